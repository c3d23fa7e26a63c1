// Minimal CSV reading for URL lists and labelled training sets
// Quoted fields may contain commas; a doubled quote inside quotes is a literal quote

use crate::models::TrainingSample;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CsvError {
    #[error("CSV input is empty")]
    Empty,

    #[error("CSV is missing the \"{0}\" column")]
    MissingColumn(String),

    #[error("Invalid label {value:?} on line {line}, expected 0/1 or true/false")]
    InvalidLabel { line: usize, value: String },
}

/// Header plus data rows; blank lines and `#` comments are skipped
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: Vec<String>,
    // (1-based source line, fields)
    rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self, CsvError> {
        let mut lines = text
            .trim_start_matches('\u{feff}')
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'));

        let (_, header_line) = lines.next().ok_or(CsvError::Empty)?;
        let headers = parse_csv_line(header_line)
            .into_iter()
            .map(|h| h.to_lowercase())
            .collect();

        let rows = lines.map(|(n, line)| (n, parse_csv_line(line))).collect();

        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Result<usize, CsvError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CsvError::MissingColumn(name.to_string()))
    }

    /// Non-empty values of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<String>, CsvError> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|(_, fields)| fields.get(idx))
            .filter(|v| !v.is_empty())
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read `url,is_phishing` rows
pub fn read_training_samples(text: &str) -> Result<Vec<TrainingSample>, CsvError> {
    let table = CsvTable::parse(text)?;
    let url_idx = table.column_index("url")?;
    let label_idx = table.column_index("is_phishing")?;

    let mut samples = Vec::with_capacity(table.len());
    for (line, fields) in &table.rows {
        let url = fields.get(url_idx).map(String::as_str).unwrap_or("");
        if url.is_empty() {
            continue;
        }
        let raw_label = fields.get(label_idx).map(String::as_str).unwrap_or("");
        let is_phishing = match raw_label.to_lowercase().as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            _ => {
                return Err(CsvError::InvalidLabel {
                    line: *line,
                    value: raw_label.to_string(),
                })
            },
        };
        samples.push(TrainingSample::new(url, is_phishing));
    }

    Ok(samples)
}

/// Split one CSV line into trimmed fields
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            },
            '"' => {
                in_quotes = !in_quotes;
            },
            ',' if !in_quotes => {
                parts.push(current.trim().to_string());
                current = String::new();
            },
            _ => {
                current.push(ch);
            },
        }
    }
    parts.push(current.trim().to_string());

    parts
}
