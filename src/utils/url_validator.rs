// Input normalization for URLs submitted to the analyzer
// Bare hosts default to http://, the result must parse with a host

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const MAX_URL_LENGTH: usize = 8192;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("URL is empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported scheme: {0}. Only HTTP and HTTPS are supported")]
    UnsupportedScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL too long (max {max}, current {current})")]
    TooLong { max: usize, current: usize },

    #[error("URL contains suspicious characters")]
    SuspiciousCharacters,
}

/// Trim the raw input, default the scheme to `http://` and check it parses with a host.
///
/// The returned string is the text that gets analyzed; it is not re-serialized through
/// `Url`, so lexical features see what the caller sent.
pub fn normalize_input(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_URL_LENGTH,
            current: trimmed.len(),
        });
    }

    if trimmed.contains(['\0', '\r', '\n']) {
        return Err(ValidationError::SuspiciousCharacters);
    }

    // schemes are case-insensitive; the canonical lower-case form is what gets analyzed
    let explicit_scheme = trimmed.split_once("://").filter(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    let candidate = match explicit_scheme {
        Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
            lower @ ("http" | "https") => format!("{}://{}", lower, rest),
            _ => return Err(ValidationError::UnsupportedScheme(scheme.to_string())),
        },
        None => format!("http://{}", trimmed),
    };

    let parsed =
        Url::parse(&candidate).map_err(|e| ValidationError::InvalidFormat(e.to_string()))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(candidate),
        _ => Err(ValidationError::MissingHost),
    }
}
