// Centralized configuration management for the phishing detector
// Load ALL env vars ONCE at startup

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub model: ModelConfig,
    pub watchlists_path: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub environment: Environment,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Timeouts and budgets for every outbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub fetch_timeout_secs: u64,
    pub fetch_max_retries: u32, // total attempts, not extra ones
    pub fetch_retry_delay_ms: u64,
    pub fetch_max_redirects: usize,
    pub fetch_max_body_bytes: usize,
    pub fetch_user_agent: String,
    pub tls_timeout_secs: u64,
    pub tls_port: u16,
    pub domain_age_timeout_secs: u64,
    pub rdap_base_url: String,
    pub predict_deadline_secs: u64,
}

impl NetworkConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_retry_delay_ms)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_timeout_secs)
    }

    pub fn domain_age_timeout(&self) -> Duration {
        Duration::from_secs(self.domain_age_timeout_secs)
    }

    pub fn predict_deadline(&self) -> Duration {
        Duration::from_secs(self.predict_deadline_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 5,
            fetch_max_retries: 2,
            fetch_retry_delay_ms: 1000,
            fetch_max_redirects: 10,
            fetch_max_body_bytes: 2 * 1024 * 1024,
            fetch_user_agent: DEFAULT_USER_AGENT.to_string(),
            tls_timeout_secs: 5,
            tls_port: 443,
            domain_age_timeout_secs: 5,
            rdap_base_url: "https://rdap.org".to_string(),
            predict_deadline_secs: 20,
        }
    }
}

/// Classifier persistence and training settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_path: String,
    pub training_csv_path: String,
    pub forest_size: usize,
    pub forest_max_depth: usize,
    pub forest_seed: u64,
    pub training_concurrency: usize,
    pub bulk_concurrency: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: "data/phishing_model.json".to_string(),
            training_csv_path: "data/sample_urls.csv".to_string(),
            forest_size: 100,
            forest_max_depth: 10,
            forest_seed: 42,
            training_concurrency: 8,
            bulk_concurrency: 8,
        }
    }
}

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).trim().parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_usize_or_default = |key: &str, default: &str| -> Result<usize, ConfigError> {
            get_or_default(key, default).trim().parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid usize".to_string())
            })
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).trim().parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:8080");
        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        let fetch_max_retries = parse_or_default("FETCH_MAX_RETRIES", "2")?;
        if fetch_max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "FETCH_MAX_RETRIES".to_string(),
                "at least one attempt is required".to_string(),
            ));
        }

        let tls_port: u16 = get_or_default("TLS_PORT", "443").trim().parse().map_err(|_| {
            ConfigError::InvalidValue("TLS_PORT".to_string(), "not a valid port".to_string())
        })?;

        let network = NetworkConfig {
            fetch_timeout_secs: parse_u64_or_default("FETCH_TIMEOUT_SECS", "5")?,
            fetch_max_retries,
            fetch_retry_delay_ms: parse_u64_or_default("FETCH_RETRY_DELAY_MS", "1000")?,
            fetch_max_redirects: parse_usize_or_default("FETCH_MAX_REDIRECTS", "10")?,
            fetch_max_body_bytes: parse_usize_or_default("FETCH_MAX_BODY_BYTES", "2097152")?,
            fetch_user_agent: get_or_default("FETCH_USER_AGENT", DEFAULT_USER_AGENT),
            tls_timeout_secs: parse_u64_or_default("TLS_TIMEOUT_SECS", "5")?,
            tls_port,
            domain_age_timeout_secs: parse_u64_or_default("DOMAIN_AGE_TIMEOUT_SECS", "5")?,
            rdap_base_url: get_or_default("RDAP_BASE_URL", "https://rdap.org")
                .trim_end_matches('/')
                .to_string(),
            predict_deadline_secs: parse_u64_or_default("PREDICT_DEADLINE_SECS", "20")?,
        };

        let forest_size = parse_usize_or_default("FOREST_SIZE", "100")?;
        if forest_size == 0 {
            return Err(ConfigError::InvalidValue(
                "FOREST_SIZE".to_string(),
                "the ensemble needs at least one tree".to_string(),
            ));
        }

        let model = ModelConfig {
            model_path: get_or_default("MODEL_PATH", "data/phishing_model.json"),
            training_csv_path: get_or_default("TRAINING_CSV_PATH", "data/sample_urls.csv"),
            forest_size,
            forest_max_depth: parse_usize_or_default("FOREST_MAX_DEPTH", "10")?,
            forest_seed: parse_u64_or_default("FOREST_SEED", "42")?,
            training_concurrency: parse_usize_or_default("TRAINING_CONCURRENCY", "8")?.max(1),
            bulk_concurrency: parse_usize_or_default("BULK_CONCURRENCY", "8")?.max(1),
        };

        Ok(Self {
            server: ServerConfig {
                bind_address,
                environment,
            },
            network,
            model,
            watchlists_path: get_or_default("WATCHLISTS_PATH", "data/watchlists.json"),
        })
    }
}
