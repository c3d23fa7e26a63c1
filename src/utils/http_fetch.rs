// Bounded-retry, timeout-bounded HTTP page fetch
// Redirects are followed by hand so the length of the chain is known

use crate::app_config::{NetworkConfig, DEFAULT_USER_AGENT};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Redirect chain longer than {0} hops")]
    TooManyRedirects(usize),

    #[error("Redirect without a usable Location header from {0}")]
    BadRedirect(String),
}

impl FetchError {
    /// Only connection and timeout failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

// =============================================================================
// DATA STRUCTURES
// =============================================================================

/// A page as served at the end of its redirect chain
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: String,
    pub body: String,
    pub redirect_count: usize,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub verify_certificates: bool,
    pub timeout: Duration,
    /// Total attempts, including the first one
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            max_redirects: 10,
            max_body_bytes: 2 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn from_network(network: &NetworkConfig, verify_certificates: bool) -> Self {
        Self {
            verify_certificates,
            timeout: network.fetch_timeout(),
            max_retries: network.fetch_max_retries.max(1),
            retry_delay: network.retry_delay(),
            max_redirects: network.fetch_max_redirects,
            max_body_bytes: network.fetch_max_body_bytes,
            user_agent: network.fetch_user_agent.clone(),
        }
    }
}

// =============================================================================
// FETCHER
// =============================================================================

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page, `None` when no response could be obtained
    async fn fetch(&self, url: &str) -> Option<FetchedPage>;
}

pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_certificates)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch with the retry budget, reporting why the last attempt failed
    pub async fn try_fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let start = parse_http_url(url)?;
        let attempts = self.config.max_retries.max(1);

        let mut attempt = 1;
        loop {
            match self.fetch_once(start.clone()).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    debug!(
                        "Fetch attempt {}/{} for {} failed: {}, retrying",
                        attempt, attempts, url, e
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, start: Url) -> Result<FetchedPage, FetchError> {
        let mut current = start;
        let mut redirect_count = 0;

        loop {
            let mut response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                let next = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|location| current.join(location).ok())
                    .filter(|next| matches!(next.scheme(), "http" | "https"));

                if let Some(next) = next {
                    redirect_count += 1;
                    if redirect_count > self.config.max_redirects {
                        return Err(FetchError::TooManyRedirects(self.config.max_redirects));
                    }
                    current = next;
                    continue;
                }
                // a 3xx without Location is a final response
                if response.headers().contains_key(LOCATION) {
                    return Err(FetchError::BadRedirect(current.to_string()));
                }
            }

            let body = read_capped(&mut response, self.config.max_body_bytes).await?;

            return Ok(FetchedPage {
                status: status.as_u16(),
                final_url: current.to_string(),
                body,
                redirect_count,
            });
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        match self.try_fetch(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                debug!("Fetch failed for {}: {}", url, e);
                None
            },
        }
    }
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}

/// Read at most `cap` bytes of the body, decoding lossily as UTF-8
async fn read_capped(response: &mut reqwest::Response, cap: usize) -> Result<String, FetchError> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = cap.saturating_sub(buf.len());
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://example.com/path").is_ok());
        assert!(parse_http_url("http://127.0.0.1:8080").is_ok());
        assert!(matches!(
            parse_http_url("ftp://example.com"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(parse_http_url("not a url").is_err());
    }

    #[test]
    fn test_non_network_errors_are_not_retried() {
        assert!(!FetchError::TooManyRedirects(10).is_retryable());
        assert!(!FetchError::InvalidUrl("x".to_string()).is_retryable());
    }

    #[test]
    fn test_config_from_network() {
        let network = NetworkConfig::default();
        let config = FetchConfig::from_network(&network, false);

        assert!(!config.verify_certificates);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_redirects, 10);
    }
}
