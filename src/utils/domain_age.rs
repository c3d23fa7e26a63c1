// Domain registration date lookup over RDAP
// GET {base}/domain/{name}, registration date taken from the "registration" event

use crate::utils::http_fetch::{FetchError, HttpFetcher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DomainAgeError {
    #[error("RDAP request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("RDAP server answered with status {0}")]
    Status(u16),

    #[error("Malformed RDAP response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No registration event for {0}")]
    MissingRegistration(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait DomainAgeLookup: Send + Sync {
    /// Registration date of a registrable domain, `None` when unknown
    async fn creation_date(&self, domain: &str, timeout: Duration) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEvent {
    event_action: String,
    event_date: Option<String>,
}

pub struct RdapLookup {
    fetcher: HttpFetcher,
    base_url: String,
}

impl RdapLookup {
    /// `fetcher` should verify certificates; RDAP answers are trusted input
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn lookup(&self, domain: &str) -> Result<DateTime<Utc>, DomainAgeError> {
        let url = format!("{}/domain/{}", self.base_url, domain);
        let page = self.fetcher.try_fetch(&url).await?;

        if !(200..300).contains(&page.status) {
            return Err(DomainAgeError::Status(page.status));
        }

        parse_registration_date(&page.body)?
            .ok_or_else(|| DomainAgeError::MissingRegistration(domain.to_string()))
    }
}

#[async_trait]
impl DomainAgeLookup for RdapLookup {
    async fn creation_date(&self, domain: &str, timeout: Duration) -> Option<DateTime<Utc>> {
        let result = match tokio::time::timeout(timeout, self.lookup(domain)).await {
            Ok(result) => result,
            Err(_) => Err(DomainAgeError::Timeout(timeout)),
        };

        match result {
            Ok(date) => Some(date),
            Err(e) => {
                debug!("Domain age lookup failed for {}: {}", domain, e);
                None
            },
        }
    }
}

/// Earliest parseable registration event in an RDAP domain object
pub fn parse_registration_date(body: &str) -> Result<Option<DateTime<Utc>>, serde_json::Error> {
    let domain: RdapDomain = serde_json::from_str(body)?;

    Ok(domain
        .events
        .iter()
        .filter(|e| e.event_action.eq_ignore_ascii_case("registration"))
        .filter_map(|e| e.event_date.as_deref())
        .filter_map(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .min())
}

/// Whole days between registration and `now`, floored
pub fn age_in_days(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created).num_seconds().div_euclid(86_400)
}
