// TLS certificate features for https:// URLs

use super::FeatureExtractor;
use crate::config::Watchlists;
use crate::models::{Feature, FeatureSource, FeatureVector, UNKNOWN};
use crate::utils::tls_probe::{CertificateSource, PeerCertificate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::{Host, Url};

/// Whole days until `not_after`, floored; negative once expired
pub fn days_to_expiry(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(86_400)
}

/// A SAN equals the host, or is a wildcard covering exactly one leftmost label of it
pub fn san_matches(host: &str, sans: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    sans.iter().any(|san| {
        let san = san.trim_end_matches('.').to_lowercase();
        if san == host {
            return true;
        }
        match (san.strip_prefix("*."), host.split_once('.')) {
            (Some(base), Some((label, rest))) => !label.is_empty() && !base.is_empty() && rest == base,
            _ => false,
        }
    })
}

pub struct TlsFeatureExtractor {
    certificates: Arc<dyn CertificateSource>,
    watchlists: Arc<Watchlists>,
    port: u16,
    timeout: Duration,
}

impl TlsFeatureExtractor {
    pub fn new(
        certificates: Arc<dyn CertificateSource>,
        watchlists: Arc<Watchlists>,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            certificates,
            watchlists,
            port,
            timeout,
        }
    }

    /// Features derived from a certificate retrieved for `host`
    pub fn certificate_features(&self, host: &str, cert: &PeerCertificate) -> FeatureVector {
        let mut features = FeatureVector::new();

        let trusted = cert
            .issuer_org
            .as_deref()
            .is_some_and(|org| self.watchlists.is_trusted_issuer(org));

        let days = cert
            .not_after
            .map(|not_after| days_to_expiry(not_after, Utc::now()));

        features
            .set_flag(Feature::HasSsl, true)
            .set_flag(Feature::TrustedIssuer, trusted)
            .set(
                Feature::DaysToExpiry,
                days.map(|d| d as f64).unwrap_or(UNKNOWN),
            )
            .set_flag(Feature::IsExpired, days.map_or(true, |d| d <= 0))
            .set_flag(
                Feature::DomainMatch,
                san_matches(host, &cert.subject_alt_names),
            )
            .set_flag(Feature::HasOrgInfo, cert.subject_org.is_some());

        features
    }
}

/// Host usable as a TLS server name, and the port from the URL if it names one
fn target(url: &str) -> Option<(String, Option<u16>)> {
    let parsed = Url::parse(url).ok()?;
    let host = match parsed.host()? {
        Host::Domain(domain) => domain.to_string(),
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => ip.to_string(),
    };
    Some((host, parsed.port()))
}

#[async_trait]
impl FeatureExtractor for TlsFeatureExtractor {
    fn source(&self) -> FeatureSource {
        FeatureSource::Tls
    }

    async fn extract(&self, url: &str) -> FeatureVector {
        if !url.starts_with("https://") {
            return self.empty();
        }

        let Some((host, port)) = target(url) else {
            debug!("No TLS target in {}", url);
            return self.empty();
        };
        let port = port.unwrap_or(self.port);

        match self
            .certificates
            .peer_certificate(&host, port, self.timeout)
            .await
        {
            Some(cert) => self.certificate_features(&host, &cert),
            None => self.empty(),
        }
    }

    fn empty(&self) -> FeatureVector {
        let mut features = FeatureVector::new();
        features
            .set_flag(Feature::HasSsl, false)
            .set_flag(Feature::TrustedIssuer, false)
            .set(Feature::DaysToExpiry, UNKNOWN)
            .set_flag(Feature::IsExpired, true)
            .set_flag(Feature::DomainMatch, false)
            .set_flag(Feature::HasOrgInfo, false);
        features
    }
}
