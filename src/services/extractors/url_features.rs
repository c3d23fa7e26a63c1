// Lexical features of the URL string plus the registration age of its domain

use super::FeatureExtractor;
use crate::config::Watchlists;
use crate::models::{Feature, FeatureSource, FeatureVector, UNKNOWN};
use crate::utils::domain_age::{age_in_days, DomainAgeLookup};
use crate::utils::DomainParts;
use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

lazy_static! {
    /// Scheme followed directly by a dotted-quad IPv4 literal
    static ref IP_URL_PATTERN: Regex =
        Regex::new(r"^https?://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("Invalid IP URL regex");
}

/// Authority, path and query of a URL, split the way `urlparse` does.
/// Works on strings that do not parse as URLs.
#[derive(Debug, Default, PartialEq)]
struct RawParts<'a> {
    host: String,
    path: &'a str,
    query: &'a str,
}

impl<'a> RawParts<'a> {
    fn split(url: &'a str) -> Self {
        let (has_authority, rest) = match url.find("://") {
            Some(i) if url[..i].chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) => {
                (true, &url[i + 3..])
            },
            _ => match url.strip_prefix("//") {
                Some(rest) => (true, rest),
                None => (false, url),
            },
        };

        let (netloc, rest) = if has_authority {
            let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        } else {
            ("", rest)
        };

        let rest = rest.split('#').next().unwrap_or("");
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

        Self {
            host: host_of_netloc(netloc),
            path,
            query,
        }
    }
}

fn host_of_netloc(netloc: &str) -> String {
    let hostport = netloc.rsplit('@').next().unwrap_or("");
    let host = if hostport.starts_with('[') {
        match hostport.find(']') {
            Some(end) => &hostport[..=end],
            None => hostport,
        }
    } else {
        hostport.split(':').next().unwrap_or("")
    };
    host.to_lowercase()
}

/// Distinct parameter names carrying a non-empty value
fn query_param_count(query: &str) -> usize {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .map(|(name, _)| name.into_owned())
        .collect::<HashSet<_>>()
        .len()
}

pub struct UrlFeatureExtractor {
    watchlists: Arc<Watchlists>,
    age_lookup: Arc<dyn DomainAgeLookup>,
    age_timeout: Duration,
}

impl UrlFeatureExtractor {
    pub fn new(
        watchlists: Arc<Watchlists>,
        age_lookup: Arc<dyn DomainAgeLookup>,
        age_timeout: Duration,
    ) -> Self {
        Self {
            watchlists,
            age_lookup,
            age_timeout,
        }
    }

    /// Every feature except the domain age, which needs the network
    pub fn lexical_features(&self, url: &str) -> (FeatureVector, DomainParts) {
        let mut features = FeatureVector::new();

        features
            .set_count(Feature::UrlLength, url.chars().count())
            .set_count(
                Feature::UrlSpecialChars,
                url.chars()
                    .filter(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
                    .count(),
            )
            .set_flag(Feature::UsesHttps, url.starts_with("https://"))
            .set_count(Feature::DotCount, url.matches('.').count())
            .set_flag(Feature::UsesIpAddress, IP_URL_PATTERN.is_match(url));

        let raw = RawParts::split(url);
        let parts = DomainParts::from_host(&raw.host);

        features
            .set_flag(
                Feature::ContainsPopularDomain,
                self.watchlists.imitates_popular_domain(&parts.domain),
            )
            .set_count(Feature::DomainLength, parts.domain.chars().count())
            .set_count(Feature::DomainHyphenCount, parts.domain.matches('-').count())
            .set_flag(
                Feature::SuspiciousTld,
                self.watchlists.is_suspicious_tld(&parts.suffix),
            );

        let path_query = format!("{}{}", raw.path, raw.query).to_lowercase();
        features
            .set_count(Feature::PathLength, raw.path.chars().count())
            .set_count(Feature::QueryLength, raw.query.chars().count())
            .set_count(Feature::QueryParamCount, query_param_count(raw.query))
            .set_count(
                Feature::SuspiciousWordsCount,
                self.watchlists.suspicious_word_count(&path_query),
            );

        (features, parts)
    }

    async fn domain_age_days(&self, parts: &DomainParts) -> f64 {
        let Some(registrable) = parts.registrable() else {
            return UNKNOWN;
        };

        match self
            .age_lookup
            .creation_date(&registrable, self.age_timeout)
            .await
        {
            Some(created) => age_in_days(created, Utc::now()) as f64,
            None => {
                debug!("No registration date for {}", registrable);
                UNKNOWN
            },
        }
    }
}

#[async_trait]
impl FeatureExtractor for UrlFeatureExtractor {
    fn source(&self) -> FeatureSource {
        FeatureSource::Url
    }

    async fn extract(&self, url: &str) -> FeatureVector {
        let (mut features, parts) = self.lexical_features(url);
        let age = self.domain_age_days(&parts).await;
        features.set(Feature::DomainAgeDays, age);
        features
    }

    fn empty(&self) -> FeatureVector {
        Feature::for_source(FeatureSource::Url)
            .map(|f| (f, f.default_value()))
            .collect()
    }

    /// Lexical features with an unknown domain age
    fn fallback(&self, url: &str) -> FeatureVector {
        let (mut features, _) = self.lexical_features(url);
        features.set(Feature::DomainAgeDays, UNKNOWN);
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    struct NoAge;

    #[async_trait]
    impl DomainAgeLookup for NoAge {
        async fn creation_date(&self, _domain: &str, _timeout: Duration) -> Option<DateTime<Utc>> {
            None
        }
    }

    #[test]
    fn test_fallback_keeps_lexical_features() {
        let extractor =
            UrlFeatureExtractor::new(Watchlists::built_in(), Arc::new(NoAge), Duration::from_secs(1));
        let features = extractor.fallback("https://www.example.com/");

        assert_eq!(features.len(), 14);
        assert_eq!(features.get(Feature::UsesHttps), 1.0);
        assert_eq!(features.get(Feature::UrlLength), 24.0);
        assert_eq!(features.get(Feature::DotCount), 2.0);
        assert_eq!(features.get(Feature::DomainLength), 7.0);
        assert_eq!(features.get(Feature::DomainAgeDays), UNKNOWN);
    }

    #[test]
    fn test_raw_parts_split() {
        let raw = RawParts::split("http://User@WWW.Example.com:8080/login?user=test#top");
        assert_eq!(raw.host, "www.example.com");
        assert_eq!(raw.path, "/login");
        assert_eq!(raw.query, "user=test");

        let raw = RawParts::split("http://www.example.com");
        assert_eq!(raw.path, "");
        assert_eq!(raw.query, "");

        let raw = RawParts::split("https://[::1]:443/x");
        assert_eq!(raw.host, "[::1]");
        assert_eq!(raw.path, "/x");

        // no authority at all
        let raw = RawParts::split("not a url?q=1");
        assert_eq!(raw.host, "");
        assert_eq!(raw.path, "not a url");
        assert_eq!(raw.query, "q=1");
    }

    #[test]
    fn test_query_param_count_semantics() {
        assert_eq!(query_param_count(""), 0);
        assert_eq!(query_param_count("user=test"), 1);
        assert_eq!(query_param_count("a=1&a=2&b=3"), 2);
        // blank values and bare names are dropped
        assert_eq!(query_param_count("a=&b&c=1"), 1);
    }
}
