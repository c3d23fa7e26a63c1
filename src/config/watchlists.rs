// Watch-lists consulted by the feature extractors
// Loaded once from data/watchlists.json, built-in lists used for anything missing

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Brands whose names are imitated inside look-alike domains
const POPULAR_DOMAINS: [&str; 10] = [
    "google",
    "facebook",
    "amazon",
    "apple",
    "netflix",
    "microsoft",
    "paypal",
    "yahoo",
    "instagram",
    "twitter",
];

/// Public suffixes common in throwaway phishing registrations
const SUSPICIOUS_TLDS: [&str; 6] = ["tk", "xyz", "ml", "ga", "cf", "gq"];

const SUSPICIOUS_WORDS: [&str; 10] = [
    "login", "signin", "account", "password", "secure", "update", "banking", "confirm", "verify",
    "paypal",
];

const TRUSTED_CAS: [&str; 11] = [
    "DigiCert",
    "Let's Encrypt",
    "Comodo",
    "GeoTrust",
    "GlobalSign",
    "Thawte",
    "Symantec",
    "RapidSSL",
    "Amazon",
    "Google",
    "Microsoft",
];

const LURE_PHRASES: [&str; 9] = [
    "verify your account",
    "update your information",
    "limited time",
    "urgent action required",
    "suspicious activity",
    "problem with your account",
    "confirm your details",
    "your account will be locked",
    "security alert",
];

static BUILT_IN: Lazy<Arc<Watchlists>> = Lazy::new(|| Arc::new(Watchlists::default()));

/// Immutable lists shared by every extractor instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Watchlists {
    pub popular_domains: Vec<String>,
    pub suspicious_tlds: Vec<String>,
    pub suspicious_words: Vec<String>,
    pub trusted_cas: Vec<String>,
    pub lure_phrases: Vec<String>,
}

impl Default for Watchlists {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            popular_domains: owned(&POPULAR_DOMAINS),
            suspicious_tlds: owned(&SUSPICIOUS_TLDS),
            suspicious_words: owned(&SUSPICIOUS_WORDS),
            trusted_cas: owned(&TRUSTED_CAS),
            lure_phrases: owned(&LURE_PHRASES),
        }
    }
}

impl Watchlists {
    /// Shared handle to the built-in lists
    pub fn built_in() -> Arc<Watchlists> {
        BUILT_IN.clone()
    }

    /// Load lists from a JSON file, keeping the built-in list for every key the file omits.
    /// A missing or malformed file falls back to the built-in lists entirely.
    pub fn load(path: impl AsRef<Path>) -> Arc<Watchlists> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Watchlists>(&content) {
                Ok(lists) => {
                    let lists = lists.normalized();
                    info!(
                        "Loaded watch-lists from {}: {} popular domains, {} suspicious TLDs, {} trusted CAs",
                        path.display(),
                        lists.popular_domains.len(),
                        lists.suspicious_tlds.len(),
                        lists.trusted_cas.len()
                    );
                    Arc::new(lists)
                },
                Err(e) => {
                    warn!(
                        "Malformed watch-list file {}: {}, using built-in lists",
                        path.display(),
                        e
                    );
                    Self::built_in()
                },
            },
            Err(e) => {
                warn!(
                    "Failed to load watch-lists from {}: {}, using built-in lists",
                    path.display(),
                    e
                );
                Self::built_in()
            },
        }
    }

    // Matching is done on lower-cased text, except trusted CA names which are compared
    // case-insensitively at match time
    fn normalized(mut self) -> Self {
        let lower = |items: &mut Vec<String>| {
            for item in items.iter_mut() {
                *item = item.trim().to_lowercase();
            }
            items.retain(|s| !s.is_empty());
        };
        lower(&mut self.popular_domains);
        lower(&mut self.suspicious_tlds);
        lower(&mut self.suspicious_words);
        lower(&mut self.lure_phrases);
        self.trusted_cas.retain(|s| !s.trim().is_empty());
        self
    }

    pub fn is_suspicious_tld(&self, suffix: &str) -> bool {
        self.suspicious_tlds.iter().any(|t| t == suffix)
    }

    /// A brand name appears inside the domain label without being the label itself
    pub fn imitates_popular_domain(&self, domain_label: &str) -> bool {
        self.popular_domains
            .iter()
            .any(|brand| domain_label.contains(brand.as_str()) && brand != domain_label)
    }

    pub fn suspicious_word_count(&self, text: &str) -> usize {
        self.suspicious_words
            .iter()
            .filter(|w| text.contains(w.as_str()))
            .count()
    }

    pub fn is_trusted_issuer(&self, issuer_org: &str) -> bool {
        let issuer = issuer_org.to_lowercase();
        self.trusted_cas
            .iter()
            .any(|ca| issuer.contains(&ca.to_lowercase()))
    }

    pub fn lure_phrase_count(&self, text: &str) -> usize {
        self.lure_phrases
            .iter()
            .filter(|p| text.contains(p.as_str()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_popular_domain_substring_rules() {
        let lists = Watchlists::default();

        assert!(lists.imitates_popular_domain("paypal-secure"));
        assert!(lists.imitates_popular_domain("mygoogleaccount"));
        // exact brand is the brand itself
        assert!(!lists.imitates_popular_domain("paypal"));
        // digit substitution is not caught by plain substring matching
        assert!(!lists.imitates_popular_domain("paypa1-secure"));
        assert!(!lists.imitates_popular_domain("example"));
    }

    #[test]
    fn test_trusted_issuer_is_case_insensitive() {
        let lists = Watchlists::default();

        assert!(lists.is_trusted_issuer("Let's Encrypt"));
        assert!(lists.is_trusted_issuer("DIGICERT INC"));
        assert!(lists.is_trusted_issuer("Google Trust Services LLC"));
        assert!(!lists.is_trusted_issuer("Acme Self Signed"));
        assert!(!lists.is_trusted_issuer(""));
    }

    #[test]
    fn test_word_and_phrase_counts() {
        let lists = Watchlists::default();

        assert_eq!(lists.suspicious_word_count("/login"), 1);
        assert_eq!(lists.suspicious_word_count("/secure/account/verify"), 3);
        assert_eq!(
            lists.lure_phrase_count("security alert: please verify your account"),
            2
        );
        assert!(lists.is_suspicious_tld("tk"));
        assert!(!lists.is_suspicious_tld("com"));
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        let path = std::env::temp_dir().join(format!("watchlists-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{"suspicious_tlds": ["TOP", " zip "]}}"#).unwrap();

        let lists = Watchlists::load(&path);
        assert_eq!(lists.suspicious_tlds, vec!["top", "zip"]);
        assert_eq!(lists.popular_domains.len(), POPULAR_DOMAINS.len());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_or_malformed_file_falls_back() {
        let missing = Watchlists::load("/definitely/not/here.json");
        assert_eq!(*missing, Watchlists::default());

        let path = std::env::temp_dir().join(format!("watchlists-bad-{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(*Watchlists::load(&path), Watchlists::default());
        std::fs::remove_file(&path).ok();
    }
}
