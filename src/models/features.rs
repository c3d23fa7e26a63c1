// Feature schema shared by the extractors, the classifiers and the API
// One closed set of named numeric signals, partitioned by the extractor that owns them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Bumped whenever a feature is added, removed or changes meaning.
/// Persisted models trained against another version are not used for scoring.
pub const SCHEMA_VERSION: u32 = 1;

/// Sentinel for "unknown / unavailable"
pub const UNKNOWN: f64 = -1.0;

// =============================================================================
// SCHEMA
// =============================================================================

/// Which extractor owns a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    Url,
    Content,
    Tls,
}

impl fmt::Display for FeatureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSource::Url => write!(f, "url"),
            FeatureSource::Content => write!(f, "content"),
            FeatureSource::Tls => write!(f, "tls"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Flag,
    Count,
    Ratio,
    Days,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    // URL lexical
    UrlLength,
    UrlSpecialChars,
    UsesHttps,
    DotCount,
    UsesIpAddress,
    ContainsPopularDomain,
    DomainLength,
    DomainHyphenCount,
    SuspiciousTld,
    DomainAgeDays,
    PathLength,
    QueryLength,
    QueryParamCount,
    SuspiciousWordsCount,
    // Page content
    HasForm,
    FormWithPassword,
    FormExternalAction,
    ExternalResourceRatio,
    ExternalLinkRatio,
    HasRedirect,
    VisibleLinksCount,
    InvisibleLinksCount,
    UrlInTitle,
    SuspiciousTextScore,
    // TLS certificate
    HasSsl,
    TrustedIssuer,
    DaysToExpiry,
    IsExpired,
    DomainMatch,
    HasOrgInfo,
}

impl Feature {
    /// Every feature, in schema (column) order
    pub const ALL: [Feature; 30] = [
        Feature::UrlLength,
        Feature::UrlSpecialChars,
        Feature::UsesHttps,
        Feature::DotCount,
        Feature::UsesIpAddress,
        Feature::ContainsPopularDomain,
        Feature::DomainLength,
        Feature::DomainHyphenCount,
        Feature::SuspiciousTld,
        Feature::DomainAgeDays,
        Feature::PathLength,
        Feature::QueryLength,
        Feature::QueryParamCount,
        Feature::SuspiciousWordsCount,
        Feature::HasForm,
        Feature::FormWithPassword,
        Feature::FormExternalAction,
        Feature::ExternalResourceRatio,
        Feature::ExternalLinkRatio,
        Feature::HasRedirect,
        Feature::VisibleLinksCount,
        Feature::InvisibleLinksCount,
        Feature::UrlInTitle,
        Feature::SuspiciousTextScore,
        Feature::HasSsl,
        Feature::TrustedIssuer,
        Feature::DaysToExpiry,
        Feature::IsExpired,
        Feature::DomainMatch,
        Feature::HasOrgInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::UrlLength => "url_length",
            Feature::UrlSpecialChars => "url_special_chars",
            Feature::UsesHttps => "uses_https",
            Feature::DotCount => "dot_count",
            Feature::UsesIpAddress => "uses_ip_address",
            Feature::ContainsPopularDomain => "contains_popular_domain",
            Feature::DomainLength => "domain_length",
            Feature::DomainHyphenCount => "domain_hyphen_count",
            Feature::SuspiciousTld => "suspicious_tld",
            Feature::DomainAgeDays => "domain_age_days",
            Feature::PathLength => "path_length",
            Feature::QueryLength => "query_length",
            Feature::QueryParamCount => "query_param_count",
            Feature::SuspiciousWordsCount => "suspicious_words_count",
            Feature::HasForm => "has_form",
            Feature::FormWithPassword => "form_with_password",
            Feature::FormExternalAction => "form_external_action",
            Feature::ExternalResourceRatio => "external_resource_ratio",
            Feature::ExternalLinkRatio => "external_link_ratio",
            Feature::HasRedirect => "has_redirect",
            Feature::VisibleLinksCount => "visible_links_count",
            Feature::InvisibleLinksCount => "invisible_links_count",
            Feature::UrlInTitle => "url_in_title",
            Feature::SuspiciousTextScore => "suspicious_text_score",
            Feature::HasSsl => "has_ssl",
            Feature::TrustedIssuer => "trusted_issuer",
            Feature::DaysToExpiry => "days_to_expiry",
            Feature::IsExpired => "is_expired",
            Feature::DomainMatch => "domain_match",
            Feature::HasOrgInfo => "has_org_info",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn source(self) -> FeatureSource {
        use Feature::*;
        match self {
            UrlLength | UrlSpecialChars | UsesHttps | DotCount | UsesIpAddress
            | ContainsPopularDomain | DomainLength | DomainHyphenCount | SuspiciousTld
            | DomainAgeDays | PathLength | QueryLength | QueryParamCount
            | SuspiciousWordsCount => FeatureSource::Url,
            HasForm | FormWithPassword | FormExternalAction | ExternalResourceRatio
            | ExternalLinkRatio | HasRedirect | VisibleLinksCount | InvisibleLinksCount
            | UrlInTitle | SuspiciousTextScore => FeatureSource::Content,
            HasSsl | TrustedIssuer | DaysToExpiry | IsExpired | DomainMatch | HasOrgInfo => {
                FeatureSource::Tls
            },
        }
    }

    pub fn kind(self) -> FeatureKind {
        use Feature::*;
        match self {
            UsesHttps | UsesIpAddress | ContainsPopularDomain | SuspiciousTld | HasForm
            | FormWithPassword | FormExternalAction | HasRedirect | UrlInTitle | HasSsl
            | TrustedIssuer | IsExpired | DomainMatch | HasOrgInfo => FeatureKind::Flag,
            ExternalResourceRatio | ExternalLinkRatio => FeatureKind::Ratio,
            DomainAgeDays | DaysToExpiry => FeatureKind::Days,
            _ => FeatureKind::Count,
        }
    }

    /// Value used when the feature is absent: flags are off, everything else unknown
    pub fn default_value(self) -> f64 {
        match self.kind() {
            FeatureKind::Flag => 0.0,
            _ => UNKNOWN,
        }
    }

    /// Features owned by one extractor, in schema order
    pub fn for_source(source: FeatureSource) -> impl Iterator<Item = Feature> {
        Feature::ALL.into_iter().filter(move |f| f.source() == source)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("feature {feature} belongs to the {owner} extractor, not {extractor}")]
    ForeignFeature {
        feature: Feature,
        owner: FeatureSource,
        extractor: FeatureSource,
    },
}

// =============================================================================
// FEATURE VECTOR
// =============================================================================

/// Named numeric signals for a single URL.
///
/// Serializes as a JSON object keyed by snake_case feature name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<Feature, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: Feature, value: f64) -> &mut Self {
        self.values.insert(feature, value);
        self
    }

    pub fn set_flag(&mut self, feature: Feature, on: bool) -> &mut Self {
        self.set(feature, if on { 1.0 } else { 0.0 })
    }

    pub fn set_count(&mut self, feature: Feature, count: usize) -> &mut Self {
        self.set(feature, count as f64)
    }

    /// Raw lookup, `None` when the extractor did not produce the feature
    pub fn value(&self, feature: Feature) -> Option<f64> {
        self.values.get(&feature).copied()
    }

    /// Lookup falling back to the schema default
    pub fn get(&self, feature: Feature) -> f64 {
        self.get_or(feature, feature.default_value())
    }

    /// Lookup falling back to a rule-specific default
    pub fn get_or(&self, feature: Feature, default: f64) -> f64 {
        self.value(feature).unwrap_or(default)
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.values.contains_key(&feature)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        self.values.iter().map(|(f, v)| (*f, *v))
    }

    pub fn features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.values.keys().copied()
    }

    /// Merge an extractor's output, accepting only features from its own namespace.
    ///
    /// Accepted features are merged even when others are rejected; the rejected ones
    /// are returned so the caller can report them.
    pub fn merge_from(&mut self, source: FeatureSource, other: FeatureVector) -> Vec<SchemaError> {
        let mut rejected = Vec::new();
        for (feature, value) in other.values {
            if feature.source() == source {
                self.values.insert(feature, value);
            } else {
                rejected.push(SchemaError::ForeignFeature {
                    feature,
                    owner: feature.source(),
                    extractor: source,
                });
            }
        }
        rejected
    }

    /// Copy with every schema feature present, absent ones set to their default
    pub fn with_defaults(&self) -> FeatureVector {
        let mut complete = self.clone();
        for feature in Feature::ALL {
            complete
                .values
                .entry(feature)
                .or_insert_with(|| feature.default_value());
        }
        complete
    }

    /// Values for the given columns, absent cells filled with `fill`
    pub fn row(&self, columns: &[Feature], fill: f64) -> Vec<f64> {
        columns.iter().map(|c| self.get_or(*c, fill)).collect()
    }
}

impl FromIterator<(Feature, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (Feature, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_are_unique_and_resolvable() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_name(feature.name()), Some(feature));
        }
        assert_eq!(Feature::from_name("not_a_feature"), None);
    }

    #[test]
    fn test_namespace_sizes() {
        assert_eq!(Feature::for_source(FeatureSource::Url).count(), 14);
        assert_eq!(Feature::for_source(FeatureSource::Content).count(), 10);
        assert_eq!(Feature::for_source(FeatureSource::Tls).count(), 6);
    }

    #[test]
    fn test_defaults_by_kind() {
        assert_eq!(Feature::UsesHttps.default_value(), 0.0);
        assert_eq!(Feature::IsExpired.default_value(), 0.0);
        assert_eq!(Feature::DomainAgeDays.default_value(), UNKNOWN);
        assert_eq!(Feature::ExternalLinkRatio.default_value(), UNKNOWN);
        assert_eq!(Feature::UrlLength.default_value(), UNKNOWN);
    }

    #[test]
    fn test_merge_rejects_foreign_features() {
        let mut merged = FeatureVector::new();
        let mut tls = FeatureVector::new();
        tls.set(Feature::HasSsl, 1.0).set(Feature::UsesHttps, 1.0);

        let rejected = merged.merge_from(FeatureSource::Tls, tls);

        assert_eq!(merged.value(Feature::HasSsl), Some(1.0));
        assert!(!merged.contains(Feature::UsesHttps));
        assert_eq!(
            rejected,
            vec![SchemaError::ForeignFeature {
                feature: Feature::UsesHttps,
                owner: FeatureSource::Url,
                extractor: FeatureSource::Tls,
            }]
        );
    }

    #[test]
    fn test_with_defaults_fills_every_feature() {
        let mut partial = FeatureVector::new();
        partial.set(Feature::UrlLength, 20.0);

        let complete = partial.with_defaults();

        assert_eq!(complete.len(), Feature::ALL.len());
        assert_eq!(complete.get(Feature::UrlLength), 20.0);
        assert_eq!(complete.value(Feature::HasForm), Some(0.0));
        assert_eq!(complete.value(Feature::DaysToExpiry), Some(UNKNOWN));
    }

    #[test]
    fn test_json_uses_feature_names() {
        let mut features = FeatureVector::new();
        features.set(Feature::DotCount, 2.0);
        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json, serde_json::json!({ "dot_count": 2.0 }));

        let back: FeatureVector = serde_json::from_value(json).unwrap();
        assert_eq!(back, features);
    }

    #[test]
    fn test_row_fills_absent_columns() {
        let mut features = FeatureVector::new();
        features.set(Feature::HasSsl, 1.0);
        let row = features.row(&[Feature::HasSsl, Feature::DaysToExpiry], UNKNOWN);
        assert_eq!(row, vec![1.0, UNKNOWN]);
    }
}
