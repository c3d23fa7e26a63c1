// Human-readable reasons behind a verdict

use crate::models::{Feature, FeatureVector, MAX_INDICATORS};

fn check(features: &FeatureVector, feature: Feature, default: f64, expected: f64) -> bool {
    features.get_or(feature, default) == expected
}

/// Suspicious signals in checklist order, at most `MAX_INDICATORS`.
///
/// The certificate checks contribute at most one entry, the first that fails.
pub fn negative_indicators(features: &FeatureVector) -> Vec<String> {
    let mut indicators = Vec::new();

    if check(features, Feature::UsesHttps, 1.0, 0.0) {
        indicators.push("URL does not use HTTPS".to_string());
    }
    if check(features, Feature::UsesIpAddress, 0.0, 1.0) {
        indicators.push("URL uses an IP address instead of a domain".to_string());
    }
    if check(features, Feature::SuspiciousTld, 0.0, 1.0) {
        indicators.push("Domain uses a suspicious TLD".to_string());
    }
    if check(features, Feature::ContainsPopularDomain, 0.0, 1.0) {
        indicators.push("URL imitates a popular domain".to_string());
    }

    let age = features.get_or(Feature::DomainAgeDays, 365.0);
    if age < 30.0 && age > 0.0 {
        indicators.push(format!("Domain registered recently ({} days)", age));
    }

    if check(features, Feature::FormExternalAction, 0.0, 1.0) {
        indicators.push("Form submits data to an external site".to_string());
    }
    if features.get_or(Feature::SuspiciousTextScore, 0.0) >= 2.0 {
        indicators.push("Page contains suspicious text".to_string());
    }
    if check(features, Feature::HasRedirect, 0.0, 1.0) {
        indicators.push("Page redirects automatically".to_string());
    }

    if check(features, Feature::HasSsl, 1.0, 0.0) {
        indicators.push("Site does not use an SSL certificate".to_string());
    } else if check(features, Feature::TrustedIssuer, 1.0, 0.0) {
        indicators.push("SSL certificate not issued by a trusted authority".to_string());
    } else if check(features, Feature::IsExpired, 0.0, 1.0) {
        indicators.push("SSL certificate has expired".to_string());
    } else if check(features, Feature::DomainMatch, 1.0, 0.0) {
        indicators.push("SSL certificate does not match the domain".to_string());
    }

    indicators.truncate(MAX_INDICATORS);
    indicators
}

/// Reassuring signals in checklist order, at most `MAX_INDICATORS`
pub fn positive_indicators(features: &FeatureVector) -> Vec<String> {
    let checklist: [(bool, &str); 12] = [
        (check(features, Feature::UsesHttps, 1.0, 1.0), "URL uses HTTPS"),
        (
            check(features, Feature::UsesIpAddress, 0.0, 0.0),
            "URL uses a valid domain",
        ),
        (
            check(features, Feature::SuspiciousTld, 0.0, 0.0),
            "Domain uses a trusted TLD",
        ),
        (
            check(features, Feature::ContainsPopularDomain, 0.0, 0.0),
            "URL does not imitate popular domains",
        ),
        (
            features.get_or(Feature::DomainAgeDays, 365.0) >= 30.0,
            "Domain registered more than 30 days ago",
        ),
        (
            check(features, Feature::FormExternalAction, 0.0, 0.0),
            "Form does not submit data to an external site",
        ),
        (
            features.get_or(Feature::SuspiciousTextScore, 0.0) < 2.0,
            "Page contains no suspicious text",
        ),
        (
            check(features, Feature::HasRedirect, 0.0, 0.0),
            "Page does not redirect automatically",
        ),
        (
            check(features, Feature::HasSsl, 1.0, 1.0),
            "Site uses an SSL certificate",
        ),
        (
            check(features, Feature::TrustedIssuer, 1.0, 1.0),
            "SSL certificate issued by a trusted authority",
        ),
        (
            check(features, Feature::IsExpired, 0.0, 0.0),
            "SSL certificate is valid",
        ),
        (
            check(features, Feature::DomainMatch, 1.0, 1.0),
            "SSL certificate matches the domain",
        ),
    ];

    checklist
        .into_iter()
        .filter(|(holds, _)| *holds)
        .map(|(_, text)| text.to_string())
        .take(MAX_INDICATORS)
        .collect()
}
