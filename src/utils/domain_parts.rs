// Public-suffix-aware split of a host into subdomain / domain label / suffix

use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainParts {
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
}

impl DomainParts {
    /// Split a host name.
    ///
    /// IP literals keep the whole host as the domain label with an empty suffix.
    /// Hosts without a known public suffix use their last label as the domain label.
    pub fn from_host(host: &str) -> Self {
        let host = host.trim_end_matches('.').to_lowercase();
        if host.is_empty() {
            return Self::default();
        }

        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if bare.parse::<IpAddr>().is_ok() {
            return Self {
                domain: host,
                ..Self::default()
            };
        }

        let known_suffix = psl::suffix(host.as_bytes())
            .filter(|s| s.is_known())
            .and_then(|s| std::str::from_utf8(s.as_bytes()).ok().map(str::to_string));

        match known_suffix {
            Some(suffix) if suffix.len() < host.len() => {
                let rest = &host[..host.len() - suffix.len() - 1];
                let (subdomain, domain) = split_last_label(rest);
                Self {
                    subdomain,
                    domain,
                    suffix,
                }
            },
            // the host is itself a public suffix
            Some(suffix) => Self {
                suffix,
                ..Self::default()
            },
            None => {
                let (subdomain, domain) = split_last_label(&host);
                Self {
                    subdomain,
                    domain,
                    suffix: String::new(),
                }
            },
        }
    }

    /// `domain.suffix`, or `None` when either part is missing
    pub fn registrable(&self) -> Option<String> {
        if self.domain.is_empty() || self.suffix.is_empty() {
            None
        } else {
            Some(format!("{}.{}", self.domain, self.suffix))
        }
    }
}

fn split_last_label(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((sub, label)) => (sub.to_string(), label.to_string()),
        None => (String::new(), name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_common_hosts() {
        let parts = DomainParts::from_host("www.example.com");
        assert_eq!(parts.subdomain, "www");
        assert_eq!(parts.domain, "example");
        assert_eq!(parts.suffix, "com");
        assert_eq!(parts.registrable().as_deref(), Some("example.com"));

        let parts = DomainParts::from_host("a.b.example.co.uk");
        assert_eq!(parts.subdomain, "a.b");
        assert_eq!(parts.domain, "example");
        assert_eq!(parts.suffix, "co.uk");
    }

    #[test]
    fn test_split_suspicious_tld() {
        let parts = DomainParts::from_host("paypa1-secure.tk");
        assert_eq!(parts.domain, "paypa1-secure");
        assert_eq!(parts.suffix, "tk");
    }

    #[test]
    fn test_ip_literal_has_no_suffix() {
        let parts = DomainParts::from_host("192.168.1.1");
        assert_eq!(parts.domain, "192.168.1.1");
        assert_eq!(parts.suffix, "");
        assert_eq!(parts.registrable(), None);

        let parts = DomainParts::from_host("[::1]");
        assert_eq!(parts.domain, "[::1]");
        assert_eq!(parts.suffix, "");
    }

    #[test]
    fn test_unknown_suffix_uses_last_label() {
        let parts = DomainParts::from_host("localhost");
        assert_eq!(parts.domain, "localhost");
        assert_eq!(parts.suffix, "");

        let parts = DomainParts::from_host("intranet.corp-internal-zz");
        assert_eq!(parts.subdomain, "intranet");
        assert_eq!(parts.domain, "corp-internal-zz");
        assert_eq!(parts.suffix, "");
    }

    #[test]
    fn test_case_and_trailing_dot_are_ignored() {
        assert_eq!(
            DomainParts::from_host("WWW.Example.COM."),
            DomainParts::from_host("www.example.com")
        );
        assert_eq!(DomainParts::from_host(""), DomainParts::default());
    }
}
