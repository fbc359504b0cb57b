//! URL validation and the allow/deny lists of news sources.

use url::Url;

pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "kompas.com",
    "detik.com",
    "tempo.co",
    "antaranews.com",
    "bbc.com",
    "cnbcindonesia.com",
    "republika.co.id",
    "katadata.co.id",
    "theguardian.com",
    "nytimes.com",
];

pub const DEFAULT_BLOCKED_DOMAINS: &[&str] = &["cnnindonesia.com"];

/// True if `raw` parses as an absolute `http` or `https` URL.
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Hostname of `raw` without a leading `www.`; empty if it does not parse.
pub fn extract_domain(raw: &str) -> String {
    Url::parse(raw.trim())
        .ok()
        .and_then(|url| url.host_str().map(normalize_host))
        .unwrap_or_default()
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

fn matches_rule(domain: &str, rule: &str) -> bool {
    domain == rule
        || (domain.len() > rule.len()
            && domain.ends_with(rule)
            && domain.as_bytes()[domain.len() - rule.len() - 1] == b'.')
}

/// Why a domain may not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("source is on the deny list")]
    Blocked,

    #[error("source is not on the allow list")]
    NotAllowed,
}

/// The two static source lists, matched on whole dot-separated suffixes.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAINS, DEFAULT_BLOCKED_DOMAINS)
    }
}

impl DomainPolicy {
    pub fn new<A, B>(allowed: A, blocked: B) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        let clean = |items: Vec<String>| -> Vec<String> {
            items.into_iter().filter(|d| !d.is_empty()).collect()
        };
        Self {
            allowed: clean(allowed.into_iter().map(|d| normalize_host(d.as_ref())).collect()),
            blocked: clean(blocked.into_iter().map(|d| normalize_host(d.as_ref())).collect()),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn blocked(&self) -> &[String] {
        &self.blocked
    }

    pub fn is_domain_allowed(&self, domain: &str) -> bool {
        let domain = normalize_host(domain);
        self.allowed.iter().any(|rule| matches_rule(&domain, rule))
    }

    pub fn is_domain_blocked(&self, domain: &str) -> bool {
        let domain = normalize_host(domain);
        self.blocked.iter().any(|rule| matches_rule(&domain, rule))
    }

    /// Deny list first, then allow list.
    pub fn check(&self, domain: &str) -> Result<(), PolicyViolation> {
        if self.is_domain_blocked(domain) {
            return Err(PolicyViolation::Blocked);
        }
        if !self.is_domain_allowed(domain) {
            return Err(PolicyViolation::NotAllowed);
        }
        Ok(())
    }
}
