//! Domain validation and normalization.
//!
//! An invalid domain is the one failure that is fatal before any work starts,
//! so it gets its own error with an actionable message.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Maximum domain length per RFC 1035.
const MAX_DOMAIN_LEN: usize = 253;

/// Raised when a domain name fails validation.
#[derive(Debug, Error)]
#[error(
    "invalid domain '{domain}': {reason}. Provide a bare domain such as 'example.com' or 'www.example.com'"
)]
pub struct DomainError {
    /// The rejected input.
    pub domain: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl DomainError {
    fn new(domain: impl Into<String>, reason: &'static str) -> Self {
        Self {
            domain: domain.into(),
            reason,
        }
    }
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Standard dotted domain, single label (localhost), IPv4, or bare IPv6.
        #[allow(clippy::expect_used)]
        Regex::new(
            r"(?x)
            ^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$
            |^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$
            |^(?:[0-9]{1,3}\.){3}[0-9]{1,3}$
            |^\[?[0-9a-f:]+\]?$",
        )
        .expect("domain pattern compiles")
    })
}

/// Validates and normalizes a domain name, with an optional `:port` suffix.
///
/// Strips any scheme and trailing slashes, lowercases, and checks the result
/// against a conservative domain grammar.
///
/// # Errors
///
/// Returns [`DomainError`] when the input is empty, too long, or malformed.
pub fn validate_domain(domain: &str) -> Result<String, DomainError> {
    let raw = domain;
    if raw.trim().is_empty() {
        return Err(DomainError::new(raw, "domain cannot be empty"));
    }

    let mut domain = raw.trim().to_lowercase();

    if domain.starts_with("http://") || domain.starts_with("https://") {
        if let Ok(parsed) = Url::parse(&domain) {
            if let Some(host) = parsed.host_str() {
                domain = match parsed.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
            }
        }
    }
    let domain = domain.trim_end_matches('/').to_string();

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(DomainError::new(raw, "domain name too long"));
    }
    if domain.contains("..") {
        return Err(DomainError::new(
            raw,
            "domain cannot contain consecutive dots",
        ));
    }

    let (host, port) = split_port(&domain);
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(DomainError::new(raw, "invalid port number"));
        }
    }
    if !domain_pattern().is_match(host) {
        return Err(DomainError::new(raw, "unrecognized domain format"));
    }

    Ok(domain)
}

/// Splits a trailing `:port` off a host. A bare IPv6 address keeps its
/// colons; only a bracketed one (`[::1]:8080`) can carry a port.
fn split_port(domain: &str) -> (&str, Option<&str>) {
    match domain.rsplit_once(':') {
        Some((host, port))
            if !host.is_empty()
                && !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!host.contains(':') || (host.starts_with('[') && host.ends_with(']'))) =>
        {
            (host, Some(port))
        }
        _ => (domain, None),
    }
}
