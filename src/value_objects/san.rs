//! Subject Alternative Name entries.
//!
//! Grounded in the teacher's `value_objects/x509/subject_alt_name.rs`, with
//! the graph-label (`NodeContributor`) machinery dropped since this crate
//! has no graph layer.

use std::fmt;
use std::net::IpAddr;
use thiserror::Error;

/// Errors raised while constructing a SAN entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanError {
    /// A DNS name failed RFC 1123 label validation.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(String),
    /// A URI lacked a scheme separator.
    #[error("invalid URI: {0}")]
    InvalidUri(String),
    /// An email SAN lacked an `@` and domain.
    #[error("invalid email: {0}")]
    InvalidEmail(String),
}

/// A validated DNS name SAN, with wildcard awareness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DnsName(String);

impl DnsName {
    /// Validate and wrap `value`. A single leading `*.` label is permitted.
    pub fn new(value: impl Into<String>) -> Result<Self, SanError> {
        let value = value.into();
        let check = value.strip_prefix("*.").unwrap_or(&value);
        if check.is_empty() || check.len() > 253 {
            return Err(SanError::InvalidDnsName(value));
        }
        for label in check.split('.') {
            if label.is_empty()
                || label.len() > 63
                || !label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
                || label.starts_with('-')
                || label.ends_with('-')
            {
                return Err(SanError::InvalidDnsName(value));
            }
        }
        Ok(Self(value))
    }

    /// True when this is a `*.domain` wildcard name.
    pub fn is_wildcard(&self) -> bool {
        self.0.starts_with("*.")
    }

    /// The domain with any wildcard label stripped.
    pub fn base_domain(&self) -> &str {
        self.0.strip_prefix("*.").unwrap_or(&self.0)
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DnsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An IP address SAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SanIpAddress(pub IpAddr);

/// A URI SAN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SanUri(String);

impl SanUri {
    /// Validate and wrap `value`. Requires a `scheme://` prefix.
    pub fn new(value: impl Into<String>) -> Result<Self, SanError> {
        let value = value.into();
        if !value.contains("://") {
            return Err(SanError::InvalidUri(value));
        }
        Ok(Self(value))
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An email address SAN (`rfc822Name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SanEmail(String);

impl SanEmail {
    /// Validate and wrap `value`.
    pub fn new(value: impl Into<String>) -> Result<Self, SanError> {
        let value = value.into();
        let mut parts = value.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(SanError::InvalidEmail(value));
        }
        Ok(Self(value))
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One entry in a certificate's SAN extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SanEntry {
    /// `dNSName`
    Dns(DnsName),
    /// `iPAddress`
    Ip(SanIpAddress),
    /// `uniformResourceIdentifier`
    Uri(SanUri),
    /// `rfc822Name`
    Email(SanEmail),
}

/// The full SAN extension value for a certificate request or profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubjectAlternativeName {
    /// All entries, in the order they should appear in the extension.
    pub entries: Vec<SanEntry>,
}

impl SubjectAlternativeName {
    /// An empty SAN list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a DNS name entry.
    pub fn with_dns_name(mut self, name: DnsName) -> Self {
        self.entries.push(SanEntry::Dns(name));
        self
    }

    /// Append an IP address entry.
    pub fn with_ip_address(mut self, ip: SanIpAddress) -> Self {
        self.entries.push(SanEntry::Ip(ip));
        self
    }

    /// True when any entry is a wildcard DNS name.
    pub fn has_wildcard(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, SanEntry::Dns(d) if d.is_wildcard()))
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_name_rejects_empty_labels() {
        assert!(DnsName::new("example.com").is_ok());
        assert!(DnsName::new("*.example.com").is_ok());
        assert!(DnsName::new("").is_err());
        assert!(DnsName::new("example..com").is_err());
        assert!(DnsName::new("-example.com").is_err());
    }

    #[test]
    fn wildcard_detection() {
        let wildcard = DnsName::new("*.example.com").unwrap();
        assert!(wildcard.is_wildcard());
        assert_eq!(wildcard.base_domain(), "example.com");
        let plain = DnsName::new("example.com").unwrap();
        assert!(!plain.is_wildcard());
    }

    #[test]
    fn uri_requires_scheme_separator() {
        assert!(SanUri::new("https://example.com").is_ok());
        assert!(SanUri::new("not-a-uri").is_err());
    }
}
