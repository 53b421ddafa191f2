//! Subject/issuer distinguished name components.
//!
//! Each RDN component is a small validated newtype rather than a free-form
//! string, matching the pattern in the teacher's `value_objects/x509`
//! module. `SubjectName` builds an RFC 4514 string for display and for
//! comparing issuer/subject DNs during chain checks.

use std::fmt;
use thiserror::Error;

/// Errors raised while constructing or parsing subject name components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubjectNameError {
    /// A required field was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// A field exceeded its maximum length.
    #[error("{field} must be at most {max} characters, found {found}")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
        /// Actual length.
        found: usize,
    },
    /// A country code was not exactly two uppercase ASCII letters.
    #[error("country code must be exactly 2 uppercase ASCII letters, found {0:?}")]
    InvalidCountryCode(String),
}

macro_rules! bounded_string {
    ($name:ident, $max:expr) => {
        /// A validated, length-bounded RDN attribute value.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap `value`.
            pub fn new(value: impl Into<String>) -> Result<Self, SubjectNameError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(SubjectNameError::Empty(stringify!($name)));
                }
                if value.len() > $max {
                    return Err(SubjectNameError::TooLong {
                        field: stringify!($name),
                        max: $max,
                        found: value.len(),
                    });
                }
                Ok(Self(value))
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

bounded_string!(CommonName, 64);
bounded_string!(OrganizationName, 64);
bounded_string!(OrganizationalUnitName, 64);
bounded_string!(StateName, 128);
bounded_string!(LocalityName, 128);

/// A two-letter ISO 3166-1 alpha-2 country code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Validate and wrap `value`. Must be exactly two uppercase ASCII letters.
    pub fn new(value: impl Into<String>) -> Result<Self, SubjectNameError> {
        let value = value.into();
        if value.len() != 2 || !value.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(SubjectNameError::InvalidCountryCode(value));
        }
        Ok(Self(value))
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An email address attribute (`emailAddress` RDN), loosely validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and wrap `value`. Requires a single `@` with content on both sides.
    pub fn new(value: impl Into<String>) -> Result<Self, SubjectNameError> {
        let value = value.into();
        let mut parts = value.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(SubjectNameError::Empty("EmailAddress"));
        }
        Ok(Self(value))
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A full subject (or issuer) distinguished name, built up RDN by RDN.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubjectName {
    /// `CN`
    pub common_name: Option<CommonName>,
    /// `O`
    pub organization: Option<OrganizationName>,
    /// `OU`
    pub organizational_unit: Option<OrganizationalUnitName>,
    /// `C`
    pub country: Option<CountryCode>,
    /// `ST`
    pub state: Option<StateName>,
    /// `L`
    pub locality: Option<LocalityName>,
    /// `emailAddress`
    pub email: Option<EmailAddress>,
}

impl SubjectName {
    /// Start an empty name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the common name.
    pub fn with_common_name(mut self, cn: CommonName) -> Self {
        self.common_name = Some(cn);
        self
    }

    /// Set the organization.
    pub fn with_organization(mut self, o: OrganizationName) -> Self {
        self.organization = Some(o);
        self
    }

    /// True when no RDN has been set.
    pub fn is_empty(&self) -> bool {
        self.common_name.is_none()
            && self.organization.is_none()
            && self.organizational_unit.is_none()
            && self.country.is_none()
            && self.state.is_none()
            && self.locality.is_none()
            && self.email.is_none()
    }

    /// Render as an RFC 4514 string, most-specific attribute first (`CN=...,O=...`).
    pub fn to_rfc4514(&self) -> String {
        let mut parts = Vec::new();
        if let Some(cn) = &self.common_name {
            parts.push(format!("CN={}", escape_rfc4514(cn.as_str())));
        }
        if let Some(ou) = &self.organizational_unit {
            parts.push(format!("OU={}", escape_rfc4514(ou.as_str())));
        }
        if let Some(o) = &self.organization {
            parts.push(format!("O={}", escape_rfc4514(o.as_str())));
        }
        if let Some(l) = &self.locality {
            parts.push(format!("L={}", escape_rfc4514(l.as_str())));
        }
        if let Some(st) = &self.state {
            parts.push(format!("ST={}", escape_rfc4514(st.as_str())));
        }
        if let Some(c) = &self.country {
            parts.push(format!("C={}", c.as_str()));
        }
        if let Some(e) = &self.email {
            parts.push(format!("emailAddress={}", escape_rfc4514(e.as_str())));
        }
        parts.join(",")
    }
}

fn escape_rfc4514(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_must_be_two_uppercase_letters() {
        assert!(CountryCode::new("US").is_ok());
        assert!(CountryCode::new("us").is_err());
        assert!(CountryCode::new("USA").is_err());
    }

    #[test]
    fn rfc4514_orders_cn_first_and_escapes_commas() {
        let name = SubjectName::new()
            .with_common_name(CommonName::new("Example, Inc.").unwrap())
            .with_organization(OrganizationName::new("Example").unwrap());
        assert_eq!(name.to_rfc4514(), "CN=Example\\, Inc.,O=Example");
    }

    #[test]
    fn email_requires_at_and_domain_dot() {
        assert!(EmailAddress::new("a@example.com").is_ok());
        assert!(EmailAddress::new("a@localhost").is_err());
        assert!(EmailAddress::new("no-at-sign").is_err());
    }
}
