//! Certificate validity periods.
//!
//! Grounded in the teacher's `value_objects/x509/validity.rs`.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Raised when `not_before` is not strictly before `not_after`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidityError {
    /// `not_before` was not before `not_after`.
    #[error("invalid validity period: not_before ({not_before}) must precede not_after ({not_after})")]
    InvalidPeriod {
        /// The offending `not_before`.
        not_before: DateTime<Utc>,
        /// The offending `not_after`.
        not_after: DateTime<Utc>,
    },
}

/// A certificate's `notBefore`/`notAfter` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CertificateValidity {
    /// `notBefore`
    pub not_before: DateTime<Utc>,
    /// `notAfter`
    pub not_after: DateTime<Utc>,
}

impl CertificateValidity {
    /// Validate and wrap a `(not_before, not_after)` pair.
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Result<Self, ValidityError> {
        if not_before >= not_after {
            return Err(ValidityError::InvalidPeriod { not_before, not_after });
        }
        Ok(Self { not_before, not_after })
    }

    /// A root CA period: 20 years, with a 5 minute backdating grace period.
    pub fn root_ca(from: DateTime<Utc>) -> Self {
        Self {
            not_before: from - Duration::minutes(5),
            not_after: from + Duration::days(365 * 20),
        }
    }

    /// An intermediate CA period: 10 years, with a 5 minute backdating grace period.
    pub fn intermediate_ca(from: DateTime<Utc>) -> Self {
        Self {
            not_before: from - Duration::minutes(5),
            not_after: from + Duration::days(365 * 10),
        }
    }

    /// A TLS server leaf period: 398 days, per the CA/Browser Forum baseline.
    pub fn tls_server(from: DateTime<Utc>) -> Self {
        Self {
            not_before: from - Duration::minutes(5),
            not_after: from + Duration::days(398),
        }
    }

    /// True when `at` falls within `[not_before, not_after]`.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.not_before && at <= self.not_after
    }

    /// True when `not_after` is in the past relative to `at`.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at > self.not_after
    }

    /// True when `not_before` is in the future relative to `at`.
    pub fn is_not_yet_valid_at(&self, at: DateTime<Utc>) -> bool {
        at < self.not_before
    }

    /// Whole days remaining until `not_after`, relative to `at`. Negative once expired.
    pub fn days_remaining(&self, at: DateTime<Utc>) -> i64 {
        (self.not_after - at).num_days()
    }

    /// Clamp this period's `not_after` to no later than `ceiling`.
    pub fn truncated_to(&self, ceiling: DateTime<Utc>) -> Self {
        Self {
            not_before: self.not_before,
            not_after: self.not_after.min(ceiling),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_period() {
        let now = Utc::now();
        assert!(CertificateValidity::new(now, now - Duration::days(1)).is_err());
    }

    #[test]
    fn truncated_to_never_extends() {
        let now = Utc::now();
        let validity = CertificateValidity::root_ca(now);
        let ceiling = now + Duration::days(30);
        let truncated = validity.truncated_to(ceiling);
        assert_eq!(truncated.not_after, ceiling);
    }

    #[test]
    fn is_valid_at_respects_bounds() {
        let now = Utc::now();
        let validity = CertificateValidity::tls_server(now);
        assert!(validity.is_valid_at(now));
        assert!(!validity.is_valid_at(now - Duration::days(1)));
    }
}
