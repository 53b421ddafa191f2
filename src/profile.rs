//! Applies a [`ProfileConfig`] to a [`CertificateRequest`], producing the
//! concrete subject, SAN, key usage, extended key usage, basic constraints
//! and validity period the Issuer will certify — or rejects the request
//! when it does not satisfy the profile's policy.

use regex::Regex;

use crate::error::{CaError, Result};
use crate::model::{CertificateRequest, ProfileConfig};
use crate::value_objects::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SanEntry, SubjectAlternativeName, SubjectName,
};

/// The fields the Issuer needs after a request has cleared profile policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedProfile {
    /// The final subject DN (request values layered over profile defaults).
    pub subject: SubjectName,
    /// The final SAN list (request values, already validated against policy).
    pub subject_alt_name: SubjectAlternativeName,
    /// The profile's key usage.
    pub key_usage: KeyUsage,
    /// The profile's extended key usage.
    pub extended_key_usage: ExtendedKeyUsage,
    /// The profile's basic constraints.
    pub basic_constraints: BasicConstraints,
    /// The validity period to issue with, in days, after clamping to the
    /// profile's maximum.
    pub validity_days: u32,
}

/// Applies profiles to requests. Stateless; profiles are passed in by the
/// caller (typically fetched from the Store's profile registry).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileEngine;

impl ProfileEngine {
    /// Create a new engine. There is no per-instance state.
    pub fn new() -> Self {
        Self
    }

    /// Apply `profile` to `request`, validating it against the profile's
    /// policy. Returns the fields the Issuer should certify.
    pub fn apply(&self, profile: &ProfileConfig, request: &CertificateRequest) -> Result<AppliedProfile> {
        let subject = Self::merge_subject(profile, request)?;
        Self::enforce_required_fields(profile, &subject)?;
        Self::validate_san(profile, &request.subject_alt_name)?;

        let validity_days = request
            .requested_validity_days
            .unwrap_or(profile.max_validity_days)
            .min(profile.max_validity_days);

        Ok(AppliedProfile {
            subject,
            subject_alt_name: request.subject_alt_name.clone(),
            key_usage: profile.key_usage.clone(),
            extended_key_usage: profile.extended_key_usage.clone(),
            basic_constraints: profile.basic_constraints,
            validity_days,
        })
    }

    fn merge_subject(profile: &ProfileConfig, request: &CertificateRequest) -> Result<SubjectName> {
        let defaults = &profile.subject_defaults;
        Ok(SubjectName {
            common_name: request
                .subject
                .common_name
                .clone()
                .or_else(|| defaults.common_name.clone()),
            organization: request
                .subject
                .organization
                .clone()
                .or_else(|| defaults.organization.clone()),
            organizational_unit: request
                .subject
                .organizational_unit
                .clone()
                .or_else(|| defaults.organizational_unit.clone()),
            country: request.subject.country.clone().or_else(|| defaults.country.clone()),
            state: request.subject.state.clone().or_else(|| defaults.state.clone()),
            locality: request
                .subject
                .locality
                .clone()
                .or_else(|| defaults.locality.clone()),
            email: request.subject.email.clone().or_else(|| defaults.email.clone()),
        })
    }

    fn enforce_required_fields(profile: &ProfileConfig, subject: &SubjectName) -> Result<()> {
        if profile.require_common_name && subject.common_name.is_none() {
            return Err(CaError::PolicyNotAccepted(
                "profile requires a common name".to_string(),
            ));
        }
        if profile.require_organization && subject.organization.is_none() {
            return Err(CaError::PolicyNotAccepted(
                "profile requires an organization".to_string(),
            ));
        }
        if profile.require_country && subject.country.is_none() {
            return Err(CaError::PolicyNotAccepted(
                "profile requires a country".to_string(),
            ));
        }
        if let Some(country) = &subject.country {
            if !profile.valid_countries.is_empty()
                && !profile.valid_countries.iter().any(|c| c == country.as_str())
            {
                return Err(CaError::PolicyNotAccepted(format!(
                    "country {} is not in this profile's allowed list",
                    country.as_str()
                )));
            }
        }
        Ok(())
    }

    fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
        patterns.iter().map(|p| Ok(Regex::new(p)?)).collect()
    }

    fn validate_san(profile: &ProfileConfig, san: &SubjectAlternativeName) -> Result<()> {
        if !profile.allow_wildcard && san.has_wildcard() {
            return Err(CaError::PolicyNotAccepted(
                "profile does not permit wildcard DNS names".to_string(),
            ));
        }

        let dns_patterns = Self::compile_patterns(&profile.allowed_san_patterns)?;
        let ip_patterns = Self::compile_patterns(&profile.allowed_ip_san_patterns)?;
        let uri_patterns = Self::compile_patterns(&profile.allowed_uri_san_patterns)?;
        let email_patterns = Self::compile_patterns(&profile.allowed_email_san_patterns)?;

        let mut counts = std::collections::HashMap::new();
        for entry in &san.entries {
            let (type_name, value, patterns): (&str, String, &[Regex]) = match entry {
                SanEntry::Dns(name) => ("DNS", name.as_str().to_string(), &dns_patterns),
                SanEntry::Ip(ip) => ("IP", ip.0.to_string(), &ip_patterns),
                SanEntry::Uri(uri) => ("URI", uri.as_str().to_string(), &uri_patterns),
                SanEntry::Email(email) => ("email", email.as_str().to_string(), &email_patterns),
            };

            if !patterns.is_empty() && !patterns.iter().any(|re| re.is_match(&value)) {
                return Err(CaError::PolicyNotAccepted(format!(
                    "{type_name} SAN {value} does not match any allowed pattern for this profile"
                )));
            }

            let count = counts.entry(type_name).or_insert(0u32);
            *count += 1;
            if let Some(max) = profile.max_san_count_per_type {
                if *count > max {
                    return Err(CaError::PolicyNotAccepted(format!(
                        "profile permits at most {max} {type_name} SAN entries"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Determine the basic constraints a subordinate CA issued under
    /// `parent` may carry, given the requested path length. Returns `None`
    /// when the parent's path length forbids issuing any further CA.
    pub fn subordinate_basic_constraints(
        parent: &BasicConstraints,
        requested_path_len: Option<u32>,
    ) -> Option<BasicConstraints> {
        parent
            .subordinate_path_len(requested_path_len)
            .map(|path_len_constraint| BasicConstraints {
                is_ca: true,
                path_len_constraint,
                critical: true,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{CommonName, DnsName, KeyUsageBit};

    fn base_profile() -> ProfileConfig {
        ProfileConfig {
            name: "tls-server".to_string(),
            subject_defaults: SubjectName::new(),
            require_common_name: true,
            require_organization: false,
            key_usage: KeyUsage::tls_server(),
            extended_key_usage: ExtendedKeyUsage::new(),
            allowed_san_patterns: vec![r"^[a-z0-9.-]+\.example\.com$".to_string()],
            basic_constraints: BasicConstraints::end_entity(),
            max_validity_days: 398,
            require_country: false,
            valid_countries: vec![],
            allow_wildcard: false,
            allowed_ip_san_patterns: vec![],
            allowed_uri_san_patterns: vec![],
            allowed_email_san_patterns: vec![],
            max_san_count_per_type: None,
        }
    }

    #[test]
    fn rejects_request_missing_required_common_name() {
        let profile = base_profile();
        let request = CertificateRequest {
            profile_name: profile.name.clone(),
            subject: SubjectName::new(),
            subject_alt_name: SubjectAlternativeName::new(),
            public_key_der: vec![],
            requested_validity_days: None,
            requester_id: None,
        };
        let engine = ProfileEngine::new();
        let err = engine.apply(&profile, &request).unwrap_err();
        assert!(matches!(err, CaError::PolicyNotAccepted(_)));
    }

    #[test]
    fn rejects_san_outside_allowed_pattern() {
        let profile = base_profile();
        let request = CertificateRequest {
            profile_name: profile.name.clone(),
            subject: SubjectName::new().with_common_name(CommonName::new("host.example.com").unwrap()),
            subject_alt_name: SubjectAlternativeName::new()
                .with_dns_name(DnsName::new("host.evil.com").unwrap()),
            public_key_der: vec![],
            requested_validity_days: None,
            requester_id: None,
        };
        let engine = ProfileEngine::new();
        let err = engine.apply(&profile, &request).unwrap_err();
        assert!(matches!(err, CaError::PolicyNotAccepted(_)));
    }

    #[test]
    fn clamps_validity_to_profile_maximum() {
        let profile = base_profile();
        let request = CertificateRequest {
            profile_name: profile.name.clone(),
            subject: SubjectName::new().with_common_name(CommonName::new("host.example.com").unwrap()),
            subject_alt_name: SubjectAlternativeName::new()
                .with_dns_name(DnsName::new("host.example.com").unwrap()),
            public_key_der: vec![],
            requested_validity_days: Some(10_000),
            requester_id: None,
        };
        let engine = ProfileEngine::new();
        let applied = engine.apply(&profile, &request).unwrap();
        assert_eq!(applied.validity_days, 398);
        assert!(applied.key_usage.has(KeyUsageBit::DigitalSignature));
    }
}
