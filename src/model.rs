//! The shared data model: the structures that flow between the Issuer,
//! Store, Revocation, TSA, EST Adapter and Enrollment Tracker components.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::value_objects::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName, SubjectName,
};

/// A certificate held by the Store, indexed by both `id` and `serial_hex`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredCertificate {
    /// Internally assigned identity, stable across the certificate's lifetime.
    pub id: Uuid,
    /// Lowercase hex serial, as it appears in the certificate.
    pub serial_hex: String,
    /// DER encoding of the certificate.
    pub der: Vec<u8>,
    /// The profile this certificate was issued under.
    pub profile_name: String,
    /// Issuer DN, RFC 4514 form, as stamped into the certificate.
    pub issuer_dn: String,
    /// Identity of whoever submitted the originating request, if known.
    pub requester_id: Option<String>,
    /// Subject DN as issued.
    pub subject: SubjectName,
    /// `notBefore`.
    pub not_before: DateTime<Utc>,
    /// `notAfter`.
    pub not_after: DateTime<Utc>,
    /// SHA-256 fingerprint of `der`.
    pub fingerprint_sha256: [u8; 32],
    /// Set once the certificate has been revoked.
    pub revocation: Option<RevocationRecord>,
    /// When this record was created.
    pub issued_at: DateTime<Utc>,
}

impl StoredCertificate {
    /// The certificate's current status, derived from its revocation record
    /// (if any) and its validity window as of `now`. `CertificateHold` is
    /// reported as `Suspended` rather than `Revoked`, since a hold is
    /// reversible.
    pub fn status(&self, now: DateTime<Utc>) -> CertificateStatus {
        if let Some(record) = &self.revocation {
            return if matches!(record.reason, RevocationReason::CertificateHold) {
                CertificateStatus::Suspended
            } else {
                CertificateStatus::Revoked
            };
        }
        if now > self.not_after {
            CertificateStatus::Expired
        } else {
            CertificateStatus::Active
        }
    }
}

/// The lifecycle status of a [`StoredCertificate`], computed rather than
/// stored, so it can never drift from the revocation record and validity
/// window it is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CertificateStatus {
    /// Not revoked and within its validity window.
    Active,
    /// Revoked for a reason other than `certificateHold`.
    Revoked,
    /// Past `notAfter`, never revoked.
    Expired,
    /// Revoked with reason `certificateHold`.
    Suspended,
}

/// A named issuance policy: default and constrained subject fields, key
/// usage, extended key usage, SAN rules, basic constraints and validity
/// bounds. Loaded from YAML; see `config.rs`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProfileConfig {
    /// The name callers reference this profile by.
    pub name: String,
    /// Subject DN fields applied when the request omits them.
    #[serde(default)]
    pub subject_defaults: SubjectName,
    /// Subject DN fields the request is required to supply (non-empty).
    #[serde(default)]
    pub require_common_name: bool,
    /// Require the request to supply an organization.
    #[serde(default)]
    pub require_organization: bool,
    /// Require the request to supply a country.
    #[serde(default)]
    pub require_country: bool,
    /// Countries the subject DN's `C` attribute is allowed to be. Empty
    /// means any value accepted by [`crate::value_objects::CountryCode`] is
    /// allowed.
    #[serde(default)]
    pub valid_countries: Vec<String>,
    /// Whether a `*.`-prefixed DNS SAN is permitted.
    #[serde(default)]
    pub allow_wildcard: bool,
    /// The key usage bits this profile issues with.
    pub key_usage: KeyUsage,
    /// The extended key usage purposes this profile issues with.
    #[serde(default)]
    pub extended_key_usage: ExtendedKeyUsage,
    /// Regular expressions a requested DNS SAN must match at least one of.
    /// Empty means any syntactically valid DNS SAN is accepted.
    #[serde(default)]
    pub allowed_san_patterns: Vec<String>,
    /// Regular expressions a requested IP SAN (rendered as text) must match
    /// at least one of. Empty means any IP SAN is accepted.
    #[serde(default)]
    pub allowed_ip_san_patterns: Vec<String>,
    /// Regular expressions a requested URI SAN must match at least one of.
    /// Empty means any URI SAN is accepted.
    #[serde(default)]
    pub allowed_uri_san_patterns: Vec<String>,
    /// Regular expressions a requested email SAN must match at least one of.
    /// Empty means any email SAN is accepted.
    #[serde(default)]
    pub allowed_email_san_patterns: Vec<String>,
    /// Maximum number of SAN entries of any single type (DNS, IP, URI,
    /// email) a request may carry. `None` means unlimited.
    #[serde(default)]
    pub max_san_count_per_type: Option<u32>,
    /// Basic constraints this profile issues with.
    pub basic_constraints: BasicConstraints,
    /// Maximum validity period this profile will issue, in days.
    pub max_validity_days: u32,
}

impl ProfileConfig {
    /// Compile every SAN pattern this profile declares, failing loudly if
    /// any is malformed. Called whenever a profile enters the system — at
    /// config load and at direct Store registration — rather than lazily
    /// the first time a request is validated against it.
    pub fn validate(&self) -> Result<()> {
        for pattern in self
            .allowed_san_patterns
            .iter()
            .chain(&self.allowed_ip_san_patterns)
            .chain(&self.allowed_uri_san_patterns)
            .chain(&self.allowed_email_san_patterns)
        {
            regex::Regex::new(pattern).map_err(crate::error::CaError::from)?;
        }
        Ok(())
    }
}

/// An incoming certificate request, already decoded from a CSR or
/// constructed directly by a caller (e.g. the EST Adapter).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CertificateRequest {
    /// The profile to issue under.
    pub profile_name: String,
    /// Requested subject DN fields; profile defaults fill in the rest.
    #[serde(default)]
    pub subject: SubjectName,
    /// Requested SAN entries.
    #[serde(default)]
    pub subject_alt_name: SubjectAlternativeName,
    /// DER encoding of the `SubjectPublicKeyInfo` to certify.
    pub public_key_der: Vec<u8>,
    /// Requested validity in days; clamped to the profile's maximum.
    pub requested_validity_days: Option<u32>,
    /// Identity of whoever submitted this request, if known.
    #[serde(default)]
    pub requester_id: Option<String>,
}

/// A freshly issued certificate, as returned by the Issuer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IssuedCertificate {
    /// The Store identity assigned to this certificate.
    pub id: Uuid,
    /// Lowercase hex serial.
    pub serial_hex: String,
    /// DER encoding of the issued certificate.
    pub der: Vec<u8>,
    /// PEM encoding of the issued certificate.
    pub pem: String,
}

/// One entry in the append-only issuance/revocation audit log.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuditEntry {
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// The kind of event.
    pub event: AuditEvent,
    /// The certificate id this event concerns.
    pub certificate_id: Uuid,
    /// The certificate's serial, for log correlation without a Store lookup.
    pub serial_hex: String,
}

/// The kind of event an [`AuditEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AuditEvent {
    /// A certificate was issued.
    Issued,
    /// A certificate was revoked.
    Revoked,
    /// A CRL was regenerated.
    CrlRegenerated,
}

/// RFC 5280 §5.3.1 `CRLReason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RevocationReason {
    /// `unspecified (0)`
    Unspecified,
    /// `keyCompromise (1)`
    KeyCompromise,
    /// `cACompromise (2)`
    CaCompromise,
    /// `affiliationChanged (3)`
    AffiliationChanged,
    /// `superseded (4)`
    Superseded,
    /// `cessationOfOperation (5)`
    CessationOfOperation,
    /// `certificateHold (6)`
    CertificateHold,
    /// `removeFromCRL (8)`
    RemoveFromCrl,
    /// `privilegeWithdrawn (9)`
    PrivilegeWithdrawn,
    /// `aACompromise (10)`
    AaCompromise,
}

impl RevocationReason {
    /// The RFC 5280 numeric code for this reason.
    pub fn code(self) -> u8 {
        match self {
            RevocationReason::Unspecified => 0,
            RevocationReason::KeyCompromise => 1,
            RevocationReason::CaCompromise => 2,
            RevocationReason::AffiliationChanged => 3,
            RevocationReason::Superseded => 4,
            RevocationReason::CessationOfOperation => 5,
            RevocationReason::CertificateHold => 6,
            RevocationReason::RemoveFromCrl => 8,
            RevocationReason::PrivilegeWithdrawn => 9,
            RevocationReason::AaCompromise => 10,
        }
    }
}

/// Records that a certificate has been revoked, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RevocationRecord {
    /// When the revocation was recorded.
    pub revoked_at: DateTime<Utc>,
    /// Why the certificate was revoked.
    pub reason: RevocationReason,
}

/// A parsed RFC 3161 timestamp request, ready for the TSA to answer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimestampRequest {
    /// Dotted OID of the hash algorithm used to produce `message_imprint`.
    pub hash_algorithm_oid: String,
    /// The digest of the data being timestamped.
    pub message_imprint: Vec<u8>,
    /// Optional OID the requestor wants echoed back (`reqPolicy`).
    pub requested_policy_oid: Option<String>,
    /// Optional nonce the requestor wants echoed back.
    pub nonce: Option<Vec<u8>>,
    /// Whether the TSA's full certificate chain should be embedded.
    pub cert_req: bool,
}

/// A signed RFC 3161 timestamp token, as returned by the TSA.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimestampToken {
    /// DER encoding of the degenerate PKCS#7 `SignedData` carrying the token.
    pub der: Vec<u8>,
    /// The serial number assigned to this token.
    pub serial_hex: String,
    /// When the token was generated.
    pub gen_time: DateTime<Utc>,
}

/// RFC 3161 §2.4.2 `PKIFailureInfo` reasons a TSA reports in a rejected
/// `TimeStampResp`. Bit positions match the ASN.1 `BIT STRING` definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimestampFailure {
    /// `badAlgorithm (0)`: the hash algorithm is unrecognized or unsupported.
    BadAlgorithm,
    /// `badDataFormat (5)`: the message imprint does not match its declared algorithm.
    BadDataFormat,
    /// `unacceptedPolicy (15)`: the requested policy OID is not one this TSA accepts.
    UnacceptedPolicy,
}

impl TimestampFailure {
    /// The `PKIFailureInfo` bit position for this reason.
    pub fn bit_position(self) -> u32 {
        match self {
            TimestampFailure::BadAlgorithm => 0,
            TimestampFailure::BadDataFormat => 5,
            TimestampFailure::UnacceptedPolicy => 15,
        }
    }
}

/// The result of a timestamp issuance attempt: either a granted token or a
/// rejection the caller can serialize into a DER `TimeStampResp` via
/// [`crate::codec::serialize_timestamp_response`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimestampOutcome {
    /// The request was granted; `der` is already a complete response.
    Granted(TimestampToken),
    /// The request was rejected for a protocol-level reason.
    Rejected(TimestampFailure),
}

/// The lifecycle state of an enrollment tracked by the Enrollment Tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EnrollmentStatus {
    /// A request has been recorded but not yet issued.
    Pending,
    /// The request resulted in an issued certificate.
    Issued,
    /// Issuance was attempted but failed (e.g. a signing or storage error),
    /// distinct from an outright policy [`EnrollmentStatus::Rejected`].
    Failed,
    /// The request was rejected.
    Rejected,
}

/// Tracks one enrollment attempt end to end.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnrollmentState {
    /// Unique identity for this enrollment.
    pub id: Uuid,
    /// Current lifecycle state.
    pub status: EnrollmentStatus,
    /// The profile the request targets.
    pub profile_name: String,
    /// The resulting certificate's Store id, once issued.
    pub certificate_id: Option<Uuid>,
    /// When the enrollment was created.
    pub created_at: DateTime<Utc>,
    /// When the enrollment last changed state.
    pub updated_at: DateTime<Utc>,
}
