//! Error taxonomy for the CA core.
//!
//! Every fallible operation in this crate returns [`CaError`]. Variants are
//! grouped the way the specification groups them: input, not-found,
//! conflict, unavailable, internal. [`CaError::kind`] recovers the group for
//! callers that need to map errors onto a status code without re-deriving it
//! from the message text.

use thiserror::Error;

/// The five error groups a caller-facing surface (HTTP, gRPC, CLI) maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was malformed or failed validation.
    Input,
    /// The referenced entity does not exist.
    NotFound,
    /// The request conflicts with existing state.
    Conflict,
    /// The service cannot currently satisfy the request.
    Unavailable,
    /// An internal invariant was violated or a dependency failed.
    Internal,
}

/// The error type returned by every CA core operation.
#[derive(Debug, Error)]
pub enum CaError {
    // --- Input ---
    /// A PEM block could not be parsed.
    #[error("invalid PEM: {0}")]
    InvalidPem(String),
    /// A PEM block was well-formed but carried the wrong label.
    #[error("wrong PEM type: expected {expected}, found {found}")]
    WrongPemType {
        /// The label the caller required.
        expected: String,
        /// The label actually present.
        found: String,
    },
    /// DER content could not be parsed as the requested structure.
    #[error("parse failure: {0}")]
    ParseFailure(String),
    /// A signature did not verify against its claimed key.
    #[error("signature verification failed")]
    SignatureVerificationFailed,
    /// A structurally valid message failed domain-level validation.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// DER input carried trailing bytes after a complete structure.
    #[error("trailing bytes after decoding {0}")]
    TrailingBytes(String),
    /// The requested algorithm is not supported by the Signer.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// The request does not satisfy the named profile's policy.
    #[error("policy not accepted: {0}")]
    PolicyNotAccepted(String),
    /// Generic validation failure with a human-readable reason.
    #[error("validation failure: {0}")]
    ValidationFailure(String),
    /// A message imprint's digest length did not match its declared algorithm.
    #[error("hash length mismatch: expected {expected}, found {found}")]
    HashLengthMismatch {
        /// Expected digest length in bytes.
        expected: usize,
        /// Actual digest length in bytes.
        found: usize,
    },

    // --- Not found ---
    /// No stored certificate matches the given id or serial.
    #[error("certificate not found: {0}")]
    CertificateNotFound(String),
    /// No profile is registered under the given name.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    /// No enrollment matches the given id.
    #[error("enrollment not found: {0}")]
    EnrollmentNotFound(String),
    /// No CA matches the given id.
    #[error("CA not found: {0}")]
    CaNotFound(String),

    // --- Conflict ---
    /// A certificate with this identity already exists.
    #[error("certificate already exists: {0}")]
    CertificateExists(String),
    /// A certificate with this serial already exists.
    #[error("serial already exists: {0}")]
    SerialExists(String),
    /// The certificate has already been revoked.
    #[error("certificate already revoked: {0}")]
    AlreadyRevoked(String),

    // --- Unavailable ---
    /// The service required to complete the operation is not configured.
    #[error("service not configured: {0}")]
    ServiceNotConfigured(String),

    // --- Internal ---
    /// The Signer failed to produce a signature.
    #[error("sign failure: {0}")]
    SignFailure(String),
    /// The Store failed to persist or retrieve state.
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// A value could not be serialized or deserialized.
    #[error("serialization failure: {0}")]
    SerializationFailure(String),
    /// The random number source failed.
    #[error("random source failure: {0}")]
    RandomSourceFailure(String),
}

impl CaError {
    /// The error group this variant belongs to.
    pub fn kind(&self) -> ErrorKind {
        use CaError::*;
        match self {
            InvalidPem(_)
            | WrongPemType { .. }
            | ParseFailure(_)
            | SignatureVerificationFailed
            | MalformedRequest(_)
            | TrailingBytes(_)
            | UnsupportedAlgorithm(_)
            | PolicyNotAccepted(_)
            | ValidationFailure(_)
            | HashLengthMismatch { .. } => ErrorKind::Input,

            CertificateNotFound(_) | ProfileNotFound(_) | EnrollmentNotFound(_) | CaNotFound(_) => {
                ErrorKind::NotFound
            }

            CertificateExists(_) | SerialExists(_) | AlreadyRevoked(_) => ErrorKind::Conflict,

            ServiceNotConfigured(_) => ErrorKind::Unavailable,

            SignFailure(_) | StorageFailure(_) | SerializationFailure(_) | RandomSourceFailure(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<serde_yaml::Error> for CaError {
    fn from(e: serde_yaml::Error) -> Self {
        CaError::SerializationFailure(e.to_string())
    }
}

impl From<serde_json::Error> for CaError {
    fn from(e: serde_json::Error) -> Self {
        CaError::SerializationFailure(e.to_string())
    }
}

impl From<rcgen::Error> for CaError {
    fn from(e: rcgen::Error) -> Self {
        CaError::SignFailure(e.to_string())
    }
}

impl From<regex::Error> for CaError {
    fn from(e: regex::Error) -> Self {
        CaError::ValidationFailure(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CaError>;
