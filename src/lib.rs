//! # ca-core
//!
//! A certificate authority core: certificate/CSR/CRL/OCSP/timestamp codec,
//! key generation and signing, serial allocation, issuance policy
//! ("profiles"), an in-memory certificate index, the end-to-end issuance
//! pipeline, revocation (CRL + OCSP), an RFC 3161 time-stamp authority, an
//! RFC 7030-shaped EST adapter, and enrollment lifecycle tracking.
//!
//! The core is synchronous: there are no suspension points, and every
//! shared data structure is safe to call from multiple threads
//! concurrently. See `SPEC_FULL.md` for the full requirements this crate
//! implements and `DESIGN.md` for where each piece is grounded.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cancellation;
pub mod codec;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod est;
pub mod issuer;
pub mod model;
pub mod profile;
pub mod revocation;
pub mod serial;
pub mod signer;
pub mod store;
pub mod tsa;
pub mod value_objects;

pub use error::{CaError, Result};

/// Convenient re-exports for the most common entry points.
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::CaConfig;
    pub use crate::enrollment::EnrollmentTracker;
    pub use crate::error::{CaError, ErrorKind, Result};
    pub use crate::est::EstAdapter;
    pub use crate::issuer::{CertificateAuthority, Issuer};
    pub use crate::model::*;
    pub use crate::profile::ProfileEngine;
    pub use crate::revocation::RevocationService;
    pub use crate::serial::SerialGenerator;
    pub use crate::signer::{KeyAlgorithm, Signer, SignerKeyPair};
    pub use crate::store::{CertificateFilter, Store};
    pub use crate::tsa::TimestampAuthority;
}
