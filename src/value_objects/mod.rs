//! Small, independently validated value types used across profile, issuer
//! and codec modules.

pub mod basic_constraints;
pub mod dn;
pub mod key_usage;
pub mod san;
pub mod validity;

pub use basic_constraints::BasicConstraints;
pub use dn::{
    CommonName, CountryCode, EmailAddress, LocalityName, OrganizationName,
    OrganizationalUnitName, StateName, SubjectName, SubjectNameError,
};
pub use key_usage::{ExtendedKeyUsage, ExtendedKeyUsagePurpose, KeyUsage, KeyUsageBit};
pub use san::{DnsName, SanEmail, SanEntry, SanError, SanIpAddress, SanUri, SubjectAlternativeName};
pub use validity::{CertificateValidity, ValidityError};
