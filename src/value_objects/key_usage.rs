//! Key usage and extended key usage bits.
//!
//! Grounded in the teacher's `value_objects/x509/key_usage.rs`, trimmed to
//! the validation logic (the CIM domain-concept traits are dropped).

use std::collections::BTreeSet;
use std::fmt;

/// One bit of the RFC 5280 `KeyUsage` extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum KeyUsageBit {
    /// Bit 0
    DigitalSignature,
    /// Bit 1
    NonRepudiation,
    /// Bit 2
    KeyEncipherment,
    /// Bit 3
    DataEncipherment,
    /// Bit 4
    KeyAgreement,
    /// Bit 5
    KeyCertSign,
    /// Bit 6
    CrlSign,
    /// Bit 7
    EncipherOnly,
    /// Bit 8
    DecipherOnly,
}

impl KeyUsageBit {
    /// The bit position within the `KeyUsage` BIT STRING (0 = most significant).
    pub fn bit_position(self) -> u8 {
        match self {
            KeyUsageBit::DigitalSignature => 0,
            KeyUsageBit::NonRepudiation => 1,
            KeyUsageBit::KeyEncipherment => 2,
            KeyUsageBit::DataEncipherment => 3,
            KeyUsageBit::KeyAgreement => 4,
            KeyUsageBit::KeyCertSign => 5,
            KeyUsageBit::CrlSign => 6,
            KeyUsageBit::EncipherOnly => 7,
            KeyUsageBit::DecipherOnly => 8,
        }
    }
}

impl fmt::Display for KeyUsageBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyUsageBit::DigitalSignature => "digitalSignature",
            KeyUsageBit::NonRepudiation => "nonRepudiation",
            KeyUsageBit::KeyEncipherment => "keyEncipherment",
            KeyUsageBit::DataEncipherment => "dataEncipherment",
            KeyUsageBit::KeyAgreement => "keyAgreement",
            KeyUsageBit::KeyCertSign => "keyCertSign",
            KeyUsageBit::CrlSign => "cRLSign",
            KeyUsageBit::EncipherOnly => "encipherOnly",
            KeyUsageBit::DecipherOnly => "decipherOnly",
        };
        write!(f, "{name}")
    }
}

/// The `KeyUsage` extension value: a set of bits plus its criticality.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyUsage {
    /// The bits that are set.
    pub bits: BTreeSet<KeyUsageBit>,
    /// Whether the extension is marked critical. CAs conventionally mark it critical.
    pub critical: bool,
}

impl KeyUsage {
    /// An empty, non-critical key usage.
    pub fn new() -> Self {
        Self::default()
    }

    /// `keyCertSign` + `cRLSign`, critical — the usual CA key usage.
    pub fn ca_certificate() -> Self {
        let mut bits = BTreeSet::new();
        bits.insert(KeyUsageBit::KeyCertSign);
        bits.insert(KeyUsageBit::CrlSign);
        Self { bits, critical: true }
    }

    /// `digitalSignature` + `keyEncipherment`, critical — typical TLS server usage.
    pub fn tls_server() -> Self {
        let mut bits = BTreeSet::new();
        bits.insert(KeyUsageBit::DigitalSignature);
        bits.insert(KeyUsageBit::KeyEncipherment);
        Self { bits, critical: true }
    }

    /// `digitalSignature`, critical — typical TLS client usage.
    pub fn tls_client() -> Self {
        let mut bits = BTreeSet::new();
        bits.insert(KeyUsageBit::DigitalSignature);
        Self { bits, critical: true }
    }

    /// True when `bit` is present.
    pub fn has(&self, bit: KeyUsageBit) -> bool {
        self.bits.contains(&bit)
    }

    /// Set `bit`.
    pub fn with(mut self, bit: KeyUsageBit) -> Self {
        self.bits.insert(bit);
        self
    }
}

/// A purpose within the `ExtendedKeyUsage` extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ExtendedKeyUsagePurpose {
    /// `id-kp-serverAuth`
    ServerAuth,
    /// `id-kp-clientAuth`
    ClientAuth,
    /// `id-kp-codeSigning`
    CodeSigning,
    /// `id-kp-emailProtection`
    EmailProtection,
    /// `id-kp-timeStamping`
    TimeStamping,
    /// `id-kp-OCSPSigning`
    OcspSigning,
    /// `anyExtendedKeyUsage`
    AnyExtendedKeyUsage,
    /// An OID not covered by the well-known purposes above.
    Custom(String),
}

impl ExtendedKeyUsagePurpose {
    /// The dotted OID string for this purpose.
    pub fn oid(&self) -> &str {
        match self {
            ExtendedKeyUsagePurpose::ServerAuth => "1.3.6.1.5.5.7.3.1",
            ExtendedKeyUsagePurpose::ClientAuth => "1.3.6.1.5.5.7.3.2",
            ExtendedKeyUsagePurpose::CodeSigning => "1.3.6.1.5.5.7.3.3",
            ExtendedKeyUsagePurpose::EmailProtection => "1.3.6.1.5.5.7.3.4",
            ExtendedKeyUsagePurpose::TimeStamping => "1.3.6.1.5.5.7.3.8",
            ExtendedKeyUsagePurpose::OcspSigning => "1.3.6.1.5.5.7.3.9",
            ExtendedKeyUsagePurpose::AnyExtendedKeyUsage => "2.5.29.37.0",
            ExtendedKeyUsagePurpose::Custom(oid) => oid,
        }
    }
}

/// The `ExtendedKeyUsage` extension value.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExtendedKeyUsage {
    /// The purposes listed, in order.
    pub purposes: Vec<ExtendedKeyUsagePurpose>,
    /// Whether the extension is marked critical.
    pub critical: bool,
}

impl ExtendedKeyUsage {
    /// An empty, non-critical extended key usage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `purpose`.
    pub fn with(mut self, purpose: ExtendedKeyUsagePurpose) -> Self {
        self.purposes.push(purpose);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ca_certificate_sets_cert_sign_and_crl_sign() {
        let ku = KeyUsage::ca_certificate();
        assert!(ku.has(KeyUsageBit::KeyCertSign));
        assert!(ku.has(KeyUsageBit::CrlSign));
        assert!(ku.critical);
    }

    #[test]
    fn bit_positions_are_stable() {
        assert_eq!(KeyUsageBit::DigitalSignature.bit_position(), 0);
        assert_eq!(KeyUsageBit::DecipherOnly.bit_position(), 8);
    }

    #[test]
    fn well_known_oids_match_rfc5280() {
        assert_eq!(ExtendedKeyUsagePurpose::ServerAuth.oid(), "1.3.6.1.5.5.7.3.1");
        assert_eq!(ExtendedKeyUsagePurpose::OcspSigning.oid(), "1.3.6.1.5.5.7.3.9");
    }
}
