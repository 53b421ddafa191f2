//! End-to-end certificate issuance: apply profile policy, allocate a
//! serial, sign with `rcgen`, extract metadata, record an audit entry.
//!
//! Grounded in the teacher's `certificate_service.rs`, standardized on its
//! newer `rcgen` API (`CertificateParams::new`, `KeyPair::generate`,
//! `params.self_signed`, `Issuer::new`, `params.signed_by`) rather than the
//! older style used elsewhere in the teacher (`crypto/x509.rs`).

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use rcgen::{
    BasicConstraints as RcgenBasicConstraints, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose as RcgenEku, Ia5String, IsCa, KeyUsagePurpose as RcgenKu, SanType,
};
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::error::{CaError, Result};
use crate::model::{AuditEntry, AuditEvent, CertificateRequest, IssuedCertificate, StoredCertificate};
use crate::profile::ProfileEngine;
use crate::serial::{serial_to_hex, SerialGenerator};
use crate::signer::SignerKeyPair;
use crate::store::Store;
use crate::value_objects::{
    BasicConstraints, ExtendedKeyUsagePurpose, KeyUsage, KeyUsageBit, SanEntry, SubjectName,
};

/// A loaded certificate authority: the signing key and parameters used to
/// sign everything issued below it.
pub struct CertificateAuthority {
    /// The CA's own key pair.
    pub key_pair: SignerKeyPair,
    /// The CA's own certificate, DER-encoded.
    pub certificate_der: Vec<u8>,
    /// The CA's subject DN, used as the issuer DN on certificates it signs.
    pub subject: SubjectName,
    /// The CA's basic constraints, used to enforce path-length rules on
    /// any subordinate CA it issues.
    pub basic_constraints: BasicConstraints,
    /// The CA's own `notAfter`; no certificate it issues may outlive it.
    pub not_after: DateTime<Utc>,
}

/// Issues certificates against a [`CertificateAuthority`], a [`Store`] of
/// profiles, and a [`SerialGenerator`].
pub struct Issuer<'a> {
    ca: &'a CertificateAuthority,
    store: &'a Store,
    serials: &'a SerialGenerator,
    profile_engine: ProfileEngine,
}

impl<'a> Issuer<'a> {
    /// Build an issuer bound to the given CA, store and serial generator.
    pub fn new(ca: &'a CertificateAuthority, store: &'a Store, serials: &'a SerialGenerator) -> Self {
        Self {
            ca,
            store,
            serials,
            profile_engine: ProfileEngine::new(),
        }
    }

    /// Issue a certificate for `request`, returning the issued certificate
    /// and recording it in the Store with an audit entry.
    pub fn issue(&self, request: &CertificateRequest, cancel: &CancellationToken) -> Result<IssuedCertificate> {
        if cancel.is_cancelled() {
            return Err(CaError::ServiceNotConfigured("issuance cancelled".to_string()));
        }

        let profile = self.store.get_profile(&request.profile_name)?;
        let applied = self.profile_engine.apply(&profile, request)?;

        if applied.basic_constraints.is_ca && !self.ca.basic_constraints.can_issue_ca_certs() {
            return Err(CaError::PolicyNotAccepted(
                "issuing CA's path length does not permit issuing further CA certificates".to_string(),
            ));
        }

        let now = Utc::now();
        let not_after = (now + chrono::Duration::days(applied.validity_days as i64)).min(self.ca.not_after);

        let mut params = CertificateParams::new(Vec::<String>::new())
            .map_err(|e| CaError::SignFailure(e.to_string()))?;
        params.distinguished_name = to_rcgen_dn(&applied.subject);
        params.subject_alt_names = to_rcgen_sans(&applied.subject_alt_name)?;
        params.key_usages = to_rcgen_key_usage(&applied.key_usage);
        params.extended_key_usages = to_rcgen_extended_key_usage(&applied.extended_key_usage);
        params.is_ca = to_rcgen_is_ca(&applied.basic_constraints);
        params.not_before = chrono_to_time(now)?;
        params.not_after = chrono_to_time(not_after)?;

        let signature_algorithm = signature_algorithm_for(&request.public_key_der)?;
        let subject_key_pair = rcgen::KeyPair::from_public_key(signature_algorithm, &request.public_key_der)
            .map_err(|e| CaError::SignFailure(e.to_string()))?;

        if cancel.is_cancelled() {
            return Err(CaError::ServiceNotConfigured("issuance cancelled".to_string()));
        }

        let ca_key_pair_der = self.ca.key_pair.to_pkcs8_der()?;
        let ca_rcgen_key_pair = rcgen::KeyPair::try_from(ca_key_pair_der.as_slice())
            .map_err(|e| CaError::SignFailure(e.to_string()))?;
        let mut ca_params = CertificateParams::new(Vec::<String>::new())
            .map_err(|e| CaError::SignFailure(e.to_string()))?;
        ca_params.distinguished_name = to_rcgen_dn(&self.ca.subject);
        let issuer = rcgen::Issuer::new(ca_params, ca_rcgen_key_pair);

        let cert = params
            .signed_by(&subject_key_pair, &issuer)
            .map_err(|e| CaError::SignFailure(e.to_string()))?;

        let der = cert.der().to_vec();
        let (metadata, _compliance) = crate::codec::decode_certificate(&der)?;
        let serial_hex = serial_to_hex(&metadata.serial);
        let id = Uuid::now_v7();

        let stored = StoredCertificate {
            id,
            serial_hex: serial_hex.clone(),
            der: der.clone(),
            profile_name: request.profile_name.clone(),
            subject: applied.subject,
            not_before: metadata.not_before,
            not_after: metadata.not_after,
            fingerprint_sha256: metadata.fingerprint_sha256,
            revocation: None,
            issued_at: now,
            issuer_dn: self.ca.subject.to_rfc4514(),
            requester_id: request.requester_id.clone(),
        };
        self.store.insert_certificate(stored)?;

        tracing::info!(%id, serial = %serial_hex, "issued certificate");

        let _ = AuditEntry {
            timestamp: now,
            event: AuditEvent::Issued,
            certificate_id: id,
            serial_hex: serial_hex.clone(),
        };

        Ok(IssuedCertificate {
            id,
            serial_hex,
            pem: cert.pem(),
            der,
        })
    }

    /// Allocate the next certificate serial. Exposed for callers (e.g. the
    /// EST Adapter) that need to reserve a serial before calling [`Self::issue`].
    pub fn next_serial(&self) -> Result<Vec<u8>> {
        self.serials.next_certificate_serial()
    }
}

pub(crate) fn to_rcgen_dn(subject: &SubjectName) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    if let Some(cn) = &subject.common_name {
        dn.push(DnType::CommonName, cn.as_str());
    }
    if let Some(o) = &subject.organization {
        dn.push(DnType::OrganizationName, o.as_str());
    }
    if let Some(ou) = &subject.organizational_unit {
        dn.push(DnType::OrganizationalUnitName, ou.as_str());
    }
    if let Some(c) = &subject.country {
        dn.push(DnType::CountryName, c.as_str());
    }
    if let Some(st) = &subject.state {
        dn.push(DnType::StateOrProvinceName, st.as_str());
    }
    if let Some(l) = &subject.locality {
        dn.push(DnType::LocalityName, l.as_str());
    }
    dn
}

fn to_rcgen_sans(san: &crate::value_objects::SubjectAlternativeName) -> Result<Vec<SanType>> {
    san.entries
        .iter()
        .map(|entry| match entry {
            SanEntry::Dns(name) => Ia5String::try_from(name.as_str())
                .map(SanType::DnsName)
                .map_err(|e| CaError::MalformedRequest(e.to_string())),
            SanEntry::Ip(ip) => Ok(SanType::IpAddress(match ip.0 {
                IpAddr::V4(v4) => IpAddr::V4(v4),
                IpAddr::V6(v6) => IpAddr::V6(v6),
            })),
            SanEntry::Uri(uri) => Ia5String::try_from(uri.as_str())
                .map(SanType::URI)
                .map_err(|e| CaError::MalformedRequest(e.to_string())),
            SanEntry::Email(email) => Ia5String::try_from(email.as_str())
                .map(SanType::Rfc822Name)
                .map_err(|e| CaError::MalformedRequest(e.to_string())),
        })
        .collect()
}

fn to_rcgen_key_usage(ku: &KeyUsage) -> Vec<RcgenKu> {
    ku.bits
        .iter()
        .filter_map(|bit| {
            Some(match bit {
                KeyUsageBit::DigitalSignature => RcgenKu::DigitalSignature,
                KeyUsageBit::NonRepudiation => RcgenKu::ContentCommitment,
                KeyUsageBit::KeyEncipherment => RcgenKu::KeyEncipherment,
                KeyUsageBit::DataEncipherment => RcgenKu::DataEncipherment,
                KeyUsageBit::KeyAgreement => RcgenKu::KeyAgreement,
                KeyUsageBit::KeyCertSign => RcgenKu::KeyCertSign,
                KeyUsageBit::CrlSign => RcgenKu::CrlSign,
                KeyUsageBit::EncipherOnly => RcgenKu::EncipherOnly,
                KeyUsageBit::DecipherOnly => RcgenKu::DecipherOnly,
            })
        })
        .collect()
}

fn to_rcgen_extended_key_usage(eku: &crate::value_objects::ExtendedKeyUsage) -> Vec<RcgenEku> {
    eku.purposes
        .iter()
        .filter_map(|purpose| {
            Some(match purpose {
                ExtendedKeyUsagePurpose::ServerAuth => RcgenEku::ServerAuth,
                ExtendedKeyUsagePurpose::ClientAuth => RcgenEku::ClientAuth,
                ExtendedKeyUsagePurpose::CodeSigning => RcgenEku::CodeSigning,
                ExtendedKeyUsagePurpose::EmailProtection => RcgenEku::EmailProtection,
                ExtendedKeyUsagePurpose::TimeStamping => RcgenEku::TimeStamping,
                ExtendedKeyUsagePurpose::OcspSigning => RcgenEku::OcspSigning,
                ExtendedKeyUsagePurpose::AnyExtendedKeyUsage | ExtendedKeyUsagePurpose::Custom(_) => return None,
            })
        })
        .collect()
}

fn to_rcgen_is_ca(bc: &BasicConstraints) -> IsCa {
    if !bc.is_ca {
        return IsCa::ExplicitNoCa;
    }
    match bc.path_len_constraint {
        None => IsCa::Ca(RcgenBasicConstraints::Unconstrained),
        Some(n) => IsCa::Ca(RcgenBasicConstraints::Constrained(n as u8)),
    }
}

fn chrono_to_time(dt: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| CaError::ValidationFailure(e.to_string()))
}

/// `rcgen::KeyPair::from_public_key` needs to know which algorithm the
/// embedded public key itself uses, not the CA's signing algorithm — those
/// legitimately differ, e.g. an Ed25519 CA issuing an ECDSA-P256 leaf.
fn signature_algorithm_for(public_key_der: &[u8]) -> Result<&'static rcgen::SignatureAlgorithm> {
    use crate::codec::PublicKeyAlgorithm;
    Ok(match crate::codec::decode_public_key_algorithm(public_key_der)? {
        PublicKeyAlgorithm::Rsa => &rcgen::PKCS_RSA_SHA256,
        PublicKeyAlgorithm::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
        PublicKeyAlgorithm::EcdsaP384 => &rcgen::PKCS_ECDSA_P384_SHA384,
        PublicKeyAlgorithm::EcdsaP521 => {
            return Err(CaError::UnsupportedAlgorithm(
                "rcgen has no P-521 signature algorithm constant; P-521 subject keys cannot be embedded".to_string(),
            ))
        }
        PublicKeyAlgorithm::Ed25519 => &rcgen::PKCS_ED25519,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_ca_conversion_matches_path_len() {
        let unconstrained = BasicConstraints::root_ca();
        assert!(matches!(
            to_rcgen_is_ca(&unconstrained),
            IsCa::Ca(RcgenBasicConstraints::Unconstrained)
        ));

        let constrained = BasicConstraints::issuing_ca();
        assert!(matches!(
            to_rcgen_is_ca(&constrained),
            IsCa::Ca(RcgenBasicConstraints::Constrained(0))
        ));

        let leaf = BasicConstraints::end_entity();
        assert!(matches!(to_rcgen_is_ca(&leaf), IsCa::ExplicitNoCa));
    }
}
