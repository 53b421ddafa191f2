//! End-to-end scenarios composing the Signer, Store, Issuer and
//! Revocation service the way a real caller would.

use ca_core::prelude::*;
use ca_core::value_objects::{BasicConstraints, CommonName, DnsName, KeyUsage, SubjectAlternativeName, SubjectName};
use chrono::Utc;

fn bootstrap_ca() -> (CertificateAuthority, SignerKeyPair) {
    let signer = Signer::new();
    let ca_key = signer.generate_key_pair(KeyAlgorithm::Ed25519).unwrap();
    let subject = SubjectName::new().with_common_name(CommonName::new("Test Root CA").unwrap());
    let der = ca_key.public_key_der().unwrap(); // stand-in; real bootstrap self-signs with rcgen directly
    let ca = CertificateAuthority {
        key_pair: signer.generate_key_pair(KeyAlgorithm::Ed25519).unwrap(),
        certificate_der: der,
        subject: subject.clone(),
        basic_constraints: BasicConstraints::root_ca(),
        not_after: Utc::now() + chrono::Duration::days(365 * 20),
    };
    (ca, ca_key)
}

fn tls_server_profile() -> ProfileConfig {
    ProfileConfig {
        name: "tls-server".to_string(),
        subject_defaults: SubjectName::new(),
        require_common_name: true,
        require_organization: false,
        key_usage: KeyUsage::tls_server(),
        extended_key_usage: Default::default(),
        allowed_san_patterns: vec![],
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
fn issuance_then_revocation_removes_certificate_from_good_standing() {
    let (ca, _) = bootstrap_ca();
    let store = Store::new();
    store.put_profile(tls_server_profile()).unwrap();
    let serials = SerialGenerator::new();
    let issuer = Issuer::new(&ca, &store, &serials);
    let cancel = CancellationToken::new();

    let signer = Signer::new();
    let leaf_key = signer.generate_key_pair(KeyAlgorithm::EcdsaP256).unwrap();

    let request = CertificateRequest {
        profile_name: "tls-server".to_string(),
        subject: SubjectName::new().with_common_name(CommonName::new("host.example.com").unwrap()),
        subject_alt_name: SubjectAlternativeName::new()
            .with_dns_name(DnsName::new("host.example.com").unwrap()),
        public_key_der: leaf_key.public_key_der().unwrap(),
        requested_validity_days: Some(90),
        requester_id: None,
    };

    let issued = issuer.issue(&request, &cancel).unwrap();
    let stored = store.get_certificate_by_id(issued.id).unwrap();
    assert!(stored.revocation.is_none());

    let revocation = RevocationService::new(&ca, &store);
    revocation.revoke(issued.id, RevocationReason::Superseded).unwrap();

    let stored_after = store.get_certificate_by_id(issued.id).unwrap();
    assert!(stored_after.revocation.is_some());

    let crl_der = revocation.generate_crl(&cancel).unwrap();
    assert!(!crl_der.is_empty());
}

#[test]
fn revoking_twice_is_rejected() {
    let (ca, _) = bootstrap_ca();
    let store = Store::new();
    store.put_profile(tls_server_profile()).unwrap();
    let serials = SerialGenerator::new();
    let issuer = Issuer::new(&ca, &store, &serials);
    let cancel = CancellationToken::new();

    let signer = Signer::new();
    let leaf_key = signer.generate_key_pair(KeyAlgorithm::Ed25519).unwrap();

    let request = CertificateRequest {
        profile_name: "tls-server".to_string(),
        subject: SubjectName::new().with_common_name(CommonName::new("host2.example.com").unwrap()),
        subject_alt_name: SubjectAlternativeName::new()
            .with_dns_name(DnsName::new("host2.example.com").unwrap()),
        public_key_der: leaf_key.public_key_der().unwrap(),
        requested_validity_days: None,
        requester_id: None,
    };
    let issued = issuer.issue(&request, &cancel).unwrap();

    let revocation = RevocationService::new(&ca, &store);
    revocation.revoke(issued.id, RevocationReason::Unspecified).unwrap();
    let err = revocation.revoke(issued.id, RevocationReason::Unspecified).unwrap_err();
    assert!(matches!(err, CaError::AlreadyRevoked(_)));
}
