//! RFC 7030-shaped EST operations (`simpleenroll`, `simplereenroll`,
//! `cacerts`), translated into Issuer/Store calls. This module does not
//! bind a socket or speak HTTP; it is the translation layer a network
//! front end would call into.
//!
//! `cacerts` and the enrollment response both use a degenerate ("certs
//! only") PKCS#7 `SignedData`, reusing `rasn-cms`'s `SignedData` structure
//! rather than adding a separate CMS crate.

use rasn::types::{Integer, ObjectIdentifier};
use rasn_cms::{CertificateChoices, CertificateSet, ContentInfo, EncapsulatedContentInfo, SignedData};

use crate::cancellation::CancellationToken;
use crate::codec::parse_csr_body;
use crate::error::{CaError, Result};
use crate::issuer::Issuer;
use crate::model::{CertificateRequest, IssuedCertificate};
use crate::signer::{KeyAlgorithm, Signer};
use crate::value_objects::{SubjectAlternativeName, SubjectName};

const PKCS7_SIGNED_DATA_OID: [u32; 6] = [1, 2, 840, 113549, 1, 7, 2];
const PKCS7_DATA_OID: [u32; 6] = [1, 2, 840, 113549, 1, 7, 1];

/// Translates EST-shaped enroll/reenroll/cacerts calls into Issuer calls.
pub struct EstAdapter<'a> {
    issuer: &'a Issuer<'a>,
}

impl<'a> EstAdapter<'a> {
    /// Build an adapter bound to the given issuer.
    pub fn new(issuer: &'a Issuer<'a>) -> Self {
        Self { issuer }
    }

    /// `/simpleenroll`: decode `csr_body` (raw DER, base64-encoded DER, or
    /// PEM — auto-detected), issue a certificate against it, and wrap the
    /// result in a degenerate PKCS#7 `SignedData`, the form EST responses use.
    pub fn simple_enroll(
        &self,
        csr_body: &[u8],
        profile_name: &str,
        requester_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let csr = parse_csr_body(csr_body)?;
        let request = CertificateRequest {
            profile_name: profile_name.to_string(),
            subject: SubjectName::new(),
            subject_alt_name: SubjectAlternativeName::new(),
            public_key_der: csr.public_key_der,
            requested_validity_days: None,
            requester_id,
        };
        let issued = self.issuer.issue(&request, cancel)?;
        wrap_certs_only(std::iter::once(&issued.der))
    }

    /// `/simplereenroll`: identical to `simpleenroll` at this layer; the
    /// distinction (same-identity, non-expired predecessor) is an EST
    /// protocol-level constraint for the network front end to enforce,
    /// not something the Issuer needs to treat differently.
    pub fn simple_reenroll(
        &self,
        csr_body: &[u8],
        profile_name: &str,
        requester_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        self.simple_enroll(csr_body, profile_name, requester_id, cancel)
    }

    /// `/serverkeygen`: generate a fresh key pair of `algorithm`, issue a
    /// certificate against it, and return a degenerate PKCS#7 `SignedData`
    /// wrapping the certificate alongside the generated PKCS#8 private key
    /// (PEM-encoded, as EST's multipart response carries it).
    pub fn server_keygen(
        &self,
        algorithm: KeyAlgorithm,
        profile_name: &str,
        requester_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<u8>, String)> {
        let key_pair = Signer::new().generate_key_pair(algorithm)?;
        let public_key_der = key_pair.public_key_der()?;
        let private_key_pem = key_pair.to_pkcs8_pem()?;

        let request = CertificateRequest {
            profile_name: profile_name.to_string(),
            subject: SubjectName::new(),
            subject_alt_name: SubjectAlternativeName::new(),
            public_key_der,
            requested_validity_days: None,
            requester_id,
        };
        let issued = self.issuer.issue(&request, cancel)?;
        let pkcs7 = wrap_certs_only(std::iter::once(&issued.der))?;
        Ok((pkcs7, private_key_pem))
    }

    /// `/csrattrs`: this CA declares no required CSR attributes, so the
    /// operation is a no-op that a network front end turns into 204 No Content.
    pub fn csr_attrs(&self) -> Result<()> {
        Ok(())
    }

    /// `/cacerts`: the full CA certificate chain as a degenerate PKCS#7
    /// `SignedData`.
    pub fn ca_certs(&self, chain_der: &[Vec<u8>]) -> Result<Vec<u8>> {
        wrap_certs_only(chain_der.iter())
    }
}

fn wrap_certs_only<'a>(certs_der: impl Iterator<Item = &'a Vec<u8>>) -> Result<Vec<u8>> {
    let certificates: Vec<CertificateChoices> = certs_der
        .map(|der| {
            rasn::der::decode(der)
                .map(CertificateChoices::Certificate)
                .map_err(|e| CaError::SerializationFailure(e.to_string()))
        })
        .collect::<Result<_>>()?;

    let signed_data = SignedData {
        version: Integer::from(1),
        digest_algorithms: Default::default(),
        encap_content_info: EncapsulatedContentInfo {
            content_type: ObjectIdentifier::new(PKCS7_DATA_OID.to_vec()).expect("valid oid"),
            content: None,
        },
        certificates: Some(CertificateSet(certificates)),
        crls: None,
        signer_infos: Default::default(),
    };

    let content_info = ContentInfo {
        content_type: ObjectIdentifier::new(PKCS7_SIGNED_DATA_OID.to_vec()).expect("valid oid"),
        content: rasn::types::Any::new(
            rasn::der::encode(&signed_data).map_err(|e| CaError::SerializationFailure(e.to_string()))?,
        ),
    };

    rasn::der::encode(&content_info).map_err(|e| CaError::SerializationFailure(e.to_string()))
}

/// Mentioned for callers that need the struct without going through
/// [`EstAdapter::simple_enroll`] (e.g. tests constructing a response by hand).
pub type EstEnrollmentResult = IssuedCertificate;
