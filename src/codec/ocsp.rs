//! RFC 6960 OCSP request/response ASN.1 structures.
//!
//! `rasn-ocsp` is not part of the dependency set this crate was built
//! against, so these structures are hand-defined with `rasn`'s derive
//! macros, following the same tagging style `rasn-pkix` uses for
//! `Certificate`/`TbsCertificate`, and reusing `rasn_pkix` types
//! (`AlgorithmIdentifier`, `Name`, `CertificateSerialNumber`, `Extension`)
//! wherever the two specifications share a structure.

use rasn::types::{BitString, GeneralizedTime, Integer, ObjectIdentifier, OctetString};
use rasn::{AsnType, Decode, Encode};
use rasn_pkix::{AlgorithmIdentifier, Certificate, CertificateSerialNumber, Extension, Name};

/// `CertID ::= SEQUENCE { hashAlgorithm, issuerNameHash, issuerKeyHash, serialNumber }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct CertId {
    /// Hash algorithm used for the two name/key hashes below.
    pub hash_algorithm: AlgorithmIdentifier,
    /// Hash of the issuer's distinguished name.
    pub issuer_name_hash: OctetString,
    /// Hash of the issuer's public key.
    pub issuer_key_hash: OctetString,
    /// The certificate's serial number.
    pub serial_number: CertificateSerialNumber,
}

/// `Request ::= SEQUENCE { reqCert, singleRequestExtensions [0] OPTIONAL }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct OcspSingleRequest {
    /// The certificate being queried.
    pub req_cert: CertId,
    /// Per-request extensions.
    #[rasn(tag(context, 0))]
    pub single_request_extensions: Option<Vec<Extension>>,
}

/// `TBSRequest ::= SEQUENCE { version [0] DEFAULT v1, requestorName [1] OPTIONAL, requestList, requestExtensions [2] OPTIONAL }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct TbsRequest {
    /// Request list version. Always 0 (v1) in this implementation.
    #[rasn(tag(context, 0), default = "default_version")]
    pub version: Integer,
    /// The certificates being queried.
    pub request_list: Vec<OcspSingleRequest>,
    /// Request-wide extensions (e.g. nonce).
    #[rasn(tag(context, 2))]
    pub request_extensions: Option<Vec<Extension>>,
}

fn default_version() -> Integer {
    Integer::from(0)
}

/// `OCSPRequest ::= SEQUENCE { tbsRequest, optionalSignature [0] OPTIONAL }`
///
/// Signed OCSP requests are not produced or required by this implementation;
/// `optional_signature` is always `None` on encode and ignored on decode.
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct OcspRequest {
    /// The unsigned request body.
    pub tbs_request: TbsRequest,
}

/// `OCSPResponseStatus ::= ENUMERATED`
#[derive(AsnType, Decode, Encode, Debug, Clone, Copy, PartialEq, Eq)]
#[rasn(enumerated)]
pub enum OcspResponseStatus {
    /// The response contains a definite answer.
    Successful = 0,
    /// The request was malformed.
    MalformedRequest = 1,
    /// The responder hit an internal error.
    InternalError = 2,
    /// The responder is temporarily unable to answer.
    TryLater = 3,
    /// `sigRequired`: the request must be signed.
    SigRequired = 5,
    /// The requestor is not authorized for this query.
    Unauthorized = 6,
}

/// `ResponseBytes ::= SEQUENCE { responseType, response }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct ResponseBytes {
    /// Always `id-pkix-ocsp-basic` (1.3.6.1.5.5.7.48.1.1) for this implementation.
    pub response_type: ObjectIdentifier,
    /// DER encoding of a [`BasicOcspResponse`].
    pub response: OctetString,
}

/// `OCSPResponse ::= SEQUENCE { responseStatus, responseBytes [0] OPTIONAL }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct OcspResponse {
    /// The top-level status of the query.
    pub response_status: OcspResponseStatus,
    /// Present exactly when `response_status` is `Successful`.
    #[rasn(tag(context, 0))]
    pub response_bytes: Option<ResponseBytes>,
}

/// `ResponderID ::= CHOICE { byName [1] Name, byKey [2] KeyHash }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
#[rasn(choice)]
pub enum ResponderId {
    /// Identified by the responder's full distinguished name.
    #[rasn(tag(context, 1))]
    ByName(Name),
    /// Identified by a SHA-1 hash of the responder's public key.
    #[rasn(tag(context, 2))]
    ByKey(OctetString),
}

/// `CertStatus ::= CHOICE { good [0], revoked [1] RevokedInfo, unknown [2] }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
#[rasn(choice)]
pub enum CertStatus {
    /// The certificate is not revoked, as far as the responder knows.
    #[rasn(tag(context, 0))]
    Good,
    /// The certificate has been revoked.
    #[rasn(tag(context, 1))]
    Revoked(RevokedInfo),
    /// The responder has no record of this certificate.
    #[rasn(tag(context, 2))]
    Unknown,
}

/// `RevokedInfo ::= SEQUENCE { revocationTime, revocationReason [0] OPTIONAL }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct RevokedInfo {
    /// When the certificate was revoked.
    pub revocation_time: GeneralizedTime,
    /// The RFC 5280 CRL reason code, if known.
    #[rasn(tag(context, 0))]
    pub revocation_reason: Option<Integer>,
}

/// `SingleResponse ::= SEQUENCE { certID, certStatus, thisUpdate, nextUpdate [0] OPTIONAL, singleExtensions [1] OPTIONAL }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct SingleResponse {
    /// Which certificate this entry answers for.
    pub cert_id: CertId,
    /// The status as of `this_update`.
    pub cert_status: CertStatus,
    /// When this status was last known to be correct.
    pub this_update: GeneralizedTime,
    /// When a client should next check for a fresher answer.
    #[rasn(tag(context, 0))]
    pub next_update: Option<GeneralizedTime>,
    /// Per-response extensions.
    #[rasn(tag(context, 1))]
    pub single_extensions: Option<Vec<Extension>>,
}

/// `ResponseData ::= SEQUENCE { version [0] DEFAULT v1, responderID, producedAt, responses, responseExtensions [1] OPTIONAL }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct ResponseData {
    /// Response data version. Always 0 (v1).
    #[rasn(tag(context, 0), default = "default_version")]
    pub version: Integer,
    /// Identifies the signer of this response.
    pub responder_id: ResponderId,
    /// When this response was produced.
    pub produced_at: GeneralizedTime,
    /// One entry per certificate queried.
    pub responses: Vec<SingleResponse>,
    /// Response-wide extensions.
    #[rasn(tag(context, 1))]
    pub response_extensions: Option<Vec<Extension>>,
}

/// `BasicOCSPResponse ::= SEQUENCE { tbsResponseData, signatureAlgorithm, signature, certs [0] OPTIONAL }`
#[derive(AsnType, Decode, Encode, Debug, Clone, PartialEq, Eq)]
pub struct BasicOcspResponse {
    /// The signed payload.
    pub tbs_response_data: ResponseData,
    /// Algorithm used to produce `signature`.
    pub signature_algorithm: AlgorithmIdentifier,
    /// Signature over the DER encoding of `tbs_response_data`.
    pub signature: BitString,
    /// Optional chain of certificates supporting verification of the signature.
    #[rasn(tag(context, 0))]
    pub certs: Option<Vec<Certificate>>,
}

/// DER-encode an [`OcspRequest`].
pub fn encode_request(request: &OcspRequest) -> rasn::error::EncodeResult<Vec<u8>> {
    rasn::der::encode(request)
}

/// Decode an [`OcspRequest`] from DER.
pub fn decode_request(der: &[u8]) -> rasn::error::DecodeResult<OcspRequest> {
    rasn::der::decode(der)
}

/// DER-encode an [`OcspResponse`].
pub fn encode_response(response: &OcspResponse) -> rasn::error::EncodeResult<Vec<u8>> {
    rasn::der::encode(response)
}

/// Decode an [`OcspResponse`] from DER.
pub fn decode_response(der: &[u8]) -> rasn::error::DecodeResult<OcspResponse> {
    rasn::der::decode(der)
}

/// DER-encode a [`BasicOcspResponse`] for embedding in a [`ResponseBytes`].
pub fn encode_basic_response(response: &BasicOcspResponse) -> rasn::error::EncodeResult<Vec<u8>> {
    rasn::der::encode(response)
}

/// Decode a [`BasicOcspResponse`] from the DER stored in a [`ResponseBytes`].
pub fn decode_basic_response(der: &[u8]) -> rasn::error::DecodeResult<BasicOcspResponse> {
    rasn::der::decode(der)
}
