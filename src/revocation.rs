//! Revocation: marking certificates revoked, regenerating the CRL, and
//! answering OCSP queries.
//!
//! CRL generation reuses `rcgen`'s own
//! `CertificateRevocationListParams`/`RevokedCertParams`, the same
//! dependency the Issuer already uses for certificate generation, rather
//! than hand-rolling the CRL ASN.1. OCSP responses are built with the
//! hand-defined structures in `codec::ocsp`, signed directly by the
//! Signer (no `rcgen` involvement, since an OCSP response is not itself an
//! X.509 certificate).

use chrono::{DateTime, Duration, Utc};
use rasn::types::{GeneralizedTime, Integer, ObjectIdentifier, OctetString};
use uuid::Uuid;

use crate::cancellation::CancellationToken;
use crate::codec::ocsp::{
    BasicOcspResponse, CertId, CertStatus, OcspRequest, OcspResponse, OcspResponseStatus,
    ResponderId, ResponseBytes, ResponseData, RevokedInfo, SingleResponse,
};
use crate::error::{CaError, Result};
use crate::issuer::CertificateAuthority;
use crate::model::{RevocationRecord, RevocationReason};
use crate::store::Store;

/// Revokes certificates and answers revocation-status queries (CRL, OCSP)
/// against a [`Store`] and a [`CertificateAuthority`].
pub struct RevocationService<'a> {
    ca: &'a CertificateAuthority,
    store: &'a Store,
}

impl<'a> RevocationService<'a> {
    /// Build a revocation service bound to the given CA and store.
    pub fn new(ca: &'a CertificateAuthority, store: &'a Store) -> Self {
        Self { ca, store }
    }

    /// Mark the certificate revoked. Returns a conflict error if it was
    /// already revoked.
    pub fn revoke(&self, id: Uuid, reason: RevocationReason) -> Result<()> {
        let record = RevocationRecord {
            revoked_at: Utc::now(),
            reason,
        };
        self.store.revoke_certificate(id, record)?;
        tracing::info!(%id, ?reason, "revoked certificate");
        Ok(())
    }

    /// Regenerate the CRL covering every currently revoked certificate.
    pub fn generate_crl(&self, cancel: &CancellationToken) -> Result<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(CaError::ServiceNotConfigured("CRL generation cancelled".to_string()));
        }

        let issuer_dn = self.ca.subject.to_rfc4514();
        let revoked = self.store.revoked_certificates(&issuer_dn)?;
        let now = Utc::now();
        let crl_number = self.store.next_crl_number();

        let mut params = rcgen::CertificateRevocationListParams {
            this_update: chrono_to_time(now)?,
            next_update: chrono_to_time(now + Duration::hours(24))?,
            crl_number: rcgen::SerialNumber::from_slice(&crl_number.to_be_bytes()),
            issuing_distribution_point: None,
            revoked_certs: Vec::with_capacity(revoked.len()),
            key_identifier_method: rcgen::KeyIdMethod::Sha256,
        };

        for certificate in &revoked {
            let Some(record) = certificate.revocation else {
                continue;
            };
            let serial_bytes =
                hex::decode(&certificate.serial_hex).map_err(|e| CaError::StorageFailure(e.to_string()))?;
            params.revoked_certs.push(rcgen::RevokedCertParams {
                serial_number: rcgen::SerialNumber::from_slice(&serial_bytes),
                revocation_time: chrono_to_time(record.revoked_at)?,
                reason_code: Some(to_rcgen_revocation_reason(record.reason)),
                invalidity_date: None,
            });
        }

        let ca_der = self.ca.key_pair.to_pkcs8_der()?;
        let ca_key_pair =
            rcgen::KeyPair::try_from(ca_der.as_slice()).map_err(|e| CaError::SignFailure(e.to_string()))?;
        let mut ca_params = rcgen::CertificateParams::new(Vec::<String>::new())
            .map_err(|e| CaError::SignFailure(e.to_string()))?;
        ca_params.distinguished_name = crate::issuer::to_rcgen_dn(&self.ca.subject);
        let issuer = rcgen::Issuer::new(ca_params, ca_key_pair);

        let crl = params
            .signed_by(&issuer)
            .map_err(|e| CaError::SignFailure(e.to_string()))?;

        tracing::info!(count = revoked.len(), "regenerated CRL");
        Ok(crl.der().to_vec())
    }

    /// Decode and answer a DER-encoded OCSP request, reporting the status of
    /// each queried certificate against the Store. Malformed DER or a
    /// request with no entries produces an `OCSPResponse` with
    /// `status=malformedRequest` rather than an error, matching what an OCSP
    /// client expects on the wire.
    pub fn answer_ocsp(&self, request_der: &[u8]) -> Result<Vec<u8>> {
        let request: OcspRequest = match rasn::der::decode(request_der) {
            Ok(request) => request,
            Err(_) => return encode_malformed_response(),
        };
        if request.tbs_request.request_list.is_empty() {
            return encode_malformed_response();
        }

        let now = Utc::now();
        let mut responses = Vec::with_capacity(request.tbs_request.request_list.len());

        for single in &request.tbs_request.request_list {
            let serial_hex = serial_hex_from_cert_id(&single.req_cert);
            let status = match self.store.get_certificate_by_serial(&serial_hex) {
                Ok(certificate) => match certificate.revocation {
                    Some(record) => CertStatus::Revoked(RevokedInfo {
                        revocation_time: chrono_to_generalized_time(record.revoked_at)?,
                        revocation_reason: Some(Integer::from(record.reason.code())),
                    }),
                    None => CertStatus::Good,
                },
                Err(_) => CertStatus::Unknown,
            };

            responses.push(SingleResponse {
                cert_id: single.req_cert.clone(),
                cert_status: status,
                this_update: chrono_to_generalized_time(now)?,
                next_update: Some(chrono_to_generalized_time(now + Duration::hours(24))?),
                single_extensions: None,
            });
        }

        let response_data = ResponseData {
            version: Integer::from(0),
            responder_id: ResponderId::ByKey(OctetString::from(
                self.ca.key_pair.public_key_der()?,
            )),
            produced_at: chrono_to_generalized_time(now)?,
            responses,
            response_extensions: None,
        };

        let tbs_der = rasn::der::encode(&response_data).map_err(|e| CaError::SignFailure(e.to_string()))?;
        let signature = self.ca.key_pair.sign_raw(&tbs_der)?;

        let basic_response = BasicOcspResponse {
            tbs_response_data: response_data,
            signature_algorithm: rasn_pkix::AlgorithmIdentifier {
                algorithm: ObjectIdentifier::new(self.ca.key_pair.signature_algorithm_oid())
                    .expect("valid oid"),
                parameters: None,
            },
            signature: rasn::types::BitString::from_vec(signature),
            certs: None,
        };

        let response_der =
            rasn::der::encode(&basic_response).map_err(|e| CaError::SignFailure(e.to_string()))?;

        let response = OcspResponse {
            response_status: OcspResponseStatus::Successful,
            response_bytes: Some(ResponseBytes {
                response_type: ObjectIdentifier::new(vec![1, 3, 6, 1, 5, 5, 7, 48, 1, 1])
                    .expect("valid oid"),
                response: OctetString::from(response_der),
            }),
        };

        rasn::der::encode(&response).map_err(|e| CaError::SignFailure(e.to_string()))
    }
}

fn encode_malformed_response() -> Result<Vec<u8>> {
    let response = OcspResponse {
        response_status: OcspResponseStatus::MalformedRequest,
        response_bytes: None,
    };
    rasn::der::encode(&response).map_err(|e| CaError::SignFailure(e.to_string()))
}

fn serial_hex_from_cert_id(cert_id: &CertId) -> String {
    let bytes: Vec<u8> = cert_id.serial_number.to_signed_bytes_be();
    hex::encode(bytes)
}

fn to_rcgen_revocation_reason(reason: RevocationReason) -> rcgen::RevocationReason {
    match reason {
        RevocationReason::Unspecified => rcgen::RevocationReason::Unspecified,
        RevocationReason::KeyCompromise => rcgen::RevocationReason::KeyCompromise,
        RevocationReason::CaCompromise => rcgen::RevocationReason::CaCompromise,
        RevocationReason::AffiliationChanged => rcgen::RevocationReason::AffiliationChanged,
        RevocationReason::Superseded => rcgen::RevocationReason::Superseded,
        RevocationReason::CessationOfOperation => rcgen::RevocationReason::CessationOfOperation,
        RevocationReason::CertificateHold => rcgen::RevocationReason::CertificateHold,
        RevocationReason::RemoveFromCrl => rcgen::RevocationReason::RemoveFromCrl,
        RevocationReason::PrivilegeWithdrawn => rcgen::RevocationReason::PrivilegeWithdrawn,
        RevocationReason::AaCompromise => rcgen::RevocationReason::AaCompromise,
    }
}

fn chrono_to_time(dt: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| CaError::ValidationFailure(e.to_string()))
}

fn chrono_to_generalized_time(dt: DateTime<Utc>) -> Result<GeneralizedTime> {
    Ok(GeneralizedTime::from(dt.fixed_offset()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revocation_reason_codes_round_trip_through_model() {
        assert_eq!(RevocationReason::KeyCompromise.code(), 1);
        assert!(matches!(
            to_rcgen_revocation_reason(RevocationReason::KeyCompromise),
            rcgen::RevocationReason::KeyCompromise
        ));
    }
}
