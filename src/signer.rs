//! Key generation and signing.
//!
//! The Signer owns all private key material that ever exists in the
//! process. It generates keys for the requested algorithm, exports them in
//! the PKCS#8 DER form `rcgen` consumes for certificate generation, and
//! signs raw byte strings directly for callers that are not building a
//! certificate (the TSA signs `TSTInfo` DER, the OCSP responder signs
//! `ResponseData` DER).
//!
//! Grounded in the teacher's `types.rs` `KeyAlgorithm`/`RsaKeySize`/
//! `EcdsaCurve` enums for the algorithm surface, and in `rcgen`'s
//! `KeyPair::generate_for` for the generation call shape.

use ed25519_dalek::{Signer as _, SigningKey};
use p256::ecdsa::signature::Signer as _;
use p384::ecdsa::signature::Signer as _;
use p521::ecdsa::signature::Signer as _;
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{CaError, Result};

/// An algorithm and key size the Signer can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KeyAlgorithm {
    /// RSA with the given modulus size in bits. Must be at least 2048.
    Rsa(u32),
    /// ECDSA over NIST P-256.
    EcdsaP256,
    /// ECDSA over NIST P-384.
    EcdsaP384,
    /// ECDSA over NIST P-521.
    EcdsaP521,
    /// Ed25519.
    Ed25519,
}

impl KeyAlgorithm {
    /// Validate the algorithm/size combination itself (not a profile policy check).
    pub fn validate(&self) -> Result<()> {
        match self {
            KeyAlgorithm::Rsa(bits) if *bits < 2048 => Err(CaError::UnsupportedAlgorithm(format!(
                "RSA key size {bits} is below the minimum of 2048 bits"
            ))),
            _ => Ok(()),
        }
    }
}

/// A generated key pair, holding exactly the private key material the
/// algorithm requires.
pub enum SignerKeyPair {
    /// RSA private key.
    Rsa(RsaPrivateKey),
    /// ECDSA P-256 signing key.
    EcdsaP256(p256::ecdsa::SigningKey),
    /// ECDSA P-384 signing key.
    EcdsaP384(p384::ecdsa::SigningKey),
    /// ECDSA P-521 signing key.
    EcdsaP521(p521::ecdsa::SigningKey),
    /// Ed25519 signing key.
    Ed25519(SigningKey),
}

impl SignerKeyPair {
    /// The algorithm this key pair was generated for.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            SignerKeyPair::Rsa(key) => KeyAlgorithm::Rsa(key.size() as u32 * 8),
            SignerKeyPair::EcdsaP256(_) => KeyAlgorithm::EcdsaP256,
            SignerKeyPair::EcdsaP384(_) => KeyAlgorithm::EcdsaP384,
            SignerKeyPair::EcdsaP521(_) => KeyAlgorithm::EcdsaP521,
            SignerKeyPair::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }

    /// Export the private key as PKCS#8 DER, the form `rcgen::KeyPair::try_from`
    /// and `rcgen::KeyPair::from_pkcs8_der_and_sign_algo` expect.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        match self {
            SignerKeyPair::Rsa(key) => key
                .to_pkcs8_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| CaError::SignFailure(e.to_string())),
            SignerKeyPair::EcdsaP256(key) => {
                use p256::pkcs8::EncodePrivateKey as _;
                key.to_pkcs8_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
            SignerKeyPair::EcdsaP384(key) => {
                use p384::pkcs8::EncodePrivateKey as _;
                key.to_pkcs8_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
            SignerKeyPair::EcdsaP521(key) => {
                use p521::pkcs8::EncodePrivateKey as _;
                key.to_pkcs8_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
            SignerKeyPair::Ed25519(key) => {
                use ed25519_dalek::pkcs8::EncodePrivateKey as _;
                key.to_pkcs8_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
        }
    }

    /// Export the private key as a PKCS#8 PEM string.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        match self {
            SignerKeyPair::Rsa(key) => key
                .to_pkcs8_pem(LineEnding::LF)
                .map(|zeroizing| zeroizing.to_string())
                .map_err(|e| CaError::SignFailure(e.to_string())),
            _ => {
                let der = self.to_pkcs8_der()?;
                Ok(pem::encode(&pem::Pem::new("PRIVATE KEY", der)))
            }
        }
    }

    /// Sign `message` directly, without going through certificate generation.
    /// Used by the TSA and OCSP responder to sign `TSTInfo`/`ResponseData` DER.
    pub fn sign_raw(&self, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            SignerKeyPair::Rsa(key) => {
                use rsa::pkcs1v15::SigningKey;
                use rsa::signature::{RandomizedSigner, SignatureEncoding};
                let digest: [u8; 32] = Sha256::digest(message).into();
                let signing_key = SigningKey::<Sha256>::new(key.clone());
                let signature = signing_key.sign_with_rng(&mut OsRng, &digest);
                Ok(signature.to_vec())
            }
            SignerKeyPair::EcdsaP256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(message);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            SignerKeyPair::EcdsaP384(key) => {
                let signature: p384::ecdsa::Signature = key.sign(message);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            SignerKeyPair::EcdsaP521(key) => {
                let signature: p521::ecdsa::Signature = key.sign(message);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            SignerKeyPair::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
        }
    }

    /// The RFC 5280 AlgorithmIdentifier OID for signatures this key pair
    /// produces via [`Self::sign_raw`] — used by the OCSP responder and TSA
    /// to declare the algorithm they actually signed with, independent of
    /// whatever algorithm rcgen chose for a subject's certificate.
    pub fn signature_algorithm_oid(&self) -> Vec<u32> {
        match self {
            SignerKeyPair::Rsa(_) => vec![1, 2, 840, 113549, 1, 1, 11],
            SignerKeyPair::EcdsaP256(_) => vec![1, 2, 840, 10045, 4, 3, 2],
            SignerKeyPair::EcdsaP384(_) => vec![1, 2, 840, 10045, 4, 3, 3],
            SignerKeyPair::EcdsaP521(_) => vec![1, 2, 840, 10045, 4, 3, 4],
            SignerKeyPair::Ed25519(_) => vec![1, 3, 101, 112],
        }
    }

    /// The DER-encoded `SubjectPublicKeyInfo` for this key pair's public half.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        match self {
            SignerKeyPair::Rsa(key) => {
                use rsa::pkcs8::EncodePublicKey as _;
                let public: RsaPublicKey = key.to_public_key();
                public
                    .to_public_key_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
            SignerKeyPair::EcdsaP256(key) => {
                use p256::pkcs8::EncodePublicKey as _;
                key.verifying_key()
                    .to_public_key_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
            SignerKeyPair::EcdsaP384(key) => {
                use p384::pkcs8::EncodePublicKey as _;
                key.verifying_key()
                    .to_public_key_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
            SignerKeyPair::EcdsaP521(key) => {
                use p521::pkcs8::EncodePublicKey as _;
                key.verifying_key()
                    .to_public_key_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
            SignerKeyPair::Ed25519(key) => {
                use ed25519_dalek::pkcs8::EncodePublicKey as _;
                key.verifying_key()
                    .to_public_key_der()
                    .map(|doc| doc.as_bytes().to_vec())
                    .map_err(|e| CaError::SignFailure(e.to_string()))
            }
        }
    }
}

/// Generates and signs with the key material it holds. Stateless beyond the
/// OS random source; callers own the returned [`SignerKeyPair`] values.
#[derive(Debug, Default, Clone, Copy)]
pub struct Signer;

impl Signer {
    /// Create a new Signer. There is no configuration: key generation always
    /// draws from the OS random source.
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh key pair for `algorithm`.
    pub fn generate_key_pair(&self, algorithm: KeyAlgorithm) -> Result<SignerKeyPair> {
        algorithm.validate()?;
        tracing::debug!(?algorithm, "generating key pair");
        match algorithm {
            KeyAlgorithm::Rsa(bits) => {
                let key = RsaPrivateKey::new(&mut OsRng, bits as usize)
                    .map_err(|e| CaError::RandomSourceFailure(e.to_string()))?;
                Ok(SignerKeyPair::Rsa(key))
            }
            KeyAlgorithm::EcdsaP256 => {
                let key = p256::ecdsa::SigningKey::random(&mut OsRng);
                Ok(SignerKeyPair::EcdsaP256(key))
            }
            KeyAlgorithm::EcdsaP384 => {
                let key = p384::ecdsa::SigningKey::random(&mut OsRng);
                Ok(SignerKeyPair::EcdsaP384(key))
            }
            KeyAlgorithm::EcdsaP521 => {
                let key = p521::ecdsa::SigningKey::random(&mut OsRng);
                Ok(SignerKeyPair::EcdsaP521(key))
            }
            KeyAlgorithm::Ed25519 => {
                let key = SigningKey::generate(&mut OsRng);
                Ok(SignerKeyPair::Ed25519(key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_small_rsa_keys() {
        assert!(KeyAlgorithm::Rsa(1024).validate().is_err());
        assert!(KeyAlgorithm::Rsa(2048).validate().is_ok());
    }

    #[test]
    fn ed25519_round_trips_through_pkcs8() {
        let signer = Signer::new();
        let key = signer.generate_key_pair(KeyAlgorithm::Ed25519).unwrap();
        let der = key.to_pkcs8_der().unwrap();
        assert!(!der.is_empty());
    }

    #[test]
    fn raw_signatures_are_nonempty_and_deterministic_for_ed25519() {
        let signer = Signer::new();
        let key = signer.generate_key_pair(KeyAlgorithm::Ed25519).unwrap();
        let sig1 = key.sign_raw(b"hello").unwrap();
        let sig2 = key.sign_raw(b"hello").unwrap();
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
    }
}
