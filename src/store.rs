//! The in-memory certificate and enrollment index.
//!
//! Grounded in the teacher's `storage/mod.rs` `MemoryKeyStorage`
//! (`Arc<RwLock<HashMap<...>>>`), generalized to the two lookups the
//! specification requires: by internal id and by serial hex, kept
//! consistent under one lock per map so a reader never observes one index
//! updated without the other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::{CaError, Result};
use crate::model::{CertificateStatus, EnrollmentState, ProfileConfig, RevocationRecord, StoredCertificate};

/// Holds certificates, enrollments and the profile registry in memory,
/// safe for concurrent access from multiple threads.
#[derive(Debug, Default)]
pub struct Store {
    certificates_by_id: RwLock<HashMap<Uuid, StoredCertificate>>,
    id_by_serial: RwLock<HashMap<String, Uuid>>,
    enrollments: RwLock<HashMap<Uuid, EnrollmentState>>,
    profiles: RwLock<HashMap<String, ProfileConfig>>,
    crl_counter: AtomicU64,
}

/// Filter criteria for [`Store::list_certificates`]. All fields are
/// optional; an absent field matches everything.
#[derive(Debug, Clone, Default)]
pub struct CertificateFilter {
    /// Restrict to certificates currently in this status.
    pub status: Option<CertificateStatus>,
    /// Restrict to certificates issued under this profile.
    pub profile_name: Option<String>,
    /// Restrict to certificates requested by this requester id.
    pub requester_id: Option<String>,
    /// Maximum number of results to return.
    pub limit: Option<usize>,
    /// Number of matching results to skip before collecting `limit`.
    pub offset: Option<usize>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile. Rejects the profile if any of its
    /// SAN allow-list patterns fail to compile as regexes.
    pub fn put_profile(&self, profile: ProfileConfig) -> Result<()> {
        profile.validate()?;
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| CaError::StorageFailure("profile registry lock poisoned".to_string()))?;
        profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Look up a profile by name.
    pub fn get_profile(&self, name: &str) -> Result<ProfileConfig> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| CaError::StorageFailure("profile registry lock poisoned".to_string()))?;
        profiles
            .get(name)
            .cloned()
            .ok_or_else(|| CaError::ProfileNotFound(name.to_string()))
    }

    /// Insert a freshly issued certificate. Fails if the id or serial is
    /// already present.
    pub fn insert_certificate(&self, certificate: StoredCertificate) -> Result<()> {
        let mut by_id = self
            .certificates_by_id
            .write()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        let mut by_serial = self
            .id_by_serial
            .write()
            .map_err(|_| CaError::StorageFailure("serial index lock poisoned".to_string()))?;

        if by_id.contains_key(&certificate.id) {
            return Err(CaError::CertificateExists(certificate.id.to_string()));
        }
        if by_serial.contains_key(&certificate.serial_hex) {
            return Err(CaError::SerialExists(certificate.serial_hex.clone()));
        }

        by_serial.insert(certificate.serial_hex.clone(), certificate.id);
        by_id.insert(certificate.id, certificate);
        Ok(())
    }

    /// Fetch a certificate by its Store id.
    pub fn get_certificate_by_id(&self, id: Uuid) -> Result<StoredCertificate> {
        let by_id = self
            .certificates_by_id
            .read()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| CaError::CertificateNotFound(id.to_string()))
    }

    /// Fetch a certificate by its lowercase hex serial.
    pub fn get_certificate_by_serial(&self, serial_hex: &str) -> Result<StoredCertificate> {
        let by_serial = self
            .id_by_serial
            .read()
            .map_err(|_| CaError::StorageFailure("serial index lock poisoned".to_string()))?;
        let id = by_serial
            .get(serial_hex)
            .copied()
            .ok_or_else(|| CaError::CertificateNotFound(serial_hex.to_string()))?;
        drop(by_serial);
        self.get_certificate_by_id(id)
    }

    /// Mark a certificate revoked. Idempotent rejection: revoking an
    /// already-revoked certificate is a conflict, not a silent no-op, so
    /// callers can distinguish "first revocation" from "already done".
    pub fn revoke_certificate(&self, id: Uuid, record: RevocationRecord) -> Result<()> {
        let mut by_id = self
            .certificates_by_id
            .write()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        let certificate = by_id
            .get_mut(&id)
            .ok_or_else(|| CaError::CertificateNotFound(id.to_string()))?;
        if certificate.revocation.is_some() {
            return Err(CaError::AlreadyRevoked(id.to_string()));
        }
        certificate.revocation = Some(record);
        Ok(())
    }

    /// All currently revoked certificates issued under `issuer_dn`, ordered
    /// by ascending serial for CRL generation.
    pub fn revoked_certificates(&self, issuer_dn: &str) -> Result<Vec<StoredCertificate>> {
        let by_id = self
            .certificates_by_id
            .read()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        let mut revoked: Vec<StoredCertificate> = by_id
            .values()
            .filter(|c| c.revocation.is_some() && c.issuer_dn == issuer_dn)
            .cloned()
            .collect();
        revoked.sort_by(|a, b| a.serial_hex.cmp(&b.serial_hex));
        Ok(revoked)
    }

    /// Allocate the next monotonically increasing CRL number, starting at 1.
    pub fn next_crl_number(&self) -> u64 {
        self.crl_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// List certificates matching `filter`, sorted by issuance time, paged
    /// by `limit`/`offset`. Returns the page alongside the total number of
    /// certificates matching the filter before paging.
    pub fn list_certificates(&self, filter: &CertificateFilter) -> Result<(Vec<StoredCertificate>, usize)> {
        let by_id = self
            .certificates_by_id
            .read()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        let mut matching: Vec<StoredCertificate> = by_id
            .values()
            .filter(|c| {
                filter
                    .status
                    .map_or(true, |status| c.status(chrono::Utc::now()) == status)
            })
            .filter(|c| {
                filter
                    .profile_name
                    .as_ref()
                    .map_or(true, |name| &c.profile_name == name)
            })
            .filter(|c| {
                filter
                    .requester_id
                    .as_ref()
                    .map_or(true, |id| c.requester_id.as_ref() == Some(id))
            })
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.issued_at);
        let total = matching.len();

        let offset = filter.offset.unwrap_or(0);
        let page: Vec<StoredCertificate> = match filter.limit {
            Some(limit) => matching.into_iter().skip(offset).take(limit).collect(),
            None => matching.into_iter().skip(offset).collect(),
        };
        Ok((page, total))
    }

    /// Replace a stored certificate in place, keyed by its id.
    pub fn update_certificate(&self, certificate: StoredCertificate) -> Result<()> {
        let mut by_id = self
            .certificates_by_id
            .write()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        if !by_id.contains_key(&certificate.id) {
            return Err(CaError::CertificateNotFound(certificate.id.to_string()));
        }
        by_id.insert(certificate.id, certificate);
        Ok(())
    }

    /// Remove a certificate from both indexes.
    pub fn delete_certificate(&self, id: Uuid) -> Result<()> {
        let mut by_id = self
            .certificates_by_id
            .write()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        let mut by_serial = self
            .id_by_serial
            .write()
            .map_err(|_| CaError::StorageFailure("serial index lock poisoned".to_string()))?;
        let certificate = by_id
            .remove(&id)
            .ok_or_else(|| CaError::CertificateNotFound(id.to_string()))?;
        by_serial.remove(&certificate.serial_hex);
        Ok(())
    }

    /// Count certificates by their current status.
    pub fn count_by_status(&self) -> Result<HashMap<CertificateStatus, usize>> {
        let by_id = self
            .certificates_by_id
            .read()
            .map_err(|_| CaError::StorageFailure("certificate index lock poisoned".to_string()))?;
        let now = chrono::Utc::now();
        let mut counts: HashMap<CertificateStatus, usize> = HashMap::new();
        for certificate in by_id.values() {
            *counts.entry(certificate.status(now)).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Insert a new enrollment record.
    pub fn insert_enrollment(&self, enrollment: EnrollmentState) -> Result<()> {
        let mut enrollments = self
            .enrollments
            .write()
            .map_err(|_| CaError::StorageFailure("enrollment index lock poisoned".to_string()))?;
        enrollments.insert(enrollment.id, enrollment);
        Ok(())
    }

    /// Fetch an enrollment by id.
    pub fn get_enrollment(&self, id: Uuid) -> Result<EnrollmentState> {
        let enrollments = self
            .enrollments
            .read()
            .map_err(|_| CaError::StorageFailure("enrollment index lock poisoned".to_string()))?;
        enrollments
            .get(&id)
            .cloned()
            .ok_or_else(|| CaError::EnrollmentNotFound(id.to_string()))
    }

    /// Replace an existing enrollment record (e.g. after a state transition).
    pub fn update_enrollment(&self, enrollment: EnrollmentState) -> Result<()> {
        let mut enrollments = self
            .enrollments
            .write()
            .map_err(|_| CaError::StorageFailure("enrollment index lock poisoned".to_string()))?;
        if !enrollments.contains_key(&enrollment.id) {
            return Err(CaError::EnrollmentNotFound(enrollment.id.to_string()));
        }
        enrollments.insert(enrollment.id, enrollment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_certificate(id: Uuid, serial_hex: &str) -> StoredCertificate {
        StoredCertificate {
            id,
            serial_hex: serial_hex.to_string(),
            der: vec![0x30, 0x00],
            profile_name: "tls-server".to_string(),
            subject: crate::value_objects::SubjectName::new(),
            not_before: Utc::now(),
            not_after: Utc::now(),
            fingerprint_sha256: [0u8; 32],
            revocation: None,
            issued_at: Utc::now(),
            issuer_dn: "CN=Test Root CA".to_string(),
            requester_id: None,
        }
    }

    #[test]
    fn lookups_by_id_and_serial_agree() {
        let store = Store::new();
        let id = Uuid::now_v7();
        store.insert_certificate(sample_certificate(id, "aabbcc")).unwrap();

        let by_id = store.get_certificate_by_id(id).unwrap();
        let by_serial = store.get_certificate_by_serial("aabbcc").unwrap();
        assert_eq!(by_id.id, by_serial.id);
    }

    #[test]
    fn rejects_duplicate_serial() {
        let store = Store::new();
        store
            .insert_certificate(sample_certificate(Uuid::now_v7(), "aabbcc"))
            .unwrap();
        let err = store
            .insert_certificate(sample_certificate(Uuid::now_v7(), "aabbcc"))
            .unwrap_err();
        assert!(matches!(err, CaError::SerialExists(_)));
    }

    #[test]
    fn revoking_twice_is_a_conflict() {
        let store = Store::new();
        let id = Uuid::now_v7();
        store.insert_certificate(sample_certificate(id, "aabbcc")).unwrap();
        let record = RevocationRecord {
            revoked_at: Utc::now(),
            reason: crate::model::RevocationReason::Superseded,
        };
        store.revoke_certificate(id, record).unwrap();
        let err = store.revoke_certificate(id, record).unwrap_err();
        assert!(matches!(err, CaError::AlreadyRevoked(_)));
    }
}
