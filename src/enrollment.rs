//! Tracks the lifecycle of an enrollment request from submission through
//! issuance or rejection.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CaError, Result};
use crate::model::{EnrollmentState, EnrollmentStatus};
use crate::store::Store;

/// Records and transitions enrollment state in a [`Store`].
pub struct EnrollmentTracker<'a> {
    store: &'a Store,
}

impl<'a> EnrollmentTracker<'a> {
    /// Build a tracker bound to the given store.
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Record a new pending enrollment for `profile_name`.
    pub fn start(&self, profile_name: &str) -> Result<EnrollmentState> {
        let now = Utc::now();
        let enrollment = EnrollmentState {
            id: Uuid::now_v7(),
            status: EnrollmentStatus::Pending,
            profile_name: profile_name.to_string(),
            certificate_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_enrollment(enrollment.clone())?;
        Ok(enrollment)
    }

    /// Mark an enrollment issued, linking it to the resulting certificate.
    pub fn mark_issued(&self, id: Uuid, certificate_id: Uuid) -> Result<EnrollmentState> {
        self.transition(id, EnrollmentStatus::Issued, Some(certificate_id))
    }

    /// Mark an enrollment rejected.
    pub fn mark_rejected(&self, id: Uuid) -> Result<EnrollmentState> {
        self.transition(id, EnrollmentStatus::Rejected, None)
    }

    /// Mark an enrollment failed (issuance was attempted but could not complete).
    pub fn mark_failed(&self, id: Uuid) -> Result<EnrollmentState> {
        self.transition(id, EnrollmentStatus::Failed, None)
    }

    fn transition(
        &self,
        id: Uuid,
        status: EnrollmentStatus,
        certificate_id: Option<Uuid>,
    ) -> Result<EnrollmentState> {
        let mut enrollment = self.store.get_enrollment(id)?;
        if !matches!(enrollment.status, EnrollmentStatus::Pending) {
            return Err(CaError::ValidationFailure(format!(
                "enrollment {id} is no longer pending"
            )));
        }
        enrollment.status = status;
        enrollment.certificate_id = certificate_id;
        enrollment.updated_at = Utc::now();
        self.store.update_enrollment(enrollment.clone())?;
        Ok(enrollment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_transition_an_already_issued_enrollment_again() {
        let store = Store::new();
        let tracker = EnrollmentTracker::new(&store);
        let enrollment = tracker.start("tls-server").unwrap();
        tracker.mark_issued(enrollment.id, Uuid::now_v7()).unwrap();
        let err = tracker.mark_rejected(enrollment.id).unwrap_err();
        assert!(matches!(err, CaError::ValidationFailure(_)));
    }
}
