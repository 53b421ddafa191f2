//! The `BasicConstraints` extension and path-length enforcement.
//!
//! Grounded in the teacher's `value_objects/x509/basic_constraints.rs`,
//! whose `can_issue_ca_certs`/`subordinate_path_len` pair is the exact shape
//! the Issuer needs to enforce the path-length invariant.

/// The `BasicConstraints` extension value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BasicConstraints {
    /// Whether the subject may act as a CA.
    pub is_ca: bool,
    /// The maximum number of non-self-issued intermediate certificates that
    /// may follow this one in a valid path. `None` means unconstrained.
    pub path_len_constraint: Option<u32>,
    /// Whether the extension is marked critical.
    pub critical: bool,
}

impl BasicConstraints {
    /// A CA certificate with an explicit path length constraint.
    pub fn ca_with_path_len(path_len: u32) -> Self {
        Self {
            is_ca: true,
            path_len_constraint: Some(path_len),
            critical: true,
        }
    }

    /// A CA certificate with no path length constraint.
    pub fn ca_unconstrained() -> Self {
        Self {
            is_ca: true,
            path_len_constraint: None,
            critical: true,
        }
    }

    /// An end-entity (leaf) certificate.
    pub fn end_entity() -> Self {
        Self {
            is_ca: false,
            path_len_constraint: None,
            critical: false,
        }
    }

    /// A root CA: unconstrained path length.
    pub fn root_ca() -> Self {
        Self::ca_unconstrained()
    }

    /// An intermediate CA one level below a root: path length 1.
    pub fn intermediate_ca() -> Self {
        Self::ca_with_path_len(1)
    }

    /// An issuing CA that may only sign end-entity certificates.
    pub fn issuing_ca() -> Self {
        Self::ca_with_path_len(0)
    }

    /// True when this CA is permitted to issue further CA certificates
    /// (false once `path_len_constraint` reaches zero).
    pub fn can_issue_ca_certs(&self) -> bool {
        self.is_ca && self.path_len_constraint != Some(0)
    }

    /// The `path_len_constraint` a direct subordinate CA issued under this
    /// one would need, given the subordinate's requested path length.
    ///
    /// Returns `None` when this CA cannot issue CA certificates at all, or
    /// when the decremented value would be negative (i.e. the subordinate's
    /// requested path length is not strictly less than this CA's).
    pub fn subordinate_path_len(&self, requested: Option<u32>) -> Option<Option<u32>> {
        if !self.can_issue_ca_certs() {
            return None;
        }
        match self.path_len_constraint {
            None => Some(requested),
            Some(parent_len) => match requested {
                None => Some(Some(parent_len.saturating_sub(1))),
                Some(child_len) if child_len < parent_len => Some(Some(child_len)),
                Some(_) => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuing_ca_cannot_issue_further_cas() {
        let issuing = BasicConstraints::issuing_ca();
        assert!(!issuing.can_issue_ca_certs());
        assert_eq!(issuing.subordinate_path_len(None), None);
    }

    #[test]
    fn root_can_issue_any_child_path_len() {
        let root = BasicConstraints::root_ca();
        assert!(root.can_issue_ca_certs());
        assert_eq!(root.subordinate_path_len(Some(3)), Some(Some(3)));
    }

    #[test]
    fn intermediate_rejects_child_with_equal_or_greater_path_len() {
        let intermediate = BasicConstraints::intermediate_ca();
        assert_eq!(intermediate.subordinate_path_len(Some(1)), None);
        assert_eq!(intermediate.subordinate_path_len(Some(2)), None);
        assert_eq!(intermediate.subordinate_path_len(Some(0)), Some(Some(0)));
        assert_eq!(intermediate.subordinate_path_len(None), Some(Some(0)));
    }
}
