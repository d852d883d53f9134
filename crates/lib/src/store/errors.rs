//! Error types for store operations.

use thiserror::Error;

/// Structured error types for the store module.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id exists in the store
    #[error("Record not found in store '{store}': {id}")]
    RecordNotFound { store: String, id: String },

    /// The store payload could not be produced
    #[error("Serialization failed in store '{store}': {reason}")]
    SerializationFailed { store: String, reason: String },

    /// The decrypted payload could not be parsed
    #[error("Deserialization failed in store '{store}': {reason}")]
    DeserializationFailed { store: String, reason: String },

    /// Store members and container participants disagree
    #[error("Membership mismatch in store '{store}': {reason}")]
    MembershipMismatch { store: String, reason: String },
}

impl StoreError {
    /// Check if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::RecordNotFound { .. })
    }

    /// Check if this error is related to serialization
    pub fn is_serialization_error(&self) -> bool {
        matches!(
            self,
            StoreError::SerializationFailed { .. } | StoreError::DeserializationFailed { .. }
        )
    }

    /// Check if this error is a member/participant consistency violation
    pub fn is_membership_mismatch(&self) -> bool {
        matches!(self, StoreError::MembershipMismatch { .. })
    }

    /// Get the store name associated with this error
    pub fn store_name(&self) -> &str {
        match self {
            StoreError::RecordNotFound { store, .. }
            | StoreError::SerializationFailed { store, .. }
            | StoreError::DeserializationFailed { store, .. }
            | StoreError::MembershipMismatch { store, .. } => store,
        }
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
