//! Error types for cryptographic and envelope operations.

use thiserror::Error;

/// Structured error types for the crypto module.
///
/// `DecryptionFailed` deliberately carries no detail: a wrong password, a
/// wrong key pair, a tampered tag and a truncated ciphertext all look the same
/// to the caller.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authenticated decryption or key unwrapping failed
    #[error("Decryption failed")]
    DecryptionFailed,

    /// The identity holds no wrapped key entry in this container
    #[error("No wrapped key found for identity: {identity}")]
    KeyNotFound { identity: String },

    /// Key material is required but not available
    #[error("Container is not unlocked: {operation} requires key material")]
    NotUnlocked { operation: String },

    /// The envelope names a scheme this implementation does not know
    #[error("Unsupported encryption scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// The operation or envelope belongs to a different scheme
    #[error("Scheme mismatch: expected {expected}, found {actual}")]
    SchemeMismatch { expected: String, actual: String },

    /// Encryption failed
    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Password key derivation failed
    #[error("Key derivation failed: {reason}")]
    KeyDerivationFailed { reason: String },

    /// A key could not be parsed
    #[error("Invalid key format: {reason}")]
    InvalidKeyFormat { reason: String },

    /// The envelope is structurally malformed
    #[error("Invalid envelope: {reason}")]
    InvalidEnvelope { reason: String },
}

impl CryptoError {
    /// Check if this error is an authenticated decryption failure.
    pub fn is_decryption_failed(&self) -> bool {
        matches!(self, CryptoError::DecryptionFailed)
    }

    /// Check if this error indicates a missing wrapped key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, CryptoError::KeyNotFound { .. })
    }

    /// Check if this error indicates missing key material.
    pub fn is_not_unlocked(&self) -> bool {
        matches!(self, CryptoError::NotUnlocked { .. })
    }

    /// Check if this error indicates an unknown envelope scheme.
    pub fn is_unsupported_scheme(&self) -> bool {
        matches!(self, CryptoError::UnsupportedScheme { .. })
    }

    /// Check if this error is caused by malformed input rather than key material.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidKeyFormat { .. }
                | CryptoError::InvalidEnvelope { .. }
                | CryptoError::SchemeMismatch { .. }
        )
    }

    pub(crate) fn not_unlocked(operation: impl Into<String>) -> Self {
        CryptoError::NotUnlocked {
            operation: operation.into(),
        }
    }
}

impl From<CryptoError> for crate::Error {
    fn from(err: CryptoError) -> Self {
        crate::Error::Crypto(err)
    }
}
