//! Passkey service error types

use crate::webauthn::ValidationError;

/// Errors returned by [`super::PasskeyService`] and the storage traits
#[derive(Debug, thiserror::Error)]
pub enum PasskeyError {
    /// The ceremony was rejected
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Challenge or credential storage failed
    #[error("store error: {0}")]
    Store(String),

    /// A credential with this id is already registered
    #[error("credential is already registered")]
    DuplicateCredential,

    /// Passkeys are disabled or the settings are invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A request field is not valid base64url
    #[error("encoding error: {0} is not valid base64url")]
    Encoding(&'static str),

    /// The system random source failed
    #[error("random number generation failed")]
    Random,
}

impl PasskeyError {
    /// The validation reason, if the ceremony itself was rejected
    #[must_use]
    pub fn validation_error(&self) -> Option<ValidationError> {
        match self {
            Self::Validation(error) => Some(*error),
            _ => None,
        }
    }
}

impl From<ring::error::Unspecified> for PasskeyError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::Random
    }
}
