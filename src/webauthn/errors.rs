//! `WebAuthn` validation errors
//!
//! Every reason a ceremony can be rejected is one of these constants. They
//! are returned as values; parsing faults are converted into them at the
//! point where they occur.

use serde::Serialize;

/// Reasons a registration or authentication ceremony is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("challenge does not match the issued challenge")]
    ChallengeMismatch,
    #[error("origin is not allowed")]
    OriginMismatch,
    #[error("RP ID hash does not match the relying party")]
    RpIdHashMismatch,
    #[error("user presence flag not set")]
    UserNotPresent,
    #[error("user verification required but not performed")]
    UserVerificationRequired,
    #[error("client data type is not valid for this ceremony")]
    InvalidType,
    #[error("client data JSON is malformed or incomplete")]
    InvalidClientData,
    #[error("attestation object is malformed")]
    InvalidAttestationObject,
    #[error("authenticator data is malformed")]
    InvalidAuthenticatorData,
    #[error("authenticator data carries no attested credential")]
    MissingAttestedCredentialData,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("signature counter did not increase")]
    SignCountNotIncremented,
    #[error("credential algorithm is not supported")]
    UnsupportedAlgorithm,
    #[error("credential not found")]
    CredentialNotFound,
    #[error("challenge has expired")]
    ChallengeExpired,
    #[error("challenge not found")]
    ChallengeNotFound,
}

impl ValidationError {
    /// Stable machine-readable code for the calling layer
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ChallengeMismatch => "challenge_mismatch",
            Self::OriginMismatch => "origin_mismatch",
            Self::RpIdHashMismatch => "rp_id_hash_mismatch",
            Self::UserNotPresent => "user_not_present",
            Self::UserVerificationRequired => "user_verification_required",
            Self::InvalidType => "invalid_type",
            Self::InvalidClientData => "invalid_client_data",
            Self::InvalidAttestationObject => "invalid_attestation_object",
            Self::InvalidAuthenticatorData => "invalid_authenticator_data",
            Self::MissingAttestedCredentialData => "missing_attested_credential_data",
            Self::InvalidSignature => "invalid_signature",
            Self::SignCountNotIncremented => "sign_count_not_incremented",
            Self::UnsupportedAlgorithm => "unsupported_algorithm",
            Self::CredentialNotFound => "credential_not_found",
            Self::ChallengeExpired => "challenge_expired",
            Self::ChallengeNotFound => "challenge_not_found",
        }
    }
}
