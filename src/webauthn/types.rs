//! `WebAuthn` ceremony inputs and outcomes
//!
//! These types are independent of any storage or transport. Everything here
//! is a plain value scoped to a single validation call.

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// What the relying party expects a ceremony to be bound to
#[derive(Debug, Clone, Copy)]
pub struct CeremonyExpectations<'a> {
    /// Raw challenge bytes issued for this ceremony
    pub challenge: &'a [u8],
    /// Allowed origins, compared case-insensitively. Empty skips the check.
    pub origins: &'a [String],
    pub rp_id: &'a str,
    pub require_user_verification: bool,
}

/// Stored credential material an assertion is checked against
#[derive(Debug, Clone, Copy)]
pub struct StoredKey<'a> {
    /// COSE-encoded public key as captured at registration
    pub public_key: &'a [u8],
    pub algorithm: i64,
    pub sign_count: u32,
}

/// Credential extracted from a successful registration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegisteredCredential {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>, // COSE-encoded public key
    pub algorithm: i64,
    pub sign_count: u32,
    pub backup_eligible: bool,
    pub backed_up: bool,
    pub aaguid: [u8; 16],
    pub user_verified: bool,
    pub attestation_format: String, // "none", "packed", ... (statement not verified)
}

/// Outcome of a successful authentication
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifiedAssertion {
    /// Counter the caller must persist for the credential
    pub new_sign_count: u32,
    pub user_verified: bool,
    pub backed_up: bool,
}

pub type AttestationResult = Result<RegisteredCredential, ValidationError>;

pub type AssertionResult = Result<VerifiedAssertion, ValidationError>;
