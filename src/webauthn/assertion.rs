//! `WebAuthn` assertion processing
//!
//! Validates an authentication ceremony against a previously registered
//! credential. The new signature counter is returned, never stored: persisting
//! it atomically per credential is the caller's job.

use super::authenticator_data::AuthenticatorData;
use super::ceremony::{verify_rp_id_hash, verify_user_flags};
use super::client_data::{verify_client_data, TYPE_GET};
use super::cose::{is_supported_algorithm, CoseKey};
use super::crypto;
use super::errors::ValidationError;
use super::types::{AssertionResult, CeremonyExpectations, StoredKey, VerifiedAssertion};

/// Validate an authentication ceremony
///
/// `authenticator_data` is the raw structure signed by the authenticator (no
/// CBOR envelope). When `validate_sign_count` is set the counter must strictly
/// increase, unless both the stored and the reported counter are zero.
///
/// # Errors
///
/// Returns the [`ValidationError`] of the first failing check. Any fault while
/// decoding the stored key or the signature is reported as
/// [`ValidationError::InvalidSignature`].
pub fn validate_assertion(
    authenticator_data: &[u8],
    client_data_json: &[u8],
    signature: &[u8],
    stored: &StoredKey<'_>,
    expected: &CeremonyExpectations<'_>,
    validate_sign_count: bool,
) -> AssertionResult {
    verify_client_data(
        client_data_json,
        TYPE_GET,
        expected.challenge,
        expected.origins,
    )?;

    let auth_data = AuthenticatorData::parse(authenticator_data)
        .ok_or(ValidationError::InvalidAuthenticatorData)?;

    verify_rp_id_hash(&auth_data, expected.rp_id)?;
    verify_user_flags(&auth_data, expected.require_user_verification)?;

    if validate_sign_count {
        verify_sign_count(stored.sign_count, auth_data.sign_count)?;
    }

    if !is_supported_algorithm(stored.algorithm) {
        return Err(ValidationError::UnsupportedAlgorithm);
    }

    let key = CoseKey::decode(stored.public_key).map_err(|_| ValidationError::InvalidSignature)?;
    if key.algorithm() != stored.algorithm {
        return Err(ValidationError::InvalidSignature);
    }

    let client_data_hash = crypto::sha256(client_data_json);
    let mut signed = Vec::with_capacity(authenticator_data.len() + client_data_hash.len());
    signed.extend_from_slice(authenticator_data);
    signed.extend_from_slice(&client_data_hash);

    if !key.verify(&signed, signature) {
        return Err(ValidationError::InvalidSignature);
    }

    Ok(VerifiedAssertion {
        new_sign_count: auth_data.sign_count,
        user_verified: auth_data.flags.user_verified(),
        backed_up: auth_data.flags.backed_up(),
    })
}

/// Zero on both sides means the authenticator keeps no counter
fn verify_sign_count(stored: u32, reported: u32) -> Result<(), ValidationError> {
    if stored == 0 && reported == 0 {
        return Ok(());
    }
    if reported > stored {
        Ok(())
    } else {
        Err(ValidationError::SignCountNotIncremented)
    }
}
