//! Checks shared by the registration and authentication ceremonies

use super::authenticator_data::AuthenticatorData;
use super::crypto;
use super::errors::ValidationError;

/// The authenticator must have scoped the credential to `rp_id`
pub(crate) fn verify_rp_id_hash(
    auth_data: &AuthenticatorData,
    rp_id: &str,
) -> Result<(), ValidationError> {
    let expected = crypto::sha256(rp_id.as_bytes());
    if crypto::constant_time_eq(&expected, &auth_data.rp_id_hash) {
        Ok(())
    } else {
        Err(ValidationError::RpIdHashMismatch)
    }
}

/// User presence is always required, verification only on request
pub(crate) fn verify_user_flags(
    auth_data: &AuthenticatorData,
    require_user_verification: bool,
) -> Result<(), ValidationError> {
    if !auth_data.flags.user_present() {
        return Err(ValidationError::UserNotPresent);
    }
    if require_user_verification && !auth_data.flags.user_verified() {
        return Err(ValidationError::UserVerificationRequired);
    }
    Ok(())
}
