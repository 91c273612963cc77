//! `WebAuthn` attestation processing
//!
//! Validates a registration ceremony and extracts the new credential.
//!
//! The attestation statement (`attStmt`) is decoded but not cryptographically
//! verified for any format, `none` included. The format name is reported in
//! [`RegisteredCredential::attestation_format`] so callers can apply their own
//! policy.

use super::authenticator_data::AuthenticatorData;
use super::cbor;
use super::ceremony::{verify_rp_id_hash, verify_user_flags};
use super::client_data::{verify_client_data, TYPE_CREATE};
use super::cose::is_supported_algorithm;
use super::errors::ValidationError;
use super::types::{AttestationResult, CeremonyExpectations, RegisteredCredential};

/// Validate a registration ceremony
///
/// Checks run in a fixed order and stop at the first failure:
/// client data (type, challenge, origin), attestation object, authenticator
/// data, RP ID hash, user presence and verification, attested credential
/// data, and finally the algorithm: it must be whitelisted and fit the key's
/// type and curve.
///
/// # Errors
///
/// Returns the [`ValidationError`] of the first failing check.
pub fn validate_attestation(
    attestation_object: &[u8],
    client_data_json: &[u8],
    expected: &CeremonyExpectations<'_>,
) -> AttestationResult {
    verify_client_data(
        client_data_json,
        TYPE_CREATE,
        expected.challenge,
        expected.origins,
    )?;

    let attestation = cbor::decode_attestation_object(attestation_object)
        .ok_or(ValidationError::InvalidAttestationObject)?;

    let auth_data = AuthenticatorData::parse(&attestation.auth_data)
        .ok_or(ValidationError::InvalidAuthenticatorData)?;

    verify_rp_id_hash(&auth_data, expected.rp_id)?;
    verify_user_flags(&auth_data, expected.require_user_verification)?;

    let credential = auth_data
        .attested_credential_data
        .ok_or(ValidationError::MissingAttestedCredentialData)?;

    let algorithm = credential.public_key.algorithm();
    if !is_supported_algorithm(algorithm) {
        return Err(ValidationError::UnsupportedAlgorithm);
    }
    // a whitelisted label on the wrong key type or curve could never verify
    if credential.public_key.usable_algorithm().is_none() {
        return Err(ValidationError::UnsupportedAlgorithm);
    }

    Ok(RegisteredCredential {
        credential_id: credential.credential_id,
        public_key: credential.public_key_bytes,
        algorithm,
        sign_count: auth_data.sign_count,
        backup_eligible: auth_data.flags.backup_eligible(),
        backed_up: auth_data.flags.backed_up(),
        aaguid: credential.aaguid,
        user_verified: auth_data.flags.user_verified(),
        attestation_format: attestation.fmt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::authenticator::TestAuthenticator;
    use crate::testing::fixtures::{TestFixtures, TEST_ORIGIN, TEST_RP_ID};
    use crate::webauthn::authenticator_data::AuthenticatorFlags;
    use ciborium::value::Value;

    const CHALLENGE: &[u8] = b"registration-challenge-0123456789";

    fn origins() -> Vec<String> {
        vec![TEST_ORIGIN.to_string()]
    }

    fn expectations<'a>(origins: &'a [String], rp_id: &'a str) -> CeremonyExpectations<'a> {
        CeremonyExpectations {
            challenge: CHALLENGE,
            origins,
            rp_id,
            require_user_verification: false,
        }
    }

    #[test]
    fn test_happy_path_returns_credential() {
        let authenticator = TestAuthenticator::es256();
        let registration = authenticator.register(CHALLENGE);
        let origins = origins();

        let credential = validate_attestation(
            &registration.attestation_object,
            &registration.client_data_json,
            &expectations(&origins, TEST_RP_ID),
        )
        .unwrap();

        assert_eq!(credential.credential_id, authenticator.credential_id());
        assert_eq!(credential.public_key, authenticator.cose_public_key());
        assert_eq!(credential.algorithm, -7);
        assert_eq!(credential.sign_count, 0);
        assert_eq!(credential.aaguid, authenticator.aaguid());
        assert_eq!(credential.attestation_format, "none");
        assert!(!credential.backup_eligible);
    }

    #[test]
    fn test_deterministic_outcome() {
        let registration = TestAuthenticator::es256().register(CHALLENGE);
        let origins = origins();
        let expected = expectations(&origins, TEST_RP_ID);

        let first = validate_attestation(
            &registration.attestation_object,
            &registration.client_data_json,
            &expected,
        );
        let second = validate_attestation(
            &registration.attestation_object,
            &registration.client_data_json,
            &expected,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_wrong_rp_id_is_rejected() {
        let registration = TestAuthenticator::es256().register(CHALLENGE);
        let origins = origins();
        let result = validate_attestation(
            &registration.attestation_object,
            &registration.client_data_json,
            &expectations(&origins, "other.example.com"),
        );
        assert_eq!(result, Err(ValidationError::RpIdHashMismatch));
    }

    #[test]
    fn test_get_type_is_rejected_for_registration() {
        let authenticator = TestAuthenticator::es256();
        let registration = authenticator.register(CHALLENGE);
        let client_data = authenticator.client_data_json("webauthn.get", CHALLENGE);
        let origins = origins();

        let result = validate_attestation(
            &registration.attestation_object,
            &client_data,
            &expectations(&origins, TEST_RP_ID),
        );
        assert_eq!(result, Err(ValidationError::InvalidType));
    }

    #[test]
    fn test_client_data_checked_before_attestation_object() {
        let origins = origins();
        let result = validate_attestation(
            b"garbage",
            b"{}",
            &expectations(&origins, TEST_RP_ID),
        );
        assert_eq!(result, Err(ValidationError::InvalidClientData));
    }

    #[test]
    fn test_malformed_attestation_object() {
        let authenticator = TestAuthenticator::es256();
        let client_data = authenticator.client_data_json("webauthn.create", CHALLENGE);
        let origins = origins();

        let result = validate_attestation(
            &[0xa1, 0x63, b'f', b'm', b't'],
            &client_data,
            &expectations(&origins, TEST_RP_ID),
        );
        assert_eq!(result, Err(ValidationError::InvalidAttestationObject));
    }

    #[test]
    fn test_short_auth_data_is_invalid_authenticator_data() {
        let authenticator = TestAuthenticator::es256();
        let client_data = authenticator.client_data_json("webauthn.create", CHALLENGE);
        let object = TestAuthenticator::attestation_object("none", &[0u8; 36]);
        let origins = origins();

        let result =
            validate_attestation(&object, &client_data, &expectations(&origins, TEST_RP_ID));
        assert_eq!(result, Err(ValidationError::InvalidAuthenticatorData));
    }

    #[test]
    fn test_user_presence_and_verification() {
        let authenticator = TestAuthenticator::es256();
        let client_data = authenticator.client_data_json("webauthn.create", CHALLENGE);
        let origins = origins();

        let not_present = TestAuthenticator::attestation_object(
            "none",
            &authenticator.registration_auth_data(AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA),
        );
        assert_eq!(
            validate_attestation(&not_present, &client_data, &expectations(&origins, TEST_RP_ID)),
            Err(ValidationError::UserNotPresent)
        );

        let present_only = authenticator.register(CHALLENGE).attestation_object;
        let mut expected = expectations(&origins, TEST_RP_ID);
        expected.require_user_verification = true;
        assert_eq!(
            validate_attestation(&present_only, &client_data, &expected),
            Err(ValidationError::UserVerificationRequired)
        );

        let verified = TestAuthenticator::attestation_object(
            "none",
            &authenticator.registration_auth_data(
                AuthenticatorFlags::USER_PRESENT
                    | AuthenticatorFlags::USER_VERIFIED
                    | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            ),
        );
        let credential = validate_attestation(&verified, &client_data, &expected).unwrap();
        assert!(credential.user_verified);
    }

    #[test]
    fn test_missing_attested_credential_data() {
        let authenticator = TestAuthenticator::es256();
        let client_data = authenticator.client_data_json("webauthn.create", CHALLENGE);
        let object = TestAuthenticator::attestation_object(
            "none",
            &authenticator.assertion_auth_data(AuthenticatorFlags::USER_PRESENT, 0),
        );
        let origins = origins();

        assert_eq!(
            validate_attestation(&object, &client_data, &expectations(&origins, TEST_RP_ID)),
            Err(ValidationError::MissingAttestedCredentialData)
        );
    }

    #[test]
    fn test_unsupported_algorithm_is_rejected_after_decoding() {
        let authenticator = TestAuthenticator::es256().with_declared_algorithm(-8);
        let registration = authenticator.register(CHALLENGE);
        let origins = origins();

        let result = validate_attestation(
            &registration.attestation_object,
            &registration.client_data_json,
            &expectations(&origins, TEST_RP_ID),
        );
        assert_eq!(result, Err(ValidationError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_algorithm_must_fit_the_key() {
        let origins = origins();
        // P-256 key labelled with RSA algorithms or another curve's hash
        for declared in [-257, -37, -35, -36] {
            let registration = TestAuthenticator::es256()
                .with_declared_algorithm(declared)
                .register(CHALLENGE);
            let result = validate_attestation(
                &registration.attestation_object,
                &registration.client_data_json,
                &expectations(&origins, TEST_RP_ID),
            );
            assert_eq!(result, Err(ValidationError::UnsupportedAlgorithm), "{declared}");
        }

        // RSA key labelled ES256
        let registration = TestAuthenticator::rs256()
            .with_declared_algorithm(-7)
            .register(CHALLENGE);
        let result = validate_attestation(
            &registration.attestation_object,
            &registration.client_data_json,
            &expectations(&origins, TEST_RP_ID),
        );
        assert_eq!(result, Err(ValidationError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_point_off_curve_is_invalid_authenticator_data() {
        let authenticator = TestAuthenticator::es256();
        let client_data = authenticator.client_data_json("webauthn.create", CHALLENGE);
        let int = |v: i64| Value::Integer(v.into());
        let off_curve_key = TestFixtures::cbor(&Value::Map(vec![
            (int(1), int(2)),
            (int(3), int(-7)),
            (int(-1), int(1)),
            (int(-2), Value::Bytes(vec![0x11; 32])),
            (int(-3), Value::Bytes(vec![0x22; 32])),
        ]));

        let mut auth_data = authenticator.assertion_auth_data(
            AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            0,
        );
        auth_data.extend_from_slice(&authenticator.aaguid());
        auth_data.extend_from_slice(&[0x00, 0x04]);
        auth_data.extend_from_slice(b"cred");
        auth_data.extend_from_slice(&off_curve_key);
        let object = TestAuthenticator::attestation_object("none", &auth_data);
        let origins = origins();

        assert_eq!(
            validate_attestation(&object, &client_data, &expectations(&origins, TEST_RP_ID)),
            Err(ValidationError::InvalidAuthenticatorData)
        );
    }

    #[test]
    fn test_packed_format_passes_through_unverified() {
        let authenticator = TestAuthenticator::es256();
        let client_data = authenticator.client_data_json("webauthn.create", CHALLENGE);
        let object = TestAuthenticator::attestation_object(
            "packed",
            &authenticator.registration_auth_data(
                AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            ),
        );
        let origins = origins();

        let credential =
            validate_attestation(&object, &client_data, &expectations(&origins, TEST_RP_ID))
                .unwrap();
        assert_eq!(credential.attestation_format, "packed");
    }

    #[test]
    fn test_backup_flags_are_reported() {
        let authenticator = TestAuthenticator::es256();
        let client_data = authenticator.client_data_json("webauthn.create", CHALLENGE);
        let object = TestAuthenticator::attestation_object(
            "none",
            &authenticator.registration_auth_data(
                AuthenticatorFlags::USER_PRESENT
                    | AuthenticatorFlags::BACKUP_ELIGIBLE
                    | AuthenticatorFlags::BACKED_UP
                    | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            ),
        );
        let origins = origins();

        let credential =
            validate_attestation(&object, &client_data, &expectations(&origins, TEST_RP_ID))
                .unwrap();
        assert!(credential.backup_eligible);
        assert!(credential.backed_up);
    }
}
