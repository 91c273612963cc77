// Integration tests for the authentication ceremony
use std::sync::Arc;

use pgpasskey::passkey::{PasskeyError, PasskeyService, PasskeySettings};
use pgpasskey::testing::constants::{TEST_ORIGIN, TEST_RP_ID};
use pgpasskey::testing::{
    MemoryChallengeStore, MemoryCredentialStore, TestAuthenticator, TestFixtures,
};
use pgpasskey::webauthn::{
    base64url, validate_assertion, validate_attestation, CeremonyExpectations,
    RegisteredCredential, StoredKey, ValidationError,
};

const CHALLENGE: &[u8] = b"integration-authentication-challenge";

type MemoryService = PasskeyService<MemoryChallengeStore, MemoryCredentialStore>;

fn expectations(origins: &[String]) -> CeremonyExpectations<'_> {
    CeremonyExpectations {
        challenge: CHALLENGE,
        origins,
        rp_id: TEST_RP_ID,
        require_user_verification: false,
    }
}

fn registered(authenticator: &TestAuthenticator) -> RegisteredCredential {
    let registration = authenticator.register(CHALLENGE);
    let origins = vec![TEST_ORIGIN.to_string()];
    validate_attestation(
        &registration.attestation_object,
        &registration.client_data_json,
        &expectations(&origins),
    )
    .expect("registration should validate")
}

fn service_with(settings: PasskeySettings) -> MemoryService {
    PasskeyService::new(
        settings,
        MemoryChallengeStore::new(),
        MemoryCredentialStore::new(),
    )
    .unwrap()
}

async fn register(service: &MemoryService, authenticator: &TestAuthenticator, user: &str) {
    let challenge = service.start_registration(Some(user)).await.unwrap();
    let bytes = base64url::decode(&challenge.challenge).unwrap();
    service
        .complete_registration(&challenge.challenge_id, &authenticator.registration_response(&bytes))
        .await
        .unwrap();
}

#[test]
fn test_assertion_against_registered_credential() {
    for authenticator in [TestAuthenticator::es256(), TestAuthenticator::rs256()] {
        let credential = registered(&authenticator);
        let assertion = authenticator.authenticate(CHALLENGE, 1);
        let origins = vec![TEST_ORIGIN.to_string()];

        let verified = validate_assertion(
            &assertion.authenticator_data,
            &assertion.client_data_json,
            &assertion.signature,
            &StoredKey {
                public_key: &credential.public_key,
                algorithm: credential.algorithm,
                sign_count: credential.sign_count,
            },
            &expectations(&origins),
            true,
        )
        .expect("assertion should validate");
        assert_eq!(verified.new_sign_count, 1);
    }
}

#[test]
fn test_single_bit_flip_in_signature() {
    let authenticator = TestAuthenticator::es256();
    let credential = registered(&authenticator);
    let assertion = authenticator.authenticate(CHALLENGE, 1);
    let origins = vec![TEST_ORIGIN.to_string()];

    let mut signature = assertion.signature.clone();
    signature[10] ^= 0x80;

    let result = validate_assertion(
        &assertion.authenticator_data,
        &assertion.client_data_json,
        &signature,
        &StoredKey {
            public_key: &credential.public_key,
            algorithm: credential.algorithm,
            sign_count: credential.sign_count,
        },
        &expectations(&origins),
        true,
    );
    assert_eq!(result, Err(ValidationError::InvalidSignature));
}

#[test]
fn test_modified_authenticator_data_breaks_signature() {
    let authenticator = TestAuthenticator::es256();
    let credential = registered(&authenticator);
    let assertion = authenticator.authenticate(CHALLENGE, 1);
    let origins = vec![TEST_ORIGIN.to_string()];

    // raise the counter after signing
    let mut authenticator_data = assertion.authenticator_data.clone();
    authenticator_data[36] = 0x09;

    let result = validate_assertion(
        &authenticator_data,
        &assertion.client_data_json,
        &assertion.signature,
        &StoredKey {
            public_key: &credential.public_key,
            algorithm: credential.algorithm,
            sign_count: credential.sign_count,
        },
        &expectations(&origins),
        true,
    );
    assert_eq!(result, Err(ValidationError::InvalidSignature));
}

#[tokio::test]
async fn test_counter_advances_across_logins() {
    let service = service_with(TestFixtures::settings());
    let authenticator = TestAuthenticator::es256();
    register(&service, &authenticator, "bob").await;

    for count in [1, 2, 7] {
        let challenge = service.start_authentication(Some("bob")).await.unwrap();
        let bytes = base64url::decode(&challenge.challenge).unwrap();
        let outcome = service
            .complete_authentication(
                &challenge.challenge_id,
                &authenticator.authentication_response(&bytes, count),
            )
            .await
            .unwrap();
        assert_eq!(outcome.sign_count, count);
    }

    let challenge = service.start_authentication(None).await.unwrap();
    let bytes = base64url::decode(&challenge.challenge).unwrap();
    let result = service
        .complete_authentication(
            &challenge.challenge_id,
            &authenticator.authentication_response(&bytes, 7),
        )
        .await;
    assert!(matches!(
        result,
        Err(PasskeyError::Validation(
            ValidationError::SignCountNotIncremented
        ))
    ));
}

#[tokio::test]
async fn test_counterless_authenticator() {
    let service = service_with(TestFixtures::settings());
    let authenticator = TestAuthenticator::es256();
    register(&service, &authenticator, "carol").await;

    for _ in 0..2 {
        let challenge = service.start_authentication(None).await.unwrap();
        let bytes = base64url::decode(&challenge.challenge).unwrap();
        let outcome = service
            .complete_authentication(
                &challenge.challenge_id,
                &authenticator.authentication_response(&bytes, 0),
            )
            .await
            .unwrap();
        assert_eq!(outcome.sign_count, 0);
    }
}

#[tokio::test]
async fn test_required_user_verification() {
    let settings = PasskeySettings {
        require_user_verification: true,
        ..TestFixtures::settings()
    };
    let service = service_with(settings);
    let authenticator = TestAuthenticator::es256();

    let challenge = service.start_registration(None).await.unwrap();
    assert_eq!(challenge.user_verification, "required");
    let bytes = base64url::decode(&challenge.challenge).unwrap();
    let result = service
        .complete_registration(&challenge.challenge_id, &authenticator.registration_response(&bytes))
        .await;
    assert!(matches!(
        result,
        Err(PasskeyError::Validation(
            ValidationError::UserVerificationRequired
        ))
    ));
}

#[tokio::test]
async fn test_concurrent_replays_of_one_assertion() {
    let service = Arc::new(service_with(TestFixtures::settings()));
    let authenticator = TestAuthenticator::es256();
    register(&service, &authenticator, "dave").await;

    let challenge = service.start_authentication(None).await.unwrap();
    let bytes = base64url::decode(&challenge.challenge).unwrap();
    let response = authenticator.authentication_response(&bytes, 3);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let challenge_id = challenge.challenge_id.clone();
            let response = response.clone();
            tokio::spawn(async move {
                service
                    .complete_authentication(&challenge_id, &response)
                    .await
                    .is_ok()
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
