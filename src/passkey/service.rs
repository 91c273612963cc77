//! Passkey ceremony service
//!
//! Connects the stateless validators in [`crate::webauthn`] to challenge and
//! credential storage: issues challenges, consumes them exactly once, and
//! persists registered credentials and their signature counters.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use super::errors::PasskeyError;
use super::settings::PasskeySettings;
use super::store::{CeremonyKind, ChallengeRecord, ChallengeStore, CredentialStore, StoredCredential};
use super::types::{
    AuthenticationOutcome, AuthenticationResponse, CeremonyChallenge, RegistrationOutcome,
    RegistrationResponse,
};
use crate::webauthn::{
    base64url, generate_challenge, generate_user_handle, validate_assertion,
    validate_attestation, CeremonyExpectations, StoredKey, ValidationError,
};

/// Length in bytes of the random part of a challenge id
const CHALLENGE_ID_LENGTH: usize = 16;

/// Passkey registration and authentication over caller-provided storage
pub struct PasskeyService<C, K> {
    settings: PasskeySettings,
    challenges: C,
    credentials: K,
}

impl<C: ChallengeStore, K: CredentialStore> PasskeyService<C, K> {
    /// Create a new passkey service
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::Configuration`] if the settings do not validate.
    pub fn new(settings: PasskeySettings, challenges: C, credentials: K) -> Result<Self, PasskeyError> {
        settings.validate().map_err(PasskeyError::Configuration)?;
        Ok(Self {
            settings,
            challenges,
            credentials,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &PasskeySettings {
        &self.settings
    }

    #[must_use]
    pub fn challenge_store(&self) -> &C {
        &self.challenges
    }

    #[must_use]
    pub fn credential_store(&self) -> &K {
        &self.credentials
    }

    /// Start a registration ceremony
    ///
    /// A user handle is generated when none is given.
    ///
    /// # Errors
    ///
    /// Returns an error if passkeys are disabled, the random source fails or
    /// the challenge cannot be stored.
    pub async fn start_registration(
        &self,
        user_handle: Option<&str>,
    ) -> Result<CeremonyChallenge, PasskeyError> {
        self.check_enabled()?;
        let user_handle = match user_handle {
            Some(handle) => handle.to_string(),
            None => generate_user_handle()?,
        };
        self.issue_challenge(CeremonyKind::Registration, Some(user_handle))
            .await
    }

    /// Start an authentication ceremony
    ///
    /// With a user handle only that user's credentials are accepted; without
    /// one any registered credential may answer (discoverable credentials).
    ///
    /// # Errors
    ///
    /// Returns an error if passkeys are disabled, the random source fails or
    /// the challenge cannot be stored.
    pub async fn start_authentication(
        &self,
        user_handle: Option<&str>,
    ) -> Result<CeremonyChallenge, PasskeyError> {
        self.check_enabled()?;
        self.issue_challenge(
            CeremonyKind::Authentication,
            user_handle.map(ToString::to_string),
        )
        .await
    }

    /// Complete a registration ceremony and store the new credential
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::Validation`] when the challenge is unknown,
    /// expired or the attestation is rejected, [`PasskeyError::Encoding`] for
    /// malformed fields, [`PasskeyError::DuplicateCredential`] if the
    /// credential id is taken, and store or configuration errors.
    pub async fn complete_registration(
        &self,
        challenge_id: &str,
        response: &RegistrationResponse,
    ) -> Result<RegistrationOutcome, PasskeyError> {
        self.check_enabled()?;
        let record = self
            .take_challenge(challenge_id, CeremonyKind::Registration)
            .await?;
        let user_handle = record
            .user_handle
            .clone()
            .ok_or(ValidationError::ChallengeNotFound)?;

        let client_data_json = decode_field(&response.response.client_data_json, "clientDataJSON")?;
        let attestation_object =
            decode_field(&response.response.attestation_object, "attestationObject")?;

        let credential = validate_attestation(
            &attestation_object,
            &client_data_json,
            &self.expectations(&record.challenge),
        )
        .map_err(|e| rejected("registration", e))?;

        if self.credentials.get(&credential.credential_id).await?.is_some() {
            warn!(
                "Passkey registration rejected: credential {} already registered",
                base64url::encode(&credential.credential_id)
            );
            return Err(PasskeyError::DuplicateCredential);
        }

        let outcome = RegistrationOutcome {
            credential_id: base64url::encode(&credential.credential_id),
            user_handle: user_handle.clone(),
            algorithm: credential.algorithm,
            attestation_format: credential.attestation_format.clone(),
            user_verified: credential.user_verified,
        };

        self.credentials
            .insert(StoredCredential {
                credential_id: credential.credential_id,
                user_handle,
                public_key: credential.public_key,
                algorithm: credential.algorithm,
                sign_count: credential.sign_count,
                aaguid: credential.aaguid,
                backup_eligible: credential.backup_eligible,
                backed_up: credential.backed_up,
                created_at: Utc::now(),
                last_used: None,
            })
            .await?;

        info!(
            "Registered passkey {} (alg {}, fmt {})",
            outcome.credential_id, outcome.algorithm, outcome.attestation_format
        );
        Ok(outcome)
    }

    /// Complete an authentication ceremony and persist the new counter
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::Validation`] when the challenge is unknown or
    /// expired, the credential is unknown, the assertion is rejected, or a
    /// concurrent authentication updated the counter first.
    pub async fn complete_authentication(
        &self,
        challenge_id: &str,
        response: &AuthenticationResponse,
    ) -> Result<AuthenticationOutcome, PasskeyError> {
        self.check_enabled()?;
        let record = self
            .take_challenge(challenge_id, CeremonyKind::Authentication)
            .await?;

        let credential_id = decode_field(&response.raw_id, "rawId")?;
        let client_data_json = decode_field(&response.response.client_data_json, "clientDataJSON")?;
        let authenticator_data =
            decode_field(&response.response.authenticator_data, "authenticatorData")?;
        let signature = decode_field(&response.response.signature, "signature")?;

        let credential = self
            .credentials
            .get(&credential_id)
            .await?
            .ok_or_else(|| rejected("authentication", ValidationError::CredentialNotFound))?;

        if let Some(expected_user) = &record.user_handle {
            if expected_user != &credential.user_handle {
                return Err(rejected(
                    "authentication",
                    ValidationError::CredentialNotFound,
                ));
            }
        }

        let verified = validate_assertion(
            &authenticator_data,
            &client_data_json,
            &signature,
            &StoredKey {
                public_key: &credential.public_key,
                algorithm: credential.algorithm,
                sign_count: credential.sign_count,
            },
            &self.expectations(&record.challenge),
            self.settings.validate_sign_count,
        )
        .map_err(|e| rejected("authentication", e))?;

        let now = Utc::now();
        let updated = self
            .credentials
            .update_sign_count(
                &credential_id,
                credential.sign_count,
                verified.new_sign_count,
                now,
            )
            .await?;
        if !updated {
            return Err(rejected(
                "authentication",
                ValidationError::SignCountNotIncremented,
            ));
        }

        let outcome = AuthenticationOutcome {
            credential_id: base64url::encode(&credential_id),
            user_handle: credential.user_handle,
            sign_count: verified.new_sign_count,
            user_verified: verified.user_verified,
            authenticated_at: now,
        };
        debug!(
            "Passkey {} authenticated, counter {}",
            outcome.credential_id, outcome.sign_count
        );
        Ok(outcome)
    }

    fn check_enabled(&self) -> Result<(), PasskeyError> {
        if !self.settings.enabled {
            return Err(PasskeyError::Configuration(
                "Passkey support is not enabled".to_string(),
            ));
        }
        Ok(())
    }

    fn expectations<'a>(&'a self, challenge: &'a [u8]) -> CeremonyExpectations<'a> {
        CeremonyExpectations {
            challenge,
            origins: &self.settings.allowed_origins,
            rp_id: &self.settings.rp_id,
            require_user_verification: self.settings.require_user_verification,
        }
    }

    async fn issue_challenge(
        &self,
        kind: CeremonyKind,
        user_handle: Option<String>,
    ) -> Result<CeremonyChallenge, PasskeyError> {
        let challenge = generate_challenge(self.settings.challenge_length)?;
        let id = base64url::encode(&generate_challenge(CHALLENGE_ID_LENGTH)?);
        let created_at = Utc::now();
        let expires_at = self.expiry_from(created_at)?;

        let response = CeremonyChallenge {
            challenge_id: id.clone(),
            challenge: base64url::encode(&challenge),
            rp_id: self.settings.rp_id.clone(),
            rp_name: self.settings.rp_name.clone(),
            timeout_ms: self.settings.challenge_timeout_seconds.saturating_mul(1000),
            user_verification: self.settings.user_verification().to_string(),
            user_handle: user_handle.clone(),
        };

        self.challenges
            .store(ChallengeRecord {
                id,
                challenge,
                kind,
                user_handle,
                created_at,
                expires_at,
            })
            .await?;

        debug!("Issued {kind:?} challenge {}", response.challenge_id);
        Ok(response)
    }

    fn expiry_from(&self, created_at: DateTime<Utc>) -> Result<DateTime<Utc>, PasskeyError> {
        i64::try_from(self.settings.challenge_timeout_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                PasskeyError::Configuration("challenge_timeout_seconds is out of range".to_string())
            })
    }

    /// Consume a challenge; it is gone afterwards whatever the outcome
    async fn take_challenge(
        &self,
        challenge_id: &str,
        kind: CeremonyKind,
    ) -> Result<ChallengeRecord, PasskeyError> {
        let record = self
            .challenges
            .consume(challenge_id)
            .await?
            .ok_or(ValidationError::ChallengeNotFound)?;

        if record.kind != kind {
            debug!(
                "Challenge {challenge_id} was issued for {:?}, not {kind:?}",
                record.kind
            );
            return Err(ValidationError::ChallengeNotFound.into());
        }
        if record.is_expired(Utc::now()) {
            return Err(ValidationError::ChallengeExpired.into());
        }
        Ok(record)
    }
}

fn decode_field(value: &str, field: &'static str) -> Result<Vec<u8>, PasskeyError> {
    base64url::decode(value).ok_or(PasskeyError::Encoding(field))
}

fn rejected(ceremony: &str, error: ValidationError) -> PasskeyError {
    warn!("Passkey {ceremony} rejected: {}", error.code());
    PasskeyError::Validation(error)
}
