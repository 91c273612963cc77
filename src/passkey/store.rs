//! Storage interfaces for challenges and credentials
//!
//! Storage is owned by the embedding application. The service only needs
//! single-use challenges and a compare-and-set on the signature counter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::PasskeyError;

/// Which ceremony a challenge was issued for
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

/// A challenge issued to a client, pending its response
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub id: String,
    pub challenge: Vec<u8>,
    pub kind: CeremonyKind,
    pub user_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeRecord {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A registered credential as persisted by the credential store
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredCredential {
    pub credential_id: Vec<u8>,
    pub user_handle: String,
    pub public_key: Vec<u8>, // COSE-encoded public key
    pub algorithm: i64,
    pub sign_count: u32,
    pub aaguid: [u8; 16],
    pub backup_eligible: bool,
    pub backed_up: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Persistence for issued challenges
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Persist a newly issued challenge
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::Store`] if the challenge cannot be saved.
    async fn store(&self, record: ChallengeRecord) -> Result<(), PasskeyError>;

    /// Remove and return a challenge
    ///
    /// Must be atomic: a challenge is handed out at most once, so a replayed
    /// response finds nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::Store`] if the store cannot be read.
    async fn consume(&self, id: &str) -> Result<Option<ChallengeRecord>, PasskeyError>;
}

/// Persistence for registered credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a credential by its raw id
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::Store`] if the store cannot be read.
    async fn get(&self, credential_id: &[u8]) -> Result<Option<StoredCredential>, PasskeyError>;

    /// Save a newly registered credential
    ///
    /// The check for an existing id and the write must be one atomic step:
    /// two registrations racing on the same credential id leave exactly one
    /// stored credential.
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::DuplicateCredential`] if a credential with the
    /// same id is already stored, or [`PasskeyError::Store`] if the credential
    /// cannot be saved.
    async fn insert(&self, credential: StoredCredential) -> Result<(), PasskeyError>;

    /// Set the signature counter to `new_count` only if it still equals
    /// `expected_previous`
    ///
    /// Returns `false` when another authentication updated the counter first.
    ///
    /// # Errors
    ///
    /// Returns [`PasskeyError::Store`] if the update cannot be performed.
    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected_previous: u32,
        new_count: u32,
        used_at: DateTime<Utc>,
    ) -> Result<bool, PasskeyError>;
}
