//! In-memory storage for testing
//!
//! These stores implement the passkey storage traits over a locked map. They
//! honour the same atomicity contracts a real store must provide.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::passkey::{ChallengeRecord, ChallengeStore, CredentialStore, PasskeyError, StoredCredential};

/// Challenge store backed by a `HashMap`
#[derive(Default)]
pub struct MemoryChallengeStore {
    records: Mutex<HashMap<String, ChallengeRecord>>,
}

impl MemoryChallengeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of challenges not yet consumed
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn store(&self, record: ChallengeRecord) -> Result<(), PasskeyError> {
        self.records.lock().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn consume(&self, id: &str) -> Result<Option<ChallengeRecord>, PasskeyError> {
        Ok(self.records.lock().await.remove(id))
    }
}

/// Credential store backed by a `HashMap`
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<HashMap<Vec<u8>, StoredCredential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.credentials.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.credentials.lock().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, credential_id: &[u8]) -> Result<Option<StoredCredential>, PasskeyError> {
        Ok(self.credentials.lock().await.get(credential_id).cloned())
    }

    async fn insert(&self, credential: StoredCredential) -> Result<(), PasskeyError> {
        let mut credentials = self.credentials.lock().await;
        if credentials.contains_key(&credential.credential_id) {
            return Err(PasskeyError::DuplicateCredential);
        }
        credentials.insert(credential.credential_id.clone(), credential);
        Ok(())
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        expected_previous: u32,
        new_count: u32,
        used_at: DateTime<Utc>,
    ) -> Result<bool, PasskeyError> {
        let mut credentials = self.credentials.lock().await;
        let Some(credential) = credentials.get_mut(credential_id) else {
            return Ok(false);
        };
        if credential.sign_count != expected_previous {
            return Ok(false);
        }
        credential.sign_count = new_count;
        credential.last_used = Some(used_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::CeremonyKind;
    use chrono::Duration;
    use std::sync::Arc;

    fn credential(id: &[u8], sign_count: u32) -> StoredCredential {
        StoredCredential {
            credential_id: id.to_vec(),
            user_handle: "user".to_string(),
            public_key: vec![0xa0],
            algorithm: -7,
            sign_count,
            aaguid: [0; 16],
            backup_eligible: false,
            backed_up: false,
            created_at: Utc::now(),
            last_used: None,
        }
    }

    #[tokio::test]
    async fn test_challenge_consumed_once() {
        let store = MemoryChallengeStore::new();
        let now = Utc::now();
        store
            .store(ChallengeRecord {
                id: "c".to_string(),
                challenge: vec![1; 16],
                kind: CeremonyKind::Authentication,
                user_handle: None,
                created_at: now,
                expires_at: now + Duration::seconds(30),
            })
            .await
            .unwrap();

        assert!(store.consume("c").await.unwrap().is_some());
        assert!(store.consume("c").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_conditional_sign_count_update() {
        let store = MemoryCredentialStore::new();
        store.insert(credential(b"id", 5)).await.unwrap();

        assert!(!store.update_sign_count(b"id", 4, 6, Utc::now()).await.unwrap());
        assert!(store.update_sign_count(b"id", 5, 6, Utc::now()).await.unwrap());
        assert_eq!(store.get(b"id").await.unwrap().unwrap().sign_count, 6);
        assert!(!store.update_sign_count(b"missing", 0, 1, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_updates_have_one_winner() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.insert(credential(b"id", 5)).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.update_sign_count(b"id", 5, 6, Utc::now()).await.unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = MemoryCredentialStore::new();
        store.insert(credential(b"id", 0)).await.unwrap();
        assert!(matches!(
            store.insert(credential(b"id", 0)).await,
            Err(PasskeyError::DuplicateCredential)
        ));
        assert_eq!(store.len().await, 1);
    }
}
