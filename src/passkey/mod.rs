//! Passkey ceremonies for application integration
//!
//! This module drives the `WebAuthn` validators with challenge issuance,
//! single-use challenge storage and credential persistence.

// Core settings
mod settings;
pub use settings::{PasskeySettings, MIN_CHALLENGE_LENGTH};

mod errors;
pub use errors::PasskeyError;

// Storage interfaces implemented by the embedding application
mod store;
pub use store::{CeremonyKind, ChallengeRecord, ChallengeStore, CredentialStore, StoredCredential};

mod types;
pub use types::*;

// Service layer
mod service;
pub use service::PasskeyService;
