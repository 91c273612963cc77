//! Passkey request and response types
//!
//! Field names follow the `WebAuthn` JSON serialization of
//! `PublicKeyCredential`, with binary fields as base64url strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Challenge handed to the client to start a ceremony
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyChallenge {
    /// Opaque id the client returns with its response
    pub challenge_id: String,
    pub challenge: String, // Base64URL-encoded random challenge
    pub rp_id: String,
    pub rp_name: String,
    pub timeout_ms: u64,
    pub user_verification: String, // "required" or "preferred"
    pub user_handle: Option<String>,
}

/// Registration response from client
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,     // Base64URL-encoded credential ID
    pub raw_id: String, // Base64URL-encoded raw credential ID
    pub response: AuthenticatorAttestationResponse,
    #[serde(rename = "type", default = "public_key_type")]
    pub credential_type: String, // Always "public-key"
}

/// Authentication response from client
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,     // Base64URL-encoded credential ID
    pub raw_id: String, // Base64URL-encoded raw credential ID
    pub response: AuthenticatorAssertionResponse,
    #[serde(rename = "type", default = "public_key_type")]
    pub credential_type: String,
}

/// Authenticator attestation response during registration
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,   // Base64URL-encoded client data JSON
    pub attestation_object: String, // Base64URL-encoded attestation object
}

/// Authenticator assertion response during authentication
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,   // Base64URL-encoded client data JSON
    pub authenticator_data: String, // Base64URL-encoded authenticator data
    pub signature: String,          // Base64URL-encoded signature
    #[serde(default)]
    pub user_handle: Option<String>,
}

/// Registration result
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub credential_id: String, // Base64URL-encoded credential ID
    pub user_handle: String,
    pub algorithm: i64,
    pub attestation_format: String,
    pub user_verified: bool,
}

/// Authentication result
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationOutcome {
    pub credential_id: String, // Base64URL-encoded credential ID
    pub user_handle: String,
    pub sign_count: u32, // Updated signature counter
    pub user_verified: bool,
    pub authenticated_at: DateTime<Utc>,
}

fn public_key_type() -> String {
    "public-key".to_string()
}
