//! Passkey settings
//!
//! This module defines the relying party configuration for passkey ceremonies.

use serde::{Deserialize, Serialize};
use url::Url;

/// Shortest challenge accepted, in bytes
pub const MIN_CHALLENGE_LENGTH: usize = 16;

/// Passkey settings for `WebAuthn` operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PasskeySettings {
    pub enabled: bool,
    pub rp_id: String,
    pub rp_name: String,
    /// Origins accepted in client data. Empty disables the origin check.
    pub allowed_origins: Vec<String>,
    pub challenge_timeout_seconds: u64,
    pub require_user_verification: bool,
    pub validate_sign_count: bool,
    pub challenge_length: usize,
}

impl Default for PasskeySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rp_id: "localhost".to_string(),
            rp_name: "pgpasskey".to_string(),
            allowed_origins: vec!["https://localhost".to_string()],
            challenge_timeout_seconds: 300,
            require_user_verification: false,
            validate_sign_count: true,
            challenge_length: 32,
        }
    }
}

impl PasskeySettings {
    /// Check the settings for values that would make every ceremony fail or
    /// weaken it
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.rp_id.trim().is_empty() {
            return Err("rp_id must not be empty".to_string());
        }

        for origin in &self.allowed_origins {
            validate_origin(origin)?;
        }

        if self.challenge_length < MIN_CHALLENGE_LENGTH {
            return Err(format!(
                "challenge_length must be at least {MIN_CHALLENGE_LENGTH} bytes, got {}",
                self.challenge_length
            ));
        }

        if self.challenge_timeout_seconds == 0 {
            return Err("challenge_timeout_seconds must be greater than zero".to_string());
        }

        if self.enabled && self.allowed_origins.is_empty() {
            log::warn!("passkeys enabled with no allowed_origins: origin check is disabled");
        }

        Ok(())
    }

    /// `WebAuthn` user verification requirement to advertise to clients
    #[must_use]
    pub fn user_verification(&self) -> &'static str {
        if self.require_user_verification {
            "required"
        } else {
            "preferred"
        }
    }
}

/// Origins must be https, except plain http on localhost for development
fn validate_origin(origin: &str) -> Result<(), String> {
    let url = Url::parse(origin).map_err(|e| format!("invalid origin '{origin}': {e}"))?;

    match url.scheme() {
        "https" => {}
        "http" if url.host_str() == Some("localhost") => {}
        _ => {
            return Err(format!(
                "origin '{origin}' must use https (http is only allowed for localhost)"
            ))
        }
    }

    if url.host_str().is_none() {
        return Err(format!("origin '{origin}' has no host"));
    }

    Ok(())
}
