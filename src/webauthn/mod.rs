//! `WebAuthn` validation engine
//!
//! Pure, synchronous validation of registration (attestation) and
//! authentication (assertion) ceremonies. Nothing here performs I/O, logs, or
//! keeps state between calls; challenge and credential storage live in
//! [`crate::passkey`].

pub mod authenticator_data;
pub mod base64url;
pub mod cbor;
pub mod cose;
pub mod crypto;

mod assertion;
mod attestation;
mod ceremony;
mod client_data;
mod errors;
mod types;

// Re-exports for public use
pub use assertion::validate_assertion;
pub use attestation::validate_attestation;
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use client_data::{ClientData, TYPE_CREATE, TYPE_GET};
pub use cose::{is_supported_algorithm, CoseAlgorithm, CoseKey, CoseKeyError, CoseKeyType, EcCurve};
pub use crypto::{generate_challenge, generate_user_handle};
pub use errors::ValidationError;
pub use types::*;
