#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `WebAuthn` passkey validation
//!
//! - [`webauthn`] validates attestation and assertion ceremonies as pure
//!   functions over the bytes a browser submits.
//! - [`passkey`] issues and consumes challenges and persists credentials
//!   through caller-provided stores.
//! - [`settings`] loads configuration from TOML and the environment.

/// Version of the pgpasskey library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod passkey;
pub mod settings;
pub mod webauthn;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use passkey::{PasskeyError, PasskeyService, PasskeySettings};
pub use settings::Settings;
pub use webauthn::{validate_assertion, validate_attestation, ValidationError};
