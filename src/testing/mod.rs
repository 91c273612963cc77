//! Testing utilities for pgpasskey
//!
//! This module collects the test helpers shared by unit and integration tests.
//!
//! ## Organization
//!
//! - [`fixtures`] - Fixed keys, COSE encodings and settings
//! - [`authenticator`] - A software authenticator producing real ceremony data
//! - [`mock`] - In-memory challenge and credential stores
//!
//! ## Usage
//!
//! ```rust
//! use pgpasskey::testing::{TestAuthenticator, TestFixtures};
//! use pgpasskey::webauthn::{validate_attestation, CeremonyExpectations};
//!
//! let settings = TestFixtures::settings();
//! let registration = TestAuthenticator::es256().register(b"challenge-bytes-0123456789abcdef");
//! let result = validate_attestation(
//!     &registration.attestation_object,
//!     &registration.client_data_json,
//!     &CeremonyExpectations {
//!         challenge: b"challenge-bytes-0123456789abcdef",
//!         origins: &settings.allowed_origins,
//!         rp_id: &settings.rp_id,
//!         require_user_verification: false,
//!     },
//! );
//! assert!(result.is_ok());
//! ```

pub mod authenticator;
pub mod fixtures;
pub mod mock;

// Re-export commonly used items for convenience
pub use authenticator::{TestAssertion, TestAuthenticator, TestRegistration};
pub use fixtures::TestFixtures;
pub use mock::{MemoryChallengeStore, MemoryCredentialStore};

/// Common test constants
pub mod constants {
    /// Relying party the fixtures and the test authenticator agree on
    pub const TEST_RP_ID: &str = "example.com";

    pub const TEST_RP_NAME: &str = "Example RP";

    /// Origin written into client data by the test authenticator
    pub const TEST_ORIGIN: &str = "https://example.com";

    /// AAGUID reported by the test authenticator
    pub const TEST_AAGUID: [u8; 16] = [
        0x08, 0x98, 0x70, 0x58, 0xca, 0xdc, 0x4b, 0x81, 0xb6, 0xe1, 0x30, 0xde, 0x50, 0xdc, 0xbe,
        0x96,
    ];

    /// Credential ids of the two built-in test keys
    pub const TEST_ES256_CREDENTIAL_ID: &[u8] = b"test-es256-credential";
    pub const TEST_RS256_CREDENTIAL_ID: &[u8] = b"test-rs256-credential";
}
