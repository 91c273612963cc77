//! Software authenticator for tests
//!
//! Produces the byte structures a browser would submit (client data JSON,
//! authenticator data, attestation objects and assertion signatures) from a
//! fixed key, so ceremonies can be exercised end to end.

use ciborium::value::Value;
use p256::ecdsa::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use super::constants::{
    TEST_AAGUID, TEST_ES256_CREDENTIAL_ID, TEST_ORIGIN, TEST_RP_ID, TEST_RS256_CREDENTIAL_ID,
};
use super::fixtures::TestFixtures;
use crate::passkey::{
    AuthenticationResponse, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    RegistrationResponse,
};
use crate::webauthn::{base64url, crypto, AuthenticatorFlags};

/// Output of a registration ceremony
#[derive(Debug, Clone)]
pub struct TestRegistration {
    pub credential_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
}

/// Output of an authentication ceremony
#[derive(Debug, Clone)]
pub struct TestAssertion {
    pub credential_id: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub signature: Vec<u8>,
}

enum CredentialKey {
    Es256(SigningKey),
    Rs256(Box<RsaPrivateKey>),
}

/// A deterministic authenticator holding one credential
pub struct TestAuthenticator {
    key: CredentialKey,
    credential_id: Vec<u8>,
    aaguid: [u8; 16],
    rp_id: String,
    origin: String,
    declared_algorithm: i64,
}

impl TestAuthenticator {
    /// Authenticator with the fixed P-256 key
    #[must_use]
    pub fn es256() -> Self {
        Self::new(
            CredentialKey::Es256(TestFixtures::ec_signing_key()),
            TEST_ES256_CREDENTIAL_ID,
            -7,
        )
    }

    /// Authenticator with the fixed RSA key, signing PKCS#1 v1.5 / SHA-256
    #[must_use]
    pub fn rs256() -> Self {
        Self::new(
            CredentialKey::Rs256(Box::new(TestFixtures::rsa_private_key())),
            TEST_RS256_CREDENTIAL_ID,
            -257,
        )
    }

    fn new(key: CredentialKey, credential_id: &[u8], algorithm: i64) -> Self {
        Self {
            key,
            credential_id: credential_id.to_vec(),
            aaguid: TEST_AAGUID,
            rp_id: TEST_RP_ID.to_string(),
            origin: TEST_ORIGIN.to_string(),
            declared_algorithm: algorithm,
        }
    }

    /// Label the public key with a different COSE algorithm
    ///
    /// Signatures are still produced with the real key type.
    #[must_use]
    pub fn with_declared_algorithm(mut self, algorithm: i64) -> Self {
        self.declared_algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_credential_id(mut self, credential_id: &[u8]) -> Self {
        self.credential_id = credential_id.to_vec();
        self
    }

    #[must_use]
    pub fn with_rp_id(mut self, rp_id: &str) -> Self {
        self.rp_id = rp_id.to_string();
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    #[must_use]
    pub fn credential_id(&self) -> Vec<u8> {
        self.credential_id.clone()
    }

    #[must_use]
    pub fn aaguid(&self) -> [u8; 16] {
        self.aaguid
    }

    #[must_use]
    pub fn algorithm(&self) -> i64 {
        self.declared_algorithm
    }

    /// COSE encoding of the credential public key
    #[must_use]
    pub fn cose_public_key(&self) -> Vec<u8> {
        match &self.key {
            CredentialKey::Es256(key) => TestFixtures::ec2_cose_key(key, self.declared_algorithm),
            CredentialKey::Rs256(key) => TestFixtures::rsa_cose_key(key, self.declared_algorithm),
        }
    }

    /// Client data JSON for `ceremony_type` over `challenge`
    #[must_use]
    pub fn client_data_json(&self, ceremony_type: &str, challenge: &[u8]) -> Vec<u8> {
        serde_json::json!({
            "type": ceremony_type,
            "challenge": base64url::encode(challenge),
            "origin": self.origin,
            "crossOrigin": false,
        })
        .to_string()
        .into_bytes()
    }

    /// Authenticator data header: RP ID hash, flags and counter
    #[must_use]
    pub fn assertion_auth_data(&self, flags: u8, sign_count: u32) -> Vec<u8> {
        let mut data = crypto::sha256(self.rp_id.as_bytes()).to_vec();
        data.push(flags);
        data.extend_from_slice(&sign_count.to_be_bytes());
        data
    }

    /// Authenticator data carrying the attested credential
    ///
    /// # Panics
    ///
    /// Panics if the credential id is longer than 65535 bytes.
    #[must_use]
    pub fn registration_auth_data(&self, flags: u8) -> Vec<u8> {
        let mut data = self.assertion_auth_data(flags, 0);
        data.extend_from_slice(&self.aaguid);
        let id_len = u16::try_from(self.credential_id.len()).expect("credential id fits u16");
        data.extend_from_slice(&id_len.to_be_bytes());
        data.extend_from_slice(&self.credential_id);
        data.extend_from_slice(&self.cose_public_key());
        data
    }

    /// Wrap authenticator data into an attestation object with an empty
    /// statement
    #[must_use]
    pub fn attestation_object(fmt: &str, auth_data: &[u8]) -> Vec<u8> {
        TestFixtures::cbor(&Value::Map(vec![
            (Value::Text("fmt".to_string()), Value::Text(fmt.to_string())),
            (Value::Text("attStmt".to_string()), Value::Map(Vec::new())),
            (
                Value::Text("authData".to_string()),
                Value::Bytes(auth_data.to_vec()),
            ),
        ]))
    }

    /// Run a registration with user presence and attestation format `none`
    #[must_use]
    pub fn register(&self, challenge: &[u8]) -> TestRegistration {
        let auth_data = self.registration_auth_data(
            AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
        );
        TestRegistration {
            credential_id: self.credential_id(),
            client_data_json: self.client_data_json("webauthn.create", challenge),
            attestation_object: Self::attestation_object("none", &auth_data),
        }
    }

    /// Run an authentication with user presence only
    #[must_use]
    pub fn authenticate(&self, challenge: &[u8], sign_count: u32) -> TestAssertion {
        self.authenticate_with_flags(challenge, AuthenticatorFlags::USER_PRESENT, sign_count)
    }

    #[must_use]
    pub fn authenticate_with_flags(
        &self,
        challenge: &[u8],
        flags: u8,
        sign_count: u32,
    ) -> TestAssertion {
        let authenticator_data = self.assertion_auth_data(flags, sign_count);
        let client_data_json = self.client_data_json("webauthn.get", challenge);

        let mut signed = authenticator_data.clone();
        signed.extend_from_slice(&crypto::sha256(&client_data_json));

        TestAssertion {
            credential_id: self.credential_id(),
            signature: self.sign(&signed),
            authenticator_data,
            client_data_json,
        }
    }

    /// Sign `data` the way a `WebAuthn` authenticator does (DER for ECDSA)
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        match &self.key {
            CredentialKey::Es256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(data);
                signature.to_der().as_bytes().to_vec()
            }
            CredentialKey::Rs256(key) => {
                let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(key.as_ref().clone());
                signer.sign(data).to_vec()
            }
        }
    }

    /// Registration wrapped in the JSON shape a browser posts
    #[must_use]
    pub fn registration_response(&self, challenge: &[u8]) -> RegistrationResponse {
        let registration = self.register(challenge);
        let id = base64url::encode(&registration.credential_id);
        RegistrationResponse {
            id: id.clone(),
            raw_id: id,
            response: AuthenticatorAttestationResponse {
                client_data_json: base64url::encode(&registration.client_data_json),
                attestation_object: base64url::encode(&registration.attestation_object),
            },
            credential_type: "public-key".to_string(),
        }
    }

    /// Authentication wrapped in the JSON shape a browser posts
    #[must_use]
    pub fn authentication_response(
        &self,
        challenge: &[u8],
        sign_count: u32,
    ) -> AuthenticationResponse {
        let assertion = self.authenticate(challenge, sign_count);
        let id = base64url::encode(&assertion.credential_id);
        AuthenticationResponse {
            id: id.clone(),
            raw_id: id,
            response: AuthenticatorAssertionResponse {
                client_data_json: base64url::encode(&assertion.client_data_json),
                authenticator_data: base64url::encode(&assertion.authenticator_data),
                signature: base64url::encode(&assertion.signature),
                user_handle: None,
            },
            credential_type: "public-key".to_string(),
        }
    }
}
