//! Client data JSON (`WebAuthn` §5.8.1)

use serde::Deserialize;

use super::base64url;
use super::crypto;
use super::errors::ValidationError;

pub const TYPE_CREATE: &str = "webauthn.create";
pub const TYPE_GET: &str = "webauthn.get";

/// The fields of `clientDataJSON` the relying party checks
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientData {
    #[serde(rename = "type")]
    pub ceremony_type: String,
    pub challenge: String, // base64url
    pub origin: String,
    #[serde(rename = "crossOrigin", default)]
    pub cross_origin: Option<bool>,
}

impl ClientData {
    /// Parse client data; `None` if it is not JSON or a field is missing
    #[must_use]
    pub fn parse(client_data_json: &[u8]) -> Option<Self> {
        serde_json::from_slice(client_data_json).ok()
    }
}

/// Check type, challenge and origin of the client data, in that order
pub(crate) fn verify_client_data(
    client_data_json: &[u8],
    expected_type: &str,
    expected_challenge: &[u8],
    expected_origins: &[String],
) -> Result<ClientData, ValidationError> {
    let client_data =
        ClientData::parse(client_data_json).ok_or(ValidationError::InvalidClientData)?;

    if client_data.ceremony_type != expected_type {
        return Err(ValidationError::InvalidType);
    }

    let challenge =
        base64url::decode(&client_data.challenge).ok_or(ValidationError::ChallengeMismatch)?;
    if !crypto::constant_time_eq(&challenge, expected_challenge) {
        return Err(ValidationError::ChallengeMismatch);
    }

    // an empty allow-list accepts every origin
    if !expected_origins.is_empty()
        && !expected_origins
            .iter()
            .any(|origin| origin.eq_ignore_ascii_case(&client_data.origin))
    {
        return Err(ValidationError::OriginMismatch);
    }

    Ok(client_data)
}
