//! Authenticator data parsing
//!
//! The format is (`WebAuthn` §6.1, big-endian):
//! - 32 bytes: RP ID hash
//! - 1 byte: flags
//! - 4 bytes: signature counter
//! - variable: attested credential data (if the AT flag is set)
//!   - 16 bytes: AAGUID
//!   - 2 bytes: credential ID length (L)
//!   - L bytes: credential ID
//!   - variable: COSE public key
//! - variable: extensions (if the ED flag is set), not interpreted here

use super::cose::CoseKey;

/// Length of the fixed authenticator data header
pub const AUTHENTICATOR_DATA_MIN_LEN: usize = 37;

const RP_ID_HASH_LEN: usize = 32;
const AAGUID_LEN: usize = 16;

/// Authenticator data flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKED_UP: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[must_use]
    pub fn user_present(self) -> bool {
        self.has(Self::USER_PRESENT)
    }

    #[must_use]
    pub fn user_verified(self) -> bool {
        self.has(Self::USER_VERIFIED)
    }

    #[must_use]
    pub fn backup_eligible(self) -> bool {
        self.has(Self::BACKUP_ELIGIBLE)
    }

    #[must_use]
    pub fn backed_up(self) -> bool {
        self.has(Self::BACKED_UP)
    }

    #[must_use]
    pub fn attested_credential_data(self) -> bool {
        self.has(Self::ATTESTED_CREDENTIAL_DATA)
    }

    #[must_use]
    pub fn extension_data(self) -> bool {
        self.has(Self::EXTENSION_DATA)
    }
}

/// Credential data attested at registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    /// The COSE key exactly as encoded by the authenticator
    pub public_key_bytes: Vec<u8>,
    pub public_key: CoseKey,
}

impl AttestedCredentialData {
    /// Parse attested credential data from the front of `bytes`
    ///
    /// Returns `None` when the buffer is too short for the declared credential
    /// ID or the public key does not decode. Bytes after the key are left
    /// untouched.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let aaguid: [u8; AAGUID_LEN] = bytes.get(..AAGUID_LEN)?.try_into().ok()?;
        let length_bytes = bytes.get(AAGUID_LEN..AAGUID_LEN + 2)?;
        let id_len = usize::from(u16::from_be_bytes([length_bytes[0], length_bytes[1]]));

        let id_start = AAGUID_LEN + 2;
        let id_end = id_start.checked_add(id_len)?;
        let credential_id = bytes.get(id_start..id_end)?.to_vec();

        let key_region = bytes.get(id_end..)?;
        let (public_key, key_len) = CoseKey::decode_prefix(key_region).ok()?;
        let public_key_bytes = key_region.get(..key_len)?.to_vec();

        Some(Self {
            aaguid,
            credential_id,
            public_key_bytes,
            public_key,
        })
    }
}

/// Parsed authenticator data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parse raw authenticator data
    ///
    /// Returns `None` if the data is shorter than the fixed header, or if the
    /// AT flag is set over attested credential data that does not parse.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < AUTHENTICATOR_DATA_MIN_LEN {
            return None;
        }

        let rp_id_hash: [u8; RP_ID_HASH_LEN] = bytes.get(..RP_ID_HASH_LEN)?.try_into().ok()?;
        let flags = AuthenticatorFlags::from_bits(bytes[RP_ID_HASH_LEN]);
        let counter: [u8; 4] = bytes
            .get(RP_ID_HASH_LEN + 1..AUTHENTICATOR_DATA_MIN_LEN)?
            .try_into()
            .ok()?;
        let sign_count = u32::from_be_bytes(counter);

        let attested_credential_data =
            if flags.attested_credential_data() && bytes.len() > AUTHENTICATOR_DATA_MIN_LEN {
                Some(AttestedCredentialData::parse(
                    &bytes[AUTHENTICATOR_DATA_MIN_LEN..],
                )?)
            } else {
                None
            };

        Some(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
        })
    }
}
