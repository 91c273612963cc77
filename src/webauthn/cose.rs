//! COSE public keys
//!
//! Credential public keys arrive as COSE_Key maps (RFC 9052/9053). This
//! module decodes the EC2 and RSA key types into [`CoseKey`] and verifies
//! assertion signatures against them with the `RustCrypto` primitives.
//!
//! Decoding and the algorithm whitelist are separate steps: a structurally
//! valid key with an algorithm outside [`is_supported_algorithm`] still
//! decodes, and the ceremony validators reject it afterwards.

use p256::ecdsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use super::cbor::{self, CborError, CborValue};

// COSE_Key common parameters
const LABEL_KTY: i128 = 1;
const LABEL_ALG: i128 = 3;

// EC2 parameters
const LABEL_EC2_CRV: i128 = -1;
const LABEL_EC2_X: i128 = -2;
const LABEL_EC2_Y: i128 = -3;
const LABEL_EC2_D: i128 = -4;

// RSA parameters, -3 through -12 are private key material
const LABEL_RSA_N: i128 = -1;
const LABEL_RSA_E: i128 = -2;
const RSA_PRIVATE_LABELS: std::ops::RangeInclusive<i128> = -12..=-3;

const KTY_EC2: i128 = 2;
const KTY_RSA: i128 = 3;

/// Signature algorithms accepted for passkeys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    Es256,
    Es384,
    Es512,
    Rs256,
    Rs384,
    Rs512,
    Ps256,
    Ps384,
    Ps512,
}

impl CoseAlgorithm {
    /// Map a COSE algorithm identifier to a supported algorithm
    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            -7 => Some(Self::Es256),
            -35 => Some(Self::Es384),
            -36 => Some(Self::Es512),
            -257 => Some(Self::Rs256),
            -258 => Some(Self::Rs384),
            -259 => Some(Self::Rs512),
            -37 => Some(Self::Ps256),
            -38 => Some(Self::Ps384),
            -39 => Some(Self::Ps512),
            _ => None,
        }
    }

    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Es384 => -35,
            Self::Es512 => -36,
            Self::Rs256 => -257,
            Self::Rs384 => -258,
            Self::Rs512 => -259,
            Self::Ps256 => -37,
            Self::Ps384 => -38,
            Self::Ps512 => -39,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
        }
    }
}

/// Whether `alg` is one of the whitelisted COSE algorithm identifiers
///
/// Anything else, EdDSA (-8) included, is rejected even when the key itself
/// decodes.
#[must_use]
pub fn is_supported_algorithm(alg: i64) -> bool {
    CoseAlgorithm::from_id(alg).is_some()
}

/// NIST curves usable with EC2 keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    fn from_id(id: i128) -> Option<Self> {
        match id {
            1 => Some(Self::P256),
            2 => Some(Self::P384),
            3 => Some(Self::P521),
            _ => None,
        }
    }

    /// Length in bytes of an affine coordinate
    #[must_use]
    pub fn coordinate_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

/// Key material of a decoded COSE key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoseKeyType {
    Ec2 {
        curve: EcCurve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    Rsa {
        modulus: Vec<u8>,
        exponent: Vec<u8>,
    },
}

/// COSE key decoding failures
#[derive(Debug, thiserror::Error)]
pub enum CoseKeyError {
    #[error("invalid COSE key encoding: {0}")]
    InvalidCbor(#[from] CborError),
    #[error("COSE key contains private key material")]
    PrivateKeyPresent,
    #[error("unsupported COSE key type {0}")]
    UnsupportedKeyType(i128),
    #[error("unsupported elliptic curve {0}")]
    UnsupportedCurve(i128),
    #[error("COSE key is missing {0}")]
    MissingField(&'static str),
    #[error("COSE key has an invalid {0}")]
    InvalidField(&'static str),
    #[error("COSE key is not a valid {0} public key")]
    InvalidPublicKey(&'static str),
}

/// Verifying key built from the COSE parameters at decode time
#[derive(Clone)]
enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
    Rsa(RsaPublicKey),
}

impl PublicKey {
    fn ec2(curve: EcCurve, x: &[u8], y: &[u8]) -> Result<Self, CoseKeyError> {
        let point = sec1_point(x, y);
        let key = match curve {
            EcCurve::P256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&point).map(Self::P256),
            EcCurve::P384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(&point).map(Self::P384),
            EcCurve::P521 => p521::ecdsa::VerifyingKey::from_sec1_bytes(&point).map(Self::P521),
        };
        key.map_err(|_| CoseKeyError::InvalidPublicKey("EC2"))
    }

    fn rsa(modulus: &[u8], exponent: &[u8]) -> Result<Self, CoseKeyError> {
        RsaPublicKey::new(
            BigUint::from_bytes_be(modulus),
            BigUint::from_bytes_be(exponent),
        )
        .map(Self::Rsa)
        .map_err(|_| CoseKeyError::InvalidPublicKey("RSA"))
    }
}

/// A decoded credential public key
#[derive(Clone)]
pub struct CoseKey {
    algorithm: i64,
    key: CoseKeyType,
    public_key: PublicKey,
}

impl std::fmt::Debug for CoseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoseKey")
            .field("algorithm", &self.algorithm)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// the verifying key is derived from `key`, so it takes no part in equality
impl PartialEq for CoseKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.key == other.key
    }
}

impl Eq for CoseKey {}

impl CoseKey {
    /// Decode a COSE key that makes up the whole of `bytes`
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed, non-canonical, private, of an
    /// unsupported type or curve, not a valid public key (an EC2 point off
    /// its curve, an unusable RSA modulus or exponent), or followed by extra
    /// bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CoseKeyError> {
        let (key, consumed) = Self::decode_prefix(bytes)?;
        if consumed != bytes.len() {
            return Err(CoseKeyError::InvalidCbor(CborError::TrailingBytes));
        }
        Ok(key)
    }

    /// Decode a COSE key from the front of `bytes`
    ///
    /// Returns the key and the number of bytes it occupied, so a caller can
    /// locate whatever follows it (extension data in authenticator data).
    ///
    /// # Errors
    ///
    /// Same as [`CoseKey::decode`], except trailing bytes are allowed.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Self, usize), CoseKeyError> {
        let (entries, consumed) = cbor::decode_canonical_map_prefix(bytes)?;
        let params = CoseParams(&entries);

        if params.contains(LABEL_EC2_D) {
            return Err(CoseKeyError::PrivateKeyPresent);
        }

        let kty = params.integer(LABEL_KTY, "kty")?;
        let algorithm = i64::try_from(params.integer(LABEL_ALG, "alg")?)
            .map_err(|_| CoseKeyError::InvalidField("alg"))?;

        let (key, public_key) = match kty {
            KTY_EC2 => {
                let crv = params.integer(LABEL_EC2_CRV, "crv")?;
                let curve = EcCurve::from_id(crv).ok_or(CoseKeyError::UnsupportedCurve(crv))?;
                let x = params.bytes(LABEL_EC2_X, "x")?;
                let y = params.bytes(LABEL_EC2_Y, "y")?;
                if x.len() != curve.coordinate_size() {
                    return Err(CoseKeyError::InvalidField("x"));
                }
                if y.len() != curve.coordinate_size() {
                    return Err(CoseKeyError::InvalidField("y"));
                }
                let public_key = PublicKey::ec2(curve, x, y)?;
                let key = CoseKeyType::Ec2 {
                    curve,
                    x: x.to_vec(),
                    y: y.to_vec(),
                };
                (key, public_key)
            }
            KTY_RSA => {
                if RSA_PRIVATE_LABELS.clone().any(|label| params.contains(label)) {
                    return Err(CoseKeyError::PrivateKeyPresent);
                }
                let modulus = params.bytes(LABEL_RSA_N, "n")?;
                let exponent = params.bytes(LABEL_RSA_E, "e")?;
                if modulus.is_empty() {
                    return Err(CoseKeyError::InvalidField("n"));
                }
                if exponent.is_empty() {
                    return Err(CoseKeyError::InvalidField("e"));
                }
                let public_key = PublicKey::rsa(modulus, exponent)?;
                let key = CoseKeyType::Rsa {
                    modulus: modulus.to_vec(),
                    exponent: exponent.to_vec(),
                };
                (key, public_key)
            }
            other => return Err(CoseKeyError::UnsupportedKeyType(other)),
        };

        Ok((
            Self {
                algorithm,
                key,
                public_key,
            },
            consumed,
        ))
    }

    /// The COSE algorithm identifier declared by the key
    #[must_use]
    pub fn algorithm(&self) -> i64 {
        self.algorithm
    }

    #[must_use]
    pub fn key_type(&self) -> &CoseKeyType {
        &self.key
    }

    /// The declared algorithm, when it is whitelisted and fits the key
    ///
    /// ES256, ES384 and ES512 need a P-256, P-384 and P-521 key respectively;
    /// the RS and PS families need an RSA key. Any other pairing yields `None`
    /// because no signature could ever verify against it.
    #[must_use]
    pub fn usable_algorithm(&self) -> Option<CoseAlgorithm> {
        let alg = CoseAlgorithm::from_id(self.algorithm)?;
        let fits = match (&self.public_key, alg) {
            (PublicKey::P256(_), CoseAlgorithm::Es256)
            | (PublicKey::P384(_), CoseAlgorithm::Es384)
            | (PublicKey::P521(_), CoseAlgorithm::Es512) => true,
            (PublicKey::Rsa(_), alg) => !matches!(
                alg,
                CoseAlgorithm::Es256 | CoseAlgorithm::Es384 | CoseAlgorithm::Es512
            ),
            _ => false,
        };
        fits.then_some(alg)
    }

    /// Verify `signature` over `data`
    ///
    /// ECDSA signatures are expected in ASN.1 DER form. A key whose declared
    /// algorithm is not [usable](CoseKey::usable_algorithm), or a malformed
    /// signature, yields `false`.
    #[must_use]
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Some(alg) = self.usable_algorithm() else {
            return false;
        };

        match &self.public_key {
            PublicKey::P256(key) => p256::ecdsa::Signature::from_der(signature)
                .is_ok_and(|signature| key.verify(data, &signature).is_ok()),
            PublicKey::P384(key) => p384::ecdsa::Signature::from_der(signature)
                .is_ok_and(|signature| key.verify(data, &signature).is_ok()),
            PublicKey::P521(key) => p521::ecdsa::Signature::from_der(signature)
                .is_ok_and(|signature| key.verify(data, &signature).is_ok()),
            PublicKey::Rsa(key) => verify_rsa(key, alg, data, signature),
        }
    }
}

/// Integer-labelled view over decoded COSE map entries
struct CoseParams<'a>(&'a [(CborValue, CborValue)]);

impl CoseParams<'_> {
    fn get(&self, label: i128) -> Option<&CborValue> {
        self.0
            .iter()
            .find(|(k, _)| k.as_integer() == Some(label))
            .map(|(_, v)| v)
    }

    fn contains(&self, label: i128) -> bool {
        self.get(label).is_some()
    }

    fn integer(&self, label: i128, name: &'static str) -> Result<i128, CoseKeyError> {
        self.get(label)
            .ok_or(CoseKeyError::MissingField(name))?
            .as_integer()
            .ok_or(CoseKeyError::InvalidField(name))
    }

    fn bytes(&self, label: i128, name: &'static str) -> Result<&[u8], CoseKeyError> {
        self.get(label)
            .ok_or(CoseKeyError::MissingField(name))?
            .as_bytes()
            .ok_or(CoseKeyError::InvalidField(name))
    }
}

/// Uncompressed SEC1 point: 0x04 || x || y
fn sec1_point(x: &[u8], y: &[u8]) -> Vec<u8> {
    let mut point = Vec::with_capacity(1 + x.len() + y.len());
    point.push(0x04);
    point.extend_from_slice(x);
    point.extend_from_slice(y);
    point
}

fn verify_rsa(key: &RsaPublicKey, alg: CoseAlgorithm, data: &[u8], signature: &[u8]) -> bool {
    match alg {
        CoseAlgorithm::Rs256 => verify_pkcs1v15::<Sha256>(key, data, signature),
        CoseAlgorithm::Rs384 => verify_pkcs1v15::<Sha384>(key, data, signature),
        CoseAlgorithm::Rs512 => verify_pkcs1v15::<Sha512>(key, data, signature),
        CoseAlgorithm::Ps256 => verify_pss::<Sha256>(key, data, signature),
        CoseAlgorithm::Ps384 => verify_pss::<Sha384>(key, data, signature),
        CoseAlgorithm::Ps512 => verify_pss::<Sha512>(key, data, signature),
        CoseAlgorithm::Es256 | CoseAlgorithm::Es384 | CoseAlgorithm::Es512 => false,
    }
}

fn verify_pkcs1v15<D>(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool
where
    D: sha2::Digest + sha2::digest::const_oid::AssociatedOid,
{
    let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
        return false;
    };
    rsa::pkcs1v15::VerifyingKey::<D>::new(key.clone())
        .verify(data, &signature)
        .is_ok()
}

fn verify_pss<D>(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool
where
    D: sha2::Digest + sha2::digest::FixedOutputReset,
{
    let Ok(signature) = rsa::pss::Signature::try_from(signature) else {
        return false;
    };
    rsa::pss::VerifyingKey::<D>::new(key.clone())
        .verify(data, &signature)
        .is_ok()
}
