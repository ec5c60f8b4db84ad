//! Core types for the MuSig protocol

use crate::arith::{self, COMPRESSED_POINT_LEN, SCALAR_LEN};
use crate::{Error, Result, MAX_KEY_SLOT, MIN_SIGNERS};
use k256::{ProjectivePoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier for a signing round
pub type SessionId = [u8; 32];

/// Offset added to the y-parity of the combined key, matching `ecrecover`'s `v`
pub const PARITY_BYTE_OFFSET: u8 = 27;

/// A signer's private scalar
///
/// Never printed, never serialized and wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Scalar);

impl SecretKey {
    /// Generate a fresh key from a CSPRNG
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(arith::random_scalar(rng))
    }

    /// Parse a 32-byte big-endian scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SCALAR_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "secret key must be {SCALAR_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        let scalar = arith::scalar_from_bytes(&array)
            .map_err(|e| Error::InvalidKey(format!("secret key: {e}")))?;
        Ok(Self(scalar))
    }

    /// Big-endian encoding of the scalar
    pub fn to_bytes(&self) -> [u8; SCALAR_LEN] {
        self.0.to_bytes().into()
    }

    /// The matching compressed public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_nonzero_point(ProjectivePoint::GENERATOR * self.0)
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// A validated compressed secp256k1 public key
///
/// Equality, ordering and hashing are defined on the 33 encoded bytes, so
/// sorting a key list yields the lexicographic order used by key aggregation.
#[derive(Clone, Copy)]
pub struct PublicKey {
    bytes: [u8; COMPRESSED_POINT_LEN],
    point: ProjectivePoint,
}

impl PublicKey {
    /// Parse and validate a compressed public key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let point = arith::parse_point(bytes)?;
        Ok(Self::from_nonzero_point(point))
    }

    /// Parse a hex string, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Wrap a point, rejecting the identity
    pub fn from_point(point: &ProjectivePoint) -> Result<Self> {
        if *point == ProjectivePoint::IDENTITY {
            return Err(Error::InvalidKey("point at infinity".into()));
        }
        Ok(Self::from_nonzero_point(*point))
    }

    fn from_nonzero_point(point: ProjectivePoint) -> Self {
        Self {
            bytes: arith::compress(&point),
            point,
        }
    }

    /// Compressed encoding
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_POINT_LEN] {
        &self.bytes
    }

    pub fn to_point(&self) -> ProjectivePoint {
        self.point
    }

    /// 0 for an even y coordinate, 1 for odd
    pub fn y_parity(&self) -> u8 {
        self.bytes[0] - 0x02
    }

    /// `27 + y_parity`, the recovery byte the verifier binds into the challenge
    pub fn parity_byte(&self) -> u8 {
        PARITY_BYTE_OFFSET + self.y_parity()
    }

    /// Big-endian x coordinate
    pub fn x_coordinate(&self) -> [u8; 32] {
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.bytes[1..]);
        x
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for PublicKey {}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.bytes))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.bytes))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.bytes))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Cache key for a signer's secret nonces within one session
///
/// `keccak(session_id || secret_key)`, so the same key signing in two sessions
/// never shares a cache slot.
#[derive(Clone, Copy)]
pub struct KeyId([u8; 32]);

impl KeyId {
    pub fn new(session_id: &SessionId, secret_key: &SecretKey) -> Self {
        let mut secret = secret_key.to_bytes();
        let id = arith::keccak256_concat(&[session_id.as_slice(), secret.as_slice()]);
        secret.zeroize();
        Self(id)
    }
}

impl PartialEq for KeyId {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for KeyId {}

impl Hash for KeyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(&self.0[..4]))
    }
}

/// Configuration for a signing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Public keys of every co-signer, in any order
    pub signers: Vec<PublicKey>,

    /// Slot of the combined key in the verifying wallet (0..=127)
    pub key_slot: u8,
}

impl SessionConfig {
    /// Create a new session configuration
    pub fn new(signers: Vec<PublicKey>, key_slot: u8) -> Result<Self> {
        if signers.len() < MIN_SIGNERS {
            return Err(Error::InsufficientSigners {
                required: MIN_SIGNERS,
                actual: signers.len(),
            });
        }
        if key_slot > MAX_KEY_SLOT {
            return Err(Error::InvalidConfig(format!(
                "key slot {key_slot} does not fit in 7 bits"
            )));
        }

        Ok(Self { signers, key_slot })
    }

    /// Load a configuration shared as JSON, re-running validation
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        Self::new(config.signers, config.key_slot)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
