//! Partial signature summation and the wire-level signature

use super::PartialSignature;
use crate::arith::{self, ensure_non_zero, SCALAR_LEN};
use crate::{Error, PublicKey, Result, MAX_KEY_SLOT};
use k256::Scalar;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Encoded length: `e (32) || s (32) || slot/parity (1)`
pub const SIGNATURE_LEN: usize = 2 * SCALAR_LEN + 1;

/// Sum of partial signatures modulo the group order
pub fn sum(signatures: &[Scalar]) -> Scalar {
    signatures
        .iter()
        .fold(Scalar::ZERO, |acc, signature| acc + signature)
}

/// Combine partial signatures into the signature the wallet verifies
///
/// All partials must have been produced over the same challenge and session
/// nonce. The number of partials is not checked here; a missing co-signer
/// simply yields a signature the verifier rejects.
pub fn aggregate(
    partials: &[PartialSignature],
    combined_key: &PublicKey,
    key_slot: u8,
) -> Result<AggregatedSignature> {
    let first = partials
        .first()
        .ok_or_else(|| Error::InvalidNonceSet("no partial signatures to aggregate".into()))?;

    if let Some(stray) = partials
        .iter()
        .find(|p| p.challenge != first.challenge || p.session_nonce != first.session_nonce)
    {
        return Err(Error::InvalidNonceSet(format!(
            "partial signature from {} was made over a different transcript",
            stray.public_key
        )));
    }

    let scalars: Vec<Scalar> = partials.iter().map(|p| p.signature).collect();
    let s = ensure_non_zero(sum(&scalars), "aggregated signature")?;

    let signature =
        AggregatedSignature::new(first.challenge, &s, key_slot, combined_key.y_parity())?;

    info!(
        combined_key = %combined_key,
        signers = partials.len(),
        e = hex::encode(signature.challenge),
        s = hex::encode(signature.signature),
        "Aggregated signature"
    );

    Ok(signature)
}

/// Aggregated Schnorr signature `(e, s)` plus the key slot and key parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedSignature {
    /// Challenge `e`
    pub challenge: [u8; 32],
    /// Signature scalar `s`
    pub signature: [u8; 32],
    /// Slot of the combined key in the wallet (7 bits)
    pub key_slot: u8,
    /// y-parity of the combined key (1 bit)
    pub parity: u8,
}

impl AggregatedSignature {
    /// Create a new signature
    pub fn new(challenge: [u8; 32], s: &Scalar, key_slot: u8, parity: u8) -> Result<Self> {
        if key_slot > MAX_KEY_SLOT {
            return Err(Error::InvalidConfig(format!(
                "key slot {key_slot} does not fit in 7 bits"
            )));
        }
        if parity > 1 {
            return Err(Error::InvalidConfig(format!("parity must be 0 or 1, got {parity}")));
        }

        Ok(Self {
            challenge,
            signature: s.to_bytes().into(),
            key_slot,
            parity,
        })
    }

    /// Packed `slot << 1 | parity`
    pub fn slot_byte(&self) -> u8 {
        (self.key_slot << 1) | self.parity
    }

    /// Convert to bytes (e || s || slot_byte)
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..32].copy_from_slice(&self.challenge);
        bytes[32..64].copy_from_slice(&self.signature);
        bytes[64] = self.slot_byte();
        bytes
    }

    /// Parse the 65-byte wire encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(Error::Deserialization(format!(
                "signature must be {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut challenge = [0u8; 32];
        challenge.copy_from_slice(&bytes[..32]);
        let mut signature = [0u8; 32];
        signature.copy_from_slice(&bytes[32..64]);
        arith::scalar_from_bytes(&signature)?;

        Ok(Self {
            challenge,
            signature,
            key_slot: bytes[64] >> 1,
            parity: bytes[64] & 1,
        })
    }

    /// Signature scalar `s`
    pub fn signature_scalar(&self) -> Result<Scalar> {
        arith::scalar_from_bytes(&self.signature)
    }
}
