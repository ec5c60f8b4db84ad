//! Signing message types
//!
//! Payloads co-signers exchange between rounds. Delivering them is up to the
//! caller; these types only fix their shape and validate them on receipt.

use super::PartialSignature;
use crate::arith::{self, compress};
use crate::{Error, PublicKey, PublicNonces, Result};
use serde::{Deserialize, Serialize};

/// Round 1 message: public nonce commitments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceMessage {
    /// Sender index in the caller's party list
    pub party_index: usize,
    /// Sender public key (compressed)
    pub public_key: Vec<u8>,
    /// First nonce commitment `k·G`
    pub k_public: Vec<u8>,
    /// Second nonce commitment `k_two·G`
    pub k_two_public: Vec<u8>,
}

impl NonceMessage {
    pub fn new(party_index: usize, public_key: &PublicKey, nonces: &PublicNonces) -> Self {
        let (k_public, k_two_public) = nonces.to_bytes();
        Self {
            party_index,
            public_key: public_key.as_bytes().to_vec(),
            k_public: k_public.to_vec(),
            k_two_public: k_two_public.to_vec(),
        }
    }

    /// Validated sender key and nonces
    pub fn parse(&self) -> Result<(PublicKey, PublicNonces)> {
        let public_key = PublicKey::from_bytes(&self.public_key)?;
        let nonces = PublicNonces::from_bytes(&self.k_public, &self.k_two_public)?;
        Ok((public_key, nonces))
    }
}

/// Round 2 message: partial signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialSignatureMessage {
    /// Sender index in the caller's party list
    pub party_index: usize,
    /// Sender public key (compressed)
    pub public_key: Vec<u8>,
    /// `s_i`
    pub signature: Vec<u8>,
    /// Challenge `e` the sender signed
    pub challenge: Vec<u8>,
    /// Session nonce `R` (compressed) the sender signed
    pub session_nonce: Vec<u8>,
}

impl PartialSignatureMessage {
    pub fn new(party_index: usize, partial: &PartialSignature) -> Self {
        Self {
            party_index,
            public_key: partial.public_key.as_bytes().to_vec(),
            signature: partial.signature.to_bytes().to_vec(),
            challenge: partial.challenge.to_vec(),
            session_nonce: compress(&partial.session_nonce).to_vec(),
        }
    }
}

impl TryFrom<&PartialSignatureMessage> for PartialSignature {
    type Error = Error;

    fn try_from(msg: &PartialSignatureMessage) -> Result<Self> {
        let public_key = PublicKey::from_bytes(&msg.public_key)?;

        let signature_bytes: [u8; 32] = msg
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::Deserialization("Invalid signature length".into()))?;
        let signature = arith::scalar_from_bytes(&signature_bytes)?;

        let challenge: [u8; 32] = msg
            .challenge
            .as_slice()
            .try_into()
            .map_err(|_| Error::Deserialization("Invalid challenge length".into()))?;

        let session_nonce = arith::parse_point(&msg.session_nonce)
            .map_err(|e| Error::InvalidNonceSet(format!("malformed session nonce: {e}")))?;

        Ok(PartialSignature {
            public_key,
            signature,
            challenge,
            session_nonce,
        })
    }
}
