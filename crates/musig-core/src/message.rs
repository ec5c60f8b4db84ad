//! Message hashing domain
//!
//! Messages are hashed as `keccak(0x19 || 0x00 || salt || message)` before
//! signing, the version-0 layout of EIP-191 that the wallet applies to the
//! hash it is asked to validate. The salt pins a signature to one verifier.

use crate::arith;
use serde::{Deserialize, Serialize};

/// EIP-191 prefix byte
pub const EIP191_PREFIX: u8 = 0x19;

/// EIP-191 version byte for "data with intended validator"
pub const EIP191_VERSION: u8 = 0x00;

/// Domain salt the verifier mixes into the message hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageDomain {
    /// 20-byte address of the validating wallet
    Address([u8; 20]),
    /// Chain id, encoded as a 32-byte big-endian word
    ChainId(u64),
}

impl MessageDomain {
    fn salt(&self) -> Vec<u8> {
        match self {
            MessageDomain::Address(address) => address.to_vec(),
            MessageDomain::ChainId(chain_id) => {
                let mut word = [0u8; 32];
                word[24..].copy_from_slice(&chain_id.to_be_bytes());
                word.to_vec()
            }
        }
    }
}

/// Hash a message under `domain`, producing the `msg_hash` every signer uses
pub fn hash_message(domain: &MessageDomain, message: &[u8]) -> [u8; 32] {
    let salt = domain.salt();
    arith::keccak256_concat(&[
        [EIP191_PREFIX, EIP191_VERSION].as_slice(),
        salt.as_slice(),
        message,
    ])
}
