//! In-process stand-in for the ERC-1271 wallet that verifies aggregated
//! signatures. It only depends on `k256` and `sha3`, so it checks the signer
//! crate against an independent reading of the verification equation.

#![allow(dead_code)]

use k256::elliptic_curve::bigint::U256;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, ProjectivePoint, Scalar};
use sha3::{Digest, Keccak256};
use std::collections::HashMap;

/// `bytes4(keccak256("isValidSignature(bytes32,bytes)"))`
pub const MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];
pub const INVALID: [u8; 4] = [0u8; 4];

#[derive(Default)]
pub struct WalletDouble {
    keys: HashMap<u8, [u8; 33]>,
}

impl WalletDouble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a combined key at `slot`
    pub fn register(&mut self, slot: u8, combined_key: [u8; 33]) {
        self.keys.insert(slot, combined_key);
    }

    /// Mirrors `isValidSignature(bytes32 hash, bytes signature)`
    ///
    /// Malformed input reverts (`Err`); a well-formed but wrong signature
    /// returns zero.
    pub fn is_valid_signature(&self, hash: &[u8; 32], signature: &[u8]) -> Result<[u8; 4], String> {
        if signature.len() != 65 {
            return Err(format!("bad signature length {}", signature.len()));
        }

        let e_bytes: [u8; 32] = signature[..32].try_into().unwrap();
        let s_bytes: [u8; 32] = signature[32..64].try_into().unwrap();
        let slot = signature[64] >> 1;
        let parity = signature[64] & 1;

        let Some(stored) = self.keys.get(&slot) else {
            return Err(format!("no key in slot {slot}"));
        };
        if stored[0] - 2 != parity {
            return Ok(INVALID);
        }
        let key = k256::PublicKey::from_sec1_bytes(stored).map_err(|e| e.to_string())?;
        let x_point = key.to_projective();

        let s: Option<Scalar> = Scalar::from_repr(FieldBytes::from(s_bytes)).into();
        let Some(s) = s else {
            return Ok(INVALID);
        };
        let e = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(e_bytes));

        // R = s·G - e·X
        let r = ProjectivePoint::GENERATOR * s - x_point * e;
        if r == ProjectivePoint::IDENTITY {
            return Ok(INVALID);
        }

        let r_encoded = r.to_affine().to_encoded_point(false);
        let r_hash = Keccak256::digest(&r_encoded.as_bytes()[1..]);

        let mut hasher = Keccak256::new();
        hasher.update(&r_hash[12..]);
        hasher.update([27 + parity]);
        hasher.update(&stored[1..]);
        hasher.update(hash);
        let expected: [u8; 32] = hasher.finalize().into();

        if expected == e_bytes {
            Ok(MAGIC_VALUE)
        } else {
            Ok(INVALID)
        }
    }
}

/// Parse a 32-byte hex secret
pub fn secret(hex_str: &str) -> musig_core::SecretKey {
    musig_core::SecretKey::from_bytes(&hex::decode(hex_str).unwrap()).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
