//! Key aggregation with rogue-key protection
//!
//! Keys are sorted before anything is hashed, so the combined key only depends
//! on the set of signers:
//!
//! ```text
//! L   = keccak(X_1 || ... || X_n)      (sorted, compressed)
//! a_i = keccak(L || X_i) mod n
//! X   = sum(a_i * X_i)
//! ```

use crate::arith::{self, combine_points};
use crate::{Error, PublicKey, Result, MIN_SIGNERS};
use k256::{ProjectivePoint, Scalar};
use tracing::{debug, instrument};

/// Output of key aggregation for one signer set
#[derive(Debug, Clone)]
pub struct KeyAggContext {
    combined_key: PublicKey,
    list_digest: [u8; 32],
    /// Sorted signer keys
    keys: Vec<PublicKey>,
    /// `a_i`, aligned with `keys`
    coefficients: Vec<Scalar>,
}

impl KeyAggContext {
    /// The aggregated public key `X`
    pub fn combined_key(&self) -> &PublicKey {
        &self.combined_key
    }

    /// The ordering digest `L`
    pub fn list_digest(&self) -> &[u8; 32] {
        &self.list_digest
    }

    /// Signer keys in canonical (sorted) order
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// Number of signers
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    /// Rogue-key coefficient `a_i` of a member key
    pub fn coefficient(&self, key: &PublicKey) -> Result<Scalar> {
        self.keys
            .binary_search(key)
            .map(|idx| self.coefficients[idx])
            .map_err(|_| Error::InvalidKey(format!("{key} is not part of the signer set")))
    }
}

/// Aggregate signer public keys into a combined key
///
/// Fails with `InsufficientSigners` for fewer than two keys and with
/// `InvalidKey` for duplicate keys or a combination that cancels out.
#[instrument(skip_all, fields(signers = public_keys.len()))]
pub fn aggregate_keys(public_keys: &[PublicKey]) -> Result<KeyAggContext> {
    if public_keys.len() < MIN_SIGNERS {
        return Err(Error::InsufficientSigners {
            required: MIN_SIGNERS,
            actual: public_keys.len(),
        });
    }

    let mut keys = public_keys.to_vec();
    keys.sort();
    if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(Error::InvalidKey(format!("duplicate public key {}", pair[0])));
    }

    let list_digest = list_digest(&keys);
    let coefficients = keys
        .iter()
        .map(|key| rogue_key_coefficient(&list_digest, key))
        .collect::<Result<Vec<_>>>()?;

    let combined = combine_points(weighted_keys(&keys, &coefficients))
        .ok_or_else(|| Error::InvalidKey("aggregated key is the point at infinity".into()))?;
    let combined_key = PublicKey::from_point(&combined)?;

    debug!(combined_key = %combined_key, "Aggregated public keys");

    Ok(KeyAggContext {
        combined_key,
        list_digest,
        keys,
        coefficients,
    })
}

/// `L = keccak(concat(sorted keys))`
pub fn list_digest(sorted_keys: &[PublicKey]) -> [u8; 32] {
    let parts: Vec<&[u8]> = sorted_keys.iter().map(|k| k.as_bytes().as_slice()).collect();
    arith::keccak256_concat(&parts)
}

/// `a_i = keccak(L || X_i) mod n`
pub fn rogue_key_coefficient(list_digest: &[u8; 32], key: &PublicKey) -> Result<Scalar> {
    let a = arith::hash_to_scalar(&[list_digest.as_slice(), key.as_bytes().as_slice()]);
    arith::ensure_non_zero(a, "rogue-key coefficient")
}

#[cfg(feature = "multi-thread")]
fn weighted_keys(keys: &[PublicKey], coefficients: &[Scalar]) -> Vec<ProjectivePoint> {
    use rayon::prelude::*;

    keys.par_iter()
        .zip(coefficients.par_iter())
        .map(|(key, a)| key.to_point() * a)
        .collect()
}

#[cfg(not(feature = "multi-thread"))]
fn weighted_keys(keys: &[PublicKey], coefficients: &[Scalar]) -> Vec<ProjectivePoint> {
    keys.iter()
        .zip(coefficients)
        .map(|(key, a)| key.to_point() * a)
        .collect()
}
