//! Binding coefficient, effective nonces and the Fiat-Shamir challenge
//!
//! ```text
//! b   = keccak(X || m || sum(K_i) || sum(K2_i)) mod n
//! R_i = K_i + b·K2_i
//! R   = sum(R_i)
//! e   = keccak(address(R) || 27 + parity(X) || x(X) || m)
//! ```
//!
//! The layout of `e` is what the on-chain verifier recomputes, so any change
//! here breaks every deployed wallet.

use crate::arith::{self, combine_points, compress, ensure_non_zero};
use crate::{Error, PublicKey, PublicNonces, Result};
use elliptic_curve::{bigint::U256, ops::Reduce};
use k256::{FieldBytes, ProjectivePoint, Scalar};

/// Session binding coefficient `b`, identical for every co-signer
pub fn binding_coefficient(
    combined_key: &PublicKey,
    msg_hash: &[u8; 32],
    all_nonces: &[PublicNonces],
) -> Result<Scalar> {
    if all_nonces.is_empty() {
        return Err(Error::NoncesNotExchanged("no public nonces received".into()));
    }

    let k_sum = combine_points(all_nonces.iter().map(PublicNonces::k_public)).ok_or_else(|| {
        Error::InvalidNonceSet("sum of first nonces is the point at infinity".into())
    })?;
    let k_two_sum = combine_points(all_nonces.iter().map(PublicNonces::k_two_public))
        .ok_or_else(|| {
            Error::InvalidNonceSet("sum of second nonces is the point at infinity".into())
        })?;

    let b = arith::hash_to_scalar(&[
        combined_key.as_bytes().as_slice(),
        msg_hash.as_slice(),
        compress(&k_sum).as_slice(),
        compress(&k_two_sum).as_slice(),
    ]);
    ensure_non_zero(b, "binding coefficient")
}

/// A signer's effective nonce `R_i = kPublic + b·kTwoPublic`
pub fn effective_nonce(nonces: &PublicNonces, b: &Scalar) -> ProjectivePoint {
    nonces.k_public() + nonces.k_two_public() * b
}

/// The session nonce `R = sum(R_i)`
pub fn session_nonce(all_nonces: &[PublicNonces], b: &Scalar) -> Result<ProjectivePoint> {
    combine_points(all_nonces.iter().map(|nonces| effective_nonce(nonces, b)))
        .ok_or_else(|| Error::InvalidNonceSet("session nonce is the point at infinity".into()))
}

/// Fiat-Shamir challenge `e` as the raw 32-byte digest
pub fn challenge(
    session_nonce: &ProjectivePoint,
    msg_hash: &[u8; 32],
    combined_key: &PublicKey,
) -> Result<[u8; 32]> {
    let nonce_address = arith::eth_address(session_nonce)
        .ok_or_else(|| Error::InvalidNonceSet("session nonce is the point at infinity".into()))?;

    Ok(arith::keccak256_concat(&[
        nonce_address.as_slice(),
        [combined_key.parity_byte()].as_slice(),
        combined_key.x_coordinate().as_slice(),
        msg_hash.as_slice(),
    ]))
}

/// The challenge reduced modulo the group order
pub fn challenge_scalar(challenge: &[u8; 32]) -> Result<Scalar> {
    let e = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*challenge));
    ensure_non_zero(e, "challenge")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate_keys, generate_nonces, SecretKey};
    use rand::rngs::OsRng;

    fn setup(n: usize) -> (PublicKey, Vec<PublicNonces>) {
        let keys: Vec<_> = (0..n)
            .map(|_| SecretKey::random(&mut OsRng).public_key())
            .collect();
        let ctx = aggregate_keys(&keys).unwrap();
        let nonces = (0..n)
            .map(|_| generate_nonces(&mut OsRng).public_nonces())
            .collect();
        (*ctx.combined_key(), nonces)
    }

    #[test]
    fn test_binding_coefficient_is_order_independent() {
        let (x, nonces) = setup(3);
        let msg = [7u8; 32];

        let b = binding_coefficient(&x, &msg, &nonces).unwrap();
        let mut reversed = nonces.clone();
        reversed.reverse();
        assert_eq!(binding_coefficient(&x, &msg, &reversed).unwrap(), b);

        let other_msg = [8u8; 32];
        assert_ne!(binding_coefficient(&x, &other_msg, &nonces).unwrap(), b);
    }

    #[test]
    fn test_binding_coefficient_needs_nonces() {
        let (x, _) = setup(2);
        assert!(matches!(
            binding_coefficient(&x, &[0u8; 32], &[]),
            Err(Error::NoncesNotExchanged(_))
        ));
    }

    #[test]
    fn test_cancelling_nonces_are_rejected() {
        let (x, nonces) = setup(2);
        let (k, k_two) = nonces[0].to_bytes();
        let negated_k = compress(&-nonces[0].k_public());
        let other = PublicNonces::from_bytes(&negated_k, &k_two).unwrap();
        let honest = PublicNonces::from_bytes(&k, &k_two).unwrap();

        assert!(matches!(
            binding_coefficient(&x, &[1u8; 32], &[honest, other]),
            Err(Error::InvalidNonceSet(_))
        ));
    }

    #[test]
    fn test_session_nonce_is_sum_of_effective_nonces() {
        let (x, nonces) = setup(2);
        let b = binding_coefficient(&x, &[3u8; 32], &nonces).unwrap();
        let r = session_nonce(&nonces, &b).unwrap();
        assert_eq!(
            r,
            effective_nonce(&nonces[0], &b) + effective_nonce(&nonces[1], &b)
        );
    }

    #[test]
    fn test_challenge_binds_every_input() {
        let (x, nonces) = setup(2);
        let msg = [9u8; 32];
        let b = binding_coefficient(&x, &msg, &nonces).unwrap();
        let r = session_nonce(&nonces, &b).unwrap();

        let e = challenge(&r, &msg, &x).unwrap();
        assert_eq!(challenge(&r, &msg, &x).unwrap(), e);
        assert_ne!(challenge(&r, &[0u8; 32], &x).unwrap(), e);
        assert_ne!(challenge(&(r + r), &msg, &x).unwrap(), e);

        let (y, _) = setup(2);
        assert_ne!(challenge(&r, &msg, &y).unwrap(), e);

        assert!(matches!(
            challenge(&ProjectivePoint::IDENTITY, &msg, &x),
            Err(Error::InvalidNonceSet(_))
        ));
    }

    #[test]
    fn test_challenge_layout() {
        let (x, _) = setup(2);
        let r = ProjectivePoint::GENERATOR;
        let msg = [0x42u8; 32];

        let mut preimage = Vec::with_capacity(20 + 1 + 32 + 32);
        let generator_address = "7e5f4552091a69125d5dfcb7b8c2659029395bdf";
        preimage.extend_from_slice(&hex::decode(generator_address).unwrap());
        preimage.push(27 + x.y_parity());
        preimage.extend_from_slice(&x.as_bytes()[1..]);
        preimage.extend_from_slice(&msg);

        assert_eq!(challenge(&r, &msg, &x).unwrap(), arith::keccak256(&preimage));
    }
}
