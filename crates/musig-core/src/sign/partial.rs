//! Partial signature computation

use super::challenge::{
    binding_coefficient, challenge, challenge_scalar, effective_nonce, session_nonce,
};
use super::PartialSignature;
use crate::arith::ensure_non_zero;
use crate::{Error, KeyAggContext, NoncePair, PublicNonces, Result, SecretKey, MIN_SIGNERS};
use tracing::{debug, instrument};

/// Produce this signer's partial signature
///
/// `s_i = k + a_i·e·x + b·k_two (mod n)`
///
/// The nonce pair is taken by value and wiped when this returns, whether or
/// not signing succeeded.
///
/// # Errors
/// * `InsufficientSigners` - fewer than two keys in `key_agg`
/// * `NoncesNotExchanged` - `all_nonces` does not hold one entry per signer
/// * `InvalidKey` - `secret_key` is not a member of the signer set
/// * `InvalidNonceSet` - this signer's own effective nonce is missing from the set
#[instrument(skip_all, fields(signers = key_agg.len()))]
pub fn partial_sign(
    nonces: NoncePair,
    key_agg: &KeyAggContext,
    secret_key: &SecretKey,
    msg_hash: &[u8; 32],
    all_nonces: &[PublicNonces],
) -> Result<PartialSignature> {
    if key_agg.len() < MIN_SIGNERS {
        return Err(Error::InsufficientSigners {
            required: MIN_SIGNERS,
            actual: key_agg.len(),
        });
    }
    if all_nonces.len() != key_agg.len() {
        return Err(Error::NoncesNotExchanged(format!(
            "have public nonces from {} of {} signers",
            all_nonces.len(),
            key_agg.len()
        )));
    }

    let public_key = secret_key.public_key();
    let a = key_agg.coefficient(&public_key)?;
    let combined_key = key_agg.combined_key();

    let b = binding_coefficient(combined_key, msg_hash, all_nonces)?;
    let own_nonce = effective_nonce(&nonces.public_nonces(), &b);
    if !all_nonces
        .iter()
        .any(|other| effective_nonce(other, &b) == own_nonce)
    {
        return Err(Error::InvalidNonceSet(
            "own nonce is not part of the session nonce set".into(),
        ));
    }

    let r = session_nonce(all_nonces, &b)?;
    let e_bytes = challenge(&r, msg_hash, combined_key)?;
    let e = challenge_scalar(&e_bytes)?;

    let s = *nonces.k() + a * e * secret_key.scalar() + b * nonces.k_two();
    let s = ensure_non_zero(s, "partial signature")?;

    debug!(signer = %public_key, "Created partial signature");

    Ok(PartialSignature {
        public_key,
        signature: s,
        challenge: e_bytes,
        session_nonce: r,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate_keys, generate_nonces};
    use k256::{ProjectivePoint, Scalar};
    use rand::rngs::OsRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Signer {
        secret: SecretKey,
        nonces: NoncePair,
    }

    fn signers(n: usize) -> (Vec<Signer>, KeyAggContext, Vec<PublicNonces>) {
        let signers: Vec<Signer> = (0..n)
            .map(|_| Signer {
                secret: SecretKey::random(&mut OsRng),
                nonces: generate_nonces(&mut OsRng),
            })
            .collect();
        let keys: Vec<_> = signers.iter().map(|s| s.secret.public_key()).collect();
        let ctx = aggregate_keys(&keys).unwrap();
        let publics = signers.iter().map(|s| s.nonces.public_nonces()).collect();
        (signers, ctx, publics)
    }

    #[test]
    fn test_partial_signature_equation() {
        let (mut signers, ctx, publics) = signers(2);
        let msg = [0x11u8; 32];

        let signer = signers.remove(0);
        let public = signer.nonces.public_nonces();
        let partial =
            partial_sign(signer.nonces, &ctx, &signer.secret, &msg, &publics).unwrap();

        // s_i·G == R_i + e·a_i·X_i
        let b = binding_coefficient(ctx.combined_key(), &msg, &publics).unwrap();
        let e = challenge_scalar(&partial.challenge).unwrap();
        let a = ctx.coefficient(&partial.public_key).unwrap();
        let lhs = ProjectivePoint::GENERATOR * partial.signature;
        let rhs = effective_nonce(&public, &b) + partial.public_key.to_point() * (e * a);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_requires_full_nonce_set() {
        let (mut signers, ctx, publics) = signers(3);
        let signer = signers.remove(0);
        let result = partial_sign(
            signer.nonces,
            &ctx,
            &signer.secret,
            &[0u8; 32],
            &publics[..2],
        );
        assert!(matches!(result, Err(Error::NoncesNotExchanged(_))));
    }

    #[test]
    fn test_rejects_foreign_nonce_set() {
        let (mut signers, ctx, mut publics) = signers(2);
        let signer = signers.remove(0);
        // Replace this signer's commitment with someone else's
        publics[0] = generate_nonces(&mut OsRng).public_nonces();
        publics[1] = generate_nonces(&mut OsRng).public_nonces();

        let result = partial_sign(signer.nonces, &ctx, &signer.secret, &[0u8; 32], &publics);
        assert!(matches!(result, Err(Error::InvalidNonceSet(_))));
    }

    #[test]
    fn test_rejects_outsider() {
        let (mut signers, ctx, publics) = signers(2);
        let signer = signers.remove(0);
        let outsider = SecretKey::random(&mut OsRng);
        let result = partial_sign(signer.nonces, &ctx, &outsider, &[0u8; 32], &publics);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    /// Solves `s = k + b·k_two + a·e·x` from three signatures that share one
    /// nonce pair. The binding coefficient changes with the message, so two
    /// reuses leave one unknown too many and the third pins down `x`.
    fn recover_secret(equations: &[(Scalar, Scalar, Scalar); 3]) -> Scalar {
        // Each row: (b, c = a·e, s). Eliminate k with row differences.
        let [(b0, c0, s0), (b1, c1, s1), (b2, c2, s2)] = *equations;
        let (db1, dc1, ds1) = (b1 - b0, c1 - c0, s1 - s0);
        let (db2, dc2, ds2) = (b2 - b0, c2 - c0, s2 - s0);
        // db1·k_two + dc1·x = ds1, db2·k_two + dc2·x = ds2
        let det = db1 * dc2 - db2 * dc1;
        (db1 * ds2 - db2 * ds1) * det.invert().unwrap()
    }

    #[test]
    fn test_nonce_reuse_leaks_secret_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let victim = SecretKey::random(&mut rng);
        let peer = SecretKey::random(&mut rng);
        let ctx = aggregate_keys(&[victim.public_key(), peer.public_key()]).unwrap();
        let a = ctx.coefficient(&victim.public_key()).unwrap();

        let k = crate::arith::random_scalar(&mut rng);
        let k_two = crate::arith::random_scalar(&mut rng);
        let peer_nonces = generate_nonces(&mut rng).public_nonces();

        let mut equations = [(Scalar::ZERO, Scalar::ZERO, Scalar::ZERO); 3];
        for (i, eq) in equations.iter_mut().enumerate() {
            let msg = [i as u8 + 1; 32];
            // The same secret nonces, rebuilt for every message
            let reused = NoncePair::from_scalars(k, k_two);
            let publics = [reused.public_nonces(), peer_nonces];

            let partial = partial_sign(reused, &ctx, &victim, &msg, &publics).unwrap();
            let b = binding_coefficient(ctx.combined_key(), &msg, &publics).unwrap();
            let e = challenge_scalar(&partial.challenge).unwrap();
            *eq = (b, a * e, partial.signature);
        }

        assert_eq!(recover_secret(&equations), *victim.scalar());
    }
}
