//! Scalar and point helpers over secp256k1
//!
//! Everything above this module talks to the curve through these functions:
//! point parsing and compression, identity-rejecting point sums, range-checked
//! scalar decoding and Keccak-256 based hashing.

use crate::{Error, Result};
use digest::Digest;
use elliptic_curve::{
    bigint::U256,
    group::GroupEncoding,
    ops::Reduce,
    sec1::{FromEncodedPoint, ToEncodedPoint},
    PrimeField,
};
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use sha3::Keccak256;
use zeroize::Zeroize;

/// Length of a compressed SEC1 point
pub const COMPRESSED_POINT_LEN: usize = 33;

/// Length of a serialized scalar
pub const SCALAR_LEN: usize = 32;

/// Keccak-256 over a single buffer
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Keccak256::digest(data.as_ref()).into()
}

/// Keccak-256 over the concatenation of `parts`
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    parts
        .iter()
        .fold(Keccak256::new(), |hasher, part| hasher.chain_update(part))
        .finalize()
        .into()
}

/// Hash `parts` and reduce the digest modulo the group order
pub fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    let digest = keccak256_concat(parts);
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(digest))
}

/// Decode a canonical, non-zero scalar
pub fn scalar_from_bytes(bytes: &[u8; SCALAR_LEN]) -> Result<Scalar> {
    let scalar: Option<Scalar> = Scalar::from_repr(FieldBytes::from(*bytes)).into();
    match scalar {
        Some(s) if !bool::from(s.is_zero()) => Ok(s),
        Some(_) => Err(Error::ScalarOutOfRange("scalar is zero".into())),
        None => Err(Error::ScalarOutOfRange(
            "scalar is not below the group order".into(),
        )),
    }
}

/// Fail on a zero scalar, which every hash-derived coefficient must avoid
pub fn ensure_non_zero(scalar: Scalar, what: &str) -> Result<Scalar> {
    if bool::from(scalar.is_zero()) {
        return Err(Error::ScalarOutOfRange(format!("{what} is zero")));
    }
    Ok(scalar)
}

/// Sample a uniformly random non-zero scalar by rejection
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; SCALAR_LEN];
    loop {
        rng.fill_bytes(&mut bytes);
        if let Ok(scalar) = scalar_from_bytes(&bytes) {
            bytes.zeroize();
            return scalar;
        }
    }
}

/// Parse a compressed SEC1 point, rejecting the identity and off-curve input
pub fn parse_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    if bytes.len() != COMPRESSED_POINT_LEN {
        return Err(Error::InvalidKey(format!(
            "expected {COMPRESSED_POINT_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let encoded =
        EncodedPoint::from_bytes(bytes).map_err(|e| Error::InvalidKey(e.to_string()))?;
    if !encoded.is_compressed() {
        return Err(Error::InvalidKey("point is not compressed".into()));
    }

    let affine_opt = AffinePoint::from_encoded_point(&encoded);
    let affine: AffinePoint = Option::<AffinePoint>::from(affine_opt)
        .ok_or_else(|| Error::InvalidKey("point is not on secp256k1".into()))?;

    let point = ProjectivePoint::from(affine);
    if point == ProjectivePoint::IDENTITY {
        return Err(Error::InvalidKey("point at infinity".into()));
    }
    Ok(point)
}

/// Compressed SEC1 encoding of a point
///
/// The identity encodes as 33 zero bytes; callers only pass points that came
/// out of [`combine_points`] or [`parse_point`].
pub fn compress(point: &ProjectivePoint) -> [u8; COMPRESSED_POINT_LEN] {
    let repr = point.to_affine().to_bytes();
    let mut out = [0u8; COMPRESSED_POINT_LEN];
    out.copy_from_slice(&repr);
    out
}

/// Sum points, returning `None` when the result is the point at infinity
pub fn combine_points<I>(points: I) -> Option<ProjectivePoint>
where
    I: IntoIterator<Item = ProjectivePoint>,
{
    let sum = points
        .into_iter()
        .fold(ProjectivePoint::IDENTITY, |acc, point| acc + point);
    (sum != ProjectivePoint::IDENTITY).then_some(sum)
}

/// Ethereum address of a point: last 20 bytes of `keccak(x || y)`
pub fn eth_address(point: &ProjectivePoint) -> Option<[u8; 20]> {
    let encoded = point.to_affine().to_encoded_point(false);
    // 0x04 || x || y
    let body = encoded.as_bytes().get(1..)?;
    if body.len() != 2 * SCALAR_LEN {
        return None;
    }

    let digest = keccak256(body);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak_concat_matches_single_buffer() {
        let joined = keccak256(b"hello world");
        let parts =
            keccak256_concat(&[b"hello".as_slice(), b" ".as_slice(), b"world".as_slice()]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_scalar_range_checks() {
        assert!(matches!(
            scalar_from_bytes(&[0u8; 32]),
            Err(Error::ScalarOutOfRange(_))
        ));
        assert!(matches!(
            scalar_from_bytes(&[0xff; 32]),
            Err(Error::ScalarOutOfRange(_))
        ));

        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(scalar_from_bytes(&one).unwrap(), Scalar::ONE);
    }

    #[test]
    fn test_parse_point_rejects_garbage() {
        let generator = compress(&ProjectivePoint::GENERATOR);
        assert_eq!(parse_point(&generator).unwrap(), ProjectivePoint::GENERATOR);

        assert!(matches!(parse_point(&[0u8; 33]), Err(Error::InvalidKey(_))));
        assert!(matches!(parse_point(&generator[..32]), Err(Error::InvalidKey(_))));

        let uncompressed = ProjectivePoint::GENERATOR
            .to_affine()
            .to_encoded_point(false);
        assert!(matches!(
            parse_point(uncompressed.as_bytes()),
            Err(Error::InvalidKey(_))
        ));

        // x = 5 is not on the curve
        let mut off_curve = [0u8; 33];
        off_curve[0] = 0x02;
        off_curve[32] = 5;
        assert!(matches!(parse_point(&off_curve), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_combine_points_rejects_identity() {
        let p = ProjectivePoint::GENERATOR * random_scalar(&mut OsRng);
        assert!(combine_points([p, -p]).is_none());
        assert_eq!(combine_points([p, p]), Some(p + p));
    }

    #[test]
    fn test_generator_address() {
        // Address of the key 0x...01
        assert_eq!(
            hex::encode(eth_address(&ProjectivePoint::GENERATOR).unwrap()),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert!(eth_address(&ProjectivePoint::IDENTITY).is_none());
    }
}
