//! Two-nonce commitments
//!
//! Every signer draws two independent secret nonces `(k, k_two)` per signing
//! round and publishes `(k·G, k_two·G)`. The secret half is consumed by value
//! by the partial signer, so a pair can only ever produce one signature.

use crate::arith::{self, compress, COMPRESSED_POINT_LEN};
use crate::{Error, Result};
use k256::{ProjectivePoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A signer's secret nonces for exactly one signature
///
/// Deliberately not `Clone`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct NoncePair {
    k: Scalar,
    k_two: Scalar,
    #[zeroize(skip)]
    public: PublicNonces,
}

impl NoncePair {
    /// Public commitments to share with co-signers
    pub fn public_nonces(&self) -> PublicNonces {
        self.public
    }

    pub(crate) fn from_scalars(k: Scalar, k_two: Scalar) -> Self {
        let public = PublicNonces {
            k_public: ProjectivePoint::GENERATOR * k,
            k_two_public: ProjectivePoint::GENERATOR * k_two,
        };
        Self { k, k_two, public }
    }

    pub(crate) fn k(&self) -> &Scalar {
        &self.k
    }

    pub(crate) fn k_two(&self) -> &Scalar {
        &self.k_two
    }
}

impl fmt::Debug for NoncePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoncePair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// The public half of a [`NoncePair`]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicNonces {
    k_public: ProjectivePoint,
    k_two_public: ProjectivePoint,
}

impl PublicNonces {
    /// Parse both compressed commitments
    pub fn from_bytes(k_public: &[u8], k_two_public: &[u8]) -> Result<Self> {
        let parse = |bytes: &[u8]| {
            arith::parse_point(bytes)
                .map_err(|e| Error::InvalidNonceSet(format!("malformed public nonce: {e}")))
        };
        Ok(Self {
            k_public: parse(k_public)?,
            k_two_public: parse(k_two_public)?,
        })
    }

    pub fn k_public(&self) -> ProjectivePoint {
        self.k_public
    }

    pub fn k_two_public(&self) -> ProjectivePoint {
        self.k_two_public
    }

    /// Compressed `(kPublic, kTwoPublic)`
    pub fn to_bytes(&self) -> ([u8; COMPRESSED_POINT_LEN], [u8; COMPRESSED_POINT_LEN]) {
        (compress(&self.k_public), compress(&self.k_two_public))
    }
}

impl fmt::Debug for PublicNonces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (k, k_two) = self.to_bytes();
        f.debug_struct("PublicNonces")
            .field("k_public", &hex::encode(k))
            .field("k_two_public", &hex::encode(k_two))
            .finish()
    }
}

/// Draw a fresh nonce pair
///
/// Both scalars are rejection-sampled, so neither is zero or out of range.
pub fn generate_nonces<R: RngCore + CryptoRng>(rng: &mut R) -> NoncePair {
    let k = arith::random_scalar(rng);
    let k_two = arith::random_scalar(rng);
    NoncePair::from_scalars(k, k_two)
}
