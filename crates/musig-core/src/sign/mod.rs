//! Signing: challenge derivation, partial signatures and aggregation

mod aggregate;
pub mod challenge;
mod messages;
mod partial;

pub use aggregate::{aggregate, sum, AggregatedSignature, SIGNATURE_LEN};
pub use challenge::{
    binding_coefficient, challenge, challenge_scalar, effective_nonce, session_nonce,
};
pub use messages::*;
pub use partial::partial_sign;

use crate::PublicKey;
use k256::{ProjectivePoint, Scalar};

/// Partial signature from one signer
///
/// Carries the shared challenge and session nonce so the aggregator can check
/// that every co-signer signed the same transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSignature {
    /// Signer that produced `s_i`
    pub public_key: PublicKey,
    /// `s_i`
    pub signature: Scalar,
    /// Shared challenge `e`
    pub challenge: [u8; 32],
    /// Shared session nonce `R`
    pub session_nonce: ProjectivePoint,
}
