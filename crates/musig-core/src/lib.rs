//! # MuSig Core
//!
//! Two-round Schnorr multi-signatures over secp256k1, producing signatures a
//! smart-contract wallet checks through ERC-1271 `isValidSignature`.
//!
//! This crate provides the building blocks for:
//! - Key aggregation with rogue-key protection
//! - Two-nonce commitments bound by a per-session coefficient
//! - Partial signing and aggregation into the 65-byte wire signature
//!
//! ## Protocol Overview
//!
//! Every signer `i` contributes a key `X_i` weighted by
//! `a_i = H(L || X_i)`, where `L` hashes the sorted key list, giving the
//! combined key `X = Σ a_i·X_i`. In round one each signer publishes two nonce
//! commitments. In round two every signer derives the binding coefficient `b`,
//! the session nonce `R = Σ (K_i + b·K2_i)` and the challenge `e`, then sends
//! `s_i = k_i + a_i·e·x_i + b·k2_i`. The aggregated `s = Σ s_i` satisfies
//! `s·G = R + e·X`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use musig_core::{hash_message, MessageDomain, SessionConfig, SigningSession};
//!
//! let config = SessionConfig::new(public_keys, 0)?;
//! let mut session = SigningSession::new(&config)?;
//!
//! let mine = session.generate_nonces(&secret_key, &mut OsRng)?;
//! // ... exchange PublicNonces with every co-signer ...
//! session.exchange_nonces(all_nonces)?;
//!
//! let msg_hash = hash_message(&MessageDomain::ChainId(1), b"payload");
//! session.compute_challenge(&msg_hash)?;
//! let partial = session.partial_sign(&secret_key)?;
//! // ... collect one partial per signer ...
//! let signature = session.aggregate(&partials)?.to_bytes();
//! ```

pub mod arith;
pub mod error;
pub mod keyagg;
pub mod message;
pub mod nonce;
pub mod session;
pub mod sign;
pub mod types;

pub use error::{Error, Result};
pub use keyagg::{aggregate_keys, KeyAggContext};
pub use message::{hash_message, MessageDomain};
pub use nonce::{generate_nonces, NoncePair, PublicNonces};
pub use session::{sign_locally, SessionState, SigningSession};
pub use sign::{
    AggregatedSignature, NonceMessage, PartialSignature, PartialSignatureMessage, SIGNATURE_LEN,
};
pub use types::{KeyId, PublicKey, SecretKey, SessionConfig, SessionId};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest signer set the protocol accepts
pub const MIN_SIGNERS: usize = 2;

/// Largest key slot that fits the 7 bits of the signature's last byte
pub const MAX_KEY_SLOT: u8 = 127;
