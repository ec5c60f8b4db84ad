//! Signing session state machine
//!
//! A [`SigningSession`] owns everything a signing round needs: the key
//! aggregation output, the secret nonces of the local signer(s) and the
//! transcript accumulated so far. Steps must run in order:
//!
//! ```text
//! KeysAggregated -> NoncesExchanged -> ChallengeComputed -> PartiallySigned(n) -> Aggregated
//! ```
//!
//! Any failure after nonces were generated drops every cached nonce. The only
//! way forward is [`SigningSession::restart`], which starts a new round under a
//! fresh session id.

use crate::sign::{
    self, binding_coefficient, challenge, session_nonce, AggregatedSignature, PartialSignature,
};
use crate::{
    aggregate_keys, generate_nonces, Error, KeyAggContext, KeyId, NoncePair, PublicKey,
    PublicNonces, Result, SecretKey, SessionConfig, SessionId,
};
use rand_core::{CryptoRng, RngCore};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Where a session is in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Combined key known, collecting local nonces
    KeysAggregated,
    /// Every signer's public nonces received
    NoncesExchanged,
    /// `b`, `R` and `e` fixed for a message
    ChallengeComputed,
    /// This many local partial signatures produced
    PartiallySigned(usize),
    /// Final signature produced
    Aggregated,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::KeysAggregated => "KeysAggregated",
            SessionState::NoncesExchanged => "NoncesExchanged",
            SessionState::ChallengeComputed => "ChallengeComputed",
            SessionState::PartiallySigned(_) => "PartiallySigned",
            SessionState::Aggregated => "Aggregated",
        }
    }
}

/// Transcript fixed by `compute_challenge`
#[derive(Debug, Clone, Copy)]
struct Transcript {
    msg_hash: [u8; 32],
    challenge: [u8; 32],
}

/// One signing round for a fixed signer set
pub struct SigningSession {
    session_id: SessionId,
    key_slot: u8,
    key_agg: KeyAggContext,
    cached_nonces: HashMap<KeyId, NoncePair>,
    public_nonces: Vec<PublicNonces>,
    transcript: Option<Transcript>,
    state: SessionState,
}

impl SigningSession {
    /// Aggregate the configured keys and open a round
    #[instrument(skip_all, fields(signers = config.signers.len(), key_slot = config.key_slot))]
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let key_agg = aggregate_keys(&config.signers)?;
        let session_id: SessionId = rand::random();

        info!(
            session_id = hex::encode(session_id),
            combined_key = %key_agg.combined_key(),
            "Opened signing session"
        );

        Ok(Self {
            session_id,
            key_slot: config.key_slot,
            key_agg,
            cached_nonces: HashMap::new(),
            public_nonces: Vec::new(),
            transcript: None,
            state: SessionState::KeysAggregated,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn key_agg(&self) -> &KeyAggContext {
        &self.key_agg
    }

    pub fn combined_key(&self) -> &PublicKey {
        self.key_agg.combined_key()
    }

    /// Number of secret nonce pairs still held
    pub fn cached_nonce_count(&self) -> usize {
        self.cached_nonces.len()
    }

    /// The challenge `e`, once computed
    pub fn challenge(&self) -> Option<[u8; 32]> {
        self.transcript.map(|t| t.challenge)
    }

    /// Draw and cache a nonce pair for a local signer
    ///
    /// Returns the public half to hand to every co-signer.
    pub fn generate_nonces<R: RngCore + CryptoRng>(
        &mut self,
        secret_key: &SecretKey,
        rng: &mut R,
    ) -> Result<PublicNonces> {
        self.expect_state(SessionState::KeysAggregated)?;

        let public_key = secret_key.public_key();
        if !self.key_agg.contains(&public_key) {
            return Err(Error::InvalidKey(format!(
                "{public_key} is not part of the signer set"
            )));
        }

        let key_id = KeyId::new(&self.session_id, secret_key);
        if self.cached_nonces.contains_key(&key_id) {
            return Err(Error::InvalidNonceSet(format!(
                "nonces for {public_key} were already generated this round"
            )));
        }

        let nonces = generate_nonces(rng);
        let public = nonces.public_nonces();
        self.cached_nonces.insert(key_id, nonces);

        debug!(signer = %public_key, "Generated nonces");
        Ok(public)
    }

    /// Accept the public nonces of every signer
    ///
    /// Every locally cached pair must appear in `all_nonces`.
    pub fn exchange_nonces(&mut self, all_nonces: Vec<PublicNonces>) -> Result<()> {
        self.expect_state(SessionState::KeysAggregated)?;

        if all_nonces.len() != self.key_agg.len() {
            return Err(Error::NoncesNotExchanged(format!(
                "have public nonces from {} of {} signers",
                all_nonces.len(),
                self.key_agg.len()
            )));
        }

        let mut commitments: Vec<_> = all_nonces.iter().map(PublicNonces::to_bytes).collect();
        commitments.sort();
        if commitments.windows(2).any(|pair| pair[0] == pair[1]) {
            self.discard_nonces();
            return Err(Error::InvalidNonceSet(
                "the same nonce commitments appear twice in the exchanged set".into(),
            ));
        }

        let missing_local = self
            .cached_nonces
            .values()
            .any(|pair| !all_nonces.contains(&pair.public_nonces()));
        if missing_local {
            self.discard_nonces();
            return Err(Error::InvalidNonceSet(
                "a local nonce commitment is missing from the exchanged set".into(),
            ));
        }

        self.public_nonces = all_nonces;
        self.state = SessionState::NoncesExchanged;
        debug!(signers = self.public_nonces.len(), "Nonces exchanged");
        Ok(())
    }

    /// Fix `b`, `R` and `e` for a message hash
    pub fn compute_challenge(&mut self, msg_hash: &[u8; 32]) -> Result<[u8; 32]> {
        if self.state == SessionState::KeysAggregated {
            return Err(Error::NoncesNotExchanged(
                "challenge requested before the nonce exchange".into(),
            ));
        }
        self.expect_state(SessionState::NoncesExchanged)?;

        let combined_key = *self.key_agg.combined_key();
        let e = match binding_coefficient(&combined_key, msg_hash, &self.public_nonces)
            .and_then(|b| session_nonce(&self.public_nonces, &b))
            .and_then(|r| challenge(&r, msg_hash, &combined_key))
        {
            Ok(e) => e,
            Err(e) => return self.abort(e),
        };

        self.transcript = Some(Transcript {
            msg_hash: *msg_hash,
            challenge: e,
        });
        self.state = SessionState::ChallengeComputed;
        debug!(e = hex::encode(e), "Challenge computed");
        Ok(e)
    }

    /// Produce the partial signature of a local signer
    ///
    /// The signer's cached nonces are removed before signing, so a second
    /// call for the same key fails with `NoncesNotExchanged`.
    pub fn partial_sign(&mut self, secret_key: &SecretKey) -> Result<PartialSignature> {
        let signed = match self.state {
            SessionState::ChallengeComputed => 0,
            SessionState::PartiallySigned(n) => n,
            SessionState::KeysAggregated => {
                return Err(Error::NoncesNotExchanged(
                    "signing requested before the nonce exchange".into(),
                ))
            }
            other => {
                return self.abort(Error::InvalidState {
                    expected: SessionState::ChallengeComputed.name(),
                    actual: other.name(),
                })
            }
        };
        let Some(transcript) = self.transcript else {
            return self.abort(Error::InvalidState {
                expected: SessionState::ChallengeComputed.name(),
                actual: self.state.name(),
            });
        };

        let key_id = KeyId::new(&self.session_id, secret_key);
        let Some(nonces) = self.cached_nonces.remove(&key_id) else {
            return self.abort(Error::NoncesNotExchanged(format!(
                "no cached nonces for {}",
                secret_key.public_key()
            )));
        };

        let partial = match sign::partial_sign(
            nonces,
            &self.key_agg,
            secret_key,
            &transcript.msg_hash,
            &self.public_nonces,
        ) {
            Ok(partial) => partial,
            Err(e) => return self.abort(e),
        };
        if partial.challenge != transcript.challenge {
            return self.abort(Error::InvalidNonceSet(
                "partial signature does not match the session challenge".into(),
            ));
        }

        self.state = SessionState::PartiallySigned(signed + 1);
        debug!(signer = %partial.public_key, signed = signed + 1, "Partial signature stored");
        Ok(partial)
    }

    /// Combine one partial signature per signer into the final signature
    pub fn aggregate(&mut self, partials: &[PartialSignature]) -> Result<AggregatedSignature> {
        let SessionState::PartiallySigned(_) = self.state else {
            return self.abort(Error::InvalidState {
                expected: "PartiallySigned",
                actual: self.state.name(),
            });
        };

        if partials.len() != self.key_agg.len() {
            return self.abort(Error::InsufficientSigners {
                required: self.key_agg.len(),
                actual: partials.len(),
            });
        }

        let mut signers: Vec<PublicKey> = partials.iter().map(|p| p.public_key).collect();
        signers.sort();
        if signers.as_slice() != self.key_agg.keys() {
            return self.abort(Error::InvalidKey(
                "partial signatures do not cover the signer set exactly once".into(),
            ));
        }

        let expected = self.challenge();
        if partials.iter().any(|p| Some(p.challenge) != expected) {
            return self.abort(Error::InvalidNonceSet(
                "partial signature made over a different challenge".into(),
            ));
        }

        let signature =
            match sign::aggregate(partials, self.key_agg.combined_key(), self.key_slot) {
                Ok(signature) => signature,
                Err(e) => return self.abort(e),
            };
        self.state = SessionState::Aggregated;
        Ok(signature)
    }

    /// Drop all round data and start over under a new session id
    pub fn restart(&mut self) {
        self.discard_nonces();
        self.public_nonces.clear();
        self.transcript = None;
        self.session_id = rand::random();
        self.state = SessionState::KeysAggregated;

        info!(session_id = hex::encode(self.session_id), "Restarted signing session");
    }

    fn discard_nonces(&mut self) {
        if !self.cached_nonces.is_empty() {
            warn!(
                count = self.cached_nonces.len(),
                "Discarding cached nonces"
            );
        }
        self.cached_nonces.clear();
    }

    /// Fail the current step; past the nonce exchange this also drops every
    /// cached nonce, since a failed round is never resumed
    fn abort<T>(&mut self, err: Error) -> Result<T> {
        if self.state != SessionState::KeysAggregated {
            self.discard_nonces();
        }
        debug!(state = self.state.name(), error = %err, "Session step failed");
        Err(err)
    }

    fn expect_state(&mut self, expected: SessionState) -> Result<()> {
        if self.state != expected {
            return self.abort(Error::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            });
        }
        Ok(())
    }
}

/// Run every step for a set of locally held keys
///
/// Useful when all signers live in one process, e.g. tests and tooling. In a
/// distributed deployment each party runs its own session and exchanges
/// [`crate::NonceMessage`] / [`crate::PartialSignatureMessage`] payloads.
#[instrument(skip_all, fields(signers = secret_keys.len(), key_slot = key_slot))]
pub fn sign_locally<R: RngCore + CryptoRng>(
    secret_keys: &[SecretKey],
    msg_hash: &[u8; 32],
    key_slot: u8,
    rng: &mut R,
) -> Result<AggregatedSignature> {
    let signers = secret_keys.iter().map(SecretKey::public_key).collect();
    let config = SessionConfig::new(signers, key_slot)?;
    let mut session = SigningSession::new(&config)?;

    let all_nonces = secret_keys
        .iter()
        .map(|sk| session.generate_nonces(sk, rng))
        .collect::<Result<Vec<_>>>()?;
    session.exchange_nonces(all_nonces)?;
    session.compute_challenge(msg_hash)?;

    let partials = secret_keys
        .iter()
        .map(|sk| session.partial_sign(sk))
        .collect::<Result<Vec<_>>>()?;
    session.aggregate(&partials)
}
