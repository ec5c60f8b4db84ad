//! MuSig Party CLI
//!
//! Command-line interface for local MuSig operations:
//! - Key generation
//! - Key aggregation
//! - Message hashing
//! - In-process signing with every secret held locally

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use musig_core::{aggregate_keys, hash_message, sign_locally, MessageDomain, PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::{info, Level};

/// MuSig Party - Schnorr multi-signature tooling
#[derive(Parser)]
#[command(name = "musig-party")]
#[command(about = "Two-round Schnorr multi-signatures for ERC-1271 wallets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh key pair (nothing is written to disk)
    Keygen,

    /// Combine public keys into the wallet key
    Aggregate {
        /// Compressed public keys (comma-separated hex)
        #[arg(short, long)]
        keys: String,
    },

    /// Hash a message the way the wallet does
    Hash {
        /// Message text
        #[arg(short, long)]
        message: String,

        #[command(flatten)]
        domain: DomainArgs,
    },

    /// Run a full signing round with locally held secrets
    Sign {
        /// Secret keys of every signer (comma-separated hex)
        #[arg(short, long)]
        secrets: String,

        /// Message text
        #[arg(short, long)]
        message: String,

        #[command(flatten)]
        domain: DomainArgs,

        /// Slot of the combined key in the wallet
        #[arg(long, env = "MUSIG_SLOT", default_value_t = 0)]
        slot: u8,
    },
}

/// `--address` takes precedence over a chain id, including one from the env
#[derive(Args)]
#[group(required = true)]
struct DomainArgs {
    /// Address of the verifying wallet (hex, 20 bytes)
    #[arg(long)]
    address: Option<String>,

    /// Chain id salt
    #[arg(long, env = "MUSIG_CHAIN_ID")]
    chain_id: Option<u64>,
}

impl DomainArgs {
    fn domain(&self) -> Result<MessageDomain> {
        match (&self.address, self.chain_id) {
            (Some(address), _) => {
                let bytes = hex::decode(address.trim_start_matches("0x"))
                    .context("address is not hex")?;
                let address: [u8; 20] = bytes
                    .try_into()
                    .map_err(|_| anyhow::anyhow!("Address must be 20 bytes"))?;
                Ok(MessageDomain::Address(address))
            }
            (None, Some(chain_id)) => Ok(MessageDomain::ChainId(chain_id)),
            (None, None) => bail!("either --address or --chain-id is required"),
        }
    }
}

#[derive(Serialize)]
struct AggregateSummary {
    combined_key: PublicKey,
    list_digest: String,
    coefficients: Vec<(PublicKey, String)>,
}

#[derive(Serialize)]
struct SignSummary {
    combined_key: PublicKey,
    msg_hash: String,
    challenge: String,
    signature: String,
    key_slot: u8,
    parity: u8,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen => run_keygen(),
        Commands::Aggregate { ref keys } => run_aggregate(keys),
        Commands::Hash {
            ref message,
            ref domain,
        } => run_hash(message, domain),
        Commands::Sign {
            ref secrets,
            ref message,
            ref domain,
            slot,
        } => run_sign(secrets, message, domain, slot),
    }
}

fn run_keygen() -> Result<()> {
    let secret_key = SecretKey::random(&mut OsRng);

    println!("Secret Key: {}", hex::encode(secret_key.to_bytes()));
    println!("Public Key: {}", secret_key.public_key());

    Ok(())
}

fn run_aggregate(keys_str: &str) -> Result<()> {
    let keys = parse_list(keys_str, PublicKey::from_hex)?;
    let ctx = aggregate_keys(&keys)?;

    info!(
        signers = ctx.len(),
        combined_key = %ctx.combined_key(),
        "Keys aggregated"
    );

    let coefficients = ctx
        .keys()
        .iter()
        .map(|key| Ok((*key, hex::encode(ctx.coefficient(key)?.to_bytes()))))
        .collect::<Result<Vec<_>>>()?;

    let summary = AggregateSummary {
        combined_key: *ctx.combined_key(),
        list_digest: hex::encode(ctx.list_digest()),
        coefficients,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn run_hash(message: &str, domain: &DomainArgs) -> Result<()> {
    let msg_hash = hash_message(&domain.domain()?, message.as_bytes());
    println!("{}", hex::encode(msg_hash));
    Ok(())
}

fn run_sign(secrets_str: &str, message: &str, domain: &DomainArgs, slot: u8) -> Result<()> {
    let secrets = parse_list(secrets_str, |s| {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| musig_core::Error::InvalidKey(e.to_string()))?;
        SecretKey::from_bytes(&bytes)
    })?;
    let msg_hash = hash_message(&domain.domain()?, message.as_bytes());

    info!(
        signers = secrets.len(),
        slot,
        msg_hash = hex::encode(msg_hash),
        "Starting local signing round"
    );

    let signature = sign_locally(&secrets, &msg_hash, slot, &mut OsRng)?;
    let combined_key = aggregate_keys(
        &secrets.iter().map(SecretKey::public_key).collect::<Vec<_>>(),
    )?;

    println!("Signature: 0x{}", hex::encode(signature.to_bytes()));

    let summary = SignSummary {
        combined_key: *combined_key.combined_key(),
        msg_hash: hex::encode(msg_hash),
        challenge: hex::encode(signature.challenge),
        signature: hex::encode(signature.signature),
        key_slot: signature.key_slot,
        parity: signature.parity,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Split a comma-separated list and parse every entry
fn parse_list<T>(
    list: &str,
    parse: impl Fn(&str) -> musig_core::Result<T>,
) -> Result<Vec<T>> {
    let items = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse(s).with_context(|| format!("invalid entry {s}")))
        .collect::<Result<Vec<_>>>()?;

    if items.is_empty() {
        bail!("empty list");
    }
    Ok(items)
}
