use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use ledger_client::config::loader::load_config;
use ledger_client::config::schema::ObservabilityConfig;
use ledger_client::crypto::mnemonic::validate_words;
use ledger_client::ethereum::{EthFees, EthRawTransaction};
use ledger_client::observability::logging::init_logging;
use ledger_client::{KeyAlgorithm, Mnemonic, PrivateKey, PublicKey};

#[derive(Parser)]
#[command(name = "ledger-keytool")]
#[command(about = "Key, mnemonic and raw-transaction tooling for the ledger client", long_about = None)]
struct Cli {
    /// Client configuration; only its observability section is used
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new private key
    Generate {
        #[arg(short, long, value_enum, default_value_t = Algorithm::Ed25519)]
        algorithm: Algorithm,
    },
    /// Mnemonic phrases
    Mnemonic {
        #[command(subcommand)]
        command: MnemonicCommands,
    },
    /// Show the public key for a DER-encoded private or public key
    PublicKey {
        /// Hex-encoded DER
        der: String,
    },
    /// Decode a raw Ethereum transaction and recover its signer
    DecodeEth {
        /// Hex-encoded raw transaction, with or without 0x
        raw: String,
    },
}

#[derive(Subcommand)]
enum MnemonicCommands {
    /// Generate a new phrase
    Generate {
        /// 12 or 24
        #[arg(short, long, default_value_t = 24)]
        words: usize,
    },
    /// Check a phrase's words and checksum
    Validate { phrase: Vec<String> },
    /// Derive the account key from a phrase
    Derive {
        phrase: Vec<String>,

        #[arg(short, long, default_value = "")]
        passphrase: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    Ed25519,
    Ecdsa,
}

impl From<Algorithm> for KeyAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Ed25519 => KeyAlgorithm::Ed25519,
            Algorithm::Ecdsa => KeyAlgorithm::EcdsaSecp256k1,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 1. Logging
    let mut observability = match &cli.config {
        Some(path) => load_config(path)?.observability,
        None => ObservabilityConfig {
            log_level: "warn".to_string(),
            ..ObservabilityConfig::default()
        },
    };
    if let Some(level) = cli.log_level {
        observability.log_level = level;
    }
    init_logging(&observability)?;

    // 2. Command
    let output = match cli.command {
        Commands::Generate { algorithm } => private_key_json(&PrivateKey::generate(algorithm.into())),
        Commands::Mnemonic { command } => match command {
            MnemonicCommands::Generate { words } => {
                let mnemonic = match words {
                    12 => Mnemonic::generate_12(),
                    24 => Mnemonic::generate(),
                    n => return Err(format!("--words must be 12 or 24, got {}", n).into()),
                };
                json!({ "phrase": mnemonic.to_string(), "words": mnemonic.words().len() })
            }
            MnemonicCommands::Validate { phrase } => {
                let words = split_phrase(&phrase);
                let status = validate_words(&words);
                json!({ "valid": status.is_ok(), "status": status.to_string() })
            }
            MnemonicCommands::Derive { phrase, passphrase } => {
                let mnemonic = Mnemonic::from_words(split_phrase(&phrase))?;
                private_key_json(&mnemonic.to_private_key(&passphrase)?)
            }
        },
        Commands::PublicKey { der } => public_key_json(&der.parse::<PublicKey>()?),
        Commands::DecodeEth { raw } => eth_json(&EthRawTransaction::decode_hex(&raw)?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Accept a phrase as one quoted argument or as separate words.
fn split_phrase(parts: &[String]) -> Vec<String> {
    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .map(|word| word.to_lowercase())
        .collect()
}

fn private_key_json(key: &PrivateKey) -> Value {
    json!({
        "algorithm": key.algorithm().to_string(),
        "private_key_der": hex::encode(key.to_bytes_der()),
        "public_key": public_key_json(&key.public_key()),
    })
}

fn public_key_json(key: &PublicKey) -> Value {
    json!({
        "algorithm": key.algorithm().to_string(),
        "der": hex::encode(key.to_bytes_der()),
        "raw": hex::encode(key.as_bytes()),
        "evm_address": key.to_evm_address().map(|a| a.to_string()),
    })
}

fn eth_json(tx: &EthRawTransaction) -> Result<Value, Box<dyn std::error::Error>> {
    let sender = tx.recover_sender()?;
    let fees = match tx.fees() {
        EthFees::GasPrice(_) => json!({ "gas_price": tx.gas_price().map(|p| p.to_string()) }),
        EthFees::Dynamic { .. } => json!({
            "max_priority_fee_per_gas": tx.max_priority_fee_per_gas().map(|p| p.to_string()),
            "max_fee_per_gas": tx.max_fee_per_gas().map(|p| p.to_string()),
        }),
    };

    Ok(json!({
        "type": format!("{:?}", tx.tx_type()),
        "chain_id": tx.chain_id().map(u64::from),
        "nonce": tx.nonce(),
        "fees": fees,
        "gas_limit": tx.gas_limit(),
        "to": tx.to().map(|a| a.to_string()),
        "value": tx.value().to_string(),
        "call_data": hex::encode(tx.call_data()),
        "recovery_id": tx.recovery_id(),
        "sender": {
            "address": sender.address.to_string(),
            "public_key": hex::encode(sender.public_key.as_bytes()),
        },
    }))
}
