use std::ops::ControlFlow;

use clap::{Parser, Subcommand};
use hashimoto::config::Settings;
use hashimoto::error::DagError;
use hashimoto::full::Full;
use hashimoto::hash::H256;
use hashimoto::hashimoto::PowOutput;
use hashimoto::light::Light;
use hashimoto::search::search;
use hashimoto::seed::seed_hash;
use hashimoto::{params, store};
use rand::{rngs::ThreadRng, RngCore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the epoch seed for a block number
    Seed {
        /// Block number
        #[arg(long)]
        block: u64,
    },

    /// Generate (or validate and reuse) the dataset file for a block's epoch
    Generate {
        /// Block number
        #[arg(long)]
        block: u64,

        #[command(flatten)]
        settings: Settings,
    },

    /// Compute the PoW digests for a header hash and nonce
    Compute {
        /// Block number
        #[arg(long)]
        block: u64,

        /// Hex-encoded 32-byte header hash (random if omitted)
        #[arg(long)]
        header: Option<String>,

        /// Nonce to bind into the mix
        #[arg(long, default_value_t = 0)]
        nonce: u64,

        /// Use the full on-disk dataset instead of the light cache
        #[arg(long)]
        full: bool,

        /// Print the digests as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        settings: Settings,
    },

    /// Search for a nonce whose result meets a difficulty target
    Search {
        /// Block number
        #[arg(long)]
        block: u64,

        /// Hex-encoded 32-byte header hash (random if omitted)
        #[arg(long)]
        header: Option<String>,

        /// Required number of leading zero bits in the result digest
        #[arg(long, default_value_t = 16)]
        difficulty_bits: u32,

        /// Use the full on-disk dataset instead of the light cache
        #[arg(long)]
        full: bool,

        /// Print the digests as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        settings: Settings,
    },
}

fn parse_header(hex_str: &str) -> H256 {
    let decoded = hex::decode(hex_str).expect("invalid hex string for --header");
    decoded
        .as_slice()
        .try_into()
        .expect("--header must be exactly 32 bytes (64 hex chars)")
}

fn random_header() -> H256 {
    let mut bytes = [0u8; 32];
    let mut rng = ThreadRng::default();
    rng.fill_bytes(&mut bytes);
    bytes
}

fn resolve_header(header: Option<String>) -> H256 {
    let header = match header {
        Some(hex_str) => parse_header(&hex_str),
        None => random_header(),
    };
    eprintln!("header hash: {}", hex::encode(header));
    header
}

fn report_progress(percent: u32) -> ControlFlow<()> {
    info!(percent, "dataset generation");
    ControlFlow::Continue(())
}

fn print_output(output: &PowOutput, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(output).unwrap());
    } else {
        println!("{output}");
    }
}

fn main() -> Result<(), DagError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed { block } => {
            println!("{}", hex::encode(seed_hash(block)));
        }

        Commands::Generate { block, settings } => {
            let light = Light::new(block)?;
            let full = Full::new(&light, &settings, &report_progress)?;
            let dir = store::resolve_dir(settings.dag_dir.as_deref())?;
            info!(
                epoch = block / params::EPOCH_LENGTH,
                bytes = full.dataset_size(),
                path = %store::dag_path(&dir, &seed_hash(block)).display(),
                "dataset ready"
            );
        }

        Commands::Compute {
            block,
            header,
            nonce,
            full,
            json,
            settings,
        } => {
            let header = resolve_header(header);
            let light = Light::new(block)?;
            let output = if full {
                Full::new(&light, &settings, &report_progress)?.compute(&header, nonce)
            } else {
                light.compute(&header, nonce)
            };
            print_output(&output, json);
        }

        Commands::Search {
            block,
            header,
            difficulty_bits,
            full,
            json,
            settings,
        } => {
            let header = resolve_header(header);
            let light = Light::new(block)?;
            let found = if full {
                let full = Full::new(&light, &settings, &report_progress)?;
                search(&full, &header, difficulty_bits, settings.effective_jobs())
            } else {
                search(&light, &header, difficulty_bits, settings.effective_jobs())
            };

            let found = found.expect("nonce space exhausted without a solution");
            println!("nonce:    {}", found.nonce);
            print_output(&found.output, json);
        }
    }

    Ok(())
}
