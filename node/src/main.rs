//! Canopy Node Binary

use anyhow::Context;
use canopy_core::{NodeConfig, QueryRequest, Version};
use canopy_node::{commit_id_json, commit_info_json, query_response_json, App};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "canopy-node")]
#[command(about = "Canopy - multi-tree commit store")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "canopy.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the latest commit identifier and per-store infos
    Info,

    /// Write a key into a store and commit
    Set {
        store: String,
        key: String,
        value: String,

        /// Treat key and value as hex
        #[arg(long)]
        hex: bool,
    },

    /// Delete a key from a store and commit
    Delete {
        store: String,
        key: String,

        /// Treat key as hex
        #[arg(long)]
        hex: bool,
    },

    /// Query a path such as /main/key
    Query {
        path: String,

        /// Query payload, usually the key
        #[arg(default_value = "")]
        data: String,

        /// Version to read; 0 is latest
        #[arg(long, default_value = "0")]
        height: Version,

        /// Request an inclusion proof
        #[arg(long)]
        prove: bool,

        /// Treat data as hex
        #[arg(long)]
        hex: bool,
    },

    /// Load an older version and commit on top of it
    Rollback {
        #[arg(long)]
        version: Version,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { data_dir, force } = &cli.command {
        init_logging("info");
        return init_config(&cli.config, data_dir.clone(), *force);
    }

    let config = load_config(&cli.config)?;
    init_logging(&config.log_level);

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Info => {
            let app = App::load_latest(config)?;
            let info = app.info()?;
            print_json(&commit_info_json(&app.last_commit_id(), &info))?;
        }

        Commands::Set {
            store,
            key,
            value,
            hex,
        } => {
            let mut app = App::load_latest(config)?;
            let id = app.set(&store, &decode_arg(&key, hex)?, &decode_arg(&value, hex)?)?;
            print_json(&commit_id_json(&id))?;
        }

        Commands::Delete { store, key, hex } => {
            let mut app = App::load_latest(config)?;
            let id = app.delete(&store, &decode_arg(&key, hex)?)?;
            print_json(&commit_id_json(&id))?;
        }

        Commands::Query {
            path,
            data,
            height,
            prove,
            hex,
        } => {
            let app = App::load_latest(config)?;
            let mut req = QueryRequest::new(path, decode_arg(&data, hex)?).at_height(height);
            if prove {
                req = req.with_proof();
            }
            print_json(&query_response_json(&app.query(&req)))?;
        }

        Commands::Rollback { version } => {
            let mut app = App::load_version(config, version)?;
            info!("Rolling back to version {}", version);
            let id = app.commit()?;
            print_json(&commit_id_json(&id))?;
        }
    }

    Ok(())
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn init_config(path: &Path, data_dir: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists, use --force to overwrite", path.display());
    }

    let mut config = NodeConfig::default();
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    config.save(path)?;

    println!("Configuration saved to: {}", path.display());
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<NodeConfig> {
    if !path.exists() {
        return Ok(NodeConfig::default());
    }
    NodeConfig::load(path).with_context(|| format!("failed to read {}", path.display()))
}

fn decode_arg(arg: &str, is_hex: bool) -> anyhow::Result<Vec<u8>> {
    if is_hex {
        hex::decode(arg).with_context(|| format!("invalid hex: {}", arg))
    } else {
        Ok(arg.as_bytes().to_vec())
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
