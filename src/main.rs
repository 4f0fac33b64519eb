//! Model Manager - CLI entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use model_manager::{CONFIG_FILENAME, HfHub, HubClient, ModelRegistry, WEIGHTS_FILENAME, cache};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "model-manager")]
#[command(about = "Model/config management over a model hub", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Permanent cache directory override
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered model implementations
    Registry,

    /// Print the config of a local directory or hub repo
    Inspect {
        path_or_id: String,

        #[arg(long, default_value = CONFIG_FILENAME)]
        filename: String,
    },

    /// Download config and weights from the hub into the temp cache
    Download { repo_id: String },

    /// List repos in the permanent cache
    Cache,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .init();

    let cache_root = cli.cache_dir.unwrap_or_else(cache::cache_root);

    match cli.command {
        Command::Registry => {
            for name in ModelRegistry::with_builtins().names() {
                println!("{name}");
            }
        }
        Command::Inspect {
            path_or_id,
            filename,
        } => {
            let local = Path::new(&path_or_id).join(&filename);
            let path = if local.is_file() {
                local
            } else {
                HfHub::new().download(&path_or_id, &filename)?
            };
            print!("{}", std::fs::read_to_string(path)?);
        }
        Command::Download { repo_id } => {
            let hub = HfHub::new();
            let config_path = hub.download(&repo_id, CONFIG_FILENAME)?;
            tracing::info!(path = %config_path.display(), "fetched config");
            match hub.download(&repo_id, WEIGHTS_FILENAME) {
                Ok(path) => tracing::info!(path = %path.display(), "fetched weights"),
                Err(e) => tracing::warn!(error = %e, "no weight file fetched"),
            }
        }
        Command::Cache => {
            for repo in cache::list_cached_repos(&cache_root) {
                let size = cache::dir_size(&cache::repo_cache_dir(&cache_root, &repo));
                println!("{repo}\t{size} bytes");
            }
        }
    }

    Ok(())
}
