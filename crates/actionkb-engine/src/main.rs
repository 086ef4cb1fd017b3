//! ActionKB operator binary
//!
//! The default store is in-process, so every command mines its source tree
//! first and then works on the fresh knowledge base.
//!
//! ```text
//! actionkb mine <dir>
//! actionkb find <dir> <query...>
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use actionkb_engine::{
    ActionFilters, KbConfig, KnowledgeBase, MatchingEngine, RepositoryMiner, ENGINE_VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "actionkb", version, about = "Semantic action knowledge base for page-object test code")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a source tree and print the mining statistics
    Mine {
        /// Root of the page-object source tree
        dir: PathBuf,
    },
    /// Mine a source tree, then look up the atomic action for a phrase
    Find {
        /// Root of the page-object source tree
        dir: PathBuf,
        /// Free-text step, e.g. `tap play`
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

impl Command {
    fn dir(&self) -> &Path {
        match self {
            Command::Mine { dir } | Command::Find { dir, .. } => dir,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting ActionKB v{}", ENGINE_VERSION);

    // Load configuration
    let config = KbConfig::load().context("loading configuration")?;
    info!("Loaded configuration: {:?}", config.matching);

    let kb = Arc::new(KnowledgeBase::in_memory(&config).await?);
    let miner = RepositoryMiner::new(Arc::clone(&kb), config.mining.clone());
    let root = cli.command.dir();
    let stats = miner
        .mine(root)
        .await
        .with_context(|| format!("mining {}", root.display()))?;

    match &cli.command {
        Command::Mine { .. } => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Find { query, .. } => {
            let engine = MatchingEngine::new(kb, config.matching.clone());
            let result = engine
                .find_atomic_action(&query.join(" "), &ActionFilters::none(), None)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_collects_query_words() {
        let cli = Cli::try_parse_from(["actionkb", "find", "src", "tap", "play"]).unwrap();
        match cli.command {
            Command::Find { dir, query } => {
                assert_eq!(dir, PathBuf::from("src"));
                assert_eq!(query, vec!["tap", "play"]);
            }
            other => panic!("expected find, got {:?}", other),
        }
    }

    #[test]
    fn test_find_requires_query() {
        assert!(Cli::try_parse_from(["actionkb", "find", "src"]).is_err());
        assert!(Cli::try_parse_from(["actionkb", "mine"]).is_err());
    }
}
