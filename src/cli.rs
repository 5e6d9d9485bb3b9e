//! Local command-line tooling over the record library.

use crate::clock::SystemClock;
use crate::config::Config;
use crate::record::{CounterBucket, RecordManager};
use crate::store::create_store;
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

/// `Mindstore` - validated per-player state records.
#[derive(Parser, Debug)]
#[command(name = "mindstore")]
#[command(version = "0.1.0")]
#[command(about = "Validated per-player state records.", long_about = None)]
pub struct Cli {
    /// Path to config.toml (default: ~/.mindstore/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a player's record
    Get {
        /// Player id
        player: String,

        /// Apply the read-time staleness decay to scene confidence
        #[arg(long)]
        view: bool,
    },

    /// Replace a player's record wholesale
    Put {
        /// Player id
        player: String,

        /// Full record as a JSON object
        #[arg(long)]
        json: String,
    },

    /// Merge-patch a player's record
    Patch {
        /// Player id
        player: String,

        /// Partial record as a JSON object
        #[arg(long)]
        json: String,
    },

    /// Claim the speech lock for a speaker
    Lock {
        /// Player id
        player: String,

        /// One of NONE|GPT|VISION (legacy LLM is accepted)
        #[arg(long)]
        speaker: String,

        /// Cooldown in milliseconds; omit to clear the lock timestamp
        #[arg(long)]
        cooldown_ms: Option<f64>,
    },

    /// Bump a 60-second rate counter
    Bump {
        /// Player id
        player: String,

        /// One of chat|tactical|auto
        #[arg(long)]
        reason: String,
    },

    /// Append a dialogue line
    Say {
        /// Player id
        player: String,

        /// One of player|system
        #[arg(long)]
        role: String,

        /// Line text
        #[arg(long)]
        text: String,
    },

    /// Check whether a new vision capture is allowed
    Gate {
        /// Player id
        player: String,

        /// One of chat|tactical|auto; picks the configured cooldown
        #[arg(long, default_value = "auto")]
        reason: String,

        /// Override the cooldown in milliseconds
        #[arg(long)]
        cooldown_ms: Option<i64>,
    },

    /// Print the tolerant debug projection
    Debug {
        /// Player id
        player: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let store = create_store(&config.storage).await?;
    let manager = RecordManager::new(store, Arc::new(SystemClock));

    match cli.command {
        Commands::Get { player, view } => {
            let record = if view {
                manager.get_view(&player).await?
            } else {
                manager.get(&player).await?
            };
            print_json(&record)
        }
        Commands::Put { player, json } => {
            let candidate: Value =
                serde_json::from_str(&json).context("--json is not valid JSON")?;
            let committed = manager.replace(&player, &candidate).await?;
            print_json(&committed)
        }
        Commands::Patch { player, json } => {
            let partial: Value = serde_json::from_str(&json).context("--json is not valid JSON")?;
            let committed = manager.patch(&player, &partial).await?;
            print_json(&committed)
        }
        Commands::Lock {
            player,
            speaker,
            cooldown_ms,
        } => {
            let lock = manager
                .acquire_speech_lock(&player, &speaker, cooldown_ms)
                .await?;
            print_json(&lock)
        }
        Commands::Bump { player, reason } => {
            let count = manager.bump_counter(&player, &reason).await?;
            print_json(&json!({ "reason": reason, "count_60s": count }))
        }
        Commands::Say { player, role, text } => {
            let len = manager.append_dialogue(&player, &role, &text).await?;
            print_json(&json!({ "dialogue_len": len }))
        }
        Commands::Gate {
            player,
            reason,
            cooldown_ms,
        } => {
            let bucket: CounterBucket = reason
                .parse()
                .map_err(|_| anyhow!("invalid reason '{reason}', expected one of chat|tactical|auto"))?;
            let cooldown = cooldown_ms.unwrap_or_else(|| config.cooldowns.for_reason(bucket));
            let decision = manager.vision_gate(&player, cooldown).await?;
            print_json(&decision)
        }
        Commands::Debug { player } => {
            let snapshot = manager.debug_snapshot(&player).await?;
            print_json(&snapshot)
        }
    }
}
