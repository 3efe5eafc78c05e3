// SPDX-FileCopyrightText: 2026 Rollbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rollbot - operator CLI for the dice bot's store.
//!
//! This is the binary entry point for inspecting and maintaining the data the
//! bot keeps: roll history, saved expressions, and shard bookkeeping.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod operator;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use rollbot_config::RollbotConfig;
use rollbot_core::{AutocompleteField, RollbotError, UserId};
use rollbot_history::EXPORT_FILE_NAME;

use crate::operator::Operator;

/// Rollbot - operator CLI for the dice bot's store.
#[derive(Parser, Debug)]
#[command(name = "rollbot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the usual locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and print the effective settings.
    CheckConfig,
    /// Show store health, usage totals, and guild counts per shard.
    Status,
    /// List a user's recent rolls, newest first.
    History { user: String },
    /// List a user's saved expressions.
    Saved { user: String },
    /// Show the suggestions a user would get for some typed input.
    Suggest {
        user: String,
        #[arg(default_value = "")]
        partial: String,
        /// Which input is being completed: roll, unsave, save_name or label.
        #[arg(long, default_value = "roll")]
        field: AutocompleteField,
    },
    /// Export a user's saved expressions as CSV.
    Export {
        user: String,
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace a user's saved expressions with the contents of a CSV file.
    Import { user: String, file: PathBuf },
    /// Delete a user's roll history and/or saved expressions.
    #[command(group(ArgGroup::new("what").required(true).multiple(true).args(["history", "saved"])))]
    Clear {
        user: String,
        #[arg(long)]
        history: bool,
        #[arg(long)]
        saved: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => rollbot_config::load_and_validate_path(path),
        None => rollbot_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            rollbot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.bot.log_level);
    rollbot_bot::describe_metrics();

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &RollbotConfig) -> Result<(), RollbotError> {
    if let Commands::CheckConfig = command {
        print_config(config);
        return Ok(());
    }

    let operator = Operator::open(config).await?;
    let result = run_store_command(&operator, command).await;
    operator.close().await;
    result
}

async fn run_store_command(operator: &Operator, command: Commands) -> Result<(), RollbotError> {
    match command {
        // Handled before the store is opened.
        Commands::CheckConfig => {}
        Commands::Status => {
            let status = operator.status().await?;
            println!("store: {} ({:?})", status.backend, status.health);
            println!("{}", status.report);
        }
        Commands::History { user } => {
            let rolls = operator.history(&UserId(user)).await?;
            if rolls.is_empty() {
                println!("no recent rolls");
            }
            for roll in rolls {
                println!("{roll}");
            }
        }
        Commands::Saved { user } => {
            let saved = operator.saved(&UserId(user)).await?;
            if saved.is_empty() {
                println!("no saved expressions");
            }
            for roll in saved {
                println!("{}\t{roll}", roll.id());
            }
        }
        Commands::Suggest {
            user,
            partial,
            field,
        } => {
            for choice in operator.suggest(&UserId(user), field, &partial).await? {
                println!("{}\t{}", choice.name, choice.value);
            }
        }
        Commands::Export { user, out } => {
            let data = operator.export(&UserId(user)).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &data).map_err(RollbotError::storage)?;
                    eprintln!("wrote {} ({} bytes)", path.display(), data.len());
                }
                None => print!("{}", String::from_utf8_lossy(&data)),
            }
        }
        Commands::Import { user, file } => {
            let data = std::fs::read_to_string(&file).map_err(RollbotError::storage)?;
            let total = operator.import(&UserId(user), &data).await?;
            println!("Expressions saved! Total expressions: {total}");
        }
        Commands::Clear {
            user,
            history,
            saved,
        } => {
            let (had_history, had_saved) = operator.clear(&UserId(user), history, saved).await?;
            if history {
                println!("history: {}", if had_history { "cleared" } else { "already empty" });
            }
            if saved {
                println!("saved: {}", if had_saved { "cleared" } else { "already empty" });
            }
        }
    }
    Ok(())
}

fn print_config(config: &RollbotConfig) {
    println!("configuration OK");
    println!("  bot.name              = {}", config.bot.name);
    println!("  bot.owners            = {}", config.bot.owners.len());
    println!("  gateway.min_shards    = {}", config.gateway.min_shards);
    println!("  storage.backend       = {:?}", config.storage.backend);
    println!("  storage.database_path = {}", config.storage.database_path);
    println!("  cache.capacity        = {}", config.cache.capacity);
    println!("  history.max_history   = {}", config.history.max_history);
    println!("  history.max_saved     = {}", config.history.max_expressions);
    println!("  export file name      = {EXPORT_FILE_NAME}");
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rollbot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn clear_requires_a_target() {
        assert!(Cli::try_parse_from(["rollbot", "clear", "42"]).is_err());
        let cli = Cli::try_parse_from(["rollbot", "clear", "42", "--saved"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Clear {
                history: false,
                saved: true,
                ..
            }
        ));
    }

    #[test]
    fn suggest_parses_field_names() {
        let cli = Cli::try_parse_from(["rollbot", "suggest", "42", "1d", "--field", "save_name"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Suggest {
                field: AutocompleteField::SaveName,
                ..
            }
        ));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = rollbot_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.bot.name, "rollbot");
    }
}
