use crate::{AppConfig, config::expand_home_in_path};

use anyhow::Result;
use clap::{Parser, Subcommand};
use confique::Config;
use ezballot_core::{ElectionContract, FUNCTIONS, MemoryLedger, SnapshotLock};
use std::{path::PathBuf, sync::Arc};
use tracing::info;

// Re-export PartialAppConfig for public usage
pub use crate::config::confique_app_config_layer::AppConfigLayer as PartialAppConfig;


#[derive(Parser)]
#[command(name = "ezballot")]
#[command(about = "Election records on a key-value ledger")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "$HOME/.ezballot/config.toml")]
    config_path: PathBuf,

    /// Configuration object
    #[command(flatten)]
    config: PartialAppConfig,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Internal helper struct that holds the resolved configuration
pub struct ResolvedCli {
    command: Commands,
    config: AppConfig,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a contract function against the ledger snapshot
    Invoke {
        /// Function name, e.g. createVote
        function: String,

        /// Positional arguments passed to the function
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List the functions that can be invoked
    Functions,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let log_level = if self.verbose { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(format!(
                "ezballot={},ezballot_core={},warn",
                log_level, log_level
            ))
            .init();

        let resolved_cli = self.resolve_config()?;
        resolved_cli.handle_command().await
    }

    /// Load the configuration and resolve all $HOME placeholders
    fn resolve_config(self) -> Result<ResolvedCli> {
        let config_path = expand_home_in_path(&self.config_path)?;

        let config = AppConfig::builder()
            .preloaded(self.config)
            .env()
            .file(&config_path)
            .load()?
            .with_resolved_paths()?;

        Ok(ResolvedCli {
            command: self.command,
            config,
        })
    }
}

impl ResolvedCli {
    async fn handle_command(&self) -> Result<()> {
        match &self.command {
            Commands::Invoke { function, args } => {
                let output = self.invoke(function, args).await?;
                println!("{}", output);
            }
            Commands::Functions => {
                for function in FUNCTIONS {
                    println!("{}", function);
                }
            }
        }
        Ok(())
    }

    /// Run one invocation as a unit of work: load the snapshot, dispatch, and
    /// persist the ledger only if the call succeeded. The snapshot lock is
    /// held across all three steps.
    async fn invoke(&self, function: &str, args: &[String]) -> Result<String> {
        let ledger_path = &self.config.ledger.ledger_path;
        let _lock = SnapshotLock::acquire(ledger_path).await?;
        let ledger = Arc::new(MemoryLedger::load(ledger_path)?);
        let contract = ElectionContract::with_layout(ledger.clone(), self.config.key_layout());

        let output = contract.invoke(function, args).await?;
        ledger.save(ledger_path).await?;
        info!("Invoked {} against {}", function, ledger_path.display());

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
