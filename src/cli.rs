use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{parse_boolish, AppConfig};
use crate::error::{Result, TrawlError};

#[derive(Parser, Debug)]
#[command(name = "trawl")]
#[command(author = "Trawl Team")]
#[command(version = "0.1.0")]
#[command(about = "Auto-claim, upgrade and transfer bot for the Sui ocean fishing game", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory (default.toml, $TRAWL_ENV.toml)
    #[arg(short, long, default_value = "config", global = true)]
    pub config: PathBuf,

    /// Upgrade boat or mesh after every claim (true/false/yes/no)
    #[arg(long, global = true)]
    pub auto_upgrade: Option<String>,

    /// Forward tokens after every claim: an amount or `all`
    #[arg(long, value_name = "AMOUNT|all", global = true)]
    pub auto_transfer: Option<String>,

    /// Recipient of auto-transfers
    #[arg(long, global = true)]
    pub recipient: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// JSON array of mnemonics, one account each
    #[arg(long, global = true)]
    pub mnemonics_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Poll and claim until interrupted (default)
    Run,
    /// Run exactly one cycle per account, then exit
    Once,
    /// Show balances, levels and accrual without sending transactions
    Status,
    /// Print the address of every configured mnemonic
    Address,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Apply command-line overrides on top of file and env configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(raw) = &self.auto_upgrade {
            config.bot.auto_upgrade = parse_boolish(raw).ok_or_else(|| {
                TrawlError::Validation(format!("--auto-upgrade `{}` is not a boolean", raw))
            })?;
        }
        if let Some(amount) = &self.auto_transfer {
            config.transfer.enabled = true;
            config.transfer.amount = amount.clone();
        }
        if let Some(recipient) = &self.recipient {
            config.transfer.recipient = recipient.clone();
        }
        if let Some(interval) = self.interval_ms {
            config.bot.poll_interval_ms = interval;
        }
        if let Some(path) = &self.mnemonics_file {
            config.signer.mnemonics_file = Some(path.clone());
        }
        Ok(())
    }
}
