use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::sui_rpc::SUI_MAINNET_URL;
use crate::error::{Result, TrawlError};
use crate::signing::validate_address;
use crate::strategy::{AutoTransfer, ClaimerConfig, GameContract, TransferAmount};

pub const DEFAULT_PACKAGE_ID: &str =
    "0x1efaf509c9b7e986ee724596f526a22b474b15c376136772c00b8452f204d2d1";
pub const DEFAULT_CLAIM_OBJECT_ID: &str =
    "0x4846a1f1030deffd9dea59016402d832588cf7e0c27b9e4c1a63d2b5e152873a";
pub const DEFAULT_COIN_TYPE: &str =
    "0xa8816d3a6e3136e86bc2873b1f94a15cadc8af2703c075f2d546c2ae367f4df9::ocean::OCEAN";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Sui fullnode JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_rpc_url() -> String {
    SUI_MAINNET_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_package_id")]
    pub package_id: String,
    #[serde(default = "default_claim_object_id")]
    pub claim_object_id: String,
    #[serde(default = "default_clock_object_id")]
    pub clock_object_id: String,
    #[serde(default = "default_coin_type")]
    pub coin_type: String,
    /// Local `gameInfo.json`; read from the claim object when unset
    #[serde(default)]
    pub info_path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            package_id: default_package_id(),
            claim_object_id: default_claim_object_id(),
            clock_object_id: default_clock_object_id(),
            coin_type: default_coin_type(),
            info_path: None,
        }
    }
}

fn default_package_id() -> String {
    DEFAULT_PACKAGE_ID.to_string()
}

fn default_claim_object_id() -> String {
    DEFAULT_CLAIM_OBJECT_ID.to_string()
}

fn default_clock_object_id() -> String {
    "0x6".to_string()
}

fn default_coin_type() -> String {
    DEFAULT_COIN_TYPE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default, deserialize_with = "deserialize_boolish")]
    pub auto_upgrade: bool,
    #[serde(default, deserialize_with = "deserialize_boolish")]
    pub upgrade_on_start: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Delay between claim, upgrade and transfer
    #[serde(default = "default_step_delay")]
    pub step_delay_ms: u64,
    #[serde(default = "default_step_delay")]
    pub error_delay_ms: u64,
    /// MIST per transaction
    #[serde(default = "default_gas_budget")]
    pub gas_budget: u64,
    #[serde(default = "default_max_concurrent_accounts")]
    pub max_concurrent_accounts: usize,
    #[serde(default = "default_outcome_log")]
    pub outcome_log: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            auto_upgrade: false,
            upgrade_on_start: false,
            poll_interval_ms: default_poll_interval(),
            step_delay_ms: default_step_delay(),
            error_delay_ms: default_step_delay(),
            gas_budget: default_gas_budget(),
            max_concurrent_accounts: default_max_concurrent_accounts(),
            outcome_log: default_outcome_log(),
        }
    }
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_step_delay() -> u64 {
    5000
}

fn default_gas_budget() -> u64 {
    10_000_000
}

fn default_max_concurrent_accounts() -> usize {
    1 // Strictly sequential
}

fn default_outcome_log() -> PathBuf {
    PathBuf::from("logs.txt")
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TransferConfig {
    #[serde(default, deserialize_with = "deserialize_boolish")]
    pub enabled: bool,
    /// Whole tokens, or `all`
    #[serde(default, deserialize_with = "deserialize_stringish")]
    pub amount: String,
    #[serde(default)]
    pub recipient: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SignerConfig {
    /// External signer program, see [`crate::signing::CommandSigner`]
    #[serde(default)]
    pub command: Option<String>,
    /// Environment variable holding a single mnemonic
    #[serde(default)]
    pub mnemonic_env: Option<String>,
    /// JSON array of mnemonics for batch runs
    #[serde(default)]
    pub mnemonics_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default, deserialize_with = "deserialize_boolish")]
    pub json: bool,
    /// Directory for the daily rotating log file
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `true/false/1/0/yes/no/y/n/on/off`, case-insensitive
pub fn parse_boolish(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" | "" => Some(false),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn deserialize_boolish<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => Ok(b),
        Scalar::Int(0) => Ok(false),
        Scalar::Int(1) => Ok(true),
        Scalar::Text(s) => parse_boolish(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("`{}` is not a boolean", s))),
        _ => Err(serde::de::Error::custom("expected a boolean")),
    }
}

fn deserialize_stringish<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    })
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("bot.poll_interval_ms", 1000)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TRAWL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TRAWL_BOT__AUTO_UPGRADE, etc.)
            .add_source(
                Environment::with_prefix("TRAWL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Built-in defaults, used when no config directory exists
    pub fn default_config() -> Self {
        Self {
            rpc: RpcConfig::default(),
            game: GameConfig::default(),
            bot: BotConfig::default(),
            transfer: TransferConfig::default(),
            signer: SignerConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                json: false,
                dir: None,
            },
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.rpc.url.trim().is_empty() {
            errors.push("rpc.url must not be empty".to_string());
        }

        for (name, id) in [
            ("game.package_id", &self.game.package_id),
            ("game.claim_object_id", &self.game.claim_object_id),
            ("game.clock_object_id", &self.game.clock_object_id),
        ] {
            if let Err(e) = validate_address(id.trim()) {
                errors.push(format!("{}: {}", name, e));
            }
        }

        if self.game.coin_type.split("::").count() != 3 {
            errors.push(format!(
                "game.coin_type `{}` must look like 0x..::module::NAME",
                self.game.coin_type
            ));
        }

        if self.bot.poll_interval_ms == 0 {
            errors.push("bot.poll_interval_ms must be positive".to_string());
        }

        if self.bot.gas_budget == 0 {
            errors.push("bot.gas_budget must be positive".to_string());
        }

        if self.bot.max_concurrent_accounts == 0 {
            errors.push("bot.max_concurrent_accounts must be at least 1".to_string());
        }

        if self.transfer.enabled {
            if let Err(e) = self.transfer.amount.parse::<TransferAmount>() {
                errors.push(format!("transfer.amount: {}", e));
            }
            let recipient = self.transfer.recipient.trim();
            let full_length = recipient.len() == 66;
            if validate_address(recipient).is_err() || !full_length {
                errors.push(format!(
                    "transfer.recipient `{}` must be a 0x-prefixed 32-byte hex address",
                    recipient
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn game_contract(&self) -> GameContract {
        GameContract {
            package_id: self.game.package_id.trim().to_string(),
            claim_object_id: self.game.claim_object_id.trim().to_string(),
            clock_object_id: self.game.clock_object_id.trim().to_string(),
            coin_type: self.game.coin_type.trim().to_string(),
        }
    }

    pub fn claimer_config(&self) -> Result<ClaimerConfig> {
        let transfer = if self.transfer.enabled {
            Some(AutoTransfer {
                amount: self.transfer.amount.parse()?,
                recipient: self.transfer.recipient.trim().to_string(),
            })
        } else {
            None
        };

        if self.bot.max_concurrent_accounts == 0 {
            return Err(TrawlError::Validation(
                "bot.max_concurrent_accounts must be at least 1".to_string(),
            ));
        }

        Ok(ClaimerConfig {
            auto_upgrade: self.bot.auto_upgrade,
            upgrade_on_start: self.bot.upgrade_on_start,
            transfer,
            poll_interval: Duration::from_millis(self.bot.poll_interval_ms),
            step_delay: Duration::from_millis(self.bot.step_delay_ms),
            error_delay: Duration::from_millis(self.bot.error_delay_ms),
            gas_budget: self.bot.gas_budget,
            max_concurrent_accounts: self.bot.max_concurrent_accounts,
        })
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RECIPIENT: &str = "0x8f1b0a6e0c7a5c2d8a9b3f4e5d6c7b8a9f0e1d2c3b4a5968778695a4b3c2d1e0";

    #[test]
    fn test_parse_boolish() {
        for yes in ["true", "TRUE", "1", "yes", "y", "on", " True "] {
            assert_eq!(parse_boolish(yes), Some(true), "{}", yes);
        }
        for no in ["false", "0", "no", "n", "off"] {
            assert_eq!(parse_boolish(no), Some(false), "{}", no);
        }
        assert_eq!(parse_boolish("maybe"), None);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.bot.poll_interval_ms, 1000);
        assert_eq!(config.game.clock_object_id, "0x6");

        let claimer = config.claimer_config().unwrap();
        assert!(claimer.transfer.is_none());
        assert_eq!(claimer.max_concurrent_accounts, 1);
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut config = AppConfig::default_config();
        config.bot.poll_interval_ms = 0;
        config.bot.max_concurrent_accounts = 0;
        config.transfer.enabled = true;
        config.transfer.amount = "-1".to_string();
        config.transfer.recipient = "0x123".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4, "{:?}", errors);
    }

    #[test]
    fn test_transfer_config_maps_to_claimer() {
        let mut config = AppConfig::default_config();
        config.transfer.enabled = true;
        config.transfer.amount = "2.5".to_string();
        config.transfer.recipient = RECIPIENT.to_string();
        assert!(config.validate().is_ok());

        let claimer = config.claimer_config().unwrap();
        let transfer = claimer.transfer.unwrap();
        assert_eq!(transfer.amount, TransferAmount::Fixed(dec!(2.5)));
        assert_eq!(transfer.recipient, RECIPIENT);
    }

    #[test]
    fn test_load_from_toml_with_boolish_values() {
        let dir = std::env::temp_dir().join(format!("trawl-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            format!(
                r#"
[bot]
auto_upgrade = "yes"
poll_interval_ms = 2500

[transfer]
enabled = "on"
amount = "all"
recipient = "{}"
"#,
                RECIPIENT
            ),
        )
        .unwrap();

        let config = AppConfig::load_from(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert!(config.bot.auto_upgrade);
        assert_eq!(config.bot.poll_interval_ms, 2500);
        assert!(config.transfer.enabled);
        assert_eq!(
            config.claimer_config().unwrap().transfer.unwrap().amount,
            TransferAmount::All
        );
        assert_eq!(config.rpc.url, SUI_MAINNET_URL);
    }
}
