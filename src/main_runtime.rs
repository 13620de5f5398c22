use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trawl::adapters::{ChainClient, SuiRpcClient};
use trawl::config::{AppConfig, LoggingConfig};
use trawl::error::{Result, TrawlError};
use trawl::signing::command_signer::MNEMONIC_ENV;
use trawl::signing::{CommandSigner, Mnemonic, TransactionSigner};

pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default_filter = if config.level.eq_ignore_ascii_case("info") {
        "info,trawl=debug".to_string()
    } else {
        config.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // TRAWL_LOG_DIR wins over [logging].dir; no directory means console only
    let log_dir = std::env::var("TRAWL_LOG_DIR")
        .ok()
        .or_else(|| config.dir.as_ref().map(|d| d.display().to_string()));

    // `tracing_appender::rolling::daily` panics if it cannot create the
    // initial file, so writability is checked first.
    let file_layer = log_dir.as_ref().and_then(|log_dir| {
        if std::fs::create_dir_all(log_dir).is_err() {
            eprintln!(
                "Warning: Could not create log directory {}, file logging disabled",
                log_dir
            );
            return None;
        }
        let test_path = std::path::Path::new(log_dir).join(".trawl_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(log_dir, "trawl.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                None
            }
        }
    });

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true));
    let console_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/trawl.log", dir);
    }
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

pub fn create_chain_client(config: &AppConfig) -> Result<Arc<dyn ChainClient>> {
    let client = SuiRpcClient::new(&config.rpc.url, config.rpc_timeout())?;
    info!("Using Sui RPC {}", client.url());
    Ok(Arc::new(client))
}

/// Mnemonics from the batch file, the configured env var, or a hidden prompt
pub fn load_mnemonics(config: &AppConfig) -> Result<Vec<Mnemonic>> {
    if let Some(path) = &config.signer.mnemonics_file {
        let list = Mnemonic::load_list(path)?;
        info!("Loaded {} mnemonic(s) from {}", list.len(), path.display());
        return Ok(list);
    }

    let var = config
        .signer
        .mnemonic_env
        .clone()
        .unwrap_or_else(|| MNEMONIC_ENV.to_string());
    match Mnemonic::from_env(&var) {
        Ok(mnemonic) => Ok(vec![mnemonic]),
        Err(_) => {
            warn!("{} is not set, asking on the terminal", var);
            Ok(vec![Mnemonic::prompt()?])
        }
    }
}

pub async fn create_signers(config: &AppConfig) -> Result<Vec<Arc<dyn TransactionSigner>>> {
    let command = config
        .signer
        .command
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            TrawlError::Validation(
                "signer.command is not configured (TRAWL_SIGNER__COMMAND)".to_string(),
            )
        })?;

    let mut signers: Vec<Arc<dyn TransactionSigner>> = Vec::new();
    for mnemonic in load_mnemonics(config)? {
        let signer = CommandSigner::connect(command, mnemonic).await?;
        signers.push(Arc::new(signer));
    }
    Ok(signers)
}
