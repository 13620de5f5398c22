use clap::Parser;
use trawl::cli::{Cli, Commands};
use trawl::config::AppConfig;

mod main_modes;
mod main_runtime;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match AppConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config.display(), e);
            std::process::exit(2);
        }
    };
    if let Err(e) = cli.apply_overrides(&mut config) {
        eprintln!("{}", e);
        std::process::exit(2);
    }
    if let Err(errors) = config.validate() {
        for error in errors {
            eprintln!("config: {}", error);
        }
        std::process::exit(2);
    }

    let result = match cli.command() {
        Commands::Run => {
            main_runtime::init_logging(&config.logging);
            main_modes::run_claimer(&config).await
        }
        Commands::Once => {
            main_runtime::init_logging(&config.logging);
            main_modes::run_once(&config).await
        }
        Commands::Status => {
            main_runtime::init_logging_simple();
            main_modes::run_status(&config).await
        }
        Commands::Address => {
            main_runtime::init_logging_simple();
            main_modes::run_address(&config).await
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
