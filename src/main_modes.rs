use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use trawl::config::AppConfig;
use trawl::domain::GameInfo;
use trawl::error::Result;
use trawl::persistence::OutcomeLog;
use trawl::strategy::{AutoClaimer, CycleReport};

use crate::main_runtime::{create_chain_client, create_signers};

async fn build_claimer(config: &AppConfig) -> Result<AutoClaimer> {
    let chain = create_chain_client(config)?;
    let mut claimer = AutoClaimer::new(chain, config.game_contract(), config.claimer_config()?)
        .with_outcome_log(Arc::new(OutcomeLog::new(&config.bot.outcome_log)));

    if let Some(path) = &config.game.info_path {
        let info = GameInfo::from_file(path)?;
        info!("Game configuration loaded from {}", path.display());
        claimer = claimer.with_game_info(info);
    }

    for signer in create_signers(config).await? {
        claimer = claimer.with_signer(signer);
    }
    Ok(claimer)
}

pub async fn run_claimer(config: &AppConfig) -> Result<()> {
    let claimer = Arc::new(build_claimer(config).await?);

    info!(
        "Tracking {} account(s), outcomes in {}",
        claimer.accounts().len(),
        config.bot.outcome_log.display()
    );

    let watcher = {
        let claimer = claimer.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested, finishing current tick");
                    claimer.stop().await;
                }
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
        })
    };

    let result = claimer.start().await;
    watcher.abort();
    result?;

    Ok(())
}

pub async fn run_once(config: &AppConfig) -> Result<()> {
    let claimer = build_claimer(config).await?;
    let reports = claimer.run_once().await;
    for report in &reports {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    let outcomes: Vec<&str> = report.outcomes.iter().map(|t| t.as_str()).collect();
    match &report.error {
        Some(e) => warn!("{}: {} ({})", report.address, outcomes.join(" -> "), e),
        None => info!("{}: {}", report.address, outcomes.join(" -> ")),
    }
}

pub async fn run_status(config: &AppConfig) -> Result<()> {
    let claimer = build_claimer(config).await?;

    for (address, snapshot) in claimer.status().await {
        match snapshot {
            Ok(s) => {
                let levels = s
                    .state
                    .as_ref()
                    .map(|st| format!("boat {} mesh {} fish {}", st.boat, st.mesh, st.seafood))
                    .unwrap_or_else(|| "not started".to_string());
                println!(
                    "[Address: {}][S : {} O : {}] {} | {}",
                    address, s.balances.sui, s.balances.token, levels, s.accrual
                );
            }
            Err(e) => println!("[Address: {}] error: {}", address, e),
        }
    }
    Ok(())
}

pub async fn run_address(config: &AppConfig) -> Result<()> {
    for signer in create_signers(config).await? {
        println!("{}", signer.address());
    }
    Ok(())
}
