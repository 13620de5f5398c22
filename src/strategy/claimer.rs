//! Auto-claimer for the ocean fishing game
//!
//! Polls every tracked account, claims when the accrual cycle is complete,
//! then optionally upgrades one track and forwards tokens to a fixed
//! recipient. A failure in one account never stops the loop or the other
//! accounts.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::calculations::{compute_accrual, Accrual};
use super::coin_selector::select_coins;
use super::executor::{TransactionExecutor, TxOutcome};
use crate::adapters::chain::{ChainClient, SUI_COIN_TYPE};
use crate::domain::numeric::{from_base_units, to_base_units};
use crate::domain::{
    AccountState, CycleState, GameInfo, TransactionBuilder, UpgradePlan,
};
use crate::error::{Result, TrawlError};
use crate::persistence::{OutcomeLog, OutcomeRecord, OutcomeTag};
use crate::signing::TransactionSigner;

/// Move module holding every game entry point
pub const GAME_MODULE: &str = "game";
const CLAIM_FUNCTION: &str = "claim";

/// On-chain addresses of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameContract {
    pub package_id: String,
    /// Shared object holding game configuration and per-account state
    pub claim_object_id: String,
    pub clock_object_id: String,
    /// Token paid for upgrades and moved by auto-transfer
    pub coin_type: String,
}

impl GameContract {
    fn target(&self, function: &str) -> String {
        format!("{}::{}::{}", self.package_id, GAME_MODULE, function)
    }
}

/// How much to forward after a successful claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAmount {
    /// Whole tokens
    Fixed(Decimal),
    /// The full token balance
    All,
}

impl TransferAmount {
    /// Raw units to send given the current raw balance; `None` if there is
    /// nothing to send.
    pub fn resolve(&self, balance: u128) -> Option<u64> {
        match self {
            TransferAmount::Fixed(amount) => to_base_units(*amount).filter(|a| *a > 0),
            TransferAmount::All => {
                let all = u64::try_from(balance).unwrap_or(u64::MAX);
                Some(all).filter(|a| *a > 0)
            }
        }
    }
}

impl FromStr for TransferAmount {
    type Err = TrawlError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") {
            return Ok(TransferAmount::All);
        }
        let amount = Decimal::from_str(raw).map_err(|e| {
            TrawlError::Validation(format!("transfer amount `{}` is not a number: {}", raw, e))
        })?;
        if amount <= Decimal::ZERO {
            return Err(TrawlError::Validation(format!(
                "transfer amount must be positive, got {}",
                amount
            )));
        }
        Ok(TransferAmount::Fixed(amount))
    }
}

impl fmt::Display for TransferAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferAmount::Fixed(amount) => write!(f, "{}", amount),
            TransferAmount::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTransfer {
    pub amount: TransferAmount,
    pub recipient: String,
}

/// Auto-claimer configuration
#[derive(Debug, Clone)]
pub struct ClaimerConfig {
    /// Upgrade one track after every successful claim
    pub auto_upgrade: bool,
    /// Try one upgrade per account before the first poll
    pub upgrade_on_start: bool,
    pub transfer: Option<AutoTransfer>,
    /// Delay between poll ticks
    pub poll_interval: Duration,
    /// Pause between claim, upgrade and transfer
    pub step_delay: Duration,
    /// Back-off after a tick with errors
    pub error_delay: Duration,
    /// Gas budget per transaction, MIST
    pub gas_budget: u64,
    /// 1 = strictly sequential
    pub max_concurrent_accounts: usize,
}

impl Default for ClaimerConfig {
    fn default() -> Self {
        Self {
            auto_upgrade: false,
            upgrade_on_start: false,
            transfer: None,
            poll_interval: Duration::from_millis(1_000),
            step_delay: Duration::from_millis(5_000),
            error_delay: Duration::from_millis(5_000),
            gas_budget: 10_000_000,
            max_concurrent_accounts: 1,
        }
    }
}

/// Balances in whole tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    pub sui: Decimal,
    pub token: Decimal,
}

/// Read-only view of one account
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub address: String,
    pub balances: Balances,
    /// `None` until the account first interacts with the game
    pub state: Option<AccountState>,
    pub accrual: Accrual,
}

/// What one cycle did for one account
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub address: String,
    pub snapshot: Option<AccountSnapshot>,
    pub outcomes: Vec<OutcomeTag>,
    pub final_state: CycleState,
    pub error: Option<String>,
}

impl CycleReport {
    fn new(address: &str) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            address: address.to_string(),
            snapshot: None,
            outcomes: Vec::new(),
            final_state: CycleState::Polling,
            error: None,
        }
    }

    pub fn claimed(&self) -> bool {
        self.outcomes.contains(&OutcomeTag::ClaimSucceeded)
    }
}

/// One signer plus its position in the claim state machine
pub struct TrackedAccount {
    executor: TransactionExecutor,
    state: RwLock<CycleState>,
}

impl TrackedAccount {
    pub fn new(chain: Arc<dyn ChainClient>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            executor: TransactionExecutor::new(chain, signer),
            state: RwLock::new(CycleState::Polling),
        }
    }

    pub fn address(&self) -> &str {
        self.executor.address()
    }

    pub async fn state(&self) -> CycleState {
        *self.state.read().await
    }

    async fn transition(&self, next: CycleState) {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            warn!(
                "{}: unexpected transition {} -> {} (valid: {:?})",
                self.address(),
                *state,
                next,
                state.valid_transitions()
            );
        } else if *state != next {
            debug!("{}: {} -> {}", self.address(), *state, next);
        }
        *state = next;
    }
}

/// Auto-claimer for one or more accounts
pub struct AutoClaimer {
    chain: Arc<dyn ChainClient>,
    contract: GameContract,
    config: ClaimerConfig,
    accounts: Vec<TrackedAccount>,
    game_info: RwLock<Option<Arc<GameInfo>>>,
    outcome_log: Option<Arc<OutcomeLog>>,
    running: Arc<RwLock<bool>>,
}

impl AutoClaimer {
    pub fn new(chain: Arc<dyn ChainClient>, contract: GameContract, config: ClaimerConfig) -> Self {
        Self {
            chain,
            contract,
            config,
            accounts: Vec::new(),
            game_info: RwLock::new(None),
            outcome_log: None,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Track another account
    pub fn with_signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.accounts
            .push(TrackedAccount::new(self.chain.clone(), signer));
        self
    }

    /// Use a preloaded game configuration instead of reading it from chain
    pub fn with_game_info(self, info: GameInfo) -> Self {
        Self {
            game_info: RwLock::new(Some(Arc::new(info))),
            ..self
        }
    }

    pub fn with_outcome_log(mut self, log: Arc<OutcomeLog>) -> Self {
        self.outcome_log = Some(log);
        self
    }

    pub fn accounts(&self) -> &[TrackedAccount] {
        &self.accounts
    }

    pub fn config(&self) -> &ClaimerConfig {
        &self.config
    }

    /// Run until [`stop`](Self::stop) is called
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.write().await;
        if *running {
            info!("AutoClaimer already running");
            return Ok(());
        }
        *running = true;
        drop(running);

        info!(
            "Starting AutoClaimer ({} account(s), poll: {}ms, auto_upgrade: {}, transfer: {})",
            self.accounts.len(),
            self.config.poll_interval.as_millis(),
            self.config.auto_upgrade,
            self.config
                .transfer
                .as_ref()
                .map(|t| format!("{} -> {}", t.amount, t.recipient))
                .unwrap_or_else(|| "off".to_string())
        );

        if self.config.upgrade_on_start {
            self.upgrade_all().await;
        }

        loop {
            if !*self.running.read().await {
                break;
            }

            let reports = self.run_once().await;
            let had_errors = reports.iter().any(|r| r.error.is_some());

            let delay = if had_errors {
                self.config.poll_interval.max(self.config.error_delay)
            } else {
                self.config.poll_interval
            };
            tokio::time::sleep(delay).await;
        }

        info!("AutoClaimer stopped");
        Ok(())
    }

    /// Stop after the current tick
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One cycle for every account. Never fails; per-account errors are in
    /// the reports.
    pub async fn run_once(&self) -> Vec<CycleReport> {
        stream::iter(self.accounts.iter())
            .map(|account| self.process_account(account))
            .buffer_unordered(self.config.max_concurrent_accounts.max(1))
            .collect()
            .await
    }

    /// One upgrade attempt per account, outside the claim cycle
    pub async fn upgrade_all(&self) -> Vec<(String, Result<OutcomeTag>)> {
        stream::iter(self.accounts.iter())
            .map(|account| async move {
                let result = self.upgrade_standalone(account).await;
                if let Err(e) = &result {
                    error!("{}: upgrade on start failed: {}", account.address(), e);
                }
                (account.address().to_string(), result)
            })
            .buffer_unordered(self.config.max_concurrent_accounts.max(1))
            .collect()
            .await
    }

    /// Read-only status of every account
    pub async fn status(&self) -> Vec<(String, Result<AccountSnapshot>)> {
        let mut out = Vec::with_capacity(self.accounts.len());
        for account in &self.accounts {
            out.push((account.address().to_string(), self.snapshot(account.address()).await));
        }
        out
    }

    async fn process_account(&self, account: &TrackedAccount) -> CycleReport {
        let mut report = CycleReport::new(account.address());
        if let Err(e) = self.run_cycle(account, &mut report).await {
            if e.is_transient() {
                warn!("{}: cycle error: {}", account.address(), e);
            } else {
                error!("{}: cycle error: {}", account.address(), e);
            }

            let claiming = account.state().await == CycleState::Claiming;
            if claiming {
                account.transition(CycleState::ClaimFailed).await;
            }
            let snapshot = report.snapshot.clone();
            self.emit(
                &mut report,
                snapshot.as_ref(),
                account.address(),
                OutcomeTag::ClaimErrored,
                Some(e.to_string()),
            )
            .await;
            report.error = Some(e.to_string());
            account.transition(CycleState::Polling).await;
        }
        report.final_state = account.state().await;
        report
    }

    #[instrument(skip(self, account, report), fields(address = %account.address(), cycle = %report.cycle_id))]
    async fn run_cycle(&self, account: &TrackedAccount, report: &mut CycleReport) -> Result<()> {
        let snapshot = self.snapshot(account.address()).await?;
        report.snapshot = Some(snapshot.clone());

        if !snapshot.accrual.is_ready() {
            account.transition(CycleState::Polling).await;
            self.emit(report, Some(&snapshot), account.address(), OutcomeTag::WaitingToClaim, None)
                .await;
            return Ok(());
        }

        account.transition(CycleState::Ready).await;
        self.emit(report, Some(&snapshot), account.address(), OutcomeTag::ReadyToClaim, None)
            .await;

        account.transition(CycleState::Claiming).await;
        let outcome = self.claim(account).await?;
        if !outcome.is_success() {
            account.transition(CycleState::ClaimFailed).await;
            self.emit(
                report,
                Some(&snapshot),
                account.address(),
                OutcomeTag::ClaimFailed,
                Some(outcome.describe()),
            )
            .await;
            account.transition(CycleState::Polling).await;
            return Ok(());
        }

        account.transition(CycleState::ClaimOk).await;
        self.emit(
            report,
            Some(&snapshot),
            account.address(),
            OutcomeTag::ClaimSucceeded,
            Some(outcome.describe()),
        )
        .await;

        if self.config.auto_upgrade {
            tokio::time::sleep(self.config.step_delay).await;
            account.transition(CycleState::Upgrading).await;
            let (tag, detail) = match self.upgrade(account).await {
                Ok(result) => result,
                Err(e) => (OutcomeTag::UpgradeFailed, Some(e.to_string())),
            };
            self.emit(report, Some(&snapshot), account.address(), tag, detail).await;
        }

        if let Some(transfer) = &self.config.transfer {
            tokio::time::sleep(self.config.step_delay).await;
            account.transition(CycleState::Transferring).await;
            let (tag, detail) = match self.transfer(account, transfer).await {
                Ok(result) => result,
                Err(e) => (OutcomeTag::TransferFailed, Some(e.to_string())),
            };
            self.emit(report, Some(&snapshot), account.address(), tag, detail).await;
        }

        account.transition(CycleState::Polling).await;
        Ok(())
    }

    /// Fetch balances and game state and evaluate the accrual
    pub async fn snapshot(&self, address: &str) -> Result<AccountSnapshot> {
        let info = self.game_info().await?;
        let state = self.account_state(address).await?;
        let balances = self.balances(address).await?;
        let accrual = compute_accrual(
            info.as_deref(),
            state.as_ref(),
            Utc::now().timestamp_millis(),
        )?;

        Ok(AccountSnapshot {
            address: address.to_string(),
            balances,
            state,
            accrual,
        })
    }

    /// Game configuration, read from the claim object once and cached.
    /// `None` while the game is not deployed.
    async fn game_info(&self) -> Result<Option<Arc<GameInfo>>> {
        if let Some(info) = self.game_info.read().await.as_ref() {
            return Ok(Some(info.clone()));
        }

        let Some(fields) = self
            .chain
            .get_object_fields(&self.contract.claim_object_id)
            .await?
        else {
            warn!(
                "Claim object {} not found, accrual is zero",
                self.contract.claim_object_id
            );
            return Ok(None);
        };

        let info = Arc::new(GameInfo::from_object_fields(&fields)?);
        info!(
            "Loaded game configuration: {} boat, {} mesh, {} fish tiers, {} boosts",
            info.boat_level.len(),
            info.mesh_level.len(),
            info.fish_type_level.len(),
            info.special_boost.len()
        );
        *self.game_info.write().await = Some(info.clone());
        Ok(Some(info))
    }

    async fn account_state(&self, address: &str) -> Result<Option<AccountState>> {
        self.chain
            .get_dynamic_field_fields(&self.contract.claim_object_id, address)
            .await?
            .map(|fields| AccountState::from_fields(&fields))
            .transpose()
    }

    async fn balances(&self, address: &str) -> Result<Balances> {
        let sui = self.chain.get_balance(address, SUI_COIN_TYPE).await?;
        let token = self
            .chain
            .get_balance(address, &self.contract.coin_type)
            .await?;
        Ok(Balances {
            sui: from_base_units(sui),
            token: from_base_units(token),
        })
    }

    async fn claim(&self, account: &TrackedAccount) -> Result<TxOutcome> {
        let mut tx = TransactionBuilder::new();
        let claim_object = tx.object(&self.contract.claim_object_id);
        let clock = tx.object(&self.contract.clock_object_id);
        tx.move_call(&self.contract.target(CLAIM_FUNCTION), vec![claim_object, clock]);

        account
            .executor
            .execute(tx.build(account.address(), self.config.gas_budget))
            .await
    }

    async fn upgrade_standalone(&self, account: &TrackedAccount) -> Result<OutcomeTag> {
        let snapshot = self.snapshot(account.address()).await?;
        let mut report = CycleReport::new(account.address());
        let (tag, detail) = self.upgrade(account).await?;
        self.emit(&mut report, Some(&snapshot), account.address(), tag, detail)
            .await;
        Ok(tag)
    }

    /// Advance the lagging track by one tier, paying with the game token
    async fn upgrade(&self, account: &TrackedAccount) -> Result<(OutcomeTag, Option<String>)> {
        let address = account.address();
        let Some(info) = self.game_info().await? else {
            return Ok((
                OutcomeTag::UpgradeFailed,
                Some("game configuration unavailable".to_string()),
            ));
        };
        // Levels are read fresh; a first claim is what creates the entry
        let Some(state) = self.account_state(address).await? else {
            return Ok((
                OutcomeTag::UpgradeFailed,
                Some("account has no game state yet".to_string()),
            ));
        };

        let (track, price) = match UpgradePlan::for_account(&info, &state) {
            UpgradePlan::MaxLevel {
                track,
                current_level,
            } => {
                info!("{}: {} at max level {}", address, track, current_level);
                return Ok((OutcomeTag::MaxLevelReached, Some(track.to_string())));
            }
            UpgradePlan::Upgrade {
                track,
                current_level,
                price,
            } => {
                debug!(
                    "{}: upgrading {} from level {} for {}",
                    address, track, current_level, price
                );
                (track, price)
            }
        };

        let mut tx = TransactionBuilder::new();
        let Some(payment) =
            select_coins(self.chain.as_ref(), address, &self.contract.coin_type, price, &mut tx)
                .await?
        else {
            return Ok((
                OutcomeTag::UpgradeInsufficientBalance,
                Some(format!("{} needs {}", track, from_base_units(u128::from(price)))),
            ));
        };
        let claim_object = tx.object(&self.contract.claim_object_id);
        tx.move_call(
            &self.contract.target(track.entry_function()),
            vec![claim_object, payment],
        );

        let outcome = account
            .executor
            .execute(tx.build(address, self.config.gas_budget))
            .await?;
        let tag = if outcome.is_success() {
            OutcomeTag::UpgradeSucceeded
        } else {
            OutcomeTag::UpgradeFailed
        };
        Ok((tag, Some(format!("{} {}", track, outcome.describe()))))
    }

    async fn transfer(
        &self,
        account: &TrackedAccount,
        transfer: &AutoTransfer,
    ) -> Result<(OutcomeTag, Option<String>)> {
        let address = account.address();
        let balance = self
            .chain
            .get_balance(address, &self.contract.coin_type)
            .await?;

        let amount = match transfer.amount.resolve(balance) {
            Some(amount) if u128::from(amount) <= balance => amount,
            _ => {
                return Ok((
                    OutcomeTag::TransferInsufficientBalance,
                    Some(format!(
                        "balance {} < {}",
                        from_base_units(balance),
                        transfer.amount
                    )),
                ))
            }
        };

        let mut tx = TransactionBuilder::new();
        let Some(coin) =
            select_coins(self.chain.as_ref(), address, &self.contract.coin_type, amount, &mut tx)
                .await?
        else {
            return Ok((
                OutcomeTag::TransferInsufficientBalance,
                Some(format!("coins do not cover {}", from_base_units(u128::from(amount)))),
            ));
        };
        tx.transfer_objects(vec![coin], &transfer.recipient);

        let outcome = account
            .executor
            .execute(tx.build(address, self.config.gas_budget))
            .await?;
        let tag = if outcome.is_success() {
            OutcomeTag::TransferSucceeded
        } else {
            OutcomeTag::TransferFailed
        };
        Ok((
            tag,
            Some(format!(
                "{} to {} {}",
                from_base_units(u128::from(amount)),
                transfer.recipient,
                outcome.describe()
            )),
        ))
    }

    async fn emit(
        &self,
        report: &mut CycleReport,
        snapshot: Option<&AccountSnapshot>,
        address: &str,
        tag: OutcomeTag,
        detail: Option<String>,
    ) {
        let record = OutcomeRecord {
            timestamp: Utc::now(),
            address: address.to_string(),
            sui_balance: snapshot.map(|s| s.balances.sui).unwrap_or_default(),
            token_balance: snapshot.map(|s| s.balances.token).unwrap_or_default(),
            claimable: snapshot.map(|s| s.accrual.claimable).unwrap_or_default(),
            progress: snapshot.map(|s| s.accrual.progress).unwrap_or_default(),
            tag,
            detail,
        };

        if tag == OutcomeTag::WaitingToClaim {
            debug!("{}", record.status_line());
        } else if tag.is_failure() {
            warn!("{}", record.status_line());
        } else {
            info!("{}", record.status_line());
        }

        if let Some(log) = &self.outcome_log {
            log.record(&record).await;
        }
        report.outcomes.push(tag);
    }
}
