//! In-memory chain and signer for driving claim cycles without a node.
//!
//! `EchoSigner` puts the request JSON (base64) in `txBytes`, so
//! `InMemoryChain` can see which entry point a transaction calls and
//! answer dry runs and executions from a script keyed by that name.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::adapters::chain::{
    is_native_gas_coin, ChainClient, CoinObject, CoinPage, ExecutionResult, ExecutionStatus,
};
use crate::domain::{AccountState, CallArg, Command, GameInfo, TransactionRequest};
use crate::error::{Result, TrawlError};
use crate::signing::{SignedTransaction, TransactionSigner};

/// Intent name used for transactions without a Move call
pub const TRANSFER_INTENT: &str = "transfer";

/// Key the chain scripts outcomes by: the first Move function, or `transfer`
pub fn intent_of(request: &TransactionRequest) -> String {
    request
        .commands
        .iter()
        .find_map(|c| match c {
            Command::MoveCall { function, .. } => Some(function.clone()),
            _ => None,
        })
        .unwrap_or_else(|| TRANSFER_INTENT.to_string())
}

fn decode_request(tx_bytes: &str) -> Result<TransactionRequest> {
    let raw = BASE64_STANDARD
        .decode(tx_bytes)
        .map_err(|e| TrawlError::Internal(format!("echo bytes are not base64: {}", e)))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Signer that "signs" by encoding the request itself
pub struct EchoSigner {
    address: String,
}

impl EchoSigner {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }
}

#[async_trait]
impl TransactionSigner for EchoSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, request: &TransactionRequest) -> Result<SignedTransaction> {
        Ok(SignedTransaction {
            tx_bytes: BASE64_STANDARD.encode(serde_json::to_vec(request)?),
            signatures: vec![BASE64_STANDARD.encode(self.address.as_bytes())],
        })
    }
}

#[derive(Default)]
struct ChainState {
    claim_object: Option<Value>,
    accounts: HashMap<String, AccountState>,
    balances: HashMap<(String, String), u128>,
    coins: HashMap<(String, String), (Vec<CoinObject>, usize)>,
    dry_runs: HashMap<String, ExecutionStatus>,
    executions: HashMap<String, ExecutionStatus>,
    failing_reads: usize,
    coin_queries: usize,
    submitted: Vec<TransactionRequest>,
    claim_time_ms: u64,
}

/// Scripted [`ChainClient`].
///
/// Unscripted dry runs and executions succeed. A successful `claim`
/// execution moves the sender's `last_claim` to [`InMemoryChain::set_claim_time`];
/// a successful upgrade bumps the matching level. Any successful execution
/// spends the sender's coins it references: the split amount if there is
/// one, otherwise the whole merged coin.
#[derive(Default)]
pub struct InMemoryChain {
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the game configuration as the claim object's `data` field
    pub fn set_game_info(&self, info_json: &str) {
        GameInfo::from_json_str(info_json).unwrap();
        self.state.lock().unwrap().claim_object = Some(json!({ "data": info_json }));
    }

    pub fn set_account(&self, owner: &str, account: AccountState) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(owner.to_string(), account);
    }

    pub fn account(&self, owner: &str) -> Option<AccountState> {
        self.state.lock().unwrap().accounts.get(owner).cloned()
    }

    /// Coins with ids `0xcoin{i}`, served `page_size` at a time. Also sets
    /// the balance to their sum.
    pub fn set_coins(&self, owner: &str, coin_type: &str, balances: &[u64], page_size: usize) {
        let coins: Vec<CoinObject> = balances
            .iter()
            .enumerate()
            .map(|(i, b)| CoinObject {
                coin_object_id: format!("0xcoin{}", i),
                balance: *b,
            })
            .collect();
        let total: u128 = balances.iter().map(|b| u128::from(*b)).sum();
        let mut state = self.state.lock().unwrap();
        let key = (owner.to_string(), coin_type.to_string());
        state.coins.insert(key.clone(), (coins, page_size.max(1)));
        state.balances.insert(key, total);
    }

    pub fn script_dry_run(&self, intent: &str, status: ExecutionStatus) {
        self.state
            .lock()
            .unwrap()
            .dry_runs
            .insert(intent.to_string(), status);
    }

    pub fn script_execution(&self, intent: &str, status: ExecutionStatus) {
        self.state
            .lock()
            .unwrap()
            .executions
            .insert(intent.to_string(), status);
    }

    /// Fail the next `count` object reads with a transient RPC error
    pub fn fail_next_reads(&self, count: usize) {
        self.state.lock().unwrap().failing_reads = count;
    }

    pub fn set_claim_time(&self, now_ms: u64) {
        self.state.lock().unwrap().claim_time_ms = now_ms;
    }

    /// Every executed request, in order
    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn submitted_intents(&self) -> Vec<String> {
        self.submitted().iter().map(intent_of).collect()
    }

    pub fn coin_queries(&self) -> usize {
        self.state.lock().unwrap().coin_queries
    }

    fn take_read_failure(state: &mut ChainState) -> Result<()> {
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(TrawlError::Rpc {
                code: -32000,
                message: "scripted read failure".to_string(),
            });
        }
        Ok(())
    }

    fn apply_effects(state: &mut ChainState, request: &TransactionRequest, intent: &str) {
        let claim_time = state.claim_time_ms;
        let account = state.accounts.entry(request.sender.clone()).or_insert(AccountState {
            boat: 0,
            mesh: 0,
            seafood: 0,
            last_claim: claim_time,
            special_boost: None,
            special_boost_start_time: None,
        });
        match intent {
            "claim" => account.last_claim = claim_time,
            "upgrade_boat" => account.boat += 1,
            "upgrade_mesh" => account.mesh += 1,
            _ => {}
        }
        Self::debit_coins(state, request);
    }

    fn debit_coins(state: &mut ChainState, request: &TransactionRequest) {
        let referenced: Vec<&str> = request
            .inputs
            .iter()
            .filter_map(|input| match input {
                CallArg::Object { object_id } => Some(object_id.as_str()),
                CallArg::Pure { .. } => None,
            })
            .collect();
        let split: Option<u64> = request.commands.iter().find_map(|c| match c {
            Command::SplitCoins { amounts, .. } => amounts.first().and_then(|a| match a {
                crate::domain::Argument::Input(i) => match request.inputs.get(usize::from(*i)) {
                    Some(CallArg::Pure { value }) => value.as_str().and_then(|v| v.parse().ok()),
                    _ => None,
                },
                _ => None,
            }),
            _ => None,
        });

        let key = state
            .coins
            .iter()
            .find(|((owner, _), (coins, _))| {
                owner == &request.sender
                    && coins
                        .iter()
                        .any(|coin| referenced.contains(&coin.coin_object_id.as_str()))
            })
            .map(|(key, _)| key.clone());
        let Some(key) = key else {
            return;
        };
        let Some((coins, _)) = state.coins.get_mut(&key) else {
            return;
        };

        let (used, kept): (Vec<CoinObject>, Vec<CoinObject>) = coins
            .drain(..)
            .partition(|coin| referenced.contains(&coin.coin_object_id.as_str()));
        let total: u64 = used.iter().map(|c| c.balance).sum();
        let spent = split.unwrap_or(total).min(total);
        *coins = kept;
        if total > spent {
            // The remainder stays in the primary coin
            coins.insert(
                0,
                CoinObject {
                    coin_object_id: used[0].coin_object_id.clone(),
                    balance: total - spent,
                },
            );
        }
        if let Some(balance) = state.balances.get_mut(&key) {
            *balance = balance.saturating_sub(u128::from(spent));
        }
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn get_object_fields(&self, _object_id: &str) -> Result<Option<Value>> {
        let mut state = self.state.lock().unwrap();
        Self::take_read_failure(&mut state)?;
        Ok(state.claim_object.clone())
    }

    async fn get_dynamic_field_fields(
        &self,
        _parent_id: &str,
        owner: &str,
    ) -> Result<Option<Value>> {
        let mut state = self.state.lock().unwrap();
        Self::take_read_failure(&mut state)?;
        Ok(state
            .accounts
            .get(owner)
            .map(|a| serde_json::to_value(a))
            .transpose()?)
    }

    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<u128> {
        let state = self.state.lock().unwrap();
        let key = (owner.to_string(), coin_type.to_string());
        if let Some(balance) = state.balances.get(&key) {
            return Ok(*balance);
        }
        // Gas is never the limiting factor unless a test says so
        Ok(if is_native_gas_coin(coin_type) {
            1_000_000_000
        } else {
            0
        })
    }

    async fn get_coins(
        &self,
        owner: &str,
        coin_type: &str,
        cursor: Option<&str>,
    ) -> Result<CoinPage> {
        let mut state = self.state.lock().unwrap();
        state.coin_queries += 1;
        let Some((coins, page_size)) = state
            .coins
            .get(&(owner.to_string(), coin_type.to_string()))
            .cloned()
        else {
            return Ok(CoinPage::default());
        };

        let start = match cursor {
            Some(c) => coins
                .iter()
                .position(|coin| coin.coin_object_id == c)
                .map(|p| p + 1)
                .unwrap_or(coins.len()),
            None => 0,
        };
        let end = (start + page_size).min(coins.len());
        let data = coins[start..end].to_vec();
        let has_next_page = end < coins.len();
        Ok(CoinPage {
            next_cursor: data.last().map(|c| c.coin_object_id.clone()),
            data,
            has_next_page,
        })
    }

    async fn dry_run(&self, tx_bytes: &str) -> Result<ExecutionStatus> {
        let request = decode_request(tx_bytes)?;
        let intent = intent_of(&request);
        let state = self.state.lock().unwrap();
        Ok(state
            .dry_runs
            .get(&intent)
            .cloned()
            .unwrap_or_else(ExecutionStatus::success))
    }

    async fn execute(&self, signed: &SignedTransaction) -> Result<ExecutionResult> {
        let request = decode_request(&signed.tx_bytes)?;
        let intent = intent_of(&request);
        let mut state = self.state.lock().unwrap();
        let status = state
            .executions
            .get(&intent)
            .cloned()
            .unwrap_or_else(ExecutionStatus::success);
        if status.is_success() {
            Self::apply_effects(&mut state, &request, &intent);
        }
        state.submitted.push(request);
        let digest = format!("digest-{}", state.submitted.len());
        Ok(ExecutionResult {
            digest,
            status: Some(status),
        })
    }
}
