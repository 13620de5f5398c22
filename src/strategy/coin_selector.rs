//! Payment coin selection
//!
//! Stages the merge/split commands that turn an owner's fragmented coin
//! objects into a single coin of an exact amount. Nothing touches chain
//! state here; only the caller's [`TransactionBuilder`] is extended.

use tracing::debug;

use crate::adapters::chain::{is_native_gas_coin, ChainClient, CoinObject};
use crate::domain::{Argument, TransactionBuilder};
use crate::error::Result;

/// Maximum source coins in one `MergeCoins` command
pub const MERGE_BATCH_LIMIT: usize = 500;

/// Stage a coin of exactly `target` raw units of `coin_type` owned by `owner`.
///
/// Returns `Ok(None)` when the owner's coins do not cover `target`; no
/// commands are staged in that case.
pub async fn select_coins(
    chain: &dyn ChainClient,
    owner: &str,
    coin_type: &str,
    target: u64,
    tx: &mut TransactionBuilder,
) -> Result<Option<Argument>> {
    if is_native_gas_coin(coin_type) {
        let gas = tx.gas();
        return Ok(Some(tx.split_coin(gas, target)));
    }

    let target_total = u128::from(target);
    let mut selected: Vec<CoinObject> = Vec::new();
    let mut total: u128 = 0;
    let mut cursor: Option<String> = None;

    'pages: loop {
        let page = chain.get_coins(owner, coin_type, cursor.as_deref()).await?;
        for coin in page.data {
            total += u128::from(coin.balance);
            selected.push(coin);
            if total >= target_total {
                break 'pages;
            }
        }
        if !page.has_next_page || page.next_cursor.is_none() {
            break;
        }
        cursor = page.next_cursor;
    }

    if total < target_total || selected.is_empty() {
        debug!(
            "{} holds {} of {}, needs {}",
            owner, total, coin_type, target
        );
        return Ok(None);
    }

    debug!(
        "Selected {} coin(s) totalling {} for {}",
        selected.len(),
        total,
        target
    );

    let primary = tx.object(&selected[0].coin_object_id);
    let rest: Vec<Argument> = selected[1..]
        .iter()
        .map(|coin| tx.object(&coin.coin_object_id))
        .collect();
    for batch in rest.chunks(MERGE_BATCH_LIMIT) {
        tx.merge_coins(primary, batch.to_vec());
    }

    if total == target_total {
        Ok(Some(primary))
    } else {
        Ok(Some(tx.split_coin(primary, target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Command;
    use crate::test_helpers::InMemoryChain;

    const OWNER: &str = "0xowner";
    const OCEAN: &str = "0xabc::ocean::OCEAN";

    fn merges(tx: &TransactionBuilder) -> Vec<usize> {
        tx.commands()
            .iter()
            .filter_map(|c| match c {
                Command::MergeCoins { sources, .. } => Some(sources.len()),
                _ => None,
            })
            .collect()
    }

    fn splits(tx: &TransactionBuilder) -> usize {
        tx.commands()
            .iter()
            .filter(|c| matches!(c, Command::SplitCoins { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_native_gas_splits_from_gas_coin() {
        let chain = InMemoryChain::new();
        let mut tx = TransactionBuilder::new();
        let coin = select_coins(&chain, OWNER, "0x2::sui::SUI", 42, &mut tx)
            .await
            .unwrap();
        assert_eq!(coin, Some(Argument::NestedResult(0, 0)));
        assert!(matches!(
            tx.commands()[0],
            Command::SplitCoins { coin: Argument::GasCoin, .. }
        ));
        assert_eq!(chain.coin_queries(), 0);
    }

    #[tokio::test]
    async fn test_stops_at_first_covering_coin() {
        let chain = InMemoryChain::new();
        chain.set_coins(OWNER, OCEAN, &[30, 30, 50, 999], 2);
        let mut tx = TransactionBuilder::new();
        let coin = select_coins(&chain, OWNER, OCEAN, 100, &mut tx)
            .await
            .unwrap();

        assert!(coin.is_some());
        // three coins cover 100; the fourth is never touched
        assert_eq!(merges(&tx), vec![2]);
        assert_eq!(splits(&tx), 1);
        assert_eq!(chain.coin_queries(), 2);
    }

    #[tokio::test]
    async fn test_exact_total_returns_primary_without_split() {
        let chain = InMemoryChain::new();
        chain.set_coins(OWNER, OCEAN, &[60, 40], 50);
        let mut tx = TransactionBuilder::new();
        let coin = select_coins(&chain, OWNER, OCEAN, 100, &mut tx)
            .await
            .unwrap();
        assert_eq!(coin, Some(Argument::Input(0)));
        assert_eq!(merges(&tx), vec![1]);
        assert_eq!(splits(&tx), 0);
    }

    #[tokio::test]
    async fn test_single_large_coin_is_split_without_merge() {
        let chain = InMemoryChain::new();
        chain.set_coins(OWNER, OCEAN, &[1_000], 50);
        let mut tx = TransactionBuilder::new();
        let coin = select_coins(&chain, OWNER, OCEAN, 1, &mut tx)
            .await
            .unwrap();
        assert_eq!(coin, Some(Argument::NestedResult(0, 0)));
        assert!(merges(&tx).is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_stages_nothing() {
        let chain = InMemoryChain::new();
        chain.set_coins(OWNER, OCEAN, &[10, 20, 30], 2);
        let mut tx = TransactionBuilder::new();
        let coin = select_coins(&chain, OWNER, OCEAN, 61, &mut tx)
            .await
            .unwrap();
        assert_eq!(coin, None);
        assert!(tx.commands().is_empty());
    }

    #[tokio::test]
    async fn test_merges_are_batched() {
        let chain = InMemoryChain::new();
        let balances = vec![1u64; 1_201];
        chain.set_coins(OWNER, OCEAN, &balances, 50);
        let mut tx = TransactionBuilder::new();
        let coin = select_coins(&chain, OWNER, OCEAN, 1_201, &mut tx)
            .await
            .unwrap();
        assert!(coin.is_some());
        assert_eq!(merges(&tx), vec![500, 500, 200]);
        assert_eq!(splits(&tx), 0);
    }

    #[tokio::test]
    async fn test_zero_target_with_no_coins_is_insufficient() {
        let chain = InMemoryChain::new();
        let mut tx = TransactionBuilder::new();
        let coin = select_coins(&chain, OWNER, OCEAN, 0, &mut tx)
            .await
            .unwrap();
        assert_eq!(coin, None);
    }
}
