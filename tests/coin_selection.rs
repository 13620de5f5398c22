use proptest::prelude::*;
use trawl::domain::{Argument, Command, TransactionBuilder};
use trawl::strategy::{select_coins, MERGE_BATCH_LIMIT};
use trawl::test_helpers::InMemoryChain;

const OWNER: &str = "0xowner";
const OCEAN: &str = "0xabc::ocean::OCEAN";

struct Staged {
    coin: Option<Argument>,
    merged_sources: Vec<usize>,
    splits: Vec<String>,
    inputs_used: usize,
}

async fn stage(balances: &[u64], page_size: usize, target: u64) -> Staged {
    let chain = InMemoryChain::new();
    chain.set_coins(OWNER, OCEAN, balances, page_size);
    let mut tx = TransactionBuilder::new();
    let coin = select_coins(&chain, OWNER, OCEAN, target, &mut tx)
        .await
        .unwrap();

    let merged_sources = tx
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::MergeCoins { sources, .. } => Some(sources.len()),
            _ => None,
        })
        .collect();
    let request = tx.build(OWNER, 1);
    let splits = request
        .commands
        .iter()
        .filter_map(|c| match c {
            Command::SplitCoins { amounts, .. } => match amounts.first() {
                Some(Argument::Input(i)) => match &request.inputs[*i as usize] {
                    trawl::domain::CallArg::Pure { value } => value.as_str().map(str::to_string),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .collect();

    Staged {
        coin,
        merged_sources,
        splits,
        inputs_used: request.inputs.len(),
    }
}

/// How many coins, in order, it takes to reach `target`
fn needed(balances: &[u64], target: u64) -> Option<(usize, u128)> {
    let mut total: u128 = 0;
    for (i, b) in balances.iter().enumerate() {
        total += u128::from(*b);
        if total >= u128::from(target) {
            return Some((i + 1, total));
        }
    }
    None
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn selection_merges_only_what_is_needed(
        balances in prop::collection::vec(1u64..1_000_000, 1..40),
        page_size in 1usize..10,
        target in 1u64..5_000_000,
    ) {
        let staged = tokio_test::block_on(stage(&balances, page_size, target));

        match needed(&balances, target) {
            Some((count, total)) => {
                prop_assert!(staged.coin.is_some());
                prop_assert_eq!(staged.merged_sources.iter().sum::<usize>(), count - 1);
                prop_assert!(staged.merged_sources.iter().all(|n| *n <= MERGE_BATCH_LIMIT));
                if total == u128::from(target) {
                    prop_assert!(staged.splits.is_empty());
                } else {
                    prop_assert_eq!(staged.splits.clone(), vec![target.to_string()]);
                }
            }
            None => {
                prop_assert!(staged.coin.is_none());
                prop_assert!(staged.merged_sources.is_empty());
                prop_assert!(staged.splits.is_empty());
                prop_assert_eq!(staged.inputs_used, 0);
            }
        }
    }
}

#[tokio::test]
async fn large_fragmented_balance_is_merged_in_bounded_batches() {
    let balances = vec![3u64; 1_100];
    let staged = stage(&balances, 50, 3_000).await;
    // 1000 coins needed: 999 merged into the primary, exact total
    assert_eq!(staged.merged_sources, vec![500, 499]);
    assert!(staged.splits.is_empty());
    assert_eq!(staged.coin, Some(Argument::Input(0)));
}

#[tokio::test]
async fn split_amount_is_exact_target() {
    let staged = stage(&[40, 40, 40], 1, 100).await;
    assert_eq!(staged.merged_sources, vec![2]);
    assert_eq!(staged.splits, vec!["100".to_string()]);
}

#[tokio::test]
async fn selecting_twice_stages_two_independent_sets() {
    let chain = InMemoryChain::new();
    chain.set_coins(OWNER, OCEAN, &[10, 10], 10);
    let mut tx = TransactionBuilder::new();
    let first = select_coins(&chain, OWNER, OCEAN, 15, &mut tx).await.unwrap();
    let second = select_coins(&chain, OWNER, OCEAN, 15, &mut tx).await.unwrap();
    assert!(first.is_some() && second.is_some());
    assert_ne!(first, second);
    // merge + split each time
    assert_eq!(tx.commands().len(), 4);
}
