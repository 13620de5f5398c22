pub mod chain;
pub mod sui_rpc;

pub use chain::{
    is_native_gas_coin, ChainClient, CoinObject, CoinPage, ExecutionResult, ExecutionStatus,
    STATUS_SUCCESS, SUI_COIN_TYPE,
};
pub use sui_rpc::{SuiRpcClient, SUI_MAINNET_URL};
