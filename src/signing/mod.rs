pub mod command_signer;
pub mod mnemonic;
pub mod signer;

pub use command_signer::{validate_address, CommandSigner};
pub use mnemonic::Mnemonic;
pub use signer::{SignedTransaction, TransactionSigner};
