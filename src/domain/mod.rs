pub mod account;
pub mod game;
pub mod numeric;
pub mod state;
pub mod transaction;
pub mod upgrade;

pub use account::AccountState;
pub use game::{BoatTier, BoostKind, FishTypeTier, GameInfo, MeshTier, SpecialBoost};
pub use state::CycleState;
pub use transaction::{Argument, CallArg, Command, TransactionBuilder, TransactionRequest};
pub use upgrade::{UpgradePlan, UpgradeTrack};
