// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// F1 DISTRIBUTION - CORE MODULE
//
// Validator reward distribution using the F1 fee distribution scheme:
// per-validator reward periods with cumulative reward-per-token snapshots,
// reference-counted so only periods some delegator or slash event still
// points at are kept. Delegator rewards are computed lazily on withdrawal
// in O(1) plus the number of slashes since the delegator's last withdrawal.
//
// All amounts are `Dec` (18 fractional digits); only payouts are truncated
// to integer coins, and the truncation residue stays in outstanding rewards.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod abci;
pub mod address;
pub mod config;
pub mod context;
pub mod error;
pub mod expected_keepers;
pub mod hooks;
pub mod invariants;
pub mod keeper;
pub mod keys;
pub mod msgs;
pub mod queries;
pub mod types;

pub use address::Address;
pub use config::DistributionConfig;
pub use context::{Context, Event};
pub use error::{DistrError, Result};
pub use expected_keepers::{BankKeeper, StakingKeeper};
pub use hooks::StakingHooks;
pub use keeper::Keeper;
pub use msgs::{Msg, MsgResponse};
pub use types::*;

/// Name of the distribution module account (holds all undistributed rewards).
pub const MODULE_NAME: &str = "distribution";

/// Module account that collects transaction fees during a block.
pub const FEE_COLLECTOR_NAME: &str = "fee_collector";

/// Module account holding bonded stake.
pub const BONDED_POOL_NAME: &str = "bonded_tokens_pool";

/// Default governance module; its module address is the default authority.
pub const GOV_MODULE_NAME: &str = "gov";

/// Largest stake drift (in units of 10^-18) tolerated between a delegator's
/// recorded stake and the staking module's current view.
pub const STAKE_TOLERANCE_UNITS: u128 = 3;
