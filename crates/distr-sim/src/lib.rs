// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// F1 DISTRIBUTION - SIMULATION COLLABORATORS
//
// A bank and a staking module small enough to read in one sitting, backed
// by the same store as the distribution engine so branches and simulations
// roll all three back together. Staking fires the distribution hooks in
// the order a production staking module does:
//
//   delegate:    BeforeDelegationCreated | BeforeDelegationSharesModified
//                → update stake → AfterDelegationModified
//   undelegate:  BeforeDelegationSharesModified → update stake →
//                AfterDelegationModified | BeforeDelegationRemoved
//   slash:       BeforeValidatorSlashed → burn tokens
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod app;
pub mod bank;
mod kv;
pub mod staking;

pub use app::SimApp;
pub use bank::SimBank;
pub use staking::SimStaking;
