// crates/garnet-core/src/lib.rs
//
// garnet-core: Core types, traits, and identities for the Garnet staking engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the staking ledger data model, validator identities, fault
// evidence, the protocol-wide error type, and the storage/query traits.

pub mod error;
pub mod evidence;
pub mod identity;
pub mod staking;
pub mod traits;

/// Block height.
pub type BlockHeight = u64;

/// Block time in unix seconds.
pub type Timestamp = u64;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use garnet_core::LedgerSnapshot;`

// Identity types
pub use identity::{StakingAddress, ValidatorPubKey};

// Evidence types
pub use evidence::{Evidence, FaultType, PunishmentKind};

// Ledger data model
pub use staking::{LedgerSnapshot, RewardsPoolState, SlashRecord, StakingAccount, ValidatorInfo};

// Error type
pub use error::GarnetError;

// Traits
pub use traits::{SnapshotStore, StakingQuery};
