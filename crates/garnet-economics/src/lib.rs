// crates/garnet-economics/src/lib.rs
//
// garnet-economics: monetary expansion, fault detection, slashing, reward
// distribution, and the StakingLedger for the Garnet staking engine.
//
// All monetary values are tracked in carats (the smallest unit of $GRT).
// 1 GRT = 100,000,000 carats (10^8). All arithmetic is integer; the decay
// curve is evaluated in 10^27 fixed point.

pub mod detector;
pub mod emission;
pub mod fixed;
pub mod ledger;
pub mod liveness;
pub mod params;
pub mod pool;
pub mod rewards;
pub mod slashing;
pub mod token;
pub mod transition;

// Re-export key types for ergonomic access from downstream crates.
pub use detector::{ByzantineFaultDetector, FaultFlag, ValidatorHealth};
pub use emission::{decay_rate, decay_tau, monetary_expansion, period_expansion};
pub use ledger::StakingLedger;
pub use params::{EpochParameters, JailingConfig, NetworkParameters, SlashRatio, SlashingConfig};
pub use rewards::{RewardDistribution, RewardDistributor};
pub use slashing::{PunishmentOutcome, SlashingEngine};
pub use token::{Grt, CARATS_PER_GRT};
pub use transition::{
    apply_block, apply_epoch, apply_unjail, epoch_transition, EpochReport, EpochTrigger,
};
