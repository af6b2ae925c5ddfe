// crates/garnet-daemon/src/shared.rs
//
// DaemonSharedState: centralized shared mutable state for the Garnet daemon.
//
// Constructed once in main.rs, then injected into the block scheduler and
// any read-only observers. The scheduler is the only task that takes the
// ledger's write lock.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use garnet_core::SnapshotStore;
use garnet_economics::{EpochReport, StakingLedger};

/// Ledger over whichever snapshot backend the config selected.
pub type DaemonLedger = StakingLedger<Box<dyn SnapshotStore>>;

/// Shared mutable state for the daemon, wrapped in Arc<RwLock<>> for
/// safe concurrent access from multiple tokio tasks.
#[derive(Clone)]
pub struct DaemonSharedState {
    /// The staking ledger (single writer: the block scheduler).
    pub ledger: Arc<RwLock<DaemonLedger>>,
    /// Last completed reward epoch (None until the first distribution).
    pub last_epoch: Arc<RwLock<Option<EpochReport>>>,
    /// Daemon start time for uptime calculation.
    pub start_time: Instant,
}

impl DaemonSharedState {
    pub fn new(ledger: DaemonLedger) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            last_epoch: Arc::new(RwLock::new(None)),
            start_time: Instant::now(),
        }
    }
}
