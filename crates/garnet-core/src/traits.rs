// crates/garnet-core/src/traits.rs

use std::sync::Arc;

use crate::error::GarnetError;
use crate::identity::StakingAddress;
use crate::staking::{LedgerSnapshot, StakingAccount};
use crate::BlockHeight;

/// Trait for persistent snapshot storage.
///
/// Implemented by garnet-store (in-memory and RocksDB backends).
pub trait SnapshotStore: Send + Sync {
    /// Persist a published snapshot. Overwrites if the height already exists.
    fn put_snapshot(&mut self, snapshot: Arc<LedgerSnapshot>) -> Result<(), GarnetError>;

    /// The latest snapshot at or below `height`, if any is retained.
    fn snapshot_at(&self, height: BlockHeight) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError>;

    /// The most recently published snapshot.
    fn latest(&self) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError>;

    /// Lowest retained height.
    fn earliest_height(&self) -> Result<Option<BlockHeight>, GarnetError>;

    /// Drop every snapshot strictly below `height`. Returns how many were removed.
    fn prune_below(&mut self, height: BlockHeight) -> Result<usize, GarnetError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Box<T> {
    fn put_snapshot(&mut self, snapshot: Arc<LedgerSnapshot>) -> Result<(), GarnetError> {
        (**self).put_snapshot(snapshot)
    }

    fn snapshot_at(&self, height: BlockHeight) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError> {
        (**self).snapshot_at(height)
    }

    fn latest(&self) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError> {
        (**self).latest()
    }

    fn earliest_height(&self) -> Result<Option<BlockHeight>, GarnetError> {
        (**self).earliest_height()
    }

    fn prune_below(&mut self, height: BlockHeight) -> Result<usize, GarnetError> {
        (**self).prune_below(height)
    }
}

/// Read-only, height-qualified staking queries.
///
/// Implemented by garnet-economics' StakingLedger.
pub trait StakingQuery {
    /// Account state at `height`, or at the tip when `height` is `None`.
    fn get_staking_state(
        &self,
        address: &StakingAddress,
        height: Option<BlockHeight>,
    ) -> Result<StakingAccount, GarnetError>;

    /// Total bonded stake at `height`, or at the tip when `height` is `None`.
    fn get_total_bonded(&self, height: Option<BlockHeight>) -> Result<u64, GarnetError>;
}
