// crates/garnet-store/src/memory.rs
//
// In-memory snapshot store. Holds the same Arc handles the ledger publishes,
// so nothing is copied on insert.

use std::collections::BTreeMap;
use std::sync::Arc;

use garnet_core::error::GarnetError;
use garnet_core::traits::SnapshotStore;
use garnet_core::{BlockHeight, LedgerSnapshot};

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: BTreeMap<BlockHeight, Arc<LedgerSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put_snapshot(&mut self, snapshot: Arc<LedgerSnapshot>) -> Result<(), GarnetError> {
        self.snapshots.insert(snapshot.height, snapshot);
        Ok(())
    }

    fn snapshot_at(&self, height: BlockHeight) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError> {
        Ok(self
            .snapshots
            .range(..=height)
            .next_back()
            .map(|(_, snap)| Arc::clone(snap)))
    }

    fn latest(&self) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError> {
        Ok(self.snapshots.values().next_back().cloned())
    }

    fn earliest_height(&self) -> Result<Option<BlockHeight>, GarnetError> {
        Ok(self.snapshots.keys().next().copied())
    }

    fn prune_below(&mut self, height: BlockHeight) -> Result<usize, GarnetError> {
        let kept = self.snapshots.split_off(&height);
        let removed = self.snapshots.len();
        self.snapshots = kept;
        Ok(removed)
    }
}
