// crates/garnet-store/src/rocks.rs
//
// RocksDB-backed persistent storage for ledger snapshots.
//
// Key format:
//   - `snapshot:{height:020}` -> JSON-serialized LedgerSnapshot
//
// Heights are zero-padded to 20 digits (the width of u64::MAX), so the
// lexicographic key order RocksDB iterates in is also height order. "Latest
// at or below h" is a single reverse seek.

use std::sync::Arc;

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};
use tracing::debug;

use garnet_core::error::GarnetError;
use garnet_core::traits::SnapshotStore;
use garnet_core::{BlockHeight, LedgerSnapshot};

const SNAPSHOT_PREFIX: &[u8] = b"snapshot:";

/// RocksDB wrapper implementing the `SnapshotStore` trait.
#[derive(Debug)]
pub struct RocksSnapshotStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksSnapshotStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, GarnetError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path)
            .map_err(|e| GarnetError::Storage(format!("Failed to open RocksDB at {}: {}", path, e)))?;

        Ok(Self { db })
    }

    /// Build the key for a snapshot: `snapshot:{height:020}`.
    fn snapshot_key(height: BlockHeight) -> Vec<u8> {
        format!("snapshot:{:020}", height).into_bytes()
    }

    fn height_from_key(key: &[u8]) -> Result<BlockHeight, GarnetError> {
        std::str::from_utf8(&key[SNAPSHOT_PREFIX.len()..])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| GarnetError::Storage(format!("malformed snapshot key {:?}", key)))
    }

    /// First snapshot reached by iterating from `mode`, if any.
    fn first_snapshot(
        &self,
        mode: IteratorMode,
    ) -> Result<Option<(BlockHeight, Vec<u8>)>, GarnetError> {
        let Some(item) = self.db.iterator(mode).next() else {
            return Ok(None);
        };
        let (key, value) =
            item.map_err(|e| GarnetError::Storage(format!("RocksDB iteration error: {}", e)))?;
        if !key.starts_with(SNAPSHOT_PREFIX) {
            return Ok(None);
        }
        Ok(Some((Self::height_from_key(&key)?, value.into_vec())))
    }

    fn decode(bytes: &[u8]) -> Result<Arc<LedgerSnapshot>, GarnetError> {
        Ok(Arc::new(LedgerSnapshot::from_json(bytes)?))
    }
}

impl SnapshotStore for RocksSnapshotStore {
    fn put_snapshot(&mut self, snapshot: Arc<LedgerSnapshot>) -> Result<(), GarnetError> {
        let json = snapshot.to_json()?;
        self.db
            .put(Self::snapshot_key(snapshot.height), json)
            .map_err(|e| GarnetError::Storage(format!("RocksDB put failed: {}", e)))
    }

    fn snapshot_at(&self, height: BlockHeight) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError> {
        let key = Self::snapshot_key(height);
        match self.first_snapshot(IteratorMode::From(&key, Direction::Reverse))? {
            Some((_, bytes)) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn latest(&self) -> Result<Option<Arc<LedgerSnapshot>>, GarnetError> {
        self.snapshot_at(BlockHeight::MAX)
    }

    fn earliest_height(&self) -> Result<Option<BlockHeight>, GarnetError> {
        Ok(self
            .first_snapshot(IteratorMode::From(SNAPSHOT_PREFIX, Direction::Forward))?
            .map(|(height, _)| height))
    }

    fn prune_below(&mut self, height: BlockHeight) -> Result<usize, GarnetError> {
        let end = Self::snapshot_key(height);
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for item in self.db.iterator(IteratorMode::From(SNAPSHOT_PREFIX, Direction::Forward)) {
            let (key, _) =
                item.map_err(|e| GarnetError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if !key.starts_with(SNAPSHOT_PREFIX) || &key[..] >= end.as_slice() {
                break;
            }
            batch.delete(&key);
            removed += 1;
        }
        if removed > 0 {
            self.db
                .write(batch)
                .map_err(|e| GarnetError::Storage(format!("RocksDB delete failed: {}", e)))?;
            debug!(removed, below = height, "pruned snapshots");
        }
        Ok(removed)
    }
}
