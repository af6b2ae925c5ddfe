// crates/garnet-store/src/lib.rs
//
// garnet-store: Snapshot persistence for the Garnet staking engine.
//
// Provides two implementations of `garnet_core::SnapshotStore`: an in-memory
// store for tests and short-lived nodes, and a RocksDB-backed store that
// survives restarts. Both answer "latest snapshot at or below height h".

pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use memory::MemorySnapshotStore;
pub use rocks::RocksSnapshotStore;
