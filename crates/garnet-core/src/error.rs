use thiserror::Error;

use crate::identity::StakingAddress;
use crate::{BlockHeight, Timestamp};

/// Protocol-wide error types for the Garnet staking engine.
#[derive(Debug, Error)]
pub enum GarnetError {
    /// A debit exceeded the account's bonded stake. Slashing resolves this by
    /// clamping to the available balance.
    #[error("Insufficient balance for {address}: requested {requested}, available {available}")]
    InsufficientBalance {
        address: StakingAddress,
        requested: u64,
        available: u64,
    },

    /// Evidence or a query referenced an address absent from the ledger.
    #[error("Unknown validator: {0}")]
    UnknownValidator(StakingAddress),

    /// A commit or epoch trigger arrived out of order.
    #[error("Non-monotonic height: last committed {last}, got {got}")]
    NonMonotonicHeight { last: BlockHeight, got: BlockHeight },

    /// Block time moved backwards.
    #[error("Non-monotonic block time: last {last}, got {got}")]
    NonMonotonicTime { last: Timestamp, got: Timestamp },

    /// The requested height is above the tip or has been pruned.
    #[error("No snapshot available at height {0}")]
    HeightUnavailable(BlockHeight),

    /// Unjail requested before the jail period ended.
    #[error("Validator {address} is jailed until {jailed_until}")]
    JailNotExpired {
        address: StakingAddress,
        jailed_until: Timestamp,
    },

    /// Unjail requested for an account that is not jailed.
    #[error("Validator {0} is not jailed")]
    NotJailed(StakingAddress),

    /// A ledger invariant failed to hold.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Integer overflow in economic arithmetic.
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// Configuration or network parameters are invalid.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage layer error (RocksDB).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cryptographic error (malformed consensus key).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for GarnetError {
    fn from(e: serde_json::Error) -> Self {
        GarnetError::Serialization(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for GarnetError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        GarnetError::Crypto(e.to_string())
    }
}

impl From<hex::FromHexError> for GarnetError {
    fn from(e: hex::FromHexError) -> Self {
        GarnetError::Serialization(format!("invalid hex: {}", e))
    }
}
