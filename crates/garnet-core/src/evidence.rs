// crates/garnet-core/src/evidence.rs
//
// Fault evidence reported by the consensus layer, and the punishment kinds it
// can lead to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::StakingAddress;
use crate::BlockHeight;

/// The kind of misbehavior a piece of evidence reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FaultType {
    /// The validator signed two conflicting votes at the same height.
    DuplicateVote,
    /// The validator did not sign the block at this height.
    MissedVote,
}

/// A single piece of evidence against a validator. Consumed once by the
/// fault detector and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub validator: StakingAddress,
    /// Height at which the fault occurred.
    pub height: BlockHeight,
    pub fault: FaultType,
}

impl Evidence {
    pub fn new(validator: StakingAddress, height: BlockHeight, fault: FaultType) -> Self {
        Self {
            validator,
            height,
            fault,
        }
    }
}

/// Why a validator was jailed and slashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PunishmentKind {
    /// Equivocation: a duplicate vote was observed.
    ByzantineFault,
    /// Too many missed votes inside the signing window.
    NonLive,
}

impl fmt::Display for PunishmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PunishmentKind::ByzantineFault => write!(f, "byzantine fault"),
            PunishmentKind::NonLive => write!(f, "non-live"),
        }
    }
}
