// crates/garnet-daemon/src/state.rs
//
// Node lifecycle for the Garnet daemon.
//
//   Initializing -> Loading -> Producing
//   any state    -> ShuttingDown

use std::fmt;
use std::time::{Duration, Instant};

use garnet_core::error::GarnetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Reading configuration and installing logging.
    Initializing,
    /// Building genesis or resuming the ledger from its snapshot store.
    Loading,
    /// Committing blocks.
    Producing,
    ShuttingDown,
}

impl NodeState {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeState::Initializing => "initializing",
            NodeState::Loading => "loading",
            NodeState::Producing => "producing",
            NodeState::ShuttingDown => "shutting-down",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_become(self, next: NodeState) -> bool {
        matches!(
            (self, next),
            (_, NodeState::ShuttingDown)
                | (NodeState::Initializing, NodeState::Loading)
                | (NodeState::Loading, NodeState::Producing)
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current lifecycle state and how long the node has been in it.
pub struct NodeStateMachine {
    current: NodeState,
    entered_at: Instant,
}

impl NodeStateMachine {
    pub fn new() -> Self {
        Self {
            current: NodeState::Initializing,
            entered_at: Instant::now(),
        }
    }

    pub fn current(&self) -> NodeState {
        self.current
    }

    /// Time spent in the current state.
    pub fn elapsed(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Move to `next`, logging how long the previous state lasted.
    ///
    /// # Errors
    /// `InvalidState` if the lifecycle does not allow the move; the machine
    /// stays where it was.
    pub fn transition(&mut self, next: NodeState) -> Result<(), GarnetError> {
        if !self.current.can_become(next) {
            return Err(GarnetError::InvalidState(format!(
                "cannot go from {} to {}",
                self.current, next
            )));
        }
        tracing::info!(
            "Node {} -> {} (after {:?})",
            self.current,
            next,
            self.elapsed()
        );
        self.current = next;
        self.entered_at = Instant::now();
        Ok(())
    }
}

impl Default for NodeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_sequence() {
        let mut machine = NodeStateMachine::new();
        machine.transition(NodeState::Loading).unwrap();
        machine.transition(NodeState::Producing).unwrap();
        machine.transition(NodeState::ShuttingDown).unwrap();
        assert_eq!(machine.current(), NodeState::ShuttingDown);
    }

    #[test]
    fn test_cannot_skip_loading() {
        let mut machine = NodeStateMachine::new();
        assert!(matches!(
            machine.transition(NodeState::Producing),
            Err(GarnetError::InvalidState(_))
        ));
        assert_eq!(machine.current(), NodeState::Initializing);
    }

    #[test]
    fn test_no_way_back_to_loading() {
        assert!(!NodeState::Producing.can_become(NodeState::Loading));
        assert!(!NodeState::ShuttingDown.can_become(NodeState::Producing));
        assert!(NodeState::Producing.can_become(NodeState::ShuttingDown));
    }

    #[test]
    fn test_shutdown_from_any_state() {
        for state in [
            NodeState::Initializing,
            NodeState::Loading,
            NodeState::Producing,
            NodeState::ShuttingDown,
        ] {
            assert!(state.can_become(NodeState::ShuttingDown));
        }
    }
}
