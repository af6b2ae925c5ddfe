// crates/garnet-economics/src/detector.rs
//
// Byzantine fault detection.
//
// Evidence arrives from consensus while a block is being built and is queued
// until the block commits. At commit the queue is drained in arrival order:
//   - DuplicateVote evidence flags the validator with a ByzantineFault
//   - MissedVote evidence feeds the validator's rolling liveness window, and
//     reaching `missed_block_threshold` misses flags it NonLive
//
// Evidence for a height that has not committed yet stays queued until it
// does. Evidence older than `max_evidence_age` blocks is discarded with a
// warning.
// The same (validator, height, fault) triple is only ever counted once, so
// resubmitting evidence is harmless.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use garnet_core::{BlockHeight, Evidence, FaultType, PunishmentKind, StakingAddress};

use crate::liveness::LivenessTracker;
use crate::params::JailingConfig;

/// A validator flagged for punishment at the next commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultFlag {
    pub validator: StakingAddress,
    /// Height of the evidence that raised the flag.
    pub evidence_height: BlockHeight,
    pub kind: PunishmentKind,
}

/// Health of a validator as seen by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorHealth {
    /// No misses in the window and no pending flag.
    Healthy,
    /// Some votes missed, but fewer than the threshold.
    Suspected { missed: u64 },
    /// Flagged for punishment, not yet drained.
    Faulted(PunishmentKind),
}

type EvidenceKey = (BlockHeight, StakingAddress, FaultType);

#[derive(Debug, Clone)]
pub struct ByzantineFaultDetector {
    config: JailingConfig,
    queue: Vec<Evidence>,
    seen: BTreeSet<EvidenceKey>,
    liveness: BTreeMap<StakingAddress, LivenessTracker>,
    raised: BTreeMap<StakingAddress, FaultFlag>,
}

impl ByzantineFaultDetector {
    pub fn new(config: JailingConfig) -> Self {
        Self {
            config,
            queue: Vec::new(),
            seen: BTreeSet::new(),
            liveness: BTreeMap::new(),
            raised: BTreeMap::new(),
        }
    }

    /// Queue evidence for the next commit.
    ///
    /// Returns `false` if the same evidence was already submitted.
    pub fn submit(&mut self, evidence: Evidence) -> bool {
        let key = (evidence.height, evidence.validator, evidence.fault);
        if !self.seen.insert(key) {
            debug!(validator = %evidence.validator, height = evidence.height, "duplicate evidence ignored");
            return false;
        }
        self.queue.push(evidence);
        true
    }

    /// A validator signed the block at `height`.
    pub fn record_signature(&mut self, validator: StakingAddress, height: BlockHeight) {
        if let Some(tracker) = self.liveness.get_mut(&validator) {
            tracker.record_signed(height, self.config.block_signing_window);
        }
    }

    /// Number of queued, unprocessed evidence items, including evidence held
    /// back for a height that has not committed yet.
    pub fn pending_evidence(&self) -> usize {
        self.queue.len()
    }

    /// Process queued evidence up to `current_height` and hand out the raised
    /// flags, ordered by validator address. Evidence above `current_height`
    /// stays queued.
    pub fn drain_faults(&mut self, current_height: BlockHeight) -> Vec<FaultFlag> {
        let (ready, held): (Vec<_>, Vec<_>) = std::mem::take(&mut self.queue)
            .into_iter()
            .partition(|e| e.height <= current_height);
        if !held.is_empty() {
            debug!(held = held.len(), current_height, "holding evidence until its height commits");
        }
        self.queue = held;
        for evidence in ready {
            self.process(evidence, current_height);
        }
        self.prune_seen(current_height);
        std::mem::take(&mut self.raised).into_values().collect()
    }

    /// Put flags back after a failed commit so they are retried.
    pub fn restore(&mut self, flags: Vec<FaultFlag>) {
        for flag in flags {
            self.raise(flag);
        }
    }

    pub fn health(&self, validator: &StakingAddress) -> ValidatorHealth {
        if let Some(flag) = self.raised.get(validator) {
            return ValidatorHealth::Faulted(flag.kind);
        }
        match self.liveness.get(validator).map(|t| t.missed_count()) {
            Some(missed) if missed > 0 => ValidatorHealth::Suspected { missed },
            _ => ValidatorHealth::Healthy,
        }
    }

    /// Drop all liveness state for a validator, e.g. once it has been jailed.
    pub fn forget(&mut self, validator: &StakingAddress) {
        self.liveness.remove(validator);
        self.raised.remove(validator);
    }

    fn process(&mut self, evidence: Evidence, current_height: BlockHeight) {
        if current_height.saturating_sub(evidence.height) > self.config.max_evidence_age {
            warn!(
                validator = %evidence.validator,
                height = evidence.height,
                current_height,
                max_age = self.config.max_evidence_age,
                "discarding expired evidence"
            );
            return;
        }

        match evidence.fault {
            FaultType::DuplicateVote => {
                self.raise(FaultFlag {
                    validator: evidence.validator,
                    evidence_height: evidence.height,
                    kind: PunishmentKind::ByzantineFault,
                });
            }
            FaultType::MissedVote => {
                let tracker = self.liveness.entry(evidence.validator).or_default();
                let missed = tracker.record_missed(evidence.height, self.config.block_signing_window);
                debug!(validator = %evidence.validator, height = evidence.height, missed, "missed vote");
                if missed >= self.config.missed_block_threshold {
                    tracker.reset();
                    self.raise(FaultFlag {
                        validator: evidence.validator,
                        evidence_height: evidence.height,
                        kind: PunishmentKind::NonLive,
                    });
                }
            }
        }
    }

    /// Record a flag. A byzantine fault takes precedence over a liveness one.
    fn raise(&mut self, flag: FaultFlag) {
        match self.raised.get(&flag.validator) {
            Some(existing)
                if existing.kind == PunishmentKind::ByzantineFault
                    || flag.kind == PunishmentKind::NonLive => {}
            _ => {
                self.raised.insert(flag.validator, flag);
            }
        }
    }

    fn prune_seen(&mut self, current_height: BlockHeight) {
        // anything below the floor would be rejected as expired anyway
        let floor = current_height.saturating_sub(self.config.max_evidence_age);
        let min_key = (floor, StakingAddress::new([0u8; 20]), FaultType::DuplicateVote);
        self.seen = self.seen.split_off(&min_key);
    }
}
