// crates/garnet-economics/src/ledger.rs
//
// StakingLedger: the single writer of the staking state.
//
// The ledger owns the tip snapshot, the fault detector and a snapshot store.
// Consensus feeds it evidence and signatures while a block is built, then
// calls exactly one of `end_block` or `on_epoch_boundary` per committed
// height. Each commit runs a pure transition (see transition.rs) and
// publishes the result as a new immutable Arc<LedgerSnapshot>. A failed
// transition publishes nothing and leaves the ledger as it was.

use std::sync::Arc;

use tracing::{debug, info};

use garnet_core::error::GarnetError;
use garnet_core::{
    BlockHeight, Evidence, FaultType, LedgerSnapshot, SnapshotStore, StakingAccount, StakingAddress,
    StakingQuery, Timestamp,
};

use crate::detector::{ByzantineFaultDetector, ValidatorHealth};
use crate::params::NetworkParameters;
use crate::slashing::PunishmentOutcome;
use crate::transition::{self, EpochReport, EpochTrigger};

pub struct StakingLedger<S: SnapshotStore> {
    params: NetworkParameters,
    store: S,
    tip: Arc<LedgerSnapshot>,
    detector: ByzantineFaultDetector,
    /// Number of most recent heights kept in the store; `None` keeps all.
    retention: Option<u64>,
}

impl<S: SnapshotStore> StakingLedger<S> {
    /// Start a ledger from a genesis snapshot, persisting it.
    pub fn from_genesis(
        params: NetworkParameters,
        genesis: LedgerSnapshot,
        mut store: S,
    ) -> Result<Self, GarnetError> {
        params.validate()?;
        genesis.check_invariants()?;
        let tip = Arc::new(genesis);
        store.put_snapshot(Arc::clone(&tip))?;
        info!(
            height = tip.height,
            validators = tip.accounts.len(),
            total_bonded = tip.total_bonded,
            "staking ledger initialised from genesis"
        );
        Ok(Self {
            detector: ByzantineFaultDetector::new(params.jailing.clone()),
            params,
            store,
            tip,
            retention: None,
        })
    }

    /// Resume from the latest snapshot in `store`.
    ///
    /// Detector state (liveness windows, queued evidence) is not persisted
    /// and starts empty.
    pub fn open(params: NetworkParameters, store: S) -> Result<Self, GarnetError> {
        params.validate()?;
        let tip = store
            .latest()?
            .ok_or_else(|| GarnetError::NotFound("no snapshot in store".into()))?;
        tip.check_invariants()?;
        info!(height = tip.height, total_bonded = tip.total_bonded, "staking ledger resumed");
        Ok(Self {
            detector: ByzantineFaultDetector::new(params.jailing.clone()),
            params,
            store,
            tip,
            retention: None,
        })
    }

    /// Keep only the `heights` most recent heights in the store.
    pub fn with_retention(mut self, heights: u64) -> Self {
        self.retention = Some(heights.max(1));
        self
    }

    pub fn params(&self) -> &NetworkParameters {
        &self.params
    }

    /// The latest published snapshot.
    pub fn tip(&self) -> Arc<LedgerSnapshot> {
        Arc::clone(&self.tip)
    }

    pub fn height(&self) -> BlockHeight {
        self.tip.height
    }

    /// Snapshot at `height` (latest at or below it), or the tip for `None`.
    ///
    /// # Errors
    /// `HeightUnavailable` above the tip or below the retained range.
    pub fn snapshot_at(
        &self,
        height: Option<BlockHeight>,
    ) -> Result<Arc<LedgerSnapshot>, GarnetError> {
        let height = match height {
            None => return Ok(self.tip()),
            Some(h) if h >= self.tip.height => {
                if h == self.tip.height {
                    return Ok(self.tip());
                }
                return Err(GarnetError::HeightUnavailable(h));
            }
            Some(h) => h,
        };
        if let Some(earliest) = self.store.earliest_height()? {
            if height < earliest {
                return Err(GarnetError::HeightUnavailable(height));
            }
        }
        self.store
            .snapshot_at(height)?
            .ok_or(GarnetError::HeightUnavailable(height))
    }

    /// Buffer evidence for the next commit.
    ///
    /// Returns `false` if the evidence was a duplicate or is ignored because
    /// the validator is jailed.
    pub fn submit_evidence(
        &mut self,
        validator: StakingAddress,
        height: BlockHeight,
        fault: FaultType,
    ) -> Result<bool, GarnetError> {
        let account = self
            .tip
            .account(&validator)
            .ok_or(GarnetError::UnknownValidator(validator))?;
        if account.is_jailed() {
            debug!(
                validator = %validator,
                height,
                ?fault,
                "evidence against jailed validator ignored"
            );
            return Ok(false);
        }
        Ok(self.detector.submit(Evidence::new(validator, height, fault)))
    }

    /// A validator signed the block at `height`.
    pub fn record_signature(
        &mut self,
        validator: StakingAddress,
        height: BlockHeight,
    ) -> Result<(), GarnetError> {
        if self.tip.account(&validator).is_none() {
            return Err(GarnetError::UnknownValidator(validator));
        }
        self.detector.record_signature(validator, height);
        Ok(())
    }

    pub fn health(&self, validator: &StakingAddress) -> ValidatorHealth {
        self.detector.health(validator)
    }

    pub fn is_epoch_due(&self, timestamp: Timestamp) -> bool {
        transition::is_epoch_due(&self.tip, timestamp, &self.params.rewards)
    }

    /// Commit an ordinary block: drain raised faults and punish.
    pub fn end_block(
        &mut self,
        height: BlockHeight,
        timestamp: Timestamp,
    ) -> Result<Vec<PunishmentOutcome>, GarnetError> {
        transition::check_order(&self.tip, height, timestamp)?;
        let faults = self.detector.drain_faults(height);
        match transition::apply_block(&self.tip, &faults, height, timestamp, &self.params) {
            Ok((next, punishments)) => {
                self.publish(next, &punishments)?;
                Ok(punishments)
            }
            Err(e) => {
                self.detector.restore(faults);
                Err(e)
            }
        }
    }

    /// Commit a block that closes a reward epoch: punish, then distribute.
    pub fn on_epoch_boundary(
        &mut self,
        height: BlockHeight,
        timestamp: Timestamp,
    ) -> Result<EpochReport, GarnetError> {
        transition::check_order(&self.tip, height, timestamp)?;
        let faults = self.detector.drain_faults(height);
        let trigger = EpochTrigger { height, timestamp };
        match transition::apply_epoch(&self.tip, &faults, trigger, &self.params) {
            Ok((next, report)) => {
                self.publish(next, &report.punishments)?;
                Ok(report)
            }
            Err(e) => {
                self.detector.restore(faults);
                Err(e)
            }
        }
    }

    /// Release a jailed validator whose jail period has ended.
    pub fn unjail(
        &mut self,
        address: &StakingAddress,
        height: BlockHeight,
        timestamp: Timestamp,
    ) -> Result<(), GarnetError> {
        let next = transition::apply_unjail(&self.tip, address, height, timestamp)?;
        self.publish(next, &[])
    }

    fn publish(
        &mut self,
        next: LedgerSnapshot,
        punishments: &[PunishmentOutcome],
    ) -> Result<(), GarnetError> {
        for outcome in punishments {
            self.detector.forget(&outcome.validator);
        }
        let next = Arc::new(next);
        self.store.put_snapshot(Arc::clone(&next))?;
        self.tip = next;

        if let Some(retention) = self.retention {
            let floor = self.tip.height.saturating_sub(retention - 1);
            let pruned = self.store.prune_below(floor)?;
            if pruned > 0 {
                debug!(pruned, floor, "pruned old snapshots");
            }
        }
        Ok(())
    }

    /// Evidence queued for the next commit.
    pub fn pending_evidence(&self) -> usize {
        self.detector.pending_evidence()
    }

    #[cfg(test)]
    fn raise(&mut self, flags: Vec<crate::detector::FaultFlag>) {
        self.detector.restore(flags);
    }
}

impl<S: SnapshotStore> StakingQuery for StakingLedger<S> {
    fn get_staking_state(
        &self,
        address: &StakingAddress,
        height: Option<BlockHeight>,
    ) -> Result<StakingAccount, GarnetError> {
        let snapshot = self.snapshot_at(height)?;
        snapshot
            .account(address)
            .cloned()
            .ok_or(GarnetError::UnknownValidator(*address))
    }

    fn get_total_bonded(&self, height: Option<BlockHeight>) -> Result<u64, GarnetError> {
        Ok(self.snapshot_at(height)?.total_bonded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use garnet_core::{PunishmentKind, ValidatorPubKey};
    use garnet_store::MemorySnapshotStore;
    use proptest::prelude::*;

    use crate::detector::FaultFlag;
    use crate::params::JailingConfig;
    use crate::pool::genesis_pool;

    const INIT_BONDED: u64 = 90_000_000_000_000_000;

    fn key(seed: u8) -> ValidatorPubKey {
        ValidatorPubKey::from_signing_key(&SigningKey::from_bytes(&[seed; 32]))
    }

    fn params() -> NetworkParameters {
        NetworkParameters {
            jailing: JailingConfig {
                block_signing_window: 10,
                missed_block_threshold: 5,
                max_evidence_age: 1_000,
            },
            ..NetworkParameters::default()
        }
    }

    fn ledger(stakes: &[(u8, u64)]) -> StakingLedger<MemorySnapshotStore> {
        let params = params();
        let accounts = stakes
            .iter()
            .map(|&(seed, bonded)| StakingAccount::new_validator(key(seed), bonded))
            .collect();
        let genesis = LedgerSnapshot::genesis(0, accounts, genesis_pool(&params.rewards, 0)).unwrap();
        StakingLedger::from_genesis(params, genesis, MemorySnapshotStore::new()).unwrap()
    }

    #[test]
    fn test_two_epoch_scenario() {
        let mut ledger = ledger(&[(1, INIT_BONDED), (2, INIT_BONDED)]);
        let a = key(1).address();
        let b = key(2).address();

        for h in 1..10 {
            ledger.end_block(h, h).unwrap();
        }
        assert!(ledger.is_epoch_due(10));
        let report = ledger.on_epoch_boundary(10, 10).unwrap();
        assert_eq!(report.distribution.minted, 6_978_080_000);

        let last_bonded = INIT_BONDED + 3_489_040_000;
        assert_eq!(ledger.get_staking_state(&a, None).unwrap().bonded, last_bonded);
        assert_eq!(ledger.get_staking_state(&b, None).unwrap().bonded, last_bonded);

        // b stops signing
        for h in 11..=15 {
            ledger.record_signature(a, h).unwrap();
            ledger.submit_evidence(b, h, FaultType::MissedVote).unwrap();
            let punished = ledger.end_block(h, h).unwrap();
            if h < 15 {
                assert!(punished.is_empty());
            } else {
                assert_eq!(punished.len(), 1);
                assert_eq!(punished[0].kind, PunishmentKind::NonLive);
            }
        }

        let slashed = 18_000_000_697_808_000;
        let jailed = ledger.get_staking_state(&b, None).unwrap();
        assert!(jailed.is_jailed());
        assert_eq!(jailed.bonded, last_bonded - slashed);

        for h in 16..20 {
            ledger.end_block(h, h).unwrap();
        }
        let report = ledger.on_epoch_boundary(20, 20).unwrap();
        assert_eq!(report.distribution.minted, 6_182_420_000);
        assert_eq!(report.distribution.slashed, slashed);

        assert_eq!(
            ledger.get_staking_state(&a, None).unwrap().bonded,
            last_bonded + 6_182_420_000 + slashed
        );
        assert_eq!(ledger.get_staking_state(&b, None).unwrap().bonded, last_bonded - slashed);

        // point-in-time reads
        assert_eq!(ledger.get_staking_state(&a, Some(9)).unwrap().bonded, INIT_BONDED);
        assert_eq!(ledger.get_total_bonded(Some(0)).unwrap(), 2 * INIT_BONDED);
    }

    #[test]
    fn test_unknown_validator_evidence_rejected() {
        let mut ledger = ledger(&[(1, 100)]);
        let stranger = StakingAddress::new([0xab; 20]);
        assert!(matches!(
            ledger.submit_evidence(stranger, 1, FaultType::DuplicateVote),
            Err(GarnetError::UnknownValidator(_))
        ));
        assert!(matches!(
            ledger.record_signature(stranger, 1),
            Err(GarnetError::UnknownValidator(_))
        ));
    }

    #[test]
    fn test_non_monotonic_commit_publishes_nothing() {
        let mut ledger = ledger(&[(1, 100), (2, 100)]);
        ledger.end_block(5, 5).unwrap();
        ledger.submit_evidence(key(1).address(), 5, FaultType::DuplicateVote).unwrap();

        assert!(matches!(
            ledger.end_block(5, 6),
            Err(GarnetError::NonMonotonicHeight { last: 5, got: 5 })
        ));
        assert_eq!(ledger.height(), 5);
        assert_eq!(ledger.pending_evidence(), 1);

        // the evidence is still applied at the next valid commit
        let punished = ledger.end_block(6, 6).unwrap();
        assert_eq!(punished.len(), 1);
    }

    #[test]
    fn test_evidence_ahead_of_tip_applied_when_height_commits() {
        let mut ledger = ledger(&[(1, 1_000), (2, 1_000)]);
        let b = key(2).address();
        assert!(ledger.submit_evidence(b, 2, FaultType::DuplicateVote).unwrap());
        assert!(ledger.end_block(1, 1).unwrap().is_empty());
        assert_eq!(ledger.pending_evidence(), 1);

        assert!(!ledger.submit_evidence(b, 2, FaultType::DuplicateVote).unwrap());
        let punished = ledger.end_block(2, 2).unwrap();
        assert_eq!(punished.len(), 1);
        assert_eq!(punished[0].validator, b);
        assert!(ledger.get_staking_state(&b, None).unwrap().is_jailed());
    }

    #[test]
    fn test_jailed_validator_evidence_ignored() {
        let mut ledger = ledger(&[(1, 1_000), (2, 1_000)]);
        let b = key(2).address();
        ledger.submit_evidence(b, 1, FaultType::DuplicateVote).unwrap();
        ledger.end_block(1, 1).unwrap();
        assert!(!ledger.submit_evidence(b, 2, FaultType::DuplicateVote).unwrap());
        assert!(ledger.end_block(2, 2).unwrap().is_empty());
        assert_eq!(ledger.get_staking_state(&b, None).unwrap().bonded, 800);
    }

    #[test]
    fn test_unjail_after_jail_duration() {
        let mut ledger = ledger(&[(1, 1_000), (2, 1_000)]);
        let b = key(2).address();
        ledger.raise(vec![FaultFlag {
            validator: b,
            evidence_height: 1,
            kind: PunishmentKind::ByzantineFault,
        }]);
        let punished = ledger.end_block(1, 100).unwrap();
        let until = punished[0].jailed_until;

        assert!(matches!(
            ledger.unjail(&b, 2, until - 1),
            Err(GarnetError::JailNotExpired { .. })
        ));
        ledger.unjail(&b, 2, until).unwrap();
        let account = ledger.get_staking_state(&b, None).unwrap();
        assert!(!account.is_jailed());
        assert_eq!(account.validator.voting_power, 800);
    }

    #[test]
    fn test_height_queries() {
        let mut ledger = ledger(&[(1, 100)]).with_retention(3);
        for h in 1..=6 {
            ledger.end_block(h, h).unwrap();
        }
        assert_eq!(ledger.snapshot_at(None).unwrap().height, 6);
        assert_eq!(ledger.snapshot_at(Some(6)).unwrap().height, 6);
        assert_eq!(ledger.snapshot_at(Some(4)).unwrap().height, 4);
        assert!(matches!(
            ledger.snapshot_at(Some(7)),
            Err(GarnetError::HeightUnavailable(7))
        ));
        assert!(matches!(
            ledger.snapshot_at(Some(3)),
            Err(GarnetError::HeightUnavailable(3))
        ));
    }

    #[test]
    fn test_open_resumes_from_store() {
        let mut ledger = ledger(&[(1, INIT_BONDED), (2, INIT_BONDED)]);
        ledger.on_epoch_boundary(10, 10).unwrap();
        let tip = ledger.tip();

        let resumed = StakingLedger::open(params(), ledger.store).unwrap();
        assert_eq!(*resumed.tip(), *tip);
        assert!(!resumed.is_epoch_due(19));
        assert!(resumed.is_epoch_due(20));
    }

    #[test]
    fn test_open_empty_store() {
        assert!(matches!(
            StakingLedger::open(params(), MemorySnapshotStore::new()),
            Err(GarnetError::NotFound(_))
        ));
    }

    #[derive(Debug, Clone)]
    enum Step {
        Miss(u8),
        Equivocate(u8),
        Block,
        Epoch,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (1u8..=4).prop_map(Step::Miss),
            (1u8..=4).prop_map(Step::Equivocate),
            Just(Step::Block),
            Just(Step::Epoch),
        ]
    }

    proptest! {
        #[test]
        fn prop_supply_conserved(
            stakes in proptest::collection::vec(0u64..1_000_000_000_000_000_000, 4),
            steps in proptest::collection::vec(step(), 1..60),
        ) {
            let seeded: Vec<(u8, u64)> = stakes.iter().enumerate().map(|(i, &s)| (i as u8 + 1, s)).collect();
            let mut ledger = ledger(&seeded);
            let mut height = 0;
            for step in steps {
                height += 1;
                match step {
                    Step::Miss(seed) => {
                        ledger.submit_evidence(key(seed).address(), height, FaultType::MissedVote).unwrap();
                        ledger.end_block(height, height).unwrap();
                    }
                    Step::Equivocate(seed) => {
                        ledger.submit_evidence(key(seed).address(), height, FaultType::DuplicateVote).unwrap();
                        ledger.end_block(height, height).unwrap();
                    }
                    Step::Block => {
                        ledger.end_block(height, height).unwrap();
                    }
                    Step::Epoch => {
                        let before = ledger.tip();
                        let report = ledger.on_epoch_boundary(height, height).unwrap();
                        let after = ledger.tip();
                        for (address, account) in &before.accounts {
                            if account.is_jailed() {
                                prop_assert_eq!(after.accounts[address].bonded, account.bonded);
                                prop_assert!(!report.distribution.rewards.contains_key(address));
                            }
                        }
                    }
                }
                let tip = ledger.tip();
                tip.check_invariants().unwrap();
                let sum: u64 = tip.accounts.values().map(|a| a.bonded).sum();
                prop_assert_eq!(sum, tip.total_bonded);
            }
        }
    }
}
