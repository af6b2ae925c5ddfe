// crates/garnet-daemon/src/scheduler.rs
//
// Block scheduler for the Garnet daemon.
//
// Simulates block production at a configurable wall-clock interval. For
// every block it reports each active validator's vote to the ledger (a
// signature, or a missed vote for validators scripted offline), injects any
// scripted equivocation, and commits the block. Blocks whose chain time
// reaches the next reward period close the epoch instead.

use std::time::Duration;

use garnet_core::error::GarnetError;
use garnet_core::{BlockHeight, FaultType, Timestamp, ValidatorPubKey};
use garnet_economics::{EpochReport, Grt, PunishmentOutcome};

use crate::config::{ChainConfig, SimulationConfig};
use crate::shared::DaemonSharedState;

/// What one committed block did.
#[derive(Debug, Clone)]
pub struct BlockSummary {
    pub height: BlockHeight,
    pub timestamp: Timestamp,
    pub punishments: Vec<PunishmentOutcome>,
    pub epoch: Option<EpochReport>,
}

/// Scheduler that simulates block progression and drives the ledger.
pub struct BlockScheduler {
    shared: DaemonSharedState,
    chain: ChainConfig,
    simulation: SimulationConfig,
    genesis_time: Timestamp,
    /// Stop after this many blocks; run until ctrl-c when `None`.
    max_blocks: Option<u64>,
    produced: u64,
}

impl BlockScheduler {
    pub fn new(
        shared: DaemonSharedState,
        chain: ChainConfig,
        simulation: SimulationConfig,
        genesis_time: Timestamp,
    ) -> Self {
        Self {
            shared,
            chain,
            simulation,
            genesis_time,
            max_blocks: None,
            produced: 0,
        }
    }

    pub fn with_max_blocks(mut self, max_blocks: Option<u64>) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    /// Run the scheduler loop until ctrl-c or the block limit.
    pub async fn run(&mut self) -> Result<(), GarnetError> {
        tracing::info!(
            "Block scheduler started (block_time={}s, interval={}ms)",
            self.chain.block_time_secs,
            self.chain.block_interval_ms
        );
        let interval = Duration::from_millis(self.chain.block_interval_ms);

        loop {
            if let Some(max) = self.max_blocks {
                if self.produced >= max {
                    tracing::info!("Block limit of {} reached", max);
                    break;
                }
            }
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Block scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let summary = self.produce_block().await?;
                    tracing::debug!(
                        "Block {} at {}: {} punished, epoch closed: {}",
                        summary.height,
                        summary.timestamp,
                        summary.punishments.len(),
                        summary.epoch.is_some()
                    );
                }
            }
        }

        Ok(())
    }

    /// Produce and commit the next block.
    pub async fn produce_block(&mut self) -> Result<BlockSummary, GarnetError> {
        let mut ledger = self.shared.ledger.write().await;
        let height = ledger.height() + 1;
        let timestamp = self.chain.block_timestamp(self.genesis_time, height);

        let tip = ledger.tip();
        for account in tip.accounts.values().filter(|a| !a.is_jailed()) {
            let pubkey = &account.validator.pubkey;
            if self.is_offline(pubkey, height) {
                ledger.submit_evidence(account.address, height, FaultType::MissedVote)?;
            } else {
                ledger.record_signature(account.address, height)?;
            }
            if self.equivocates(pubkey, height) {
                ledger.submit_evidence(account.address, height, FaultType::DuplicateVote)?;
            }
        }

        let summary = if ledger.is_epoch_due(timestamp) {
            let report = ledger.on_epoch_boundary(height, timestamp)?;
            let dist = &report.distribution;
            tracing::info!(
                "=== EPOCH {} === (block {}) minted {}, redistributed {} slashed, {} eligible validators",
                dist.epoch,
                height,
                Grt::from_carats(dist.minted),
                Grt::from_carats(dist.slashed),
                dist.rewards.len()
            );
            *self.shared.last_epoch.write().await = Some(report.clone());
            BlockSummary {
                height,
                timestamp,
                punishments: report.punishments.clone(),
                epoch: Some(report),
            }
        } else {
            let punishments = ledger.end_block(height, timestamp)?;
            tracing::trace!("Block {} committed at {}", height, timestamp);
            BlockSummary {
                height,
                timestamp,
                punishments,
                epoch: None,
            }
        };

        for outcome in &summary.punishments {
            tracing::warn!(
                "Validator {} jailed for {} until {}, slashed {}",
                outcome.validator,
                outcome.kind,
                outcome.jailed_until,
                Grt::from_carats(outcome.slashed)
            );
        }
        self.produced += 1;
        Ok(summary)
    }

    fn is_offline(&self, pubkey: &ValidatorPubKey, height: BlockHeight) -> bool {
        self.simulation
            .offline
            .iter()
            .any(|o| o.pubkey == *pubkey && height >= o.from_height)
    }

    fn equivocates(&self, pubkey: &ValidatorPubKey, height: BlockHeight) -> bool {
        self.simulation
            .equivocations
            .iter()
            .any(|e| e.pubkey == *pubkey && e.height == height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_core::{PunishmentKind, SnapshotStore, StakingQuery};
    use garnet_economics::{JailingConfig, StakingLedger};
    use garnet_store::MemorySnapshotStore;

    use crate::config::{DaemonConfig, Equivocation, OfflineValidator};
    use crate::genesis::{build_genesis, dev_validators, DEV_VALIDATOR_BONDED};

    fn scheduler(simulation: SimulationConfig) -> BlockScheduler {
        let mut config = DaemonConfig::default();
        config.params.jailing = JailingConfig {
            block_signing_window: 10,
            missed_block_threshold: 5,
            max_evidence_age: 1_000,
        };
        let genesis = build_genesis(&config).unwrap();
        let genesis_time = genesis.block_time;
        let store: Box<dyn SnapshotStore> = Box::new(MemorySnapshotStore::new());
        let ledger = StakingLedger::from_genesis(config.params.clone(), genesis, store).unwrap();
        BlockScheduler::new(DaemonSharedState::new(ledger), config.chain, simulation, genesis_time)
    }

    #[tokio::test]
    async fn test_epoch_closes_every_period() {
        let mut scheduler = scheduler(SimulationConfig::default());
        for height in 1..10 {
            let summary = scheduler.produce_block().await.unwrap();
            assert_eq!(summary.height, height);
            assert!(summary.epoch.is_none());
        }
        let summary = scheduler.produce_block().await.unwrap();
        let report = summary.epoch.unwrap();
        assert_eq!(report.distribution.minted, 6_978_080_000);

        let last = scheduler.shared.last_epoch.read().await;
        assert_eq!(last.as_ref().unwrap().height, 10);
    }

    #[tokio::test]
    async fn test_offline_validator_is_jailed() {
        let offline = dev_validators()[1].pubkey;
        let mut scheduler = scheduler(SimulationConfig {
            offline: vec![OfflineValidator {
                pubkey: offline,
                from_height: 11,
            }],
            equivocations: Vec::new(),
        });

        let mut punished = Vec::new();
        for _ in 0..20 {
            punished.extend(scheduler.produce_block().await.unwrap().punishments);
        }
        assert_eq!(punished.len(), 1);
        assert_eq!(punished[0].kind, PunishmentKind::NonLive);

        let ledger = scheduler.shared.ledger.read().await;
        let account = ledger.get_staking_state(&offline.address(), None).unwrap();
        assert!(account.is_jailed());
        assert_eq!(
            account.bonded,
            DEV_VALIDATOR_BONDED + 3_489_040_000 - 18_000_000_697_808_000
        );
    }

    #[tokio::test]
    async fn test_equivocation_jails_immediately() {
        let cheater = dev_validators()[0].pubkey;
        let mut scheduler = scheduler(SimulationConfig {
            offline: Vec::new(),
            equivocations: vec![Equivocation {
                pubkey: cheater,
                height: 3,
            }],
        });

        scheduler.produce_block().await.unwrap();
        scheduler.produce_block().await.unwrap();
        let summary = scheduler.produce_block().await.unwrap();
        assert_eq!(summary.punishments.len(), 1);
        assert_eq!(summary.punishments[0].kind, PunishmentKind::ByzantineFault);
    }

    #[tokio::test]
    async fn test_run_stops_at_block_limit() {
        let mut scheduler = scheduler(SimulationConfig::default()).with_max_blocks(Some(3));
        scheduler.chain.block_interval_ms = 1;
        scheduler.run().await.unwrap();
        assert_eq!(scheduler.shared.ledger.read().await.height(), 3);
    }
}
