// crates/garnet-economics/src/slashing.rs
//
// Punishment of faulty validators.
//
// Both fault kinds jail the validator and confiscate a configured fraction
// of its bonded stake:
//   - ByzantineFault (duplicate vote): `byzantine_slash_ratio`
//   - NonLive (missed votes):          `liveness_slash_ratio`
//
// The validator stays jailed until `block_time + jail_duration`. Jailed
// validators earn no rewards and are not punished again until unjailed.
// Confiscated stake is parked as a pending SlashRecord and redistributed to
// the eligible validators at the next reward epoch.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use garnet_core::error::GarnetError;
use garnet_core::{BlockHeight, LedgerSnapshot, PunishmentKind, SlashRecord, StakingAddress, Timestamp};

use crate::detector::FaultFlag;
use crate::params::{SlashRatio, SlashingConfig};

/// What happened to a punished validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentOutcome {
    pub validator: StakingAddress,
    pub kind: PunishmentKind,
    /// Stake actually confiscated.
    pub slashed: u64,
    pub jailed_until: Timestamp,
    pub evidence_height: BlockHeight,
}

/// Applies jail and slash to a ledger snapshot under construction.
pub struct SlashingEngine<'a> {
    config: &'a SlashingConfig,
}

impl<'a> SlashingEngine<'a> {
    pub fn new(config: &'a SlashingConfig) -> Self {
        Self { config }
    }

    pub fn ratio_for(&self, kind: PunishmentKind) -> SlashRatio {
        match kind {
            PunishmentKind::ByzantineFault => self.config.byzantine_slash_ratio,
            PunishmentKind::NonLive => self.config.liveness_slash_ratio,
        }
    }

    /// Punish the validator named by `flag`.
    ///
    /// Uses `snapshot.height` as the slash height and `snapshot.block_time` as
    /// the start of the jail period. Returns `Ok(None)` if the validator is
    /// already jailed.
    ///
    /// # Errors
    /// `UnknownValidator` if the address is not in the ledger.
    pub fn punish(
        &self,
        snapshot: &mut LedgerSnapshot,
        flag: &FaultFlag,
    ) -> Result<Option<PunishmentOutcome>, GarnetError> {
        let height = snapshot.height;
        let now = snapshot.block_time;
        let jailed_until = now.saturating_add(self.config.jail_duration);
        let ratio = self.ratio_for(flag.kind);

        let account = snapshot
            .account_mut(&flag.validator)
            .ok_or(GarnetError::UnknownValidator(flag.validator))?;

        if account.is_jailed() {
            debug!(validator = %flag.validator, kind = %flag.kind, "already jailed, not punished again");
            return Ok(None);
        }

        let requested = ratio.apply(account.bonded);
        let slashed = match account.debit(requested) {
            Ok(()) => requested,
            Err(GarnetError::InsufficientBalance { available, .. }) => {
                warn!(
                    validator = %flag.validator,
                    requested,
                    available,
                    "slash exceeds bonded stake, clamping"
                );
                account.debit(available)?;
                available
            }
            Err(e) => return Err(e),
        };
        account.jail(jailed_until, flag.evidence_height, flag.kind);

        snapshot.total_bonded = snapshot
            .total_bonded
            .checked_sub(slashed)
            .ok_or_else(|| GarnetError::InvariantViolation("slash exceeds total bonded".into()))?;
        if slashed > 0 {
            snapshot.pending_slashes.push(SlashRecord {
                validator: flag.validator,
                amount: slashed,
                height,
                kind: flag.kind,
            });
        }

        info!(
            validator = %flag.validator,
            kind = %flag.kind,
            ratio = %ratio,
            slashed,
            jailed_until,
            height,
            "validator jailed and slashed"
        );

        Ok(Some(PunishmentOutcome {
            validator: flag.validator,
            kind: flag.kind,
            slashed,
            jailed_until,
            evidence_height: flag.evidence_height,
        }))
    }

    /// Punish every flagged validator in order.
    pub fn punish_all(
        &self,
        snapshot: &mut LedgerSnapshot,
        flags: &[FaultFlag],
    ) -> Result<Vec<PunishmentOutcome>, GarnetError> {
        let mut outcomes = Vec::new();
        for flag in flags {
            if let Some(outcome) = self.punish(snapshot, flag)? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }
}
