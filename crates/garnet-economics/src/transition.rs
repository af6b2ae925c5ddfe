// crates/garnet-economics/src/transition.rs
//
// Pure ledger transitions.
//
// Every function here takes the previous snapshot by reference and returns
// a new one; nothing is mutated in place and nothing touches storage. The
// StakingLedger wraps these with fault detection and persistence.
//
// Order inside an epoch transition is fixed: punish first, then distribute.
// Stake slashed at the epoch height is therefore redistributed in that same
// epoch, and the punished validator is already excluded from S.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use garnet_core::error::GarnetError;
use garnet_core::{BlockHeight, Evidence, LedgerSnapshot, StakingAddress, Timestamp};

use crate::detector::{ByzantineFaultDetector, FaultFlag};
use crate::params::{EpochParameters, NetworkParameters};
use crate::rewards::{RewardDistribution, RewardDistributor};
use crate::slashing::{PunishmentOutcome, SlashingEngine};

/// Height and block time at which an epoch boundary is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochTrigger {
    pub height: BlockHeight,
    pub timestamp: Timestamp,
}

/// Everything that happened at a reward epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochReport {
    pub height: BlockHeight,
    pub punishments: Vec<PunishmentOutcome>,
    pub distribution: RewardDistribution,
}

/// Whether a reward epoch is due at `timestamp`.
pub fn is_epoch_due(
    snapshot: &LedgerSnapshot,
    timestamp: Timestamp,
    params: &EpochParameters,
) -> bool {
    timestamp >= snapshot.pool.last_distribution_time.saturating_add(params.period)
}

/// Check that (`height`, `timestamp`) may follow `prev`.
///
/// # Errors
/// `NonMonotonicHeight` unless `height > prev.height`, `NonMonotonicTime` if
/// `timestamp < prev.block_time`.
pub fn check_order(
    prev: &LedgerSnapshot,
    height: BlockHeight,
    timestamp: Timestamp,
) -> Result<(), GarnetError> {
    if height <= prev.height {
        return Err(GarnetError::NonMonotonicHeight {
            last: prev.height,
            got: height,
        });
    }
    if timestamp < prev.block_time {
        return Err(GarnetError::NonMonotonicTime {
            last: prev.block_time,
            got: timestamp,
        });
    }
    Ok(())
}

fn advance(
    prev: &LedgerSnapshot,
    height: BlockHeight,
    timestamp: Timestamp,
) -> Result<LedgerSnapshot, GarnetError> {
    check_order(prev, height, timestamp)?;
    let mut next = prev.clone();
    next.height = height;
    next.block_time = timestamp;
    Ok(next)
}

fn seal(mut next: LedgerSnapshot) -> Result<LedgerSnapshot, GarnetError> {
    next.recompute_total_bonded()?;
    next.check_invariants()?;
    Ok(next)
}

/// Commit an ordinary block: punish the flagged validators.
pub fn apply_block(
    prev: &LedgerSnapshot,
    faults: &[FaultFlag],
    height: BlockHeight,
    timestamp: Timestamp,
    params: &NetworkParameters,
) -> Result<(LedgerSnapshot, Vec<PunishmentOutcome>), GarnetError> {
    let mut next = advance(prev, height, timestamp)?;
    let punishments = SlashingEngine::new(&params.slashing).punish_all(&mut next, faults)?;
    Ok((seal(next)?, punishments))
}

/// Commit a block that closes a reward epoch: punish, then distribute.
pub fn apply_epoch(
    prev: &LedgerSnapshot,
    faults: &[FaultFlag],
    trigger: EpochTrigger,
    params: &NetworkParameters,
) -> Result<(LedgerSnapshot, EpochReport), GarnetError> {
    let mut next = advance(prev, trigger.height, trigger.timestamp)?;
    let punishments = SlashingEngine::new(&params.slashing).punish_all(&mut next, faults)?;
    let distribution =
        RewardDistributor::new(&params.rewards).distribute(&mut next, trigger.timestamp)?;
    let report = EpochReport {
        height: trigger.height,
        punishments,
        distribution,
    };
    Ok((seal(next)?, report))
}

/// Run a whole epoch from raw evidence.
///
/// The evidence is judged by a fresh detector, so missed votes only count
/// towards liveness within this one call. The StakingLedger keeps a
/// long-lived detector instead.
///
/// # Errors
/// `UnknownValidator` if any evidence names an address absent from `prev`,
/// whatever its fault type.
pub fn epoch_transition(
    prev: &LedgerSnapshot,
    evidence: &[Evidence],
    trigger: EpochTrigger,
    params: &NetworkParameters,
) -> Result<(LedgerSnapshot, EpochReport), GarnetError> {
    let mut detector = ByzantineFaultDetector::new(params.jailing.clone());
    for item in evidence {
        if prev.account(&item.validator).is_none() {
            return Err(GarnetError::UnknownValidator(item.validator));
        }
        detector.submit(item.clone());
    }
    let faults = detector.drain_faults(trigger.height);
    let held = detector.pending_evidence();
    if held > 0 {
        warn!(held, height = trigger.height, "evidence above the epoch height ignored");
    }
    apply_epoch(prev, &faults, trigger, params)
}

/// Release a validator from jail.
///
/// # Errors
/// `UnknownValidator`, `NotJailed`, or `JailNotExpired` while
/// `timestamp < jailed_until`.
pub fn apply_unjail(
    prev: &LedgerSnapshot,
    address: &StakingAddress,
    height: BlockHeight,
    timestamp: Timestamp,
) -> Result<LedgerSnapshot, GarnetError> {
    let mut next = advance(prev, height, timestamp)?;
    let account = next
        .account_mut(address)
        .ok_or(GarnetError::UnknownValidator(*address))?;
    let jailed_until = account.jailed_until.ok_or(GarnetError::NotJailed(*address))?;
    if timestamp < jailed_until {
        return Err(GarnetError::JailNotExpired {
            address: *address,
            jailed_until,
        });
    }
    account.unjail();
    info!(validator = %address, height, "validator unjailed");
    seal(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use garnet_core::{FaultType, PunishmentKind, StakingAccount, ValidatorPubKey};

    use crate::pool::genesis_pool;

    const INIT_BONDED: u64 = 90_000_000_000_000_000;

    fn key(seed: u8) -> ValidatorPubKey {
        ValidatorPubKey::from_signing_key(&SigningKey::from_bytes(&[seed; 32]))
    }

    fn genesis() -> LedgerSnapshot {
        let accounts = vec![
            StakingAccount::new_validator(key(1), INIT_BONDED),
            StakingAccount::new_validator(key(2), INIT_BONDED),
        ];
        LedgerSnapshot::genesis(0, accounts, genesis_pool(&EpochParameters::default(), 0)).unwrap()
    }

    fn flag(seed: u8, kind: PunishmentKind) -> FaultFlag {
        FaultFlag {
            validator: key(seed).address(),
            evidence_height: 1,
            kind,
        }
    }

    #[test]
    fn test_block_without_faults_changes_nothing_but_height() {
        let prev = genesis();
        let (next, punished) = apply_block(&prev, &[], 1, 1, &NetworkParameters::default()).unwrap();
        assert!(punished.is_empty());
        assert_eq!(next.height, 1);
        assert_eq!(next.block_time, 1);
        assert_eq!(next.accounts, prev.accounts);
        assert_eq!(prev.height, 0);
    }

    #[test]
    fn test_rejects_non_monotonic_height() {
        let prev = genesis();
        let (next, _) = apply_block(&prev, &[], 2, 1, &NetworkParameters::default()).unwrap();
        assert!(matches!(
            apply_block(&next, &[], 2, 2, &NetworkParameters::default()),
            Err(GarnetError::NonMonotonicHeight { last: 2, got: 2 })
        ));
    }

    #[test]
    fn test_rejects_time_going_backwards() {
        let prev = genesis();
        let (next, _) = apply_block(&prev, &[], 1, 5, &NetworkParameters::default()).unwrap();
        assert!(matches!(
            apply_block(&next, &[], 2, 4, &NetworkParameters::default()),
            Err(GarnetError::NonMonotonicTime { last: 5, got: 4 })
        ));
    }

    #[test]
    fn test_epoch_slashes_before_distributing() {
        let params = NetworkParameters::default();
        let prev = genesis();
        let trigger = EpochTrigger { height: 10, timestamp: 10 };
        let (next, report) =
            apply_epoch(&prev, &[flag(2, PunishmentKind::ByzantineFault)], trigger, &params).unwrap();

        let slashed = INIT_BONDED / 5;
        assert_eq!(report.punishments.len(), 1);
        assert_eq!(report.distribution.slashed, slashed);
        assert_eq!(report.distribution.eligible_bonded, INIT_BONDED);
        let a = next.account(&key(1).address()).unwrap();
        assert_eq!(a.bonded, INIT_BONDED + report.distribution.minted + slashed);
        assert!(next.pending_slashes.is_empty());
    }

    #[test]
    fn test_epoch_transition_from_evidence() {
        let params = NetworkParameters::default();
        let prev = genesis();
        let evidence = vec![
            Evidence::new(key(2).address(), 9, FaultType::DuplicateVote),
            Evidence::new(key(2).address(), 9, FaultType::DuplicateVote),
            Evidence::new(key(1).address(), 9, FaultType::MissedVote),
        ];
        let trigger = EpochTrigger { height: 10, timestamp: 10 };
        let (next, report) = epoch_transition(&prev, &evidence, trigger, &params).unwrap();

        assert_eq!(report.punishments.len(), 1);
        assert_eq!(report.punishments[0].validator, key(2).address());
        assert!(next.account(&key(2).address()).unwrap().is_jailed());
        assert!(!next.account(&key(1).address()).unwrap().is_jailed());
        next.check_invariants().unwrap();
    }

    #[test]
    fn test_epoch_transition_rejects_unknown_validator() {
        let params = NetworkParameters::default();
        let prev = genesis();
        let stranger = StakingAddress::new([0xab; 20]);
        let trigger = EpochTrigger { height: 10, timestamp: 10 };

        // a single miss is below the liveness threshold but must still surface
        let evidence = vec![
            Evidence::new(key(1).address(), 9, FaultType::MissedVote),
            Evidence::new(stranger, 9, FaultType::MissedVote),
        ];
        assert!(matches!(
            epoch_transition(&prev, &evidence, trigger, &params),
            Err(GarnetError::UnknownValidator(addr)) if addr == stranger
        ));

        let evidence = vec![Evidence::new(stranger, 9, FaultType::DuplicateVote)];
        assert!(matches!(
            epoch_transition(&prev, &evidence, trigger, &params),
            Err(GarnetError::UnknownValidator(_))
        ));
    }

    #[test]
    fn test_is_epoch_due() {
        let params = EpochParameters::default();
        let snap = genesis();
        assert!(!is_epoch_due(&snap, 9, &params));
        assert!(is_epoch_due(&snap, 10, &params));
    }

    #[test]
    fn test_unjail_lifecycle() {
        let params = NetworkParameters::default();
        let (jailed, punished) =
            apply_block(&genesis(), &[flag(2, PunishmentKind::NonLive)], 1, 100, &params).unwrap();
        let until = punished[0].jailed_until;
        let addr = key(2).address();

        assert!(matches!(
            apply_unjail(&jailed, &addr, 2, until - 1),
            Err(GarnetError::JailNotExpired { .. })
        ));
        let free = apply_unjail(&jailed, &addr, 2, until).unwrap();
        let account = free.account(&addr).unwrap();
        assert!(!account.is_jailed());
        assert_eq!(account.validator.voting_power, account.bonded);

        assert!(matches!(
            apply_unjail(&free, &addr, 3, until),
            Err(GarnetError::NotJailed(_))
        ));
        assert!(matches!(
            apply_unjail(&free, &StakingAddress::new([0xee; 20]), 3, until),
            Err(GarnetError::UnknownValidator(_))
        ));
    }
}
