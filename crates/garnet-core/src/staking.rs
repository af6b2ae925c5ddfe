// crates/garnet-core/src/staking.rs
//
// Staking ledger data model: per-validator accounts, the rewards pool state,
// pending slash records, and the point-in-time LedgerSnapshot that ties them
// together.
//
// A LedgerSnapshot is the complete input and output of every block and epoch
// transition. Published snapshots are never mutated; each transition clones
// the previous one and publishes the result as a new Arc.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GarnetError;
use crate::evidence::PunishmentKind;
use crate::identity::{StakingAddress, ValidatorPubKey};
use crate::{BlockHeight, Timestamp};

/// Consensus-facing information about a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    /// Consensus key the validator signs votes with.
    pub pubkey: ValidatorPubKey,
    /// Equal to `bonded` while active, zero while jailed.
    pub voting_power: u64,
    /// Height of the fault that last got this validator punished.
    pub last_evidence_height: Option<BlockHeight>,
    /// Kind of the last punishment.
    pub last_fault: Option<PunishmentKind>,
}

/// A bonded validator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingAccount {
    pub address: StakingAddress,
    /// Bonded stake in base units.
    pub bonded: u64,
    /// Present iff the account is currently jailed.
    pub jailed_until: Option<Timestamp>,
    pub validator: ValidatorInfo,
}

impl StakingAccount {
    /// Create an active validator account owned by `pubkey`.
    pub fn new_validator(pubkey: ValidatorPubKey, bonded: u64) -> Self {
        Self {
            address: pubkey.address(),
            bonded,
            jailed_until: None,
            validator: ValidatorInfo {
                pubkey,
                voting_power: bonded,
                last_evidence_height: None,
                last_fault: None,
            },
        }
    }

    pub fn is_jailed(&self) -> bool {
        self.jailed_until.is_some()
    }

    /// Eligible for rewards: not jailed and holding stake.
    pub fn is_eligible(&self) -> bool {
        !self.is_jailed() && self.bonded > 0
    }

    /// Remove `amount` from bonded stake.
    ///
    /// # Errors
    /// Returns `GarnetError::InsufficientBalance` if `amount > bonded`; the
    /// account is left untouched.
    pub fn debit(&mut self, amount: u64) -> Result<(), GarnetError> {
        if amount > self.bonded {
            return Err(GarnetError::InsufficientBalance {
                address: self.address,
                requested: amount,
                available: self.bonded,
            });
        }
        self.bonded -= amount;
        self.refresh_voting_power();
        Ok(())
    }

    /// Add `amount` to bonded stake.
    pub fn credit(&mut self, amount: u64) -> Result<(), GarnetError> {
        self.bonded = self.bonded.checked_add(amount).ok_or_else(|| {
            GarnetError::ArithmeticOverflow(format!("crediting {} to {}", amount, self.address))
        })?;
        self.refresh_voting_power();
        Ok(())
    }

    /// Jail the account until `until`, recording the fault that caused it.
    pub fn jail(&mut self, until: Timestamp, evidence_height: BlockHeight, kind: PunishmentKind) {
        self.jailed_until = Some(until);
        self.validator.last_evidence_height = Some(evidence_height);
        self.validator.last_fault = Some(kind);
        self.refresh_voting_power();
    }

    /// Release the account from jail.
    pub fn unjail(&mut self) {
        self.jailed_until = None;
        self.refresh_voting_power();
    }

    fn refresh_voting_power(&mut self) {
        self.validator.voting_power = if self.is_jailed() { 0 } else { self.bonded };
    }
}

/// Stake confiscated from a punished validator, waiting to be redistributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashRecord {
    pub validator: StakingAddress,
    /// Confiscated amount in base units.
    pub amount: u64,
    /// Height at which the slash was applied.
    pub height: BlockHeight,
    pub kind: PunishmentKind,
}

/// Monetary state carried from one reward epoch to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsPoolState {
    /// Current decay time constant. Shrinks after every distribution.
    pub tau: u64,
    /// Supply still mintable under the expansion cap.
    pub remaining: u64,
    /// Undistributed remainder carried into the next epoch.
    pub period_bonus: u64,
    /// Total supply accounted for by the ledger (genesis stake + minted).
    pub issued: u64,
    /// Total minted since genesis.
    pub minted_total: u64,
    /// Block time of the last distribution (genesis time before the first).
    pub last_distribution_time: Timestamp,
    /// Number of completed distributions.
    pub epoch: u64,
}

/// Point-in-time view of the whole staking ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub height: BlockHeight,
    pub block_time: Timestamp,
    pub accounts: BTreeMap<StakingAddress, StakingAccount>,
    /// Sum of all `bonded`, jailed accounts included.
    pub total_bonded: u64,
    pub pool: RewardsPoolState,
    /// Slashes applied since the last distribution.
    pub pending_slashes: Vec<SlashRecord>,
}

impl LedgerSnapshot {
    /// Build the genesis snapshot at height 0.
    ///
    /// The pool's `issued` supply is set to the genesis stake.
    ///
    /// # Errors
    /// Returns `GarnetError::InvalidState` if two accounts share an address.
    pub fn genesis(
        block_time: Timestamp,
        accounts: Vec<StakingAccount>,
        mut pool: RewardsPoolState,
    ) -> Result<Self, GarnetError> {
        let mut map = BTreeMap::new();
        for account in accounts {
            let address = account.address;
            if map.insert(address, account).is_some() {
                return Err(GarnetError::InvalidState(format!(
                    "duplicate genesis account {}",
                    address
                )));
            }
        }

        let total_bonded = checked_sum(map.values().map(|a| a.bonded))?;
        pool.issued = total_bonded;
        pool.last_distribution_time = block_time;

        let snapshot = Self {
            height: 0,
            block_time,
            accounts: map,
            total_bonded,
            pool,
            pending_slashes: Vec::new(),
        };
        snapshot.check_invariants()?;
        Ok(snapshot)
    }

    pub fn account(&self, address: &StakingAddress) -> Option<&StakingAccount> {
        self.accounts.get(address)
    }

    pub fn account_mut(&mut self, address: &StakingAddress) -> Option<&mut StakingAccount> {
        self.accounts.get_mut(address)
    }

    /// Bonded stake of reward-eligible accounts.
    pub fn eligible_bonded(&self) -> Result<u64, GarnetError> {
        checked_sum(
            self.accounts
                .values()
                .filter(|a| a.is_eligible())
                .map(|a| a.bonded),
        )
    }

    /// Sum of slashed amounts waiting for the next distribution.
    pub fn pending_slashed(&self) -> Result<u64, GarnetError> {
        checked_sum(self.pending_slashes.iter().map(|s| s.amount))
    }

    /// Recompute `total_bonded` from the individual balances.
    pub fn recompute_total_bonded(&mut self) -> Result<(), GarnetError> {
        self.total_bonded = checked_sum(self.accounts.values().map(|a| a.bonded))?;
        Ok(())
    }

    /// Verify the ledger invariants:
    /// - `sum(bonded) == total_bonded`
    /// - `total_bonded + pending slashes + period bonus == issued`
    /// - voting power is zero exactly for jailed accounts
    pub fn check_invariants(&self) -> Result<(), GarnetError> {
        let sum = checked_sum(self.accounts.values().map(|a| a.bonded))?;
        if sum != self.total_bonded {
            return Err(GarnetError::InvariantViolation(format!(
                "height {}: sum of bonded {} != total_bonded {}",
                self.height, sum, self.total_bonded
            )));
        }

        let accounted = checked_sum(
            [self.total_bonded, self.pending_slashed()?, self.pool.period_bonus].into_iter(),
        )?;
        if accounted != self.pool.issued {
            return Err(GarnetError::InvariantViolation(format!(
                "height {}: accounted supply {} != issued {}",
                self.height, accounted, self.pool.issued
            )));
        }

        for account in self.accounts.values() {
            let expected = if account.is_jailed() { 0 } else { account.bonded };
            if account.validator.voting_power != expected {
                return Err(GarnetError::InvariantViolation(format!(
                    "height {}: {} has voting power {} (expected {})",
                    self.height, account.address, account.validator.voting_power, expected
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, GarnetError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, GarnetError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Sum u64 values, reporting overflow instead of wrapping.
pub fn checked_sum(mut values: impl Iterator<Item = u64>) -> Result<u64, GarnetError> {
    values.try_fold(0u64, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| GarnetError::ArithmeticOverflow("bonded sum exceeds u64".to_string()))
    })
}
