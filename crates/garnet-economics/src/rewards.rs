// crates/garnet-economics/src/rewards.rs
//
// Reward distribution for the Garnet staking engine.
//
// At every reward epoch the distributable amount is:
//   1. newly minted supply, from monetary expansion over the eligible stake S
//   2. plus every pending slash since the last distribution
//   3. plus the period bonus carried over from the previous epoch
//
// Each eligible (non-jailed) validator receives
// `floor(distributable * bonded / S)`, credited straight to its bonded stake.
// Whatever the floors leave over becomes the next epoch's period bonus. With
// no eligible stake nothing is minted and the whole amount is carried.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use garnet_core::error::GarnetError;
use garnet_core::{LedgerSnapshot, StakingAddress, Timestamp};

use crate::emission::monetary_expansion;
use crate::params::EpochParameters;
use crate::pool;

/// The result of one reward epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDistribution {
    /// Epoch number after this distribution.
    pub epoch: u64,
    /// Eligible bonded stake S the distribution was computed over.
    pub eligible_bonded: u64,
    /// Newly minted supply.
    pub minted: u64,
    /// Slashed stake redistributed.
    pub slashed: u64,
    /// Period bonus carried in from the previous epoch.
    pub carried_in: u64,
    /// Remainder carried into the next epoch.
    pub carried_out: u64,
    /// Reward credited to each eligible validator.
    pub rewards: BTreeMap<StakingAddress, u64>,
}

impl RewardDistribution {
    /// Total credited to validators.
    pub fn distributed(&self) -> u64 {
        self.rewards.values().sum()
    }
}

pub struct RewardDistributor<'a> {
    params: &'a EpochParameters,
}

impl<'a> RewardDistributor<'a> {
    pub fn new(params: &'a EpochParameters) -> Self {
        Self { params }
    }

    /// Run a distribution on `snapshot`, dated `time`.
    ///
    /// Drains the pending slashes, credits rewards, updates the pool (tau,
    /// remaining supply, period bonus, epoch) and `total_bonded`.
    pub fn distribute(
        &self,
        snapshot: &mut LedgerSnapshot,
        time: Timestamp,
    ) -> Result<RewardDistribution, GarnetError> {
        let eligible_bonded = snapshot.eligible_bonded()?;
        let expansion = monetary_expansion(eligible_bonded, snapshot.pool.tau, self.params)?;
        let minted = pool::mint(&mut snapshot.pool, expansion)?;

        let slashed = snapshot.pending_slashed()?;
        snapshot.pending_slashes.clear();
        let carried_in = pool::take_period_bonus(&mut snapshot.pool);

        let distributable = minted
            .checked_add(slashed)
            .and_then(|v| v.checked_add(carried_in))
            .ok_or_else(|| GarnetError::ArithmeticOverflow("distributable amount".into()))?;

        let mut rewards = BTreeMap::new();
        if eligible_bonded > 0 {
            for account in snapshot.accounts.values_mut().filter(|a| a.is_eligible()) {
                // bonded <= S, so the share never exceeds distributable
                let share =
                    (distributable as u128 * account.bonded as u128 / eligible_bonded as u128) as u64;
                account.credit(share)?;
                debug!(validator = %account.address, share, bonded = account.bonded, "reward credited");
                rewards.insert(account.address, share);
            }
        }

        let distributed: u64 = rewards.values().sum();
        let carried_out = distributable - distributed;
        pool::carry(&mut snapshot.pool, carried_out)?;
        pool::finish_epoch(&mut snapshot.pool, self.params, time);
        snapshot.recompute_total_bonded()?;

        info!(
            epoch = snapshot.pool.epoch,
            eligible_bonded,
            minted,
            slashed,
            carried_in,
            carried_out,
            tau = snapshot.pool.tau,
            "rewards distributed"
        );

        Ok(RewardDistribution {
            epoch: snapshot.pool.epoch,
            eligible_bonded,
            minted,
            slashed,
            carried_in,
            carried_out,
            rewards,
        })
    }
}
