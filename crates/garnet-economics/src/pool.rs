// crates/garnet-economics/src/pool.rs
//
// Rewards pool management.
//
// The pool state lives inside every LedgerSnapshot and tracks:
//   - the remaining mintable supply under the expansion cap
//   - the decaying tau used by monetary expansion
//   - the period bonus: amounts that could not be split evenly and are
//     carried into the next distribution
//   - the issued supply, used for the ledger's supply invariant

use garnet_core::error::GarnetError;
use garnet_core::staking::RewardsPoolState;
use garnet_core::Timestamp;

use crate::emission::decay_tau;
use crate::params::EpochParameters;

/// Pool state for a fresh chain. `issued` is filled in by the genesis snapshot.
pub fn genesis_pool(params: &EpochParameters, genesis_time: Timestamp) -> RewardsPoolState {
    RewardsPoolState {
        tau: params.tau,
        remaining: params.expansion_cap,
        period_bonus: 0,
        issued: 0,
        minted_total: 0,
        last_distribution_time: genesis_time,
        epoch: 0,
    }
}

/// Mint up to `amount` from the remaining supply.
///
/// Returns the amount actually minted, which is smaller than requested once
/// the expansion cap is nearly exhausted.
pub fn mint(pool: &mut RewardsPoolState, amount: u64) -> Result<u64, GarnetError> {
    let minted = amount.min(pool.remaining);
    pool.remaining -= minted;
    pool.minted_total = pool
        .minted_total
        .checked_add(minted)
        .ok_or_else(|| GarnetError::ArithmeticOverflow("minted total".into()))?;
    pool.issued = pool
        .issued
        .checked_add(minted)
        .ok_or_else(|| GarnetError::ArithmeticOverflow("issued supply".into()))?;
    Ok(minted)
}

/// Take the carried period bonus out of the pool for distribution.
pub fn take_period_bonus(pool: &mut RewardsPoolState) -> u64 {
    std::mem::take(&mut pool.period_bonus)
}

/// Carry an undistributed remainder into the next epoch.
pub fn carry(pool: &mut RewardsPoolState, amount: u64) -> Result<(), GarnetError> {
    pool.period_bonus = pool
        .period_bonus
        .checked_add(amount)
        .ok_or_else(|| GarnetError::ArithmeticOverflow("period bonus".into()))?;
    Ok(())
}

/// Close out a distribution: decay tau and advance the epoch counter.
pub fn finish_epoch(pool: &mut RewardsPoolState, params: &EpochParameters, time: Timestamp) {
    pool.tau = decay_tau(pool.tau, params).max(1);
    pool.last_distribution_time = time;
    pool.epoch += 1;
}
