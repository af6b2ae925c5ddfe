// crates/garnet-economics/src/emission.rs
//
// Monetary expansion: how much new supply a reward epoch mints.
//
// The inflation rate decays with the amount of bonded stake S:
//
//   R = r0 * e^(-S / tau)
//   N = floor(S * ((1 + R)^(period / year) - 1))
//   minted = N - (N mod granularity)
//
// More bonded stake means a lower marginal rate, which keeps inflation from
// running away as stake grows. The power is evaluated as
// expm1((period / year) * ln(1 + R)) in fixed point (see fixed.rs), so every
// node computes bit-identical results. Integer truncation happens only when
// forming N and when rounding to the granularity.

use garnet_core::error::GarnetError;

use crate::fixed::{self, EXP_NEG_CUTOFF, SCALE};
use crate::params::{EpochParameters, PERMILLE, PPM};

/// Annual inflation rate for `bonded` stake under `tau`, in fixed point.
///
/// Returns `r0` for zero stake and zero once `bonded / tau` passes the
/// exponential cutoff.
pub fn decay_rate(bonded: u64, tau: u64, params: &EpochParameters) -> Result<u128, GarnetError> {
    if tau == 0 {
        return Err(GarnetError::InvalidConfig("tau must be > 0".into()));
    }
    let base_rate = fixed::from_ratio(params.base_rate_permille as u128, PERMILLE as u128)?;
    if (bonded / tau) as u128 >= EXP_NEG_CUTOFF {
        return Ok(0);
    }
    let exponent = fixed::from_ratio(bonded as u128, tau as u128)?;
    fixed::mul(base_rate, fixed::exp_neg(exponent)?)
}

/// Unrounded expansion N for one reward period.
pub fn period_expansion(
    bonded: u64,
    tau: u64,
    params: &EpochParameters,
) -> Result<u64, GarnetError> {
    if bonded == 0 {
        return Ok(0);
    }
    let rate = decay_rate(bonded, tau, params)?;
    if rate == 0 {
        return Ok(0);
    }

    // (period / year) * ln(1 + R), one truncation
    let log_growth = fixed::ln_1p(rate)?;
    let exponent = fixed::mul_div(log_growth, params.period as u128, params.year_seconds as u128)
        .ok_or_else(|| GarnetError::ArithmeticOverflow("period exponent".into()))?;
    let growth = fixed::expm1(exponent)?;

    let expansion = fixed::mul_div(bonded as u128, growth, SCALE)
        .ok_or_else(|| GarnetError::ArithmeticOverflow("period expansion".into()))?;
    u64::try_from(expansion).map_err(|_| {
        GarnetError::ArithmeticOverflow(format!("expansion {} exceeds u64", expansion))
    })
}

/// Amount minted for one reward period, rounded down to the granularity.
///
/// Pure: identical inputs always yield identical output.
///
/// # Errors
/// `InvalidConfig` for `tau == 0` or a zero granularity, and
/// `ArithmeticOverflow` if the expansion does not fit in u64.
pub fn monetary_expansion(
    bonded: u64,
    tau: u64,
    params: &EpochParameters,
) -> Result<u64, GarnetError> {
    if params.granularity == 0 {
        return Err(GarnetError::InvalidConfig("granularity must be > 0".into()));
    }
    let expansion = period_expansion(bonded, tau, params)?;
    Ok(expansion - expansion % params.granularity)
}

/// Decay tau after a distribution: `tau * tau_decay_ppm / 10^6`.
pub fn decay_tau(tau: u64, params: &EpochParameters) -> u64 {
    // tau_decay_ppm <= 10^6, so the result never exceeds tau
    ((tau as u128 * params.tau_decay_ppm as u128) / PPM as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INIT_BONDED: u64 = 90_000_000_000_000_000;
    const TAU: u64 = 145_000_000_000_000_000;

    fn params() -> EpochParameters {
        EpochParameters::default()
    }

    #[test]
    fn test_first_epoch_two_validators() {
        let minted = monetary_expansion(2 * INIT_BONDED, TAU, &params()).unwrap();
        assert_eq!(minted, 6_978_080_000);
        assert_eq!(
            period_expansion(2 * INIT_BONDED, TAU, &params()).unwrap(),
            6_978_084_763
        );
    }

    #[test]
    fn test_second_epoch_after_jailing() {
        let last_bonded = INIT_BONDED + 6_978_080_000 / 2;
        let tau = decay_tau(TAU, &params());
        assert_eq!(tau, 144_979_700_000_000_000);
        let minted = monetary_expansion(last_bonded, tau, &params()).unwrap();
        assert_eq!(minted, 6_182_420_000);
    }

    #[test]
    fn test_zero_stake_mints_nothing() {
        assert_eq!(monetary_expansion(0, TAU, &params()).unwrap(), 0);
    }

    #[test]
    fn test_zero_stake_rate_is_base_rate() {
        let rate = decay_rate(0, TAU, &params()).unwrap();
        assert_eq!(rate, 450_000_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_stake_far_beyond_tau_mints_nothing() {
        assert_eq!(decay_rate(10_000_000_000_000_000_000, 1_000_000_000_000_000, &params()).unwrap(), 0);
        assert_eq!(
            monetary_expansion(10_000_000_000_000_000_000, 1_000_000_000_000_000, &params()).unwrap(),
            0
        );
    }

    #[test]
    fn test_small_stake_rounds_to_zero() {
        // 1 carat of stake expands by far less than one granule
        assert_eq!(monetary_expansion(1, TAU, &params()).unwrap(), 0);
    }

    #[test]
    fn test_zero_tau_rejected() {
        assert!(matches!(
            monetary_expansion(1, 0, &params()),
            Err(GarnetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_one_grt_quintillion_reference() {
        // S = 10^18, tau = 1.45e17: N = 144_268_909
        assert_eq!(period_expansion(1_000_000_000_000_000_000, TAU, &params()).unwrap(), 144_268_909);
        assert_eq!(monetary_expansion(1_000_000_000_000_000_000, TAU, &params()).unwrap(), 144_260_000);
    }

    #[test]
    fn test_decay_tau_full_ppm_is_identity() {
        let mut p = params();
        p.tau_decay_ppm = PPM;
        assert_eq!(decay_tau(TAU, &p), TAU);
    }

    proptest! {
        #[test]
        fn prop_expansion_is_deterministic(bonded in 0u64..=u64::MAX, tau in 1u64..=u64::MAX) {
            let a = monetary_expansion(bonded, tau, &params());
            let b = monetary_expansion(bonded, tau, &params());
            prop_assert_eq!(a.ok(), b.ok());
        }

        #[test]
        fn prop_minted_is_multiple_of_granularity(bonded in 0u64..=u64::MAX, tau in 1u64..=u64::MAX) {
            let minted = monetary_expansion(bonded, tau, &params()).unwrap();
            prop_assert_eq!(minted % params().granularity, 0);
            prop_assert!(minted <= period_expansion(bonded, tau, &params()).unwrap());
        }

        #[test]
        fn prop_rate_never_exceeds_base_rate(bonded in 0u64..=u64::MAX, tau in 1u64..=u64::MAX) {
            let rate = decay_rate(bonded, tau, &params()).unwrap();
            prop_assert!(rate <= 450_000_000_000_000_000_000_000_000);
        }

        #[test]
        fn prop_rate_decreases_with_stake(
            bonded in 0u64..1_000_000_000_000_000_000,
            extra in 1_000_000_000u64..1_000_000_000_000_000_000,
        ) {
            let low = decay_rate(bonded, TAU, &params()).unwrap();
            let high = decay_rate(bonded + extra, TAU, &params()).unwrap();
            prop_assert!(high <= low);
        }
    }
}
