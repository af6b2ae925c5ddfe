// crates/garnet-economics/src/fixed.rs
//
// Deterministic fixed-point arithmetic for the monetary expansion curve.
//
// Every validator must mint bit-identical amounts, so nothing here touches
// platform floating point. Values are unsigned decimals scaled by 10^27 and
// stored in u128; products are formed in 256 bits and divided back down, so
// the only rounding is one truncation per operation.
//
// Functions provided:
//   - exp_neg(x)  = e^(-x)      for any x >= 0 (underflows to 0 past x = 64)
//   - ln_1p(x)    = ln(1 + x)   for any x >= 0 (atanh series)
//   - expm1(x)    = e^x - 1     for small x (Taylor series, no cancellation)

use garnet_core::error::GarnetError;

/// One unit in fixed-point representation (10^27).
pub const SCALE: u128 = 1_000_000_000_000_000_000_000_000_000;

/// floor(e^-1 * 10^27).
pub const E_INV: u128 = 367_879_441_171_442_321_595_523_770;

/// Past this integer part e^(-x) is below 10^-27 and truncates to zero.
pub const EXP_NEG_CUTOFF: u128 = 64;

/// Multiply two u128 values into a 256-bit (hi, lo) pair.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & MASK) + (p10 & MASK);
    let lo = (p00 & MASK) | (mid << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (hi, lo)
}

/// Compute `floor(a * b / d)` without intermediate overflow.
///
/// Returns `None` if `d == 0` or the quotient does not fit in u128.
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (hi, lo) = widening_mul(a, b);
    if hi == 0 {
        return Some(lo / d);
    }
    if hi >= d {
        return None;
    }

    // Schoolbook binary long division of (hi, lo) by d. `hi < d` guarantees
    // the quotient fits in 128 bits.
    let mut rem = hi;
    let mut quotient: u128 = 0;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some(quotient)
}

fn overflow(op: &str) -> GarnetError {
    GarnetError::ArithmeticOverflow(format!("fixed-point {}", op))
}

/// Fixed-point multiplication: `a * b / SCALE`.
pub fn mul(a: u128, b: u128) -> Result<u128, GarnetError> {
    mul_div(a, b, SCALE).ok_or_else(|| overflow("mul"))
}

/// Fixed-point ratio of two integers: `num / den` scaled by SCALE.
pub fn from_ratio(num: u128, den: u128) -> Result<u128, GarnetError> {
    mul_div(num, SCALE, den).ok_or_else(|| overflow("ratio"))
}

/// e^f for 0 <= f < 1, by Taylor series. Every term is positive, so the
/// truncation error is bounded by the number of terms.
fn exp_unit_interval(f: u128) -> Result<u128, GarnetError> {
    let mut sum = SCALE;
    let mut term = SCALE;
    let mut k: u128 = 1;
    loop {
        term = mul(term, f)? / k;
        if term == 0 {
            break;
        }
        sum += term;
        k += 1;
    }
    Ok(sum)
}

/// e^(-x) for fixed-point x >= 0.
///
/// Splits x into integer part n and fraction f:
/// e^(-x) = e^(-f) * (e^-1)^n, with e^(-f) = 1 / e^f.
pub fn exp_neg(x: u128) -> Result<u128, GarnetError> {
    let n = x / SCALE;
    if n >= EXP_NEG_CUTOFF {
        return Ok(0);
    }
    let f = x % SCALE;

    let mut result = mul_div(SCALE, SCALE, exp_unit_interval(f)?).ok_or_else(|| overflow("exp"))?;
    for _ in 0..n {
        result = mul(result, E_INV)?;
        if result == 0 {
            break;
        }
    }
    Ok(result)
}

/// ln(1 + x) for fixed-point x >= 0.
///
/// Uses ln(1 + x) = 2 * atanh(z) with z = x / (2 + x), which lies in [0, 1)
/// and converges quickly for the rates the emission curve produces.
pub fn ln_1p(x: u128) -> Result<u128, GarnetError> {
    if x == 0 {
        return Ok(0);
    }
    let denominator = x
        .checked_add(2 * SCALE)
        .ok_or_else(|| overflow("ln_1p"))?;
    let z = mul_div(x, SCALE, denominator).ok_or_else(|| overflow("ln_1p"))?;
    let z_squared = mul(z, z)?;

    let mut acc: u128 = 0;
    let mut power = z;
    let mut k: u128 = 1;
    loop {
        let term = power / k;
        if term == 0 {
            break;
        }
        acc += term;
        power = mul(power, z_squared)?;
        k += 2;
    }
    acc.checked_mul(2).ok_or_else(|| overflow("ln_1p"))
}

/// e^x - 1 for fixed-point x >= 0, summed directly so that tiny exponents
/// keep full relative precision.
pub fn expm1(x: u128) -> Result<u128, GarnetError> {
    let mut sum: u128 = 0;
    let mut term = SCALE;
    let mut k: u128 = 1;
    loop {
        term = mul(term, x)? / k;
        if term == 0 {
            break;
        }
        sum = sum.checked_add(term).ok_or_else(|| overflow("expm1"))?;
        k += 1;
    }
    Ok(sum)
}
