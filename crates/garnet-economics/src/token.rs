// crates/garnet-economics/src/token.rs
//
// $GRT display type.
//
// The smallest unit of $GRT is the "carat". 1 GRT = 10^8 carats. All ledger
// accounting uses raw u64 carats; this type only exists for display.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of carats in one GRT. 1 GRT = 10^8 carats.
pub const CARATS_PER_GRT: u64 = 100_000_000;

/// A $GRT amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Grt {
    /// Amount in carats (1 GRT = 10^8 carats).
    pub carats: u64,
}

impl Grt {
    pub fn from_carats(carats: u64) -> Self {
        Self { carats }
    }
}

impl fmt::Display for Grt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.carats / CARATS_PER_GRT;
        let frac = self.carats % CARATS_PER_GRT;
        if frac == 0 {
            write!(f, "{} GRT", whole)
        } else {
            // Up to 8 decimal places, trailing zeros trimmed
            let frac_str = format!("{:08}", frac);
            write!(f, "{}.{} GRT", whole, frac_str.trim_end_matches('0'))
        }
    }
}
