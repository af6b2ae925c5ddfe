// crates/garnet-economics/src/params.rs
//
// Network parameters for rewards, slashing and jailing.
//
// Defaults reproduce the reference devnet:
//   - reward period 10 s, tau 1.45e17 carats decaying by 0.99986 per epoch
//   - base inflation rate r0 = 0.45, minted amounts rounded down to 10,000
//   - 20% slash for both byzantine and liveness faults
//
// Every struct deserializes from the daemon's TOML config with per-field
// defaults, so partial `[params.*]` tables are accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use garnet_core::error::GarnetError;

/// Seconds in a 365-day year.
pub const YEAR_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Denominator for parts-per-million ratios.
pub const PPM: u64 = 1_000_000;

/// Denominator for permille rates.
pub const PERMILLE: u64 = 1_000;

/// Reward epoch parameters consumed by monetary expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochParameters {
    /// Reward period in seconds of chain time.
    #[serde(default = "default_period")]
    pub period: u64,
    /// Initial decay time constant, in carats.
    #[serde(default = "default_tau")]
    pub tau: u64,
    /// Base inflation rate r0 in permille (450 = 0.45).
    #[serde(default = "default_base_rate_permille")]
    pub base_rate_permille: u64,
    /// Length of a year in seconds.
    #[serde(default = "default_year_seconds")]
    pub year_seconds: u64,
    /// Minted amounts are rounded down to a multiple of this.
    #[serde(default = "default_granularity")]
    pub granularity: u64,
    /// Factor applied to tau after every distribution, in ppm.
    #[serde(default = "default_tau_decay_ppm")]
    pub tau_decay_ppm: u64,
    /// Total supply that may ever be minted.
    #[serde(default = "default_expansion_cap")]
    pub expansion_cap: u64,
}

fn default_period() -> u64 {
    10
}

fn default_tau() -> u64 {
    145_000_000_000_000_000
}

fn default_base_rate_permille() -> u64 {
    450
}

fn default_year_seconds() -> u64 {
    YEAR_SECONDS
}

fn default_granularity() -> u64 {
    10_000
}

fn default_tau_decay_ppm() -> u64 {
    999_860
}

fn default_expansion_cap() -> u64 {
    5_000_000_000_000_000_000
}

impl Default for EpochParameters {
    fn default() -> Self {
        Self {
            period: default_period(),
            tau: default_tau(),
            base_rate_permille: default_base_rate_permille(),
            year_seconds: default_year_seconds(),
            granularity: default_granularity(),
            tau_decay_ppm: default_tau_decay_ppm(),
            expansion_cap: default_expansion_cap(),
        }
    }
}

impl EpochParameters {
    pub fn validate(&self) -> Result<(), GarnetError> {
        if self.period == 0 {
            return Err(GarnetError::InvalidConfig("reward period must be > 0".into()));
        }
        if self.year_seconds == 0 || self.period > self.year_seconds {
            return Err(GarnetError::InvalidConfig(format!(
                "reward period {} must lie within a year of {} seconds",
                self.period, self.year_seconds
            )));
        }
        if self.tau == 0 {
            return Err(GarnetError::InvalidConfig("tau must be > 0".into()));
        }
        if self.base_rate_permille > PERMILLE {
            return Err(GarnetError::InvalidConfig(format!(
                "base rate {}‰ exceeds 100%",
                self.base_rate_permille
            )));
        }
        if self.granularity == 0 {
            return Err(GarnetError::InvalidConfig("granularity must be > 0".into()));
        }
        if self.tau_decay_ppm == 0 || self.tau_decay_ppm > PPM {
            return Err(GarnetError::InvalidConfig(format!(
                "tau decay {} ppm must be in (0, {}]",
                self.tau_decay_ppm, PPM
            )));
        }
        Ok(())
    }
}

/// Fraction of bonded stake confiscated on punishment, held in ppm.
///
/// Written in config as a decimal string with at most six places: "0.2".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SlashRatio(u64);

impl SlashRatio {
    pub fn from_ppm(ppm: u64) -> Result<Self, GarnetError> {
        if ppm > PPM {
            return Err(GarnetError::InvalidConfig(format!(
                "slash ratio {} ppm exceeds 1.0",
                ppm
            )));
        }
        Ok(Self(ppm))
    }

    pub fn ppm(&self) -> u64 {
        self.0
    }

    /// `floor(amount * ratio)`.
    pub fn apply(&self, amount: u64) -> u64 {
        // ratio <= 1, so the quotient always fits back into u64
        ((amount as u128 * self.0 as u128) / PPM as u128) as u64
    }
}

impl FromStr for SlashRatio {
    type Err = GarnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GarnetError::InvalidConfig(format!("invalid slash ratio {:?}", s));
        let (whole, frac) = match s.trim().split_once('.') {
            Some((w, f)) => (w, f),
            None => (s.trim(), ""),
        };
        if whole.is_empty() || frac.len() > 6 {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let frac_ppm: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<6}", frac).parse().map_err(|_| invalid())?
        };
        let ppm = whole
            .checked_mul(PPM)
            .and_then(|w| w.checked_add(frac_ppm))
            .ok_or_else(invalid)?;
        Self::from_ppm(ppm)
    }
}

impl fmt::Display for SlashRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PPM;
        let frac = self.0 % PPM;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let frac_str = format!("{:06}", frac);
            write!(f, "{}.{}", whole, frac_str.trim_end_matches('0'))
        }
    }
}

impl From<SlashRatio> for String {
    fn from(ratio: SlashRatio) -> Self {
        ratio.to_string()
    }
}

impl TryFrom<String> for SlashRatio {
    type Error = GarnetError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Slashing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingConfig {
    /// Ratio slashed for a duplicate vote.
    #[serde(default = "default_slash_ratio")]
    pub byzantine_slash_ratio: SlashRatio,
    /// Ratio slashed for missing too many votes.
    #[serde(default = "default_slash_ratio")]
    pub liveness_slash_ratio: SlashRatio,
    /// Seconds a punished validator stays jailed before it may unjail.
    #[serde(default = "default_jail_duration")]
    pub jail_duration: u64,
}

fn default_slash_ratio() -> SlashRatio {
    SlashRatio(200_000)
}

fn default_jail_duration() -> u64 {
    // 21 days, the unbonding period of the reference network
    21 * 24 * 60 * 60
}

impl Default for SlashingConfig {
    fn default() -> Self {
        Self {
            byzantine_slash_ratio: default_slash_ratio(),
            liveness_slash_ratio: default_slash_ratio(),
            jail_duration: default_jail_duration(),
        }
    }
}

/// Fault detection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JailingConfig {
    /// Number of most recent heights a validator's missed votes are counted over.
    #[serde(default = "default_block_signing_window")]
    pub block_signing_window: u64,
    /// Missed votes inside the window that make a validator non-live.
    #[serde(default = "default_missed_block_threshold")]
    pub missed_block_threshold: u64,
    /// Evidence older than this many blocks is discarded.
    #[serde(default = "default_max_evidence_age")]
    pub max_evidence_age: u64,
}

fn default_block_signing_window() -> u64 {
    100
}

fn default_missed_block_threshold() -> u64 {
    50
}

fn default_max_evidence_age() -> u64 {
    100_000
}

impl Default for JailingConfig {
    fn default() -> Self {
        Self {
            block_signing_window: default_block_signing_window(),
            missed_block_threshold: default_missed_block_threshold(),
            max_evidence_age: default_max_evidence_age(),
        }
    }
}

impl JailingConfig {
    pub fn validate(&self) -> Result<(), GarnetError> {
        if self.block_signing_window == 0 {
            return Err(GarnetError::InvalidConfig(
                "block signing window must be > 0".into(),
            ));
        }
        if self.missed_block_threshold == 0 || self.missed_block_threshold > self.block_signing_window {
            return Err(GarnetError::InvalidConfig(format!(
                "missed block threshold {} must be in [1, {}]",
                self.missed_block_threshold, self.block_signing_window
            )));
        }
        Ok(())
    }
}

/// All parameters of the staking engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameters {
    #[serde(default)]
    pub rewards: EpochParameters,
    #[serde(default)]
    pub slashing: SlashingConfig,
    #[serde(default)]
    pub jailing: JailingConfig,
}

impl NetworkParameters {
    pub fn validate(&self) -> Result<(), GarnetError> {
        self.rewards.validate()?;
        self.jailing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        NetworkParameters::default().validate().unwrap();
    }

    #[test]
    fn test_year_seconds() {
        assert_eq!(YEAR_SECONDS, 31_536_000);
    }

    #[test]
    fn test_slash_ratio_parse() {
        assert_eq!("0.2".parse::<SlashRatio>().unwrap().ppm(), 200_000);
        assert_eq!("0.000001".parse::<SlashRatio>().unwrap().ppm(), 1);
        assert_eq!("1".parse::<SlashRatio>().unwrap().ppm(), PPM);
        assert_eq!("1.0".parse::<SlashRatio>().unwrap().ppm(), PPM);
        assert_eq!("0".parse::<SlashRatio>().unwrap().ppm(), 0);
    }

    #[test]
    fn test_slash_ratio_rejects_invalid() {
        assert!("1.5".parse::<SlashRatio>().is_err());
        assert!("0.0000001".parse::<SlashRatio>().is_err());
        assert!("-0.1".parse::<SlashRatio>().is_err());
        assert!(".5".parse::<SlashRatio>().is_err());
        assert!("abc".parse::<SlashRatio>().is_err());
    }

    #[test]
    fn test_slash_ratio_display() {
        assert_eq!(SlashRatio::from_ppm(200_000).unwrap().to_string(), "0.2");
        assert_eq!(SlashRatio::from_ppm(PPM).unwrap().to_string(), "1");
        assert_eq!(SlashRatio::from_ppm(10).unwrap().to_string(), "0.00001");
    }

    #[test]
    fn test_slash_ratio_apply_floors() {
        let ratio: SlashRatio = "0.2".parse().unwrap();
        assert_eq!(ratio.apply(90_000_003_489_040_000), 18_000_000_697_808_000);
        assert_eq!(ratio.apply(4), 0);
        assert_eq!(ratio.apply(u64::MAX), u64::MAX / 5);
    }

    #[test]
    fn test_params_from_partial_toml_json() {
        let params: NetworkParameters =
            serde_json::from_str(r#"{"slashing": {"byzantine_slash_ratio": "0.05"}}"#).unwrap();
        assert_eq!(params.slashing.byzantine_slash_ratio.ppm(), 50_000);
        assert_eq!(params.slashing.liveness_slash_ratio.ppm(), 200_000);
        assert_eq!(params.rewards, EpochParameters::default());
    }

    #[test]
    fn test_invalid_rewards_rejected() {
        let mut params = EpochParameters::default();
        params.tau = 0;
        assert!(params.validate().is_err());

        let mut params = EpochParameters::default();
        params.base_rate_permille = 1_001;
        assert!(params.validate().is_err());

        let mut params = EpochParameters::default();
        params.period = YEAR_SECONDS + 1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_invalid_jailing_rejected() {
        let config = JailingConfig {
            block_signing_window: 5,
            missed_block_threshold: 6,
            max_evidence_age: 10,
        };
        assert!(config.validate().is_err());
    }
}
