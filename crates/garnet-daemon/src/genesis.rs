// crates/garnet-daemon/src/genesis.rs
//
// Genesis snapshot construction from the daemon configuration.

use ed25519_dalek::SigningKey;

use garnet_core::error::GarnetError;
use garnet_core::{LedgerSnapshot, StakingAccount, ValidatorPubKey};
use garnet_economics::pool::genesis_pool;
use garnet_economics::CARATS_PER_GRT;

use crate::config::{DaemonConfig, GenesisValidator};

/// Bonded stake of each dev validator: 900,000,000 GRT.
pub const DEV_VALIDATOR_BONDED: u64 = 900_000_000 * CARATS_PER_GRT;

/// Deterministic two-validator set used when the config names none.
pub fn dev_validators() -> Vec<GenesisValidator> {
    (1u8..=2)
        .map(|seed| GenesisValidator {
            pubkey: ValidatorPubKey::from_signing_key(&SigningKey::from_bytes(&[seed; 32])),
            bonded: DEV_VALIDATOR_BONDED,
        })
        .collect()
}

/// Build the height-0 snapshot.
pub fn build_genesis(config: &DaemonConfig) -> Result<LedgerSnapshot, GarnetError> {
    let genesis_time = config.chain.genesis_timestamp()?;
    let validators = if config.genesis.validators.is_empty() {
        tracing::warn!("No genesis validators configured, using the dev validator set");
        dev_validators()
    } else {
        config.genesis.validators.clone()
    };

    let accounts = validators
        .into_iter()
        .map(|v| StakingAccount::new_validator(v.pubkey, v.bonded))
        .collect();
    LedgerSnapshot::genesis(
        genesis_time,
        accounts,
        genesis_pool(&config.params.rewards, genesis_time),
    )
}
