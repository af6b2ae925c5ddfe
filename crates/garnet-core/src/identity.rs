// crates/garnet-core/src/identity.rs
//
// Validator identities: the ed25519 consensus key a validator signs votes
// with, and the staking address its bonded stake is recorded under.
//
// The staking address is derived from the consensus key as the last 20 bytes
// of sha256(pubkey), so evidence naming a consensus key can always be mapped
// back to the account that gets slashed.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::GarnetError;

/// Length of a staking address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Identity of a staking account. Rendered as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct StakingAddress([u8; ADDRESS_LEN]);

impl StakingAddress {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the staking address owned by a consensus key.
    pub fn from_pubkey(pubkey: &ValidatorPubKey) -> Self {
        let digest = Sha256::digest(pubkey.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for StakingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for StakingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StakingAddress({})", self)
    }
}

impl FromStr for StakingAddress {
    type Err = GarnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw)?;
        let bytes: [u8; ADDRESS_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            GarnetError::Serialization(format!(
                "staking address must be {} bytes, got {}",
                ADDRESS_LEN,
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl From<StakingAddress> for String {
    fn from(addr: StakingAddress) -> Self {
        addr.to_string()
    }
}

impl TryFrom<String> for StakingAddress {
    type Error = GarnetError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A validator's ed25519 consensus public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ValidatorPubKey([u8; 32]);

impl ValidatorPubKey {
    /// Accept a 32-byte key only if it decodes to a valid ed25519 point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, GarnetError> {
        VerifyingKey::from_bytes(&bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_signing_key(key: &SigningKey) -> Self {
        Self(key.verifying_key().to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Staking address owned by this key.
    pub fn address(&self) -> StakingAddress {
        StakingAddress::from_pubkey(self)
    }
}

impl fmt::Display for ValidatorPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ValidatorPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorPubKey({})", self)
    }
}

impl FromStr for ValidatorPubKey {
    type Err = GarnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw)?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|v: Vec<u8>| {
            GarnetError::Crypto(format!("consensus key must be 32 bytes, got {}", v.len()))
        })?;
        Self::from_bytes(bytes)
    }
}

impl From<ValidatorPubKey> for String {
    fn from(key: ValidatorPubKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ValidatorPubKey {
    type Error = GarnetError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
