//! Addresses and the persisted distribution records.
//!
//! Every record here is stored by the engine under the key layout described
//! in `accrue_distribution::keys` and encoded with bincode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::coins::DecCoins;
use crate::dec::Dec;
use crate::error::StoreError;

/// Length of an account or operator address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account or validator operator address.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, StoreError> {
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| StoreError::MalformedKey(format!("address of length {}", bytes.len())))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Cumulative reward ratios snapshotted when a validator period closes.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ValidatorHistoricalRewards {
    /// Reward per token accrued since the validator was created.
    pub cumulative_reward_ratio: DecCoins,
    /// Referral-eligible reward per token accrued since creation.
    pub cumulative_recommanders_reward_ratio: DecCoins,
    /// Starting infos, slash events, and the open period pointing here.
    pub reference_count: u32,
}

/// Accumulators for the still-open period of a validator.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ValidatorCurrentRewards {
    pub period: u64,
    pub rewards: DecCoins,
    pub recommanders_rewards: DecCoins,
}

impl ValidatorCurrentRewards {
    pub fn empty(period: u64) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }
}

/// Snapshot taken when a delegation's rewards were last settled.
#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct DelegatorStartingInfo {
    pub previous_period: u64,
    pub stake: Dec,
    pub height: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ValidatorSlashEvent {
    pub validator_period: u64,
    pub fraction: Dec,
}

/// Upper bound on what withdrawals from a validator may still draw.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ValidatorOutstandingRewards {
    pub rewards: DecCoins,
}

/// One vesting bucket of delayed validator rewards.
///
/// Times are unix seconds aligned to the delayed-reward unit.
#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ValidatorDelayedReward {
    /// Vesting duration in ticks.
    pub period: u64,
    pub update_time: i64,
    /// Per-denom release per tick, filled in on first release.
    pub unit_per_tick: DecCoins,
    pub remaining_reward: DecCoins,
}

impl ValidatorDelayedReward {
    pub fn new(period: u64, update_time: i64, remaining_reward: DecCoins) -> Self {
        Self {
            period,
            update_time,
            unit_per_tick: DecCoins::new(),
            remaining_reward,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ValidatorDelayedRewardInfo {
    /// Defaults to the unix epoch.
    pub last_processed_bucket_time: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct FeePool {
    pub community_pool: DecCoins,
}
