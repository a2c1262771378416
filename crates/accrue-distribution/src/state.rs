//! Typed access to the distribution records in a [`KvStore`].

use bincode::{Decode, Encode};

use accrue_core::coins::DecCoins;
use accrue_core::error::StoreError;
use accrue_core::kv::KvStore;
use accrue_core::types::{
    Address, DelegatorStartingInfo, FeePool, ValidatorCurrentRewards, ValidatorDelayedReward,
    ValidatorDelayedRewardInfo, ValidatorHistoricalRewards, ValidatorOutstandingRewards,
    ValidatorSlashEvent,
};

use crate::keys;

fn encode<T: Encode>(value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode<T: Decode<()>>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| StoreError::Codec(e.to_string()))
}

/// Distribution records over a borrowed store.
pub struct DistributionState<'a> {
    kv: &'a mut dyn KvStore,
}

impl<'a> DistributionState<'a> {
    pub fn new(kv: &'a mut dyn KvStore) -> Self {
        Self { kv }
    }

    fn load<T: Decode<()>>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        self.kv.get(key)?.map(|bytes| decode(&bytes)).transpose()
    }

    fn store<T: Encode>(&mut self, key: &[u8], value: &T) -> Result<(), StoreError> {
        self.kv.put(key, &encode(value)?)
    }

    // --- Outstanding rewards ---

    pub fn outstanding_rewards(&self, val: &Address) -> Result<DecCoins, StoreError> {
        let record: Option<ValidatorOutstandingRewards> = self.load(&keys::outstanding_rewards(val))?;
        Ok(record.map(|r| r.rewards).unwrap_or_default())
    }

    pub fn set_outstanding_rewards(&mut self, val: &Address, rewards: &DecCoins) -> Result<(), StoreError> {
        let record = ValidatorOutstandingRewards {
            rewards: rewards.clone(),
        };
        self.store(&keys::outstanding_rewards(val), &record)
    }

    // --- Historical and current rewards ---

    pub fn historical_rewards(
        &self,
        val: &Address,
        period: u64,
    ) -> Result<Option<ValidatorHistoricalRewards>, StoreError> {
        self.load(&keys::historical_rewards(val, period))
    }

    pub fn set_historical_rewards(
        &mut self,
        val: &Address,
        period: u64,
        rewards: &ValidatorHistoricalRewards,
    ) -> Result<(), StoreError> {
        self.store(&keys::historical_rewards(val, period), rewards)
    }

    pub fn delete_historical_rewards(&mut self, val: &Address, period: u64) -> Result<(), StoreError> {
        self.kv.delete(&keys::historical_rewards(val, period))
    }

    /// Number of historical checkpoints still stored for `val`.
    pub fn historical_rewards_count(&self, val: &Address) -> Result<usize, StoreError> {
        let mut count = 0;
        for entry in self.kv.prefix(&keys::historical_rewards_prefix(val)) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    pub fn current_rewards(&self, val: &Address) -> Result<Option<ValidatorCurrentRewards>, StoreError> {
        self.load(&keys::current_rewards(val))
    }

    pub fn set_current_rewards(
        &mut self,
        val: &Address,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<(), StoreError> {
        self.store(&keys::current_rewards(val), rewards)
    }

    // --- Delegator starting info ---

    pub fn starting_info(
        &self,
        val: &Address,
        del: &Address,
    ) -> Result<Option<DelegatorStartingInfo>, StoreError> {
        self.load(&keys::starting_info(val, del))
    }

    pub fn set_starting_info(
        &mut self,
        val: &Address,
        del: &Address,
        info: &DelegatorStartingInfo,
    ) -> Result<(), StoreError> {
        self.store(&keys::starting_info(val, del), info)
    }

    pub fn delete_starting_info(&mut self, val: &Address, del: &Address) -> Result<(), StoreError> {
        self.kv.delete(&keys::starting_info(val, del))
    }

    // --- Slash events ---

    pub fn set_slash_event(
        &mut self,
        val: &Address,
        height: u64,
        event: &ValidatorSlashEvent,
    ) -> Result<(), StoreError> {
        self.store(&keys::slash_event(val, height, event.validator_period), event)
    }

    /// Slash events of `val` with `start_height <= height <= end_height`,
    /// ascending by height then period.
    pub fn slash_events_between(
        &self,
        val: &Address,
        start_height: u64,
        end_height: u64,
    ) -> impl Iterator<Item = Result<(u64, ValidatorSlashEvent), StoreError>> + '_ {
        let start = keys::slash_events_from_height(val, start_height);
        let iter = match end_height.checked_add(1) {
            Some(next) => self.kv.range(&start, Some(&keys::slash_events_from_height(val, next))),
            None => self.kv.prefix(&keys::slash_events_prefix(val)),
        };
        iter.map(|entry| -> Result<(u64, ValidatorSlashEvent), StoreError> {
            let (key, value) = entry?;
            let (_, height, _) = keys::split_slash_event_key(&key)?;
            Ok((height, decode(&value)?))
        })
    }

    // --- Commission ---

    pub fn accumulated_commission(&self, val: &Address) -> Result<DecCoins, StoreError> {
        Ok(self.load(&keys::accumulated_commission(val))?.unwrap_or_default())
    }

    pub fn set_accumulated_commission(
        &mut self,
        val: &Address,
        commission: &DecCoins,
    ) -> Result<(), StoreError> {
        self.store(&keys::accumulated_commission(val), commission)
    }

    // --- Delayed rewards ---

    pub fn delayed_reward(
        &self,
        val: &Address,
        bucket_time: i64,
    ) -> Result<Option<ValidatorDelayedReward>, StoreError> {
        self.load(&keys::delayed_reward(val, bucket_time))
    }

    pub fn set_delayed_reward(
        &mut self,
        val: &Address,
        bucket_time: i64,
        reward: &ValidatorDelayedReward,
    ) -> Result<(), StoreError> {
        self.store(&keys::delayed_reward(val, bucket_time), reward)
    }

    pub fn delete_delayed_reward(&mut self, val: &Address, bucket_time: i64) -> Result<(), StoreError> {
        self.kv.delete(&keys::delayed_reward(val, bucket_time))
    }

    /// Open vesting buckets of `val`, ascending by bucket time.
    pub fn delayed_rewards_of(
        &self,
        val: &Address,
    ) -> impl Iterator<Item = Result<(i64, ValidatorDelayedReward), StoreError>> + '_ {
        self.kv
            .prefix(&keys::delayed_rewards_prefix(val))
            .map(|entry| -> Result<(i64, ValidatorDelayedReward), StoreError> {
                let (key, value) = entry?;
                let (_, bucket_time) = keys::split_delayed_reward_key(&key)?;
                Ok((bucket_time, decode(&value)?))
            })
    }

    pub fn delayed_reward_info(&self, val: &Address) -> Result<ValidatorDelayedRewardInfo, StoreError> {
        Ok(self.load(&keys::delayed_reward_info(val))?.unwrap_or_default())
    }

    pub fn set_delayed_reward_info(
        &mut self,
        val: &Address,
        info: &ValidatorDelayedRewardInfo,
    ) -> Result<(), StoreError> {
        self.store(&keys::delayed_reward_info(val), info)
    }

    pub fn delete_delayed_reward_info(&mut self, val: &Address) -> Result<(), StoreError> {
        self.kv.delete(&keys::delayed_reward_info(val))
    }

    // --- Fee pool ---

    pub fn fee_pool(&self) -> Result<FeePool, StoreError> {
        Ok(self.load(keys::FEE_POOL_KEY)?.unwrap_or_default())
    }

    pub fn set_fee_pool(&mut self, pool: &FeePool) -> Result<(), StoreError> {
        self.store(keys::FEE_POOL_KEY, pool)
    }

    // --- Withdraw address ---

    /// Configured withdraw address of `del`, defaulting to `del` itself.
    pub fn withdraw_addr(&self, del: &Address) -> Result<Address, StoreError> {
        Ok(self.load(&keys::withdraw_addr(del))?.unwrap_or(*del))
    }

    pub fn set_withdraw_addr(&mut self, del: &Address, addr: &Address) -> Result<(), StoreError> {
        self.store(&keys::withdraw_addr(del), addr)
    }

    pub fn delete_withdraw_addr(&mut self, del: &Address) -> Result<(), StoreError> {
        self.kv.delete(&keys::withdraw_addr(del))
    }
}
