//! Delayed reward vesting.
//!
//! Part of every minted validator reward is held back in time buckets keyed
//! by the block time truncated to the delayed-reward unit. Each bucket
//! releases linearly over its vesting period, one tick per unit, into the
//! validator's normal reward flow.
//!
//! The vesting period grows with how far a validator's token-per-delegator
//! concentration, scaled by a chain-wide variance factor, sits from 1:
//! `min_delayed_period + floor(max_delayed_interval * |ratio - 1|)`.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use accrue_core::coins::DecCoins;
use accrue_core::dec::Dec;
use accrue_core::error::{ArithmeticError, DistributionError};
use accrue_core::params::Params;
use accrue_core::traits::ValidatorInfo;
use accrue_core::types::{Address, ValidatorDelayedReward};

use crate::Ctx;

/// Start of the bucket containing `time`, in unix seconds.
pub fn delayed_reward_time(time: DateTime<Utc>, unit_secs: u64) -> i64 {
    let unit = i64::try_from(unit_secs.max(1)).unwrap_or(i64::MAX);
    time.timestamp().div_euclid(unit) * unit
}

/// Vesting duration, in ticks, for a new bucket of `validator`.
pub fn compute_vesting_period(
    validator: &ValidatorInfo,
    variance: Dec,
    params: &Params,
) -> Result<u64, DistributionError> {
    let factor = if validator.delegator_count == 0 {
        Dec::ZERO
    } else {
        let per_delegator = Dec::from_u128(validator.tokens)?.quo_int(validator.delegator_count)?;
        per_delegator.mul(variance)?.checked_sub(Dec::ONE)?.abs()?
    };
    let interval = Dec::from_u64(params.max_delayed_interval)
        .mul_truncate(factor)?
        .truncate_int();
    let interval = u64::try_from(interval).map_err(|_| ArithmeticError::Overflow)?;
    Ok(params
        .min_delayed_period
        .checked_add(interval)
        .ok_or(ArithmeticError::Overflow)?)
}

/// Release whatever `bucket` has vested by `now`.
///
/// Returns `None` when no whole tick has passed since the last release;
/// the bucket is then untouched. Otherwise the released amount is removed
/// from the bucket and its update time moves to `now`.
pub fn release_bucket(
    bucket: &mut ValidatorDelayedReward,
    now: i64,
    unit_secs: u64,
) -> Result<Option<DecCoins>, ArithmeticError> {
    let unit = i64::try_from(unit_secs.max(1)).unwrap_or(i64::MAX);
    let ticks = now.saturating_sub(bucket.update_time).div_euclid(unit);
    if ticks <= 0 {
        return Ok(None);
    }

    let balances: Vec<(String, Dec)> = bucket
        .remaining_reward
        .iter()
        .map(|(denom, amount)| (denom.to_string(), amount))
        .collect();

    let mut released = DecCoins::new();
    for (denom, remaining) in balances {
        let mut per_tick = bucket.unit_per_tick.amount_of(&denom);
        if per_tick.is_zero() {
            per_tick = if bucket.period == 0 {
                remaining
            } else {
                remaining.quo_int(bucket.period)?
            };
            // Dust too small to split releases in one go.
            if per_tick.is_zero() {
                per_tick = remaining;
            }
            bucket.unit_per_tick.insert(&denom, per_tick);
        }

        // An overflowing product is past `remaining` anyway, which caps it.
        let amount = per_tick
            .mul_int(i128::from(ticks))
            .map_or(remaining, |due| due.min(remaining));
        bucket.remaining_reward.insert(&denom, remaining.checked_sub(amount)?);
        released.insert(&denom, amount);
    }

    bucket.update_time = now;
    Ok(Some(released))
}

impl Ctx<'_> {
    fn current_bucket_time(&self) -> i64 {
        delayed_reward_time(self.clock.block_time(), self.params.delayed_reward_unit_secs)
    }

    pub fn vesting_period(&self, val: &Address, variance: Dec) -> Result<u64, DistributionError> {
        let validator = self.validator(val)?;
        compute_vesting_period(&validator, variance, self.params)
    }

    /// Allocate `tokens` to `val`, holding back the delayed proportion.
    ///
    /// The immediate part is allocated right away. The delayed part joins
    /// the bucket for the current block time, creating it with a freshly
    /// computed vesting period if needed.
    pub fn allocate_with_delay(
        &mut self,
        val: &Address,
        tokens: &DecCoins,
        variance: Dec,
    ) -> Result<(), DistributionError> {
        let delayed = tokens.mul_dec(self.params.delayed_reward_proportion)?;
        let immediate = tokens.checked_sub(&delayed)?;
        self.allocate_tokens_to_validator(val, &immediate)?;

        if delayed.is_zero() {
            return Ok(());
        }

        let bucket_time = self.current_bucket_time();
        let bucket = match self.state.delayed_reward(val, bucket_time)? {
            Some(mut bucket) => {
                bucket.remaining_reward = bucket.remaining_reward.checked_add(&delayed)?;
                bucket
            }
            None => {
                let period = self.vesting_period(val, variance)?;
                ValidatorDelayedReward::new(period, bucket_time, delayed.clone())
            }
        };
        self.state.set_delayed_reward(val, bucket_time, &bucket)?;

        debug!(
            validator = %val,
            bucket = bucket_time,
            period = bucket.period,
            delayed = %delayed,
            "enqueued delayed reward"
        );
        Ok(())
    }

    /// Release vested rewards of `val` into its normal reward flow.
    ///
    /// Runs at most once per bucket unit; returns what was released.
    pub fn release_due(&mut self, val: &Address) -> Result<DecCoins, DistributionError> {
        let now = self.current_bucket_time();
        let mut info = self.state.delayed_reward_info(val)?;
        if now <= info.last_processed_bucket_time {
            return Ok(DecCoins::new());
        }

        let unit = self.params.delayed_reward_unit_secs;
        let mut released = DecCoins::new();
        let mut touched = Vec::new();
        for entry in self.state.delayed_rewards_of(val) {
            let (bucket_time, mut bucket) = entry?;
            if let Some(amount) = release_bucket(&mut bucket, now, unit)? {
                released = released.checked_add(&amount)?;
                touched.push((bucket_time, bucket));
            }
        }

        for (bucket_time, bucket) in touched {
            if bucket.remaining_reward.is_zero() {
                self.state.delete_delayed_reward(val, bucket_time)?;
            } else {
                self.state.set_delayed_reward(val, bucket_time, &bucket)?;
            }
        }

        if !released.is_zero() {
            if self.staking.validator(val).is_some() {
                self.allocate_tokens_to_validator(val, &released)?;
            } else {
                warn!(
                    validator = %val,
                    amount = %released,
                    "validator gone, moving released delayed rewards to community pool"
                );
                self.add_to_community_pool(&released)?;
            }
            debug!(validator = %val, released = %released, "released delayed rewards");
        }

        info.last_processed_bucket_time = now;
        self.state.set_delayed_reward_info(val, &info)?;
        Ok(released)
    }

    /// Remove every vesting bucket of a removed validator, crediting the
    /// unreleased total to the community pool.
    pub fn drain_delayed_rewards(&mut self, val: &Address) -> Result<DecCoins, DistributionError> {
        let mut total = DecCoins::new();
        let mut times = Vec::new();
        for entry in self.state.delayed_rewards_of(val) {
            let (bucket_time, bucket) = entry?;
            total = total.checked_add(&bucket.remaining_reward)?;
            times.push(bucket_time);
        }
        for bucket_time in times {
            self.state.delete_delayed_reward(val, bucket_time)?;
        }
        self.state.delete_delayed_reward_info(val)?;
        self.add_to_community_pool(&total)?;
        debug!(validator = %val, drained = %total, "drained delayed rewards");
        Ok(total)
    }
}
