//! Period ledger.
//!
//! Each validator carries a monotonically increasing period counter. Closing
//! a period folds the open accumulators into a new cumulative reward-ratio
//! checkpoint; rewards owed between any two periods are then one
//! subtraction away. Checkpoints are reference counted and pruned once
//! nothing points at them.

use tracing::{debug, warn};

use accrue_core::coins::DecCoins;
use accrue_core::constants::MAX_REFERENCE_COUNT;
use accrue_core::dec::Dec;
use accrue_core::error::{DistributionError, InvariantViolation};
use accrue_core::types::{
    Address, DelegatorStartingInfo, ValidatorCurrentRewards, ValidatorHistoricalRewards,
    ValidatorSlashEvent,
};

use crate::Ctx;

impl Ctx<'_> {
    /// Set up the records of a newly created validator.
    ///
    /// Period 0 is a zero checkpoint referenced by the open period 1.
    pub fn initialize_validator(&mut self, val: &Address) -> Result<(), DistributionError> {
        let genesis = ValidatorHistoricalRewards {
            reference_count: 1,
            ..ValidatorHistoricalRewards::default()
        };
        self.state.set_historical_rewards(val, 0, &genesis)?;
        self.state.set_current_rewards(val, &ValidatorCurrentRewards::empty(1))?;
        self.state.set_accumulated_commission(val, &DecCoins::new())?;
        self.state.set_outstanding_rewards(val, &DecCoins::new())?;
        debug!(validator = %val, "initialized validator distribution records");
        Ok(())
    }

    pub fn historical_rewards(
        &self,
        val: &Address,
        period: u64,
    ) -> Result<ValidatorHistoricalRewards, DistributionError> {
        self.state
            .historical_rewards(val, period)?
            .ok_or_else(|| InvariantViolation::MissingHistoricalRewards { validator: *val, period }.into())
    }

    pub fn current_rewards(&self, val: &Address) -> Result<ValidatorCurrentRewards, DistributionError> {
        self.state
            .current_rewards(val)?
            .ok_or_else(|| InvariantViolation::MissingCurrentRewards(*val).into())
    }

    /// Close the open period of `val` and return its number.
    ///
    /// The accumulators are divided by the bonded tokens and added to the
    /// previous checkpoint's ratios. A validator with no tokens cannot
    /// carry a ratio, so its accumulators go to the community pool instead.
    pub fn increment_period(&mut self, val: &Address) -> Result<u64, DistributionError> {
        let validator = self.validator(val)?;
        let current = self.current_rewards(val)?;

        let (ratio, recommanders_ratio) = if validator.tokens == 0 {
            let dropped = current.rewards.checked_add(&current.recommanders_rewards)?;
            if !dropped.is_zero() {
                warn!(
                    validator = %val,
                    amount = %dropped,
                    "validator has no tokens, moving period rewards to community pool"
                );
                let outstanding = self.state.outstanding_rewards(val)?.checked_sub(&dropped)?;
                if outstanding.is_any_negative() {
                    return Err(InvariantViolation::OutstandingUnderflow(*val).into());
                }
                self.state.set_outstanding_rewards(val, &outstanding)?;
                self.add_to_community_pool(&dropped)?;
            }
            (DecCoins::new(), DecCoins::new())
        } else {
            let tokens = Dec::from_u128(validator.tokens)?;
            (
                current.rewards.quo_dec_truncate(tokens)?,
                current.recommanders_rewards.quo_dec_truncate(tokens)?,
            )
        };

        let previous_period = current.period.saturating_sub(1);
        let previous = self.historical_rewards(val, previous_period)?;
        self.decrement_reference_count(val, previous_period)?;

        let checkpoint = ValidatorHistoricalRewards {
            cumulative_reward_ratio: previous.cumulative_reward_ratio.checked_add(&ratio)?,
            cumulative_recommanders_reward_ratio: previous
                .cumulative_recommanders_reward_ratio
                .checked_add(&recommanders_ratio)?,
            reference_count: 1,
        };
        self.state.set_historical_rewards(val, current.period, &checkpoint)?;
        self.state
            .set_current_rewards(val, &ValidatorCurrentRewards::empty(current.period + 1))?;

        debug!(validator = %val, period = current.period, "closed validator period");
        Ok(current.period)
    }

    pub fn increment_reference_count(&mut self, val: &Address, period: u64) -> Result<(), DistributionError> {
        let mut historical = self.historical_rewards(val, period)?;
        if historical.reference_count >= MAX_REFERENCE_COUNT {
            return Err(InvariantViolation::ReferenceCountOverflow {
                validator: *val,
                period,
                max: MAX_REFERENCE_COUNT,
            }
            .into());
        }
        historical.reference_count += 1;
        self.state.set_historical_rewards(val, period, &historical)?;
        Ok(())
    }

    /// Drop one reference to a checkpoint, pruning it at zero.
    pub fn decrement_reference_count(&mut self, val: &Address, period: u64) -> Result<(), DistributionError> {
        let mut historical = self.historical_rewards(val, period)?;
        if historical.reference_count == 0 {
            return Err(InvariantViolation::ReferenceCountUnderflow { validator: *val, period }.into());
        }
        historical.reference_count -= 1;
        if historical.reference_count == 0 {
            self.state.delete_historical_rewards(val, period)?;
        } else {
            self.state.set_historical_rewards(val, period, &historical)?;
        }
        Ok(())
    }

    /// Snapshot a delegation's stake against the last closed period.
    ///
    /// The caller must close the validator's period first so the snapshot
    /// starts on a fresh checkpoint.
    pub fn initialize_delegation(&mut self, val: &Address, del: &Address) -> Result<(), DistributionError> {
        let previous_period = self.current_rewards(val)?.period.saturating_sub(1);
        self.increment_reference_count(val, previous_period)?;

        let validator = self.validator(val)?;
        let delegation = self.delegation(val, del)?;
        // Truncated so the snapshot never claims more than was bonded.
        let stake = validator.tokens_from_shares_truncated(delegation.shares)?;

        let info = DelegatorStartingInfo {
            previous_period,
            stake,
            height: self.clock.block_height(),
        };
        self.state.set_starting_info(val, del, &info)?;
        debug!(validator = %val, delegator = %del, period = previous_period, stake = %stake, "initialized delegation");
        Ok(())
    }

    /// Record a slash of `fraction` against `val` at the current height.
    ///
    /// Must run before the staking layer burns the tokens so the closing
    /// period is divided by the pre-slash stake.
    pub fn record_slash(&mut self, val: &Address, fraction: Dec) -> Result<(), DistributionError> {
        if fraction.is_negative() || fraction >= Dec::ONE {
            return Err(InvariantViolation::InvalidSlashFraction(fraction).into());
        }
        let period = self.increment_period(val)?;
        self.increment_reference_count(val, period)?;

        let height = self.clock.block_height();
        let event = ValidatorSlashEvent {
            validator_period: period,
            fraction,
        };
        self.state.set_slash_event(val, height, &event)?;
        debug!(validator = %val, height, period, fraction = %fraction, "recorded slash event");
        Ok(())
    }
}
