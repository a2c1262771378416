//! Delegator reward withdrawal.

use tracing::{debug, info};

use accrue_core::coins::{Coins, DecCoins};
use accrue_core::error::{DistributionError, InvariantViolation};
use accrue_core::types::Address;

use crate::Ctx;
use crate::cascade::CascadePayout;

/// What a withdrawal paid and where the change went.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WithdrawOutcome {
    /// Integral rewards sent to the delegator's withdraw address.
    pub rewards: Coins,
    /// Referral share as paid by the cascade.
    pub cascade: CascadePayout,
    /// Fractional change credited to the community pool.
    pub community_pool: DecCoins,
}

impl Ctx<'_> {
    /// Settle and pay everything `del` has accrued on `val`.
    ///
    /// Closes the validator's period, clamps the owed amounts to the
    /// outstanding pool, pays the integral parts, and removes the starting
    /// info. Any failed send aborts the whole call.
    pub fn withdraw(&mut self, val: &Address, del: &Address) -> Result<WithdrawOutcome, DistributionError> {
        let starting = self
            .state
            .starting_info(val, del)?
            .ok_or(DistributionError::EmptyDelegationDistInfo {
                validator: *val,
                delegator: *del,
            })?;
        let validator = self.validator(val)?;
        let delegation = self.delegation(val, del)?;

        let ending_period = self.increment_period(val)?;
        let owed = self.calculate_delegation_rewards(&validator, &delegation, &starting, ending_period)?;
        let outstanding = self.state.outstanding_rewards(val)?;

        let rewards = owed.rewards.intersect(&outstanding);
        if rewards != owed.rewards {
            info!(
                validator = %val,
                delegator = %del,
                got = %rewards,
                expected = %owed.rewards,
                "rounding error withdrawing rewards from validator"
            );
        }

        let (coins, mut change) = rewards.truncate_decimal()?;
        if !coins.is_zero() {
            let withdraw_addr = self.state.withdraw_addr(del)?;
            self.send(&withdraw_addr, &coins)?;
        }

        // The referral share draws on what the delegator's share left behind.
        let left = outstanding.checked_sub(&rewards)?;
        let recommanders = owed.recommanders_rewards.intersect(&left);
        if recommanders != owed.recommanders_rewards {
            info!(
                validator = %val,
                delegator = %del,
                got = %recommanders,
                expected = %owed.recommanders_rewards,
                "rounding error withdrawing recommanders rewards from validator"
            );
        }
        let cascade = self.pay_cascade(&validator, &delegation, &recommanders)?;
        change = change.checked_add(&cascade.remainder)?;

        let left = left.checked_sub(&recommanders)?;
        if left.is_any_negative() {
            return Err(InvariantViolation::OutstandingUnderflow(*val).into());
        }
        self.state.set_outstanding_rewards(val, &left)?;
        self.add_to_community_pool(&change)?;

        self.decrement_reference_count(val, starting.previous_period)?;
        self.state.delete_starting_info(val, del)?;

        debug!(
            validator = %val,
            delegator = %del,
            rewards = %coins,
            referral = %recommanders,
            "withdrew delegation rewards"
        );
        Ok(WithdrawOutcome {
            rewards: coins,
            cascade,
            community_pool: change,
        })
    }

    /// [`withdraw`](Self::withdraw), then start a fresh snapshot if the
    /// delegation is still bonded.
    pub fn withdraw_delegation_rewards(
        &mut self,
        val: &Address,
        del: &Address,
    ) -> Result<WithdrawOutcome, DistributionError> {
        let outcome = self.withdraw(val, del)?;
        if self.staking.delegation(del, val).is_some() {
            self.initialize_delegation(val, del)?;
        }
        Ok(outcome)
    }
}
