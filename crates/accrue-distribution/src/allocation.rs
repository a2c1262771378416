//! Reward allocation, validator commission, and withdraw addresses.

use tracing::debug;

use accrue_core::coins::{Coins, DecCoins};
use accrue_core::error::{DistributionError, InvariantViolation};
use accrue_core::types::Address;

use crate::Ctx;

impl Ctx<'_> {
    /// Credit freshly minted `tokens` to `val`.
    ///
    /// The commission and referral shares are taken at the validator's
    /// rates, truncated; delegators share the rest. Outstanding grows by the
    /// full amount.
    pub fn allocate_tokens_to_validator(&mut self, val: &Address, tokens: &DecCoins) -> Result<(), DistributionError> {
        let validator = self.validator(val)?;
        let rule = &validator.commission_rule;

        let commission = tokens.mul_dec_truncate(rule.validator_rate)?;
        let recommanders = tokens.mul_dec_truncate(rule.recommanders_rate)?;
        let shared = tokens.checked_sub(&commission)?.checked_sub(&recommanders)?;

        let accumulated = self.state.accumulated_commission(val)?.checked_add(&commission)?;
        self.state.set_accumulated_commission(val, &accumulated)?;

        let mut current = self.current_rewards(val)?;
        current.rewards = current.rewards.checked_add(&shared)?;
        current.recommanders_rewards = current.recommanders_rewards.checked_add(&recommanders)?;
        self.state.set_current_rewards(val, &current)?;

        let outstanding = self.state.outstanding_rewards(val)?.checked_add(tokens)?;
        self.state.set_outstanding_rewards(val, &outstanding)?;

        debug!(
            validator = %val,
            commission = %commission,
            recommanders = %recommanders,
            shared = %shared,
            "allocated tokens to validator"
        );
        Ok(())
    }

    pub fn accumulated_commission(&self, val: &Address) -> Result<DecCoins, DistributionError> {
        Ok(self.state.accumulated_commission(val)?)
    }

    /// Pay the integral part of the accumulated commission to the
    /// operator's withdraw address; the fraction stays accumulated.
    pub fn withdraw_validator_commission(&mut self, val: &Address) -> Result<Coins, DistributionError> {
        let validator = self.validator(val)?;
        let accumulated = self.state.accumulated_commission(val)?;
        let (commission, change) = accumulated.truncate_decimal()?;
        if commission.is_zero() {
            return Err(DistributionError::NoValidatorCommission);
        }

        self.state.set_accumulated_commission(val, &change)?;
        let outstanding = self
            .state
            .outstanding_rewards(val)?
            .checked_sub(&commission.to_dec_coins()?)?;
        if outstanding.is_any_negative() {
            return Err(InvariantViolation::OutstandingUnderflow(*val).into());
        }
        self.state.set_outstanding_rewards(val, &outstanding)?;

        let withdraw_addr = self.state.withdraw_addr(&validator.operator_account)?;
        self.send(&withdraw_addr, &commission)?;
        debug!(validator = %val, commission = %commission, "withdrew validator commission");
        Ok(commission)
    }

    /// Route future withdrawals of `del` to `addr`.
    ///
    /// Pointing it back at `del` itself clears the record.
    pub fn set_withdraw_addr(&mut self, del: &Address, addr: &Address) -> Result<(), DistributionError> {
        if !self.params.withdraw_addr_enabled {
            return Err(DistributionError::WithdrawAddrDisabled);
        }
        if addr == del {
            self.state.delete_withdraw_addr(del)?;
        } else {
            self.state.set_withdraw_addr(del, addr)?;
        }
        Ok(())
    }

    pub fn withdraw_addr(&self, del: &Address) -> Result<Address, DistributionError> {
        Ok(self.state.withdraw_addr(del)?)
    }
}

#[cfg(test)]
mod tests {
    use accrue_core::commission::ReallocatedCommissionRule;
    use accrue_core::dec::Dec;
    use accrue_core::kv::MemoryKv;
    use accrue_core::params::Params;
    use accrue_core::testing::{MockStaking, RecordingLedger, addr};
    use accrue_core::traits::BlockInfo;
    use chrono::DateTime;

    use super::*;

    const DENOM: &str = "acc";

    fn staking() -> MockStaking {
        let mut staking = MockStaking::new();
        let rule = ReallocatedCommissionRule::new("0.1".parse().unwrap(), "0.05".parse().unwrap(), Vec::new());
        staking.add_validator(addr(1), rule);
        staking.delegate(addr(2), addr(1), 50, None);
        staking
    }

    fn clock() -> BlockInfo {
        BlockInfo::new(2, DateTime::from_timestamp(1_700_000_000, 0).unwrap())
    }

    #[test]
    fn allocation_splits_by_commission_rule() {
        let staking = staking();
        let mut kv = MemoryKv::new();
        let mut ledger = RecordingLedger::new();
        let clock = clock();
        let params = Params::default();
        let mut ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);
        ctx.initialize_validator(&addr(1)).unwrap();

        let tokens = DecCoins::single(DENOM, "33.3".parse().unwrap());
        ctx.allocate_tokens_to_validator(&addr(1), &tokens).unwrap();

        let current = ctx.current_rewards(&addr(1)).unwrap();
        assert_eq!(ctx.accumulated_commission(&addr(1)).unwrap().amount_of(DENOM), "3.33".parse().unwrap());
        assert_eq!(current.recommanders_rewards.amount_of(DENOM), "1.665".parse().unwrap());
        assert_eq!(current.rewards.amount_of(DENOM), "28.305".parse().unwrap());
        assert_eq!(ctx.outstanding_rewards(&addr(1)).unwrap(), tokens);
    }

    #[test]
    fn commission_withdrawal_keeps_fraction() {
        let staking = staking();
        let mut kv = MemoryKv::new();
        let mut ledger = RecordingLedger::new();
        let clock = clock();
        let params = Params::default();
        let mut ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);
        ctx.initialize_validator(&addr(1)).unwrap();
        ctx.allocate_tokens_to_validator(&addr(1), &DecCoins::single(DENOM, Dec::from_i64(125)))
            .unwrap();

        let paid = ctx.withdraw_validator_commission(&addr(1)).unwrap();
        assert_eq!(paid.amount_of(DENOM), 12);
        assert_eq!(ctx.accumulated_commission(&addr(1)).unwrap().amount_of(DENOM), "0.5".parse().unwrap());
        assert_eq!(ctx.outstanding_rewards(&addr(1)).unwrap().amount_of(DENOM), Dec::from_i64(113));

        let err = ctx.withdraw_validator_commission(&addr(1)).unwrap_err();
        assert_eq!(err, DistributionError::NoValidatorCommission);
        drop(ctx);
        assert_eq!(ledger.received(&addr(1), DENOM), 12);
    }

    #[test]
    fn withdraw_addr_defaults_and_resets() {
        let staking = staking();
        let mut kv = MemoryKv::new();
        let mut ledger = RecordingLedger::new();
        let clock = clock();
        let params = Params::default();
        let mut ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);

        assert_eq!(ctx.withdraw_addr(&addr(2)).unwrap(), addr(2));
        ctx.set_withdraw_addr(&addr(2), &addr(7)).unwrap();
        assert_eq!(ctx.withdraw_addr(&addr(2)).unwrap(), addr(7));
        ctx.set_withdraw_addr(&addr(2), &addr(2)).unwrap();
        assert_eq!(ctx.withdraw_addr(&addr(2)).unwrap(), addr(2));
        drop(ctx);
        assert!(kv.is_empty());
    }

    #[test]
    fn withdraw_addr_can_be_disabled() {
        let staking = staking();
        let mut kv = MemoryKv::new();
        let mut ledger = RecordingLedger::new();
        let clock = clock();
        let params = Params {
            withdraw_addr_enabled: false,
            ..Params::default()
        };
        let mut ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);
        assert_eq!(
            ctx.set_withdraw_addr(&addr(2), &addr(7)),
            Err(DistributionError::WithdrawAddrDisabled)
        );
    }
}
