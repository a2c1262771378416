//! Referral cascade payouts.
//!
//! The referral-eligible share of a withdrawal walks up the delegator's
//! referral chain, one configured class rate per hop. Whatever the chain
//! does not absorb goes to the validator's operator account, and the
//! fractional change is returned to the caller. Nothing is created or lost:
//! hop payouts plus the validator payout plus the returned change always
//! equal the input exactly.

use tracing::{debug, info};

use accrue_core::coins::{Coins, DecCoins};
use accrue_core::error::DistributionError;
use accrue_core::traits::{DelegationInfo, ValidatorInfo};
use accrue_core::types::Address;

use crate::Ctx;

/// One referral payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CascadeHop {
    pub depth: usize,
    pub payee: Address,
    pub amount: Coins,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadePayout {
    pub hops: Vec<CascadeHop>,
    /// Sum of all hop payments.
    pub hop_total: Coins,
    /// Integral amount paid to the validator's operator account.
    pub validator_payout: Coins,
    /// Fractional change left after the final truncation.
    pub remainder: DecCoins,
}

impl CascadePayout {
    /// Everything paid out, hops and validator together.
    pub fn total_paid(&self) -> Result<Coins, DistributionError> {
        Ok(self.hop_total.checked_add(&self.validator_payout)?)
    }
}

impl Ctx<'_> {
    /// Distribute `amount` along the referral chain of `delegation`.
    ///
    /// Each hop takes `amount * rate` for its depth, truncated to whole
    /// coins; the change stays in the remaining pool. The walk stops early
    /// on self-referral, a missing referrer, a referrer without its own
    /// delegation to this validator, or a share that rounds past what is
    /// left in the pool.
    pub fn pay_cascade(
        &mut self,
        validator: &ValidatorInfo,
        delegation: &DelegationInfo,
        amount: &DecCoins,
    ) -> Result<CascadePayout, DistributionError> {
        if amount.is_zero() {
            return Ok(CascadePayout::default());
        }

        let val = validator.operator;
        let mut payout = CascadePayout::default();
        let mut remaining = amount.clone();
        let mut link = delegation.clone();

        for (depth, class) in validator.commission_rule.class_rates.iter().enumerate() {
            let target = amount.mul_dec(class.rate)?;
            let after = remaining.checked_sub(&target)?;
            if after.is_any_negative() {
                info!(
                    validator = %val,
                    delegator = %link.delegator,
                    depth,
                    rate = %class.rate,
                    got = %remaining,
                    expected = %target,
                    "rounding error paying referral cascade, stopping early"
                );
                break;
            }

            let Some(payee) = link.referrer.filter(|referrer| *referrer != link.delegator) else {
                debug!(validator = %val, delegator = %link.delegator, depth, "referral chain ends");
                break;
            };
            let Some(next) = self.staking.delegation(&payee, &val) else {
                debug!(validator = %val, payee = %payee, depth, "referrer has no delegation, chain ends");
                break;
            };

            let (coins, change) = target.truncate_decimal()?;
            remaining = after.checked_add(&change)?;
            if !coins.is_zero() {
                self.send(&payee, &coins)?;
            }
            payout.hop_total = payout.hop_total.checked_add(&coins)?;
            payout.hops.push(CascadeHop {
                depth,
                payee,
                amount: coins,
            });
            link = next;
        }

        let (coins, change) = remaining.truncate_decimal()?;
        if !coins.is_zero() {
            self.send(&validator.operator_account, &coins)?;
        }
        payout.validator_payout = coins;
        payout.remainder = change;
        Ok(payout)
    }
}
