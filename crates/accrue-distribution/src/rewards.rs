//! Reward calculation.
//!
//! Rewards between two periods are `(ratio_end - ratio_start) * stake`,
//! truncated toward zero so the engine never pays more than the exact
//! amount owed. [`Ctx::calculate_delegation_rewards`] splits the interval
//! at every slash event and shrinks the stake as it goes.

use tracing::debug;

use accrue_core::coins::DecCoins;
use accrue_core::dec::Dec;
use accrue_core::error::{DistributionError, InvariantViolation};
use accrue_core::traits::{DelegationInfo, ValidatorInfo};
use accrue_core::types::{Address, DelegatorStartingInfo, ValidatorHistoricalRewards};

use crate::Ctx;

/// Rewards owed to a delegation, split by destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DelegationRewards {
    /// Paid to the delegator.
    pub rewards: DecCoins,
    /// Routed through the referral cascade.
    pub recommanders_rewards: DecCoins,
}

/// Rewards accrued by `stake` between two checkpoints of `val`.
///
/// The referral-eligible part is computed only when `include_recommanders`
/// is set; otherwise it is left empty.
pub fn rewards_between(
    val: &Address,
    (start_period, starting): (u64, &ValidatorHistoricalRewards),
    (end_period, ending): (u64, &ValidatorHistoricalRewards),
    stake: Dec,
    include_recommanders: bool,
) -> Result<DelegationRewards, DistributionError> {
    if start_period > end_period {
        return Err(InvariantViolation::PeriodsOutOfOrder {
            start: start_period,
            end: end_period,
        }
        .into());
    }
    if stake.is_negative() {
        return Err(InvariantViolation::NegativeStake(stake).into());
    }

    let negative = || InvariantViolation::NegativeRewardRatio {
        validator: *val,
        start: start_period,
        end: end_period,
    };

    let difference = ending
        .cumulative_reward_ratio
        .checked_sub(&starting.cumulative_reward_ratio)?;
    if difference.is_any_negative() {
        return Err(negative().into());
    }
    let rewards = difference.mul_dec_truncate(stake)?;

    let recommanders_rewards = if include_recommanders {
        let difference = ending
            .cumulative_recommanders_reward_ratio
            .checked_sub(&starting.cumulative_recommanders_reward_ratio)?;
        if difference.is_any_negative() {
            return Err(negative().into());
        }
        difference.mul_dec_truncate(stake)?
    } else {
        DecCoins::new()
    };

    Ok(DelegationRewards {
        rewards,
        recommanders_rewards,
    })
}

impl Ctx<'_> {
    /// Rewards accrued by `stake` on `val` from `start_period` to `end_period`.
    pub fn rewards_between(
        &self,
        val: &Address,
        start_period: u64,
        end_period: u64,
        stake: Dec,
        include_recommanders: bool,
    ) -> Result<DelegationRewards, DistributionError> {
        if start_period > end_period {
            return Err(InvariantViolation::PeriodsOutOfOrder {
                start: start_period,
                end: end_period,
            }
            .into());
        }
        let starting = self.historical_rewards(val, start_period)?;
        let ending = self.historical_rewards(val, end_period)?;
        rewards_between(
            val,
            (start_period, &starting),
            (end_period, &ending),
            stake,
            include_recommanders,
        )
    }

    /// Total rewards of a delegation from its starting info to `ending_period`.
    ///
    /// Segments closed by a slash earn only the plain reward; the referral
    /// share is computed once, over the trailing segment, at the reconciled
    /// stake.
    pub fn calculate_delegation_rewards(
        &self,
        validator: &ValidatorInfo,
        delegation: &DelegationInfo,
        starting: &DelegatorStartingInfo,
        ending_period: u64,
    ) -> Result<DelegationRewards, DistributionError> {
        let val = &validator.operator;
        let height = self.clock.block_height();
        if starting.height == height {
            return Ok(DelegationRewards::default());
        }

        let mut start_period = starting.previous_period;
        let mut stake = starting.stake;
        let mut rewards = DecCoins::new();

        // Slashes recorded earlier in this block still reduced the live
        // stake, so the scan includes the current height.
        if height > starting.height {
            for entry in self.state.slash_events_between(val, starting.height, height) {
                let (_, event) = entry?;
                if event.validator_period <= start_period {
                    continue;
                }
                let segment = self.rewards_between(val, start_period, event.validator_period, stake, false)?;
                rewards = rewards.checked_add(&segment.rewards)?;
                stake = stake.mul_truncate(Dec::ONE.checked_sub(event.fraction)?)?;
                start_period = event.validator_period;
            }
        }

        let current_stake = validator.tokens_from_shares(delegation.shares)?;
        if stake > current_stake {
            let ceiling = current_stake.checked_add(self.params.stake_tolerance())?;
            if stake > ceiling {
                return Err(InvariantViolation::StakeExceedsCurrent {
                    delegator: delegation.delegator,
                    stake,
                    current: current_stake,
                }
                .into());
            }
            debug!(
                validator = %val,
                delegator = %delegation.delegator,
                got = %current_stake,
                expected = %stake,
                "clamped reconstructed stake to live stake"
            );
            stake = current_stake;
        }

        let last = self.rewards_between(val, start_period, ending_period, stake, true)?;
        Ok(DelegationRewards {
            rewards: rewards.checked_add(&last.rewards)?,
            recommanders_rewards: last.recommanders_rewards,
        })
    }

    /// Rewards `del` has accrued on `val`, closing the open period first.
    pub fn pending_rewards(&mut self, val: &Address, del: &Address) -> Result<DelegationRewards, DistributionError> {
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
        self.calculate_delegation_rewards(&validator, &delegation, &starting, ending_period)
    }
}

#[cfg(test)]
mod tests {
    use accrue_core::commission::ReallocatedCommissionRule;
    use accrue_core::kv::MemoryKv;
    use accrue_core::params::Params;
    use accrue_core::testing::{MockStaking, RecordingLedger, addr};
    use accrue_core::traits::{BlockInfo, StakingView};
    use accrue_core::types::ValidatorSlashEvent;
    use chrono::DateTime;
    use proptest::prelude::*;

    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn checkpoint(plain: &str, recommanders: &str) -> ValidatorHistoricalRewards {
        ValidatorHistoricalRewards {
            cumulative_reward_ratio: DecCoins::single("acc", dec(plain)),
            cumulative_recommanders_reward_ratio: DecCoins::single("acc", dec(recommanders)),
            reference_count: 1,
        }
    }

    fn block(height: u64) -> BlockInfo {
        BlockInfo::new(height, DateTime::from_timestamp(1_700_000_000, 0).unwrap())
    }

    #[test]
    fn tenth_per_share_over_thousand_stake_is_hundred() {
        let out = rewards_between(
            &addr(1),
            (5, &checkpoint("0.3", "0")),
            (6, &checkpoint("0.4", "0")),
            Dec::from_i64(1000),
            true,
        )
        .unwrap();
        assert_eq!(out.rewards, DecCoins::single("acc", Dec::from_i64(100)));
        assert!(out.recommanders_rewards.is_zero());
    }

    #[test]
    fn recommanders_share_only_when_requested() {
        let start = checkpoint("0", "0");
        let end = checkpoint("1", "0.5");
        let plain = rewards_between(&addr(1), (1, &start), (2, &end), Dec::from_i64(10), false).unwrap();
        let both = rewards_between(&addr(1), (1, &start), (2, &end), Dec::from_i64(10), true).unwrap();
        assert!(plain.recommanders_rewards.is_zero());
        assert_eq!(both.recommanders_rewards.amount_of("acc"), Dec::from_i64(5));
        assert_eq!(plain.rewards, both.rewards);
    }

    #[test]
    fn out_of_order_periods_are_fatal() {
        let c = checkpoint("0", "0");
        let err = rewards_between(&addr(1), (4, &c), (3, &c), Dec::ONE, false).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn negative_stake_is_fatal() {
        let c = checkpoint("0", "0");
        let err = rewards_between(&addr(1), (1, &c), (1, &c), Dec::from_i64(-1), false).unwrap_err();
        assert_eq!(
            err,
            DistributionError::Invariant(InvariantViolation::NegativeStake(Dec::from_i64(-1)))
        );
    }

    #[test]
    fn decreasing_ratio_is_fatal() {
        let err = rewards_between(
            &addr(1),
            (1, &checkpoint("2", "0")),
            (2, &checkpoint("1", "0")),
            Dec::ONE,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DistributionError::Invariant(InvariantViolation::NegativeRewardRatio { .. })
        ));
    }

    #[test]
    fn reward_is_truncated_not_rounded() {
        let out = rewards_between(
            &addr(1),
            (1, &checkpoint("0", "0")),
            (2, &checkpoint("0.000000000000000001", "0")),
            dec("0.9"),
            false,
        )
        .unwrap();
        assert!(out.rewards.is_zero());
    }

    /// Staking state for the slash scenario: 1000 tokens bonded at period 3,
    /// halved by a slash that closed period 5.
    fn slash_scenario() -> (MemoryKv, MockStaking) {
        let val = addr(1);
        let del = addr(2);
        let mut staking = MockStaking::new();
        staking.add_validator(val, ReallocatedCommissionRule::default());
        staking.delegate(del, val, 1000, None);
        staking.slash_tokens(&val, dec("0.5"));

        let mut kv = MemoryKv::new();
        {
            let mut state = crate::state::DistributionState::new(&mut kv);
            let ratios = [(3, "1", "0.1"), (5, "2", "0.2"), (8, "5", "0.5")];
            for (period, plain, recommanders) in ratios {
                state.set_historical_rewards(&val, period, &checkpoint(plain, recommanders)).unwrap();
            }
            let event = ValidatorSlashEvent {
                validator_period: 5,
                fraction: dec("0.5"),
            };
            state.set_slash_event(&val, 15, &event).unwrap();
        }
        (kv, staking)
    }

    #[test]
    fn slash_halves_stake_for_trailing_segment() {
        let (mut kv, staking) = slash_scenario();
        let mut ledger = RecordingLedger::new();
        let clock = block(20);
        let params = Params::default();
        let ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);

        let validator = staking.validator(&addr(1)).unwrap();
        let delegation = staking.delegation(&addr(2), &addr(1)).unwrap();
        let starting = DelegatorStartingInfo {
            previous_period: 3,
            stake: Dec::from_i64(1000),
            height: 10,
        };

        let out = ctx.calculate_delegation_rewards(&validator, &delegation, &starting, 8).unwrap();
        // [3,5) at 1000 plain only: 1000 * (2 - 1) = 1000
        // [5,8] at 500: plain 500 * 3 = 1500, recommanders 500 * 0.3 = 150
        assert_eq!(out.rewards.amount_of("acc"), Dec::from_i64(2500));
        assert_eq!(out.recommanders_rewards.amount_of("acc"), Dec::from_i64(150));
    }

    #[test]
    fn same_height_start_accrues_nothing() {
        let (mut kv, staking) = slash_scenario();
        let mut ledger = RecordingLedger::new();
        let clock = block(10);
        let params = Params::default();
        let ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);

        let validator = staking.validator(&addr(1)).unwrap();
        let delegation = staking.delegation(&addr(2), &addr(1)).unwrap();
        let starting = DelegatorStartingInfo {
            previous_period: 3,
            stake: Dec::from_i64(1000),
            height: 10,
        };
        let out = ctx.calculate_delegation_rewards(&validator, &delegation, &starting, 8).unwrap();
        assert_eq!(out, DelegationRewards::default());
    }

    #[test]
    fn stake_drift_within_tolerance_is_clamped() {
        let (mut kv, staking) = slash_scenario();
        let mut ledger = RecordingLedger::new();
        let clock = block(20);
        let params = Params::default();
        let ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);

        let validator = staking.validator(&addr(1)).unwrap();
        let delegation = staking.delegation(&addr(2), &addr(1)).unwrap();
        // Halved by the slash this lands at 500 + 2 units, inside the tolerance.
        let starting = DelegatorStartingInfo {
            previous_period: 3,
            stake: Dec::from_raw(1000 * 10i128.pow(18) + 4),
            height: 10,
        };
        let out = ctx.calculate_delegation_rewards(&validator, &delegation, &starting, 8).unwrap();
        assert_eq!(out.recommanders_rewards.amount_of("acc"), Dec::from_i64(150));
    }

    #[test]
    fn stake_drift_beyond_tolerance_is_fatal() {
        let (mut kv, staking) = slash_scenario();
        let mut ledger = RecordingLedger::new();
        let clock = block(20);
        let params = Params::default();
        let ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);

        let validator = staking.validator(&addr(1)).unwrap();
        let delegation = staking.delegation(&addr(2), &addr(1)).unwrap();
        let starting = DelegatorStartingInfo {
            previous_period: 3,
            stake: Dec::from_i64(1001),
            height: 10,
        };
        let err = ctx
            .calculate_delegation_rewards(&validator, &delegation, &starting, 8)
            .unwrap_err();
        assert!(matches!(
            err,
            DistributionError::Invariant(InvariantViolation::StakeExceedsCurrent { .. })
        ));
    }

    fn ratio_strategy() -> impl Strategy<Value = Vec<i64>> {
        prop::collection::vec(0i64..1_000_000_000_000, 3)
    }

    proptest! {
        #[test]
        fn rewards_are_monotonic_in_end_period(
            steps in ratio_strategy(),
            stake in 0i64..1_000_000_000,
        ) {
            let r0 = Dec::from_raw(steps[0] as i128);
            let r1 = r0.checked_add(Dec::from_raw(steps[1] as i128)).unwrap();
            let r2 = r1.checked_add(Dec::from_raw(steps[2] as i128)).unwrap();
            let at = |r: Dec| ValidatorHistoricalRewards {
                cumulative_reward_ratio: DecCoins::single("acc", r),
                cumulative_recommanders_reward_ratio: DecCoins::single("acc", r),
                reference_count: 1,
            };
            let stake = Dec::from_i64(stake);
            let near = rewards_between(&addr(1), (0, &at(r0)), (1, &at(r1)), stake, true).unwrap();
            let far = rewards_between(&addr(1), (0, &at(r0)), (2, &at(r2)), stake, true).unwrap();
            prop_assert!(far.rewards.amount_of("acc") >= near.rewards.amount_of("acc"));
            prop_assert!(
                far.recommanders_rewards.amount_of("acc") >= near.recommanders_rewards.amount_of("acc")
            );
        }

        #[test]
        fn reward_never_exceeds_exact_product(
            ratio in 0i128..10_000_000_000_000_000_000,
            stake in 0i128..10_000_000_000_000_000_000,
        ) {
            let start = ValidatorHistoricalRewards::default();
            let end = ValidatorHistoricalRewards {
                cumulative_reward_ratio: DecCoins::single("acc", Dec::from_raw(ratio)),
                ..ValidatorHistoricalRewards::default()
            };
            let out = rewards_between(&addr(1), (0, &start), (1, &end), Dec::from_raw(stake), false).unwrap();
            // Compare in units of 10^-36 to stay exact.
            let paid = out.rewards.amount_of("acc").raw();
            let exact_scaled = ratio * stake;
            prop_assert!(paid * 10i128.pow(18) <= exact_scaled);
            prop_assert!(exact_scaled - paid * 10i128.pow(18) < 10i128.pow(18));
        }
    }
}
