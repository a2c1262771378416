//! Criterion benchmarks for the reward calculator.
//!
//! Covers: the pure checkpoint difference, a slash-heavy aggregation walk,
//! and a multi-hop referral cascade.

use chrono::DateTime;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use accrue_core::coins::DecCoins;
use accrue_core::commission::{RecommanderClassRate, ReallocatedCommissionRule};
use accrue_core::dec::Dec;
use accrue_core::kv::MemoryKv;
use accrue_core::params::Params;
use accrue_core::testing::{MockStaking, RecordingLedger, addr};
use accrue_core::traits::{BlockInfo, StakingView};
use accrue_core::types::{DelegatorStartingInfo, ValidatorHistoricalRewards, ValidatorSlashEvent};
use accrue_distribution::rewards::rewards_between;
use accrue_distribution::{Ctx, DistributionState};

const DENOMS: [&str; 4] = ["acc", "atom", "osmo", "usdc"];

fn checkpoint(scale: i64) -> ValidatorHistoricalRewards {
    let mut ratio = DecCoins::new();
    for (i, denom) in DENOMS.iter().enumerate() {
        ratio.insert(denom, Dec::from_ratio(scale * (i as i64 + 1), 7).unwrap());
    }
    ValidatorHistoricalRewards {
        cumulative_reward_ratio: ratio.clone(),
        cumulative_recommanders_reward_ratio: ratio,
        reference_count: 1,
    }
}

fn bench_rewards_between(c: &mut Criterion) {
    let start = checkpoint(1);
    let end = checkpoint(1_000);
    let stake: Dec = "123456.789".parse().unwrap();
    c.bench_function("rewards_between_4_denoms", |b| {
        b.iter(|| {
            rewards_between(
                &addr(1),
                (0, black_box(&start)),
                (1, black_box(&end)),
                black_box(stake),
                true,
            )
            .unwrap()
        })
    });
}

fn bench_slash_walk(c: &mut Criterion) {
    let val = addr(1);
    let mut staking = MockStaking::new();
    staking.add_validator(val, ReallocatedCommissionRule::default());
    staking.delegate(addr(2), val, 1_000_000, None);

    let mut kv = MemoryKv::new();
    {
        let mut state = DistributionState::new(&mut kv);
        for period in 0..=100u64 {
            state.set_historical_rewards(&val, period, &checkpoint(period as i64)).unwrap();
        }
        // Zero-fraction slashes split the walk without moving the live stake.
        for period in 1..100u64 {
            let event = ValidatorSlashEvent {
                validator_period: period,
                fraction: Dec::ZERO,
            };
            state.set_slash_event(&val, period, &event).unwrap();
        }
    }

    let validator = staking.validator(&val).unwrap();
    let delegation = staking.delegation(&addr(2), &val).unwrap();
    let starting = DelegatorStartingInfo {
        previous_period: 0,
        stake: Dec::from_i64(1_000_000),
        height: 0,
    };
    let clock = BlockInfo::new(200, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    let params = Params::default();

    c.bench_function("calculate_delegation_rewards_99_slashes", |b| {
        b.iter(|| {
            let mut ledger = RecordingLedger::new();
            let ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);
            ctx.calculate_delegation_rewards(&validator, &delegation, black_box(&starting), 100)
                .unwrap()
        })
    });
}

fn bench_cascade(c: &mut Criterion) {
    let val = addr(1);
    let rates = (0..8)
        .map(|i| RecommanderClassRate::new(i, Dec::from_ratio(1, 10).unwrap()))
        .collect();
    let mut staking = MockStaking::new();
    staking.add_validator(val, ReallocatedCommissionRule::new(Dec::ZERO, Dec::ZERO, rates));
    for i in 2..10u8 {
        staking.delegate(addr(i), val, 10, Some(addr(i + 1)));
    }
    staking.delegate(addr(10), val, 10, None);

    let validator = staking.validator(&val).unwrap();
    let delegation = staking.delegation(&addr(2), &val).unwrap();
    let amount = DecCoins::single("acc", "98765.4321".parse().unwrap());
    let clock = BlockInfo::new(1, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    let params = Params::default();

    c.bench_function("pay_cascade_8_hops", |b| {
        b.iter(|| {
            let mut kv = MemoryKv::new();
            let mut ledger = RecordingLedger::new();
            let mut ctx = Ctx::new(&mut kv, &staking, &mut ledger, &clock, &params);
            ctx.pay_cascade(&validator, &delegation, black_box(&amount)).unwrap()
        })
    });
}

criterion_group!(benches, bench_rewards_between, bench_slash_walk, bench_cascade);
criterion_main!(benches);
