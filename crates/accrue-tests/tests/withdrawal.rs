//! End-to-end withdrawal scenarios: allocation, slashing, and payout.

use accrue_core::commission::ReallocatedCommissionRule;
use accrue_core::dec::Dec;
use accrue_core::error::{DistributionError, InvariantViolation};
use accrue_tests::helpers::*;

const DENOM: &str = "acc";

fn plain_validator(h: &mut Harness) -> accrue_core::types::Address {
    let val = addr(1);
    h.create_validator(val, ReallocatedCommissionRule::default()).unwrap();
    val
}

#[test]
fn single_delegator_receives_everything() {
    init_logging_from_env();
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(2), val, 1000, None).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 250))).unwrap();

    h.next_block(6);
    let outcome = h.step(|ctx| ctx.withdraw_delegation_rewards(&val, &addr(2))).unwrap();
    assert_eq!(outcome.rewards.amount_of(DENOM), 250);
    assert_eq!(h.ledger.received(&addr(2), DENOM), 250);
    assert!(h.held(&val, DENOM).unwrap().is_zero());
}

#[test]
fn slash_between_allocations_halves_later_rewards() {
    init_logging_from_env();
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(2), val, 1000, None).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 1000))).unwrap();

    h.next_block(6);
    h.slash(val, Dec::from_ratio(1, 2).unwrap()).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 1000))).unwrap();

    h.next_block(6);
    let outcome = h.step(|ctx| ctx.withdraw(&val, &addr(2))).unwrap();
    // Sole delegator: both allocations are owed in full, the first at the
    // original stake and the second at the halved one.
    assert_eq!(outcome.rewards.amount_of(DENOM), 2000);
    assert!(h.held(&val, DENOM).unwrap().is_zero());
}

#[test]
fn two_delegators_split_by_stake() {
    init_logging_from_env();
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(2), val, 300, None).unwrap();
    h.bond(addr(3), val, 100, None).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 400))).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.withdraw_delegation_rewards(&val, &addr(2))).unwrap();
    h.step(|ctx| ctx.withdraw_delegation_rewards(&val, &addr(3))).unwrap();

    assert_eq!(h.ledger.received(&addr(2), DENOM), 300);
    assert_eq!(h.ledger.received(&addr(3), DENOM), 100);
}

#[test]
fn mainnet_sized_delegations_settle() {
    init_logging_from_env();
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(3), val, 90_000_000_000, None).unwrap();
    h.bond(addr(2), val, 10_000_000_000, None).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 1_000_000_000))).unwrap();

    h.next_block(6);
    let outcome = h.step(|ctx| ctx.withdraw_delegation_rewards(&val, &addr(2))).unwrap();
    assert_eq!(outcome.rewards.amount_of(DENOM), 100_000_000);
    let outcome = h.step(|ctx| ctx.withdraw_delegation_rewards(&val, &addr(3))).unwrap();
    assert_eq!(outcome.rewards.amount_of(DENOM), 900_000_000);
}

#[test]
fn settled_checkpoints_are_pruned() {
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(2), val, 30, None).unwrap();
    h.bond(addr(3), val, 10, None).unwrap();

    for _ in 0..4 {
        h.next_block(6);
        h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 40))).unwrap();
        h.next_block(6);
        h.step(|ctx| ctx.withdraw_delegation_rewards(&val, &addr(2))).unwrap();
        h.step(|ctx| ctx.withdraw_delegation_rewards(&val, &addr(3))).unwrap();

        // One checkpoint per live snapshot; the newer one also backs the
        // open period.
        let stored = h.step(|ctx| Ok(ctx.state().historical_rewards_count(&val)?)).unwrap();
        assert_eq!(stored, 2);
    }
    assert_eq!(h.ledger.received(&addr(2), DENOM), 120);
    assert_eq!(h.ledger.received(&addr(3), DENOM), 40);
}

#[test]
fn fractional_rewards_go_to_community_pool() {
    init_logging_from_env();
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(2), val, 3, None).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 10))).unwrap();

    h.next_block(6);
    let outcome = h.step(|ctx| ctx.withdraw(&val, &addr(2))).unwrap();
    // 10 / 3 truncates to 3.333333333333333333 per token; 3 tokens earn
    // 9.999999999999999999, of which 9 is paid.
    assert_eq!(outcome.rewards.amount_of(DENOM), 9);
    assert_eq!(outcome.community_pool.amount_of(DENOM), "0.999999999999999999".parse().unwrap());

    // Nothing minted is lost: paid + community pool + outstanding dust.
    let paid = Dec::from_i64(h.ledger.total_sent(DENOM) as i64);
    assert_eq!(paid.checked_add(h.held(&val, DENOM).unwrap()).unwrap(), Dec::from_i64(10));
}

#[test]
fn query_does_not_mutate_state() {
    init_logging_from_env();
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(2), val, 10, None).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 50))).unwrap();
    let before = h.kv.clone();

    h.next_block(6);
    let pending = h.query(&val, &addr(2)).unwrap();
    assert_eq!(pending.rewards.amount_of(DENOM), Dec::from_i64(50));
    assert_eq!(h.kv, before);
}

#[test]
fn withdrawing_unknown_delegation_is_recoverable() {
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    let err = h.step(|ctx| ctx.withdraw(&val, &addr(4))).unwrap_err();
    assert!(matches!(err, DistributionError::EmptyDelegationDistInfo { .. }));
    assert!(!err.is_fatal());
}

#[test]
fn corrupted_stake_is_fatal() {
    let mut h = Harness::new(Default::default());
    let val = plain_validator(&mut h);
    h.bond(addr(2), val, 100, None).unwrap();

    // Tokens vanish without a recorded slash: the snapshot now overstates
    // the live stake.
    h.staking.slash_tokens(&val, Dec::from_ratio(1, 10).unwrap());
    h.next_block(6);
    let err = h.step(|ctx| ctx.withdraw(&val, &addr(2))).unwrap_err();
    assert!(matches!(
        err,
        DistributionError::Invariant(InvariantViolation::StakeExceedsCurrent { .. })
    ));
    assert!(err.is_fatal());
}
