//! All-or-nothing accounting steps.

use accrue_core::commission::{RecommanderClassRate, ReallocatedCommissionRule};
use accrue_core::dec::Dec;
use accrue_core::error::{DistributionError, TransferError};
use accrue_tests::helpers::*;

const DENOM: &str = "acc";

#[test]
fn rejected_referral_send_aborts_whole_withdrawal() {
    init_logging_from_env();
    let mut h = Harness::new(Default::default());
    let val = addr(1);
    let rule = ReallocatedCommissionRule::new(
        Dec::ZERO,
        "0.5".parse().unwrap(),
        vec![RecommanderClassRate::new(0, "0.5".parse().unwrap())],
    );
    h.create_validator(val, rule).unwrap();
    h.bond(addr(3), val, 10, None).unwrap();
    h.bond(addr(2), val, 10, Some(addr(3))).unwrap();

    h.next_block(6);
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 100))).unwrap();

    h.ledger.block(addr(3));
    let store_before = h.kv.clone();
    h.next_block(6);
    let err = h.step(|ctx| ctx.withdraw(&val, &addr(2))).unwrap_err();

    assert_eq!(err, DistributionError::Transfer(TransferError::BlockedRecipient(addr(3))));
    assert!(!err.is_fatal());
    // The delegator's own payout was sent before the cascade failed; it is
    // rolled back with everything else.
    assert!(h.ledger.transfers.is_empty());
    assert_eq!(h.kv, store_before);

    h.ledger.blocked.clear();
    let outcome = h.step(|ctx| ctx.withdraw(&val, &addr(2))).unwrap();
    assert_eq!(outcome.rewards.amount_of(DENOM), 25);
    assert_eq!(h.ledger.received(&addr(3), DENOM), 12);
}

#[test]
fn rejected_commission_send_keeps_commission() {
    let mut h = Harness::new(Default::default());
    let val = addr(1);
    let rule = ReallocatedCommissionRule::new("0.1".parse().unwrap(), Dec::ZERO, Vec::new());
    h.create_validator(val, rule).unwrap();
    h.bond(addr(2), val, 10, None).unwrap();
    h.step(|ctx| ctx.allocate_tokens_to_validator(&val, &coins(DENOM, 100))).unwrap();

    h.ledger.block(val);
    assert!(h.step(|ctx| ctx.withdraw_validator_commission(&val)).is_err());
    let commission = h.step(|ctx| ctx.accumulated_commission(&val)).unwrap();
    assert_eq!(commission.amount_of(DENOM), Dec::from_i64(10));
}
