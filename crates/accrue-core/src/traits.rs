//! Collaborator interfaces consumed by the distribution engine.
//!
//! - [`StakingView`]: read-only validator and delegation state
//! - [`TokenLedger`]: moves integral coins out of module pools
//! - [`Clock`]: current block height and time
//!
//! The engine never owns these; a caller lends them for the duration of one
//! accounting step.

use chrono::{DateTime, Utc};

use crate::coins::Coins;
use crate::commission::ReallocatedCommissionRule;
use crate::dec::Dec;
use crate::error::{ArithmeticError, TransferError};
use crate::types::Address;

/// Validator state as seen by the distribution engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub operator: Address,
    /// Bonded tokens backing the validator.
    pub tokens: u128,
    /// Total shares issued to delegators.
    pub delegator_shares: Dec,
    pub delegator_count: u64,
    /// Account that receives the validator's own payouts.
    pub operator_account: Address,
    pub commission_rule: ReallocatedCommissionRule,
}

impl ValidatorInfo {
    /// Tokens represented by `shares`, rounded.
    pub fn tokens_from_shares(&self, shares: Dec) -> Result<Dec, ArithmeticError> {
        if self.delegator_shares.is_zero() {
            return Ok(Dec::ZERO);
        }
        shares.mul_quo(Dec::from_u128(self.tokens)?, self.delegator_shares)
    }

    /// Tokens represented by `shares`, truncated toward zero.
    pub fn tokens_from_shares_truncated(&self, shares: Dec) -> Result<Dec, ArithmeticError> {
        if self.delegator_shares.is_zero() {
            return Ok(Dec::ZERO);
        }
        shares.mul_quo_truncate(Dec::from_u128(self.tokens)?, self.delegator_shares)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationInfo {
    pub delegator: Address,
    pub validator: Address,
    pub shares: Dec,
    /// Referrer designated by the delegator, if any.
    pub referrer: Option<Address>,
}

/// Read-only view of validators and delegations.
pub trait StakingView {
    /// Look up a validator by operator address. `None` if unknown.
    fn validator(&self, operator: &Address) -> Option<ValidatorInfo>;

    /// Look up the delegation of `delegator` to `validator`. `None` if absent.
    fn delegation(&self, delegator: &Address, validator: &Address) -> Option<DelegationInfo>;
}

/// Token transfers out of module-owned pools.
pub trait TokenLedger {
    /// Send `amount` from module pool `pool` to `account`.
    ///
    /// Failures are surfaced to the caller unmodified and abort the
    /// enclosing accounting step.
    fn send_from_pool_to_account(
        &mut self,
        pool: &str,
        account: &Address,
        amount: &Coins,
    ) -> Result<(), TransferError>;
}

pub trait Clock {
    fn block_height(&self) -> u64;
    fn block_time(&self) -> DateTime<Utc>;
}

/// Height and time of the block being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockInfo {
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }
}

impl Clock for BlockInfo {
    fn block_height(&self) -> u64 {
        self.height
    }

    fn block_time(&self) -> DateTime<Utc> {
        self.time
    }
}
