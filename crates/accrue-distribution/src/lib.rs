//! # accrue-distribution
//! Reward distribution engine for the Accrue proof-of-stake ledger.
//!
//! Every operation runs against a [`Ctx`]: the store for one accounting step
//! plus the collaborators it consumes (staking view, token ledger, clock,
//! params). Wrap a step in [`atomically`] so a failure anywhere, including a
//! rejected token send, leaves the store untouched.
//!
//! - [`period`]: validator periods and reference-counted checkpoints
//! - [`rewards`]: reward calculation and slash-adjusted aggregation
//! - [`withdraw`]: delegator withdrawals
//! - [`cascade`]: referral cascade payouts
//! - [`vesting`]: delayed reward buckets and linear release
//! - [`allocation`]: reward allocation, commission, withdraw addresses

pub mod allocation;
pub mod cascade;
pub mod keys;
pub mod period;
pub mod rewards;
pub mod state;
pub mod vesting;
pub mod withdraw;

use accrue_core::coins::{Coins, DecCoins};
use accrue_core::error::{DistributionError, TransferError};
use accrue_core::kv::{CacheKv, KvStore};
use accrue_core::params::Params;
use accrue_core::traits::{Clock, DelegationInfo, StakingView, TokenLedger, ValidatorInfo};
use accrue_core::types::Address;

pub use accrue_core::kv::atomically;
pub use cascade::{CascadeHop, CascadePayout};
pub use rewards::DelegationRewards;
pub use state::DistributionState;
pub use withdraw::WithdrawOutcome;

/// Store handle and collaborators for one accounting step.
pub struct Ctx<'a> {
    pub(crate) state: DistributionState<'a>,
    pub(crate) staking: &'a dyn StakingView,
    pub(crate) ledger: &'a mut dyn TokenLedger,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) params: &'a Params,
}

impl<'a> Ctx<'a> {
    pub fn new(
        kv: &'a mut dyn KvStore,
        staking: &'a dyn StakingView,
        ledger: &'a mut dyn TokenLedger,
        clock: &'a dyn Clock,
        params: &'a Params,
    ) -> Self {
        Self {
            state: DistributionState::new(kv),
            staking,
            ledger,
            clock,
            params,
        }
    }

    /// Read access to the underlying records.
    pub fn state(&self) -> &DistributionState<'a> {
        &self.state
    }

    pub fn params(&self) -> &Params {
        self.params
    }

    pub(crate) fn validator(&self, val: &Address) -> Result<ValidatorInfo, DistributionError> {
        self.staking
            .validator(val)
            .ok_or(DistributionError::ValidatorNotFound(*val))
    }

    pub(crate) fn delegation(
        &self,
        val: &Address,
        del: &Address,
    ) -> Result<DelegationInfo, DistributionError> {
        self.staking
            .delegation(del, val)
            .ok_or(DistributionError::DelegationNotFound {
                validator: *val,
                delegator: *del,
            })
    }

    pub(crate) fn send(&mut self, account: &Address, amount: &Coins) -> Result<(), TransferError> {
        self.ledger.send_from_pool_to_account(
            accrue_core::constants::DISTRIBUTION_POOL,
            account,
            amount,
        )
    }

    pub(crate) fn add_to_community_pool(&mut self, amount: &DecCoins) -> Result<(), DistributionError> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut pool = self.state.fee_pool()?;
        pool.community_pool = pool.community_pool.checked_add(amount)?;
        self.state.set_fee_pool(&pool)?;
        Ok(())
    }

    pub fn community_pool(&self) -> Result<DecCoins, DistributionError> {
        Ok(self.state.fee_pool()?.community_pool)
    }

    pub fn outstanding_rewards(&self, val: &Address) -> Result<DecCoins, DistributionError> {
        Ok(self.state.outstanding_rewards(val)?)
    }
}

/// Ledger for read-only queries; any send is refused.
struct NoSendLedger;

impl TokenLedger for NoSendLedger {
    fn send_from_pool_to_account(
        &mut self,
        _pool: &str,
        _account: &Address,
        _amount: &Coins,
    ) -> Result<(), TransferError> {
        Err(TransferError::Rejected("read-only query".to_string()))
    }
}

/// Rewards `del` would receive from `val` if it withdrew now.
///
/// Runs the calculation against a throwaway overlay; nothing is written to
/// `kv`.
pub fn query_delegation_rewards(
    kv: &mut dyn KvStore,
    staking: &dyn StakingView,
    clock: &dyn Clock,
    params: &Params,
    val: &Address,
    del: &Address,
) -> Result<DelegationRewards, DistributionError> {
    let mut cache = CacheKv::new(kv);
    let mut ledger = NoSendLedger;
    let mut ctx = Ctx::new(&mut cache, staking, &mut ledger, clock, params);
    ctx.pending_rewards(val, del)
}
