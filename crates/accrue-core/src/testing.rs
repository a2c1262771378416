//! In-memory collaborator doubles for test suites.
//!
//! Available under `#[cfg(test)]` or with the `testing` feature.

use std::collections::{HashMap, HashSet};

use crate::coins::Coins;
use crate::commission::ReallocatedCommissionRule;
use crate::dec::Dec;
use crate::error::TransferError;
use crate::traits::{DelegationInfo, StakingView, TokenLedger, ValidatorInfo};
use crate::types::Address;

/// Address whose 20 bytes all equal `seed`.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

/// Staking state held in plain maps.
#[derive(Clone, Debug, Default)]
pub struct MockStaking {
    pub validators: HashMap<Address, ValidatorInfo>,
    pub delegations: HashMap<(Address, Address), DelegationInfo>,
}

impl MockStaking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator whose operator account is its own address.
    pub fn add_validator(&mut self, operator: Address, rule: ReallocatedCommissionRule) {
        self.validators.insert(
            operator,
            ValidatorInfo {
                operator,
                tokens: 0,
                delegator_shares: Dec::ZERO,
                delegator_count: 0,
                operator_account: operator,
                commission_rule: rule,
            },
        );
    }

    /// Bond `tokens` one-to-one into shares for `delegator`.
    pub fn delegate(
        &mut self,
        delegator: Address,
        validator: Address,
        tokens: u64,
        referrer: Option<Address>,
    ) {
        let shares = Dec::from_u64(tokens);
        if let Some(v) = self.validators.get_mut(&validator) {
            v.tokens += tokens as u128;
            v.delegator_shares = v.delegator_shares.checked_add(shares).unwrap_or(v.delegator_shares);
            v.delegator_count += 1;
        }
        self.delegations.insert(
            (delegator, validator),
            DelegationInfo {
                delegator,
                validator,
                shares,
                referrer,
            },
        );
    }

    /// Burn `fraction` of the validator's tokens, leaving shares untouched.
    pub fn slash_tokens(&mut self, validator: &Address, fraction: Dec) {
        if let Some(v) = self.validators.get_mut(validator) {
            let burned = Dec::from_u128(v.tokens)
                .and_then(|t| t.mul_truncate(fraction))
                .map(|b| b.truncate_int() as u128)
                .unwrap_or(0);
            v.tokens -= burned;
        }
    }

    pub fn remove_delegation(&mut self, delegator: &Address, validator: &Address) {
        if self.delegations.remove(&(*delegator, *validator)).is_some() {
            if let Some(v) = self.validators.get_mut(validator) {
                v.delegator_count = v.delegator_count.saturating_sub(1);
            }
        }
    }
}

impl StakingView for MockStaking {
    fn validator(&self, operator: &Address) -> Option<ValidatorInfo> {
        self.validators.get(operator).cloned()
    }

    fn delegation(&self, delegator: &Address, validator: &Address) -> Option<DelegationInfo> {
        self.delegations.get(&(*delegator, *validator)).cloned()
    }
}

/// Ledger that records every transfer and can refuse chosen recipients.
#[derive(Clone, Debug, Default)]
pub struct RecordingLedger {
    pub transfers: Vec<(String, Address, Coins)>,
    pub blocked: HashSet<Address>,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&mut self, account: Address) {
        self.blocked.insert(account);
    }

    /// Sum of everything sent to `account` in `denom`.
    pub fn received(&self, account: &Address, denom: &str) -> u128 {
        self.transfers
            .iter()
            .filter(|(_, to, _)| to == account)
            .map(|(_, _, coins)| coins.amount_of(denom))
            .sum()
    }

    pub fn total_sent(&self, denom: &str) -> u128 {
        self.transfers.iter().map(|(_, _, coins)| coins.amount_of(denom)).sum()
    }
}

impl TokenLedger for RecordingLedger {
    fn send_from_pool_to_account(
        &mut self,
        pool: &str,
        account: &Address,
        amount: &Coins,
    ) -> Result<(), TransferError> {
        if self.blocked.contains(account) {
            return Err(TransferError::BlockedRecipient(*account));
        }
        self.transfers.push((pool.to_string(), *account, amount.clone()));
        Ok(())
    }
}
