//! Error types for the Accrue distribution engine.
//!
//! Errors fall into four classes:
//! - [`InvariantViolation`]: accounting corruption; the enclosing call must
//!   be aborted and never retried.
//! - [`DistributionError::EmptyDelegationDistInfo`] and friends: recoverable,
//!   caused by the request itself.
//! - [`TransferError`]: surfaced unmodified from the token ledger.
//! - [`StoreError`]: backend or codec failures.
use thiserror::Error;

use crate::dec::Dec;
use crate::types::Address;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("decimal overflow")] Overflow,
    #[error("division by zero")] DivisionByZero,
    #[error("negative amount where a non-negative one is required: {0}")] Negative(Dec),
    #[error("invalid decimal string: {0}")] Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("starting period {start} is after ending period {end}")] PeriodsOutOfOrder { start: u64, end: u64 },
    #[error("stake should not be negative: {0}")] NegativeStake(Dec),
    #[error("negative reward ratio for validator {validator} between periods {start} and {end}")] NegativeRewardRatio { validator: Address, start: u64, end: u64 },
    #[error("calculated final stake for delegator {delegator} greater than current stake: final {stake}, current {current}")] StakeExceedsCurrent { delegator: Address, stake: Dec, current: Dec },
    #[error("historical rewards missing for validator {validator} at period {period}")] MissingHistoricalRewards { validator: Address, period: u64 },
    #[error("current rewards missing for validator {0}")] MissingCurrentRewards(Address),
    #[error("reference count for validator {validator} period {period} would exceed {max}")] ReferenceCountOverflow { validator: Address, period: u64, max: u32 },
    #[error("reference count for validator {validator} period {period} is already zero")] ReferenceCountUnderflow { validator: Address, period: u64 },
    #[error("slash fraction outside [0, 1): {0}")] InvalidSlashFraction(Dec),
    #[error("outstanding rewards of validator {0} would become negative")] OutstandingUnderflow(Address),
}

/// Failure reported by the external token ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds in pool {pool}")] InsufficientFunds { pool: String },
    #[error("recipient {0} is blocked from receiving funds")] BlockedRecipient(Address),
    #[error("transfer rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommissionError {
    #[error("commission rate must be non-negative")] Negative,
    #[error("commission rate cannot exceed 1")] Huge,
    #[error("incentive depth {depth} does not match {classes} recommander class rates")] MismatchRecommanderClass { depth: u32, classes: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("backend: {0}")] Backend(String),
    #[error("codec: {0}")] Codec(String),
    #[error("malformed key: {0}")] MalformedKey(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("delayed reward proportion must lie in [0, 1], got {0}")] InvalidDelayedProportion(Dec),
    #[error("delayed reward unit must be at least one second")] ZeroRewardUnit,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")] Io { path: String, source: std::io::Error },
    #[error("parsing params: {0}")] Json(#[from] serde_json::Error),
    #[error(transparent)] Params(#[from] ParamsError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("no delegation distribution info for delegator {delegator} on validator {validator}")] EmptyDelegationDistInfo { validator: Address, delegator: Address },
    #[error("validator not found: {0}")] ValidatorNotFound(Address),
    #[error("delegation of {delegator} to validator {validator} not found")] DelegationNotFound { validator: Address, delegator: Address },
    #[error("no validator commission to withdraw")] NoValidatorCommission,
    #[error("set withdraw address is disabled")] WithdrawAddrDisabled,
    #[error(transparent)] Invariant(#[from] InvariantViolation),
    #[error(transparent)] Transfer(#[from] TransferError),
    #[error(transparent)] Commission(#[from] CommissionError),
    #[error(transparent)] Arithmetic(#[from] ArithmeticError),
    #[error(transparent)] Store(#[from] StoreError),
    #[error(transparent)] Params(#[from] ParamsError),
}

impl DistributionError {
    /// Whether the error signals corrupted accounting state.
    ///
    /// Fatal errors must abort the enclosing transaction and must not be
    /// retried; everything else is either caller error or a transient
    /// collaborator failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_) | Self::Arithmetic(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violations_are_fatal() {
        let err: DistributionError = InvariantViolation::NegativeStake(Dec::from_i64(-1)).into();
        assert!(err.is_fatal());
    }

    #[test]
    fn not_found_is_recoverable() {
        let err = DistributionError::EmptyDelegationDistInfo {
            validator: Address([1; 20]),
            delegator: Address([2; 20]),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn transfer_failure_is_transparent() {
        let err: DistributionError = TransferError::Rejected("frozen".into()).into();
        assert_eq!(err.to_string(), "transfer rejected: frozen");
        assert!(!err.is_fatal());
    }
}
