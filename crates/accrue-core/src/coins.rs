//! Multi-denomination amounts.
//!
//! [`DecCoins`] carries fractional per-denom amounts (reward ratios, pools,
//! accumulators); [`Coins`] carries the integral amounts that actually move
//! through the token ledger. Both keep denoms sorted and never store zero
//! entries, so equality is structural.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dec::Dec;
use crate::error::ArithmeticError;

#[derive(
    Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct DecCoins(BTreeMap<String, Dec>);

impl DecCoins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(denom: &str, amount: Dec) -> Self {
        let mut coins = Self::new();
        coins.insert(denom, amount);
        coins
    }

    /// Set the amount for `denom`, removing the entry when it is zero.
    pub fn insert(&mut self, denom: &str, amount: Dec) {
        if amount.is_zero() {
            self.0.remove(denom);
        } else {
            self.0.insert(denom.to_string(), amount);
        }
    }

    pub fn amount_of(&self, denom: &str) -> Dec {
        self.0.get(denom).copied().unwrap_or(Dec::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Dec)> {
        self.0.iter().map(|(denom, amount)| (denom.as_str(), *amount))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_any_negative(&self) -> bool {
        self.0.values().any(|amount| amount.is_negative())
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, ArithmeticError> {
        let mut sum = self.clone();
        for (denom, amount) in other.iter() {
            sum.insert(denom, sum.amount_of(denom).checked_add(amount)?);
        }
        Ok(sum)
    }

    /// Per-denom difference. The result may hold negative entries; callers
    /// that require non-negative balances check [`is_any_negative`](Self::is_any_negative).
    pub fn checked_sub(&self, other: &Self) -> Result<Self, ArithmeticError> {
        let mut diff = self.clone();
        for (denom, amount) in other.iter() {
            diff.insert(denom, diff.amount_of(denom).checked_sub(amount)?);
        }
        Ok(diff)
    }

    /// Per-denom minimum over the denoms present in both sets.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (denom, amount) in self.iter() {
            out.insert(denom, amount.min(other.amount_of(denom)));
        }
        out
    }

    pub fn mul_dec(&self, factor: Dec) -> Result<Self, ArithmeticError> {
        self.map_amounts(|amount| amount.mul(factor))
    }

    pub fn mul_dec_truncate(&self, factor: Dec) -> Result<Self, ArithmeticError> {
        self.map_amounts(|amount| amount.mul_truncate(factor))
    }

    pub fn quo_dec_truncate(&self, divisor: Dec) -> Result<Self, ArithmeticError> {
        self.map_amounts(|amount| amount.quo_truncate(divisor))
    }

    /// Split into integral coins and the fractional change left over.
    ///
    /// Every amount must be non-negative.
    pub fn truncate_decimal(&self) -> Result<(Coins, DecCoins), ArithmeticError> {
        let mut whole = Coins::new();
        let mut change = DecCoins::new();
        for (denom, amount) in self.iter() {
            if amount.is_negative() {
                return Err(ArithmeticError::Negative(amount));
            }
            let truncated = amount.truncate();
            whole.insert(denom, truncated.truncate_int() as u128);
            change.insert(denom, amount.checked_sub(truncated)?);
        }
        Ok((whole, change))
    }

    fn map_amounts(
        &self,
        f: impl Fn(Dec) -> Result<Dec, ArithmeticError>,
    ) -> Result<Self, ArithmeticError> {
        let mut out = Self::new();
        for (denom, amount) in self.iter() {
            out.insert(denom, f(amount)?);
        }
        Ok(out)
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(denom, amount)| format!("{amount}{denom}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl fmt::Debug for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecCoins[{self}]")
    }
}

/// Integral per-denom token amounts.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(denom: &str, amount: u128) -> Self {
        let mut coins = Self::new();
        coins.insert(denom, amount);
        coins
    }

    pub fn insert(&mut self, denom: &str, amount: u128) {
        if amount == 0 {
            self.0.remove(denom);
        } else {
            self.0.insert(denom.to_string(), amount);
        }
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> {
        self.0.iter().map(|(denom, amount)| (denom.as_str(), *amount))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, ArithmeticError> {
        let mut sum = self.clone();
        for (denom, amount) in other.iter() {
            let total = sum
                .amount_of(denom)
                .checked_add(amount)
                .ok_or(ArithmeticError::Overflow)?;
            sum.insert(denom, total);
        }
        Ok(sum)
    }

    pub fn to_dec_coins(&self) -> Result<DecCoins, ArithmeticError> {
        let mut out = DecCoins::new();
        for (denom, amount) in self.iter() {
            out.insert(denom, Dec::from_u128(amount)?);
        }
        Ok(out)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(denom, amount)| format!("{amount}{denom}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl fmt::Debug for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coins[{self}]")
    }
}
