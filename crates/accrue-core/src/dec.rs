//! Fixed-point decimal with 18 fractional digits.
//!
//! A [`Dec`] stores a signed count of 10^-18 units in an `i128`. Products and
//! quotients are formed in arbitrary precision and rescaled once, so no
//! intermediate overflows; only a final result outside the `i128` range
//! reports [`ArithmeticError::Overflow`].
//!
//! Two rounding modes are offered:
//! - `mul` / `quo` / `quo_int` round half to even on the dropped digits.
//! - `mul_truncate` / `quo_truncate` truncate toward zero. Reward math uses
//!   these so a computed payout never exceeds the exact amount owed.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ArithmeticError;

/// Number of fractional decimal digits.
pub const PRECISION: u32 = 18;

const ONE_RAW: i128 = 1_000_000_000_000_000_000;

#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, bincode::Encode, bincode::Decode,
)]
pub struct Dec(i128);

impl Dec {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE_RAW);
    /// Smallest positive representable value, 10^-18.
    pub const SMALLEST: Self = Self(1);

    /// Wrap a raw count of 10^-18 units.
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// Raw count of 10^-18 units.
    pub const fn raw(self) -> i128 {
        self.0
    }

    pub fn from_i64(value: i64) -> Self {
        Self(value as i128 * ONE_RAW)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value as i128 * ONE_RAW)
    }

    pub fn from_u128(value: u128) -> Result<Self, ArithmeticError> {
        i128::try_from(value)
            .ok()
            .and_then(|v| v.checked_mul(ONE_RAW))
            .map(Self)
            .ok_or(ArithmeticError::Overflow)
    }

    /// `numerator / denominator`, rounded half to even.
    pub fn from_ratio(numerator: i64, denominator: i64) -> Result<Self, ArithmeticError> {
        Self::from_i64(numerator).quo(Self::from_i64(denominator))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn abs(self) -> Result<Self, ArithmeticError> {
        self.0.checked_abs().map(Self).ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_add(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0.checked_add(other.0).map(Self).ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0.checked_sub(other.0).map(Self).ok_or(ArithmeticError::Overflow)
    }

    /// Exact multiplication by an integer.
    pub fn mul_int(self, factor: i128) -> Result<Self, ArithmeticError> {
        self.0.checked_mul(factor).map(Self).ok_or(ArithmeticError::Overflow)
    }

    /// Product rounded half to even.
    pub fn mul(self, other: Self) -> Result<Self, ArithmeticError> {
        let product = BigInt::from(self.0) * BigInt::from(other.0);
        to_dec(round_half_even(product, BigInt::from(ONE_RAW)))
    }

    /// Product truncated toward zero.
    pub fn mul_truncate(self, other: Self) -> Result<Self, ArithmeticError> {
        let product = BigInt::from(self.0) * BigInt::from(other.0);
        to_dec(product / BigInt::from(ONE_RAW))
    }

    /// Quotient rounded half to even.
    pub fn quo(self, other: Self) -> Result<Self, ArithmeticError> {
        if other.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        let (numerator, denominator) = signed_quotient(self, other);
        to_dec(round_half_even(numerator, denominator))
    }

    /// Quotient truncated toward zero.
    pub fn quo_truncate(self, other: Self) -> Result<Self, ArithmeticError> {
        if other.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        let (numerator, denominator) = signed_quotient(self, other);
        to_dec(numerator / denominator)
    }

    /// `self * numerator / denominator` in one step, rounded half to even.
    ///
    /// Only the final result has to fit; the product is never materialized
    /// as a `Dec`.
    pub fn mul_quo(self, numerator: Self, denominator: Self) -> Result<Self, ArithmeticError> {
        let (product, denominator) = scaled_ratio(self, numerator, denominator)?;
        to_dec(round_half_even(product, denominator))
    }

    /// [`mul_quo`](Self::mul_quo) truncated toward zero.
    pub fn mul_quo_truncate(self, numerator: Self, denominator: Self) -> Result<Self, ArithmeticError> {
        let (product, denominator) = scaled_ratio(self, numerator, denominator)?;
        to_dec(product / denominator)
    }

    /// Division by an integer, rounded half to even.
    pub fn quo_int(self, divisor: u64) -> Result<Self, ArithmeticError> {
        if divisor == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        to_dec(round_half_even(BigInt::from(self.0), BigInt::from(divisor)))
    }

    /// Integral part, truncated toward zero.
    pub fn truncate_int(self) -> i128 {
        self.0 / ONE_RAW
    }

    /// `self` with the fractional digits dropped (toward zero).
    pub fn truncate(self) -> Self {
        Self(self.0 - self.0 % ONE_RAW)
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }
}

/// Arrange `a / b` as `(a * ONE) / |b|` with the sign carried on the numerator.
fn signed_quotient(a: Dec, b: Dec) -> (BigInt, BigInt) {
    let numerator = BigInt::from(a.0) * BigInt::from(ONE_RAW);
    let denominator = BigInt::from(b.0);
    if denominator.is_negative() {
        (-numerator, -denominator)
    } else {
        (numerator, denominator)
    }
}

/// Arrange `a * b / c` over raw units with a positive denominator.
fn scaled_ratio(a: Dec, b: Dec, c: Dec) -> Result<(BigInt, BigInt), ArithmeticError> {
    if c.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }
    let product = BigInt::from(a.0) * BigInt::from(b.0);
    let denominator = BigInt::from(c.0);
    if denominator.is_negative() {
        Ok((-product, -denominator))
    } else {
        Ok((product, denominator))
    }
}

/// `numerator / denominator` rounded half to even. `denominator` must be positive.
fn round_half_even(numerator: BigInt, denominator: BigInt) -> BigInt {
    let quotient = &numerator / &denominator;
    let remainder = &numerator % &denominator;
    if remainder.is_zero() {
        return quotient;
    }
    let step = if numerator.is_negative() { BigInt::from(-1) } else { BigInt::from(1) };
    let twice = remainder.abs() * 2u32;
    match twice.cmp(&denominator) {
        std::cmp::Ordering::Greater => quotient + step,
        std::cmp::Ordering::Equal if (&quotient % 2u32) != BigInt::zero() => quotient + step,
        _ => quotient,
    }
}

fn to_dec(raw: BigInt) -> Result<Dec, ArithmeticError> {
    raw.to_i128().map(Dec).ok_or(ArithmeticError::Overflow)
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        let one = ONE_RAW as u128;
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}{}.{:0width$}",
            magnitude / one,
            magnitude % one,
            width = PRECISION as usize
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({self})")
    }
}

impl FromStr for Dec {
    type Err = ArithmeticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArithmeticError::Parse(s.to_string());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty()
            || frac_part.len() > PRECISION as usize
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let int_value: i128 = int_part.parse().map_err(|_| invalid())?;
        let frac_value: i128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{frac_part:0<width$}", width = PRECISION as usize);
            padded.parse().map_err(|_| invalid())?
        };

        let raw = int_value
            .checked_mul(ONE_RAW)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self(if negative { -raw } else { raw }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
