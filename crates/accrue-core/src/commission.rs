//! Reallocated commission rule: how a validator splits freshly allocated
//! rewards between itself, its delegators, and the referral chain.

use serde::{Deserialize, Serialize};

use crate::dec::Dec;
use crate::error::CommissionError;

/// Referral-share rate applied at one depth of the referral chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommanderClassRate {
    pub index: u32,
    pub rate: Dec,
}

impl RecommanderClassRate {
    pub fn new(index: u32, rate: Dec) -> Self {
        Self { index, rate }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReallocatedCommissionRule {
    /// Share of each allocation kept as validator commission.
    pub validator_rate: Dec,
    /// Share of each allocation set aside for the referral cascade.
    pub recommanders_rate: Dec,
    pub incentive_depth: u32,
    /// One rate per referral depth, ascending by index.
    pub class_rates: Vec<RecommanderClassRate>,
    /// Unix seconds of the last change.
    pub update_time: i64,
}

impl Default for ReallocatedCommissionRule {
    fn default() -> Self {
        Self::new(Dec::ZERO, Dec::ZERO, Vec::new())
    }
}

impl ReallocatedCommissionRule {
    /// Rule with `incentive_depth` taken from the number of class rates.
    pub fn new(validator_rate: Dec, recommanders_rate: Dec, class_rates: Vec<RecommanderClassRate>) -> Self {
        Self {
            validator_rate,
            recommanders_rate,
            incentive_depth: class_rates.len() as u32,
            class_rates,
            update_time: 0,
        }
    }

    pub fn with_update_time(mut self, update_time: i64) -> Self {
        self.update_time = update_time;
        self
    }

    /// Sort class rates ascending by index.
    pub fn sorted(mut self) -> Self {
        self.class_rates.sort_by_key(|rate| rate.index);
        self
    }

    pub fn validate(&self) -> Result<(), CommissionError> {
        if self.validator_rate.is_negative() || self.recommanders_rate.is_negative() {
            return Err(CommissionError::Negative);
        }
        if self.validator_rate > Dec::ONE || self.recommanders_rate > Dec::ONE {
            return Err(CommissionError::Huge);
        }
        let combined = self
            .validator_rate
            .checked_add(self.recommanders_rate)
            .map_err(|_| CommissionError::Huge)?;
        if combined > Dec::ONE {
            return Err(CommissionError::Huge);
        }
        if self.incentive_depth as usize != self.class_rates.len() {
            return Err(CommissionError::MismatchRecommanderClass {
                depth: self.incentive_depth,
                classes: self.class_rates.len(),
            });
        }
        validate_class_rates(&self.class_rates)
    }
}

fn validate_class_rates(rates: &[RecommanderClassRate]) -> Result<(), CommissionError> {
    let mut total = Dec::ZERO;
    for class in rates {
        if class.rate.is_negative() {
            return Err(CommissionError::Negative);
        }
        if class.rate > Dec::ONE {
            return Err(CommissionError::Huge);
        }
        total = total.checked_add(class.rate).map_err(|_| CommissionError::Huge)?;
    }
    if total > Dec::ONE {
        return Err(CommissionError::Huge);
    }
    Ok(())
}
