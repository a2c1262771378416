//! Protocol constants and parameter defaults.

/// Module pool that holds undistributed rewards and pays withdrawals.
pub const DISTRIBUTION_POOL: &str = "distribution";

/// Default minimum vesting duration, in ticks.
pub const DEFAULT_MIN_DELAYED_PERIOD: u64 = 7;

/// Default extra vesting ticks at full concentration deviation.
pub const DEFAULT_MAX_DELAYED_INTERVAL: u64 = 21;

/// Default tick length: one day.
pub const DEFAULT_DELAYED_REWARD_UNIT_SECS: u64 = 86_400;

/// Default reconciliation tolerance, in smallest decimal units.
pub const DEFAULT_STAKE_TOLERANCE_UNITS: u64 = 3;

/// Upper bound on references to one historical checkpoint: the open period,
/// a slash event closed at that period, and one starting info.
pub const MAX_REFERENCE_COUNT: u32 = 3;
