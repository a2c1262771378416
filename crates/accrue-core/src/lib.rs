//! # accrue-core
//! Foundation types and contracts for the Accrue reward distribution engine.
//!
//! - [`dec::Dec`] and [`coins`]: fixed-point and multi-denom amounts
//! - [`types`]: addresses and persisted distribution records
//! - [`traits`]: collaborator interfaces (staking view, token ledger, clock)
//! - [`kv`]: ordered key-value storage and the transactional overlay
//! - [`params`]: chain parameters and engine configuration

pub mod coins;
pub mod commission;
pub mod constants;
pub mod dec;
pub mod error;
pub mod kv;
pub mod params;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use coins::{Coins, DecCoins};
pub use dec::Dec;
pub use types::Address;
