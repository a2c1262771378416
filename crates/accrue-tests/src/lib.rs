//! Scenario test suite for the Accrue distribution engine.
//!
//! Integration tests drive whole accounting steps (bonding, allocation,
//! slashing, vesting, withdrawal) through [`helpers::Harness`] and check
//! the payouts and conservation of funds end to end.

pub mod helpers;
