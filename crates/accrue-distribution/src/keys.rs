//! Store key layout.
//!
//! Every key is a one-byte prefix followed by fixed-width fields: 20-byte
//! addresses, big-endian `u64`s, and bucket times as sign-flipped
//! big-endian `i64`s. Lexicographic key order therefore matches numeric
//! order, which the ordered scans over slash events and vesting buckets
//! rely on.

use accrue_core::error::StoreError;
use accrue_core::types::{ADDRESS_LEN, Address};

pub const OUTSTANDING_REWARDS_PREFIX: u8 = 0x01;
pub const HISTORICAL_REWARDS_PREFIX: u8 = 0x02;
pub const CURRENT_REWARDS_PREFIX: u8 = 0x03;
pub const STARTING_INFO_PREFIX: u8 = 0x04;
pub const SLASH_EVENT_PREFIX: u8 = 0x05;
pub const ACCUMULATED_COMMISSION_PREFIX: u8 = 0x06;
pub const DELAYED_REWARD_PREFIX: u8 = 0x07;
pub const DELAYED_REWARD_INFO_PREFIX: u8 = 0x08;
pub const FEE_POOL_KEY: &[u8] = &[0x09];
pub const WITHDRAW_ADDR_PREFIX: u8 = 0x0A;

fn with_address(prefix: u8, addr: &Address, extra: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ADDRESS_LEN + extra);
    key.push(prefix);
    key.extend_from_slice(addr.as_bytes());
    key
}

/// Order-preserving encoding of a signed timestamp.
pub fn encode_time(secs: i64) -> [u8; 8] {
    ((secs as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn decode_time(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
}

pub fn outstanding_rewards(val: &Address) -> Vec<u8> {
    with_address(OUTSTANDING_REWARDS_PREFIX, val, 0)
}

pub fn historical_rewards(val: &Address, period: u64) -> Vec<u8> {
    let mut key = with_address(HISTORICAL_REWARDS_PREFIX, val, 8);
    key.extend_from_slice(&period.to_be_bytes());
    key
}

pub fn historical_rewards_prefix(val: &Address) -> Vec<u8> {
    with_address(HISTORICAL_REWARDS_PREFIX, val, 0)
}

pub fn current_rewards(val: &Address) -> Vec<u8> {
    with_address(CURRENT_REWARDS_PREFIX, val, 0)
}

pub fn starting_info(val: &Address, del: &Address) -> Vec<u8> {
    let mut key = with_address(STARTING_INFO_PREFIX, val, ADDRESS_LEN);
    key.extend_from_slice(del.as_bytes());
    key
}

pub fn slash_event(val: &Address, height: u64, period: u64) -> Vec<u8> {
    let mut key = slash_events_from_height(val, height);
    key.extend_from_slice(&period.to_be_bytes());
    key
}

/// Lower bound of every slash event of `val` recorded at `height` or later.
pub fn slash_events_from_height(val: &Address, height: u64) -> Vec<u8> {
    let mut key = with_address(SLASH_EVENT_PREFIX, val, 16);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub fn slash_events_prefix(val: &Address) -> Vec<u8> {
    with_address(SLASH_EVENT_PREFIX, val, 0)
}

/// Recover `(validator, height, period)` from a slash event key.
pub fn split_slash_event_key(key: &[u8]) -> Result<(Address, u64, u64), StoreError> {
    if key.len() != 1 + ADDRESS_LEN + 16 || key[0] != SLASH_EVENT_PREFIX {
        return Err(StoreError::MalformedKey(format!("slash event key {}", hex::encode(key))));
    }
    let val = Address::from_slice(&key[1..1 + ADDRESS_LEN])?;
    let height = be_u64(&key[1 + ADDRESS_LEN..1 + ADDRESS_LEN + 8])?;
    let period = be_u64(&key[1 + ADDRESS_LEN + 8..])?;
    Ok((val, height, period))
}

pub fn accumulated_commission(val: &Address) -> Vec<u8> {
    with_address(ACCUMULATED_COMMISSION_PREFIX, val, 0)
}

pub fn delayed_reward(val: &Address, bucket_time: i64) -> Vec<u8> {
    let mut key = with_address(DELAYED_REWARD_PREFIX, val, 8);
    key.extend_from_slice(&encode_time(bucket_time));
    key
}

pub fn delayed_rewards_prefix(val: &Address) -> Vec<u8> {
    with_address(DELAYED_REWARD_PREFIX, val, 0)
}

/// Recover `(validator, bucket_time)` from a delayed reward key.
pub fn split_delayed_reward_key(key: &[u8]) -> Result<(Address, i64), StoreError> {
    if key.len() != 1 + ADDRESS_LEN + 8 || key[0] != DELAYED_REWARD_PREFIX {
        return Err(StoreError::MalformedKey(format!("delayed reward key {}", hex::encode(key))));
    }
    let val = Address::from_slice(&key[1..1 + ADDRESS_LEN])?;
    let time = decode_time(fixed8(&key[1 + ADDRESS_LEN..])?);
    Ok((val, time))
}

pub fn delayed_reward_info(val: &Address) -> Vec<u8> {
    with_address(DELAYED_REWARD_INFO_PREFIX, val, 0)
}

pub fn withdraw_addr(del: &Address) -> Vec<u8> {
    with_address(WITHDRAW_ADDR_PREFIX, del, 0)
}

fn fixed8(bytes: &[u8]) -> Result<[u8; 8], StoreError> {
    bytes
        .try_into()
        .map_err(|_| StoreError::MalformedKey(format!("expected 8 bytes, got {}", bytes.len())))
}

fn be_u64(bytes: &[u8]) -> Result<u64, StoreError> {
    fixed8(bytes).map(u64::from_be_bytes)
}
