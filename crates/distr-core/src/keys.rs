// ─────────────────────────────────────────────────────────────────
// Store key layout
// ─────────────────────────────────────────────────────────────────
// 0x00                                          → FeePool
// 0x01                                          → previous proposer
// 0x02 | len | val                              → outstanding rewards
// 0x03 | len | del                              → withdraw address
// 0x04 | len | val | len | del                  → delegator starting info
// 0x05 | len | val | period(be64)               → historical rewards
// 0x06 | len | val                              → current rewards
// 0x07 | len | val                              → accumulated commission
// 0x08 | len | val | height(be64) | period(be64) → slash event
// 0x09                                          → params
//
// Addresses carry a one-byte length so a prefix scan over one validator
// never picks up a longer address that happens to share its bytes.
// ─────────────────────────────────────────────────────────────────

use crate::address::Address;
use crate::error::{DistrError, Result};

pub const FEE_POOL_KEY: u8 = 0x00;
pub const PROPOSER_KEY: u8 = 0x01;
pub const VALIDATOR_OUTSTANDING_REWARDS_PREFIX: u8 = 0x02;
pub const DELEGATOR_WITHDRAW_ADDR_PREFIX: u8 = 0x03;
pub const DELEGATOR_STARTING_INFO_PREFIX: u8 = 0x04;
pub const VALIDATOR_HISTORICAL_REWARDS_PREFIX: u8 = 0x05;
pub const VALIDATOR_CURRENT_REWARDS_PREFIX: u8 = 0x06;
pub const VALIDATOR_ACCUMULATED_COMMISSION_PREFIX: u8 = 0x07;
pub const VALIDATOR_SLASH_EVENT_PREFIX: u8 = 0x08;
pub const PARAMS_KEY: u8 = 0x09;

fn push_addr(buf: &mut Vec<u8>, addr: &Address) {
    buf.push(addr.len() as u8);
    buf.extend_from_slice(addr.as_bytes());
}

fn with_addr(prefix: u8, addr: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + addr.len() + 16);
    key.push(prefix);
    push_addr(&mut key, addr);
    key
}

pub fn fee_pool_key() -> Vec<u8> {
    vec![FEE_POOL_KEY]
}

pub fn proposer_key() -> Vec<u8> {
    vec![PROPOSER_KEY]
}

pub fn params_key() -> Vec<u8> {
    vec![PARAMS_KEY]
}

pub fn outstanding_rewards_key(val: &Address) -> Vec<u8> {
    with_addr(VALIDATOR_OUTSTANDING_REWARDS_PREFIX, val)
}

pub fn withdraw_addr_key(del: &Address) -> Vec<u8> {
    with_addr(DELEGATOR_WITHDRAW_ADDR_PREFIX, del)
}

pub fn starting_info_prefix(val: &Address) -> Vec<u8> {
    with_addr(DELEGATOR_STARTING_INFO_PREFIX, val)
}

pub fn starting_info_key(val: &Address, del: &Address) -> Vec<u8> {
    let mut key = starting_info_prefix(val);
    push_addr(&mut key, del);
    key
}

pub fn historical_rewards_prefix(val: &Address) -> Vec<u8> {
    with_addr(VALIDATOR_HISTORICAL_REWARDS_PREFIX, val)
}

pub fn historical_rewards_key(val: &Address, period: u64) -> Vec<u8> {
    let mut key = historical_rewards_prefix(val);
    key.extend_from_slice(&period.to_be_bytes());
    key
}

pub fn current_rewards_key(val: &Address) -> Vec<u8> {
    with_addr(VALIDATOR_CURRENT_REWARDS_PREFIX, val)
}

pub fn commission_key(val: &Address) -> Vec<u8> {
    with_addr(VALIDATOR_ACCUMULATED_COMMISSION_PREFIX, val)
}

pub fn slash_event_prefix(val: &Address) -> Vec<u8> {
    with_addr(VALIDATOR_SLASH_EVENT_PREFIX, val)
}

/// All slash events of `val` at exactly `height`.
pub fn slash_event_height_prefix(val: &Address, height: u64) -> Vec<u8> {
    let mut key = slash_event_prefix(val);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub fn slash_event_key(val: &Address, height: u64, period: u64) -> Vec<u8> {
    let mut key = slash_event_height_prefix(val, height);
    key.extend_from_slice(&period.to_be_bytes());
    key
}

// ─────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────

struct KeyReader<'k> {
    key: &'k [u8],
    pos: usize,
}

impl<'k> KeyReader<'k> {
    fn new(key: &'k [u8], prefix: u8) -> Result<Self> {
        match key.first() {
            Some(&p) if p == prefix => Ok(Self { key, pos: 1 }),
            _ => Err(DistrError::Codec(format!(
                "key {} does not start with prefix {:#04x}",
                hex::encode(key),
                prefix
            ))),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'k [u8]> {
        let end = self.pos + n;
        if end > self.key.len() {
            return Err(DistrError::Codec(format!(
                "key {} truncated",
                hex::encode(self.key)
            )));
        }
        let out = &self.key[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn address(&mut self) -> Result<Address> {
        let len = self.take(1)?[0] as usize;
        let bytes = self.take(len)?;
        Address::new(bytes.to_vec()).map_err(|e| DistrError::Codec(e.to_string()))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    fn finish(self) -> Result<()> {
        if self.pos != self.key.len() {
            return Err(DistrError::Codec(format!(
                "key {} has trailing bytes",
                hex::encode(self.key)
            )));
        }
        Ok(())
    }
}

/// Address following a single-address prefix (outstanding, current,
/// commission, withdraw address).
pub fn parse_address_key(key: &[u8], prefix: u8) -> Result<Address> {
    let mut r = KeyReader::new(key, prefix)?;
    let addr = r.address()?;
    r.finish()?;
    Ok(addr)
}

pub fn parse_starting_info_key(key: &[u8]) -> Result<(Address, Address)> {
    let mut r = KeyReader::new(key, DELEGATOR_STARTING_INFO_PREFIX)?;
    let val = r.address()?;
    let del = r.address()?;
    r.finish()?;
    Ok((val, del))
}

pub fn parse_historical_rewards_key(key: &[u8]) -> Result<(Address, u64)> {
    let mut r = KeyReader::new(key, VALIDATOR_HISTORICAL_REWARDS_PREFIX)?;
    let val = r.address()?;
    let period = r.u64()?;
    r.finish()?;
    Ok((val, period))
}

pub fn parse_slash_event_key(key: &[u8]) -> Result<(Address, u64, u64)> {
    let mut r = KeyReader::new(key, VALIDATOR_SLASH_EVENT_PREFIX)?;
    let val = r.address()?;
    let height = r.u64()?;
    let period = r.u64()?;
    r.finish()?;
    Ok((val, height, period))
}
