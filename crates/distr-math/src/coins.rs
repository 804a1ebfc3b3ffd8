// ─────────────────────────────────────────────────────────────────
// Integer coin vectors
// ─────────────────────────────────────────────────────────────────
// `Coins` is always normalized: sorted by denom (byte order), no
// duplicate denoms, no zero amounts. Amounts are u128 base units.
// ─────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MathError;

/// Denoms: a letter followed by 2..=127 of `[a-zA-Z0-9/:._-]`.
pub fn validate_denom(denom: &str) -> Result<(), MathError> {
    let bytes = denom.as_bytes();
    let ok = (3..=128).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(MathError::InvalidDenom(denom.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Build a normalized vector. Zero entries are dropped; duplicate
    /// or malformed denoms are rejected.
    pub fn new(mut coins: Vec<Coin>) -> Result<Self, MathError> {
        for c in &coins {
            validate_denom(&c.denom)?;
        }
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        for pair in coins.windows(2) {
            if pair[0].denom == pair[1].denom {
                return Err(MathError::DuplicateDenom(pair[0].denom.clone()));
            }
        }
        coins.retain(|c| !c.is_zero());
        Ok(Coins(coins))
    }

    pub fn empty() -> Self {
        Coins(Vec::new())
    }

    /// Single-denom vector (empty when `amount` is zero).
    pub fn single(denom: impl Into<String>, amount: u128) -> Self {
        if amount == 0 {
            return Coins::empty();
        }
        Coins(vec![Coin::new(denom, amount)])
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|i| self.0[i].amount)
            .unwrap_or(0)
    }

    pub fn checked_add(&self, other: &Coins) -> Result<Coins, MathError> {
        let mut out: Vec<Coin> = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() || j < other.0.len() {
            let next = match (self.0.get(i), other.0.get(j)) {
                (Some(a), Some(b)) if a.denom == b.denom => {
                    i += 1;
                    j += 1;
                    let amount = a.amount.checked_add(b.amount).ok_or(MathError::Overflow)?;
                    Coin::new(a.denom.clone(), amount)
                }
                (Some(a), Some(b)) if a.denom < b.denom => {
                    i += 1;
                    a.clone()
                }
                (Some(_), Some(b)) => {
                    j += 1;
                    b.clone()
                }
                (Some(a), None) => {
                    i += 1;
                    a.clone()
                }
                (None, Some(b)) => {
                    j += 1;
                    b.clone()
                }
                (None, None) => break,
            };
            out.push(next);
        }
        Ok(Coins(out))
    }

    /// `self - other`; fails if any denom would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins, MathError> {
        let mut out = self.0.clone();
        for c in &other.0 {
            match out.binary_search_by(|x| x.denom.cmp(&c.denom)) {
                Ok(idx) if out[idx].amount >= c.amount => out[idx].amount -= c.amount,
                Ok(idx) => {
                    return Err(MathError::Insufficient {
                        denom: c.denom.clone(),
                        have: out[idx].amount.to_string(),
                        need: c.amount.to_string(),
                    })
                }
                Err(_) => {
                    return Err(MathError::Insufficient {
                        denom: c.denom.clone(),
                        have: "0".to_string(),
                        need: c.amount.to_string(),
                    })
                }
            }
        }
        out.retain(|c| !c.is_zero());
        Ok(Coins(out))
    }

    /// True when every denom in `other` is covered by `self`.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.0.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
