// ─────────────────────────────────────────────────────────────────
// Decimal coin vectors
// ─────────────────────────────────────────────────────────────────
// Same normalization as `Coins` (sorted, unique, non-zero). A stored
// DecCoins is never negative; subtraction that would go below zero
// returns None and the caller decides whether that is a user error
// or a corrupted state.
// ─────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{validate_denom, Coin, Coins, Dec, MathError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecCoins(Vec<DecCoin>);

impl DecCoins {
    pub fn new(mut coins: Vec<DecCoin>) -> Result<Self, MathError> {
        for c in &coins {
            validate_denom(&c.denom)?;
            if c.amount.is_negative() {
                return Err(MathError::NegativeAmount(c.denom.clone()));
            }
        }
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        for pair in coins.windows(2) {
            if pair[0].denom == pair[1].denom {
                return Err(MathError::DuplicateDenom(pair[0].denom.clone()));
            }
        }
        coins.retain(|c| !c.amount.is_zero());
        Ok(DecCoins(coins))
    }

    pub fn empty() -> Self {
        DecCoins(Vec::new())
    }

    pub fn single(denom: impl Into<String>, amount: Dec) -> Self {
        if amount.is_zero() {
            return DecCoins::empty();
        }
        DecCoins(vec![DecCoin::new(denom, amount)])
    }

    pub fn from_coins(coins: &Coins) -> Self {
        DecCoins(
            coins
                .iter()
                .map(|c| DecCoin::new(c.denom.clone(), Dec::from_u128(c.amount)))
                .collect(),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecCoin> {
        self.0.iter()
    }

    pub fn is_any_negative(&self) -> bool {
        self.0.iter().any(|c| c.amount.is_negative())
    }

    pub fn amount_of(&self, denom: &str) -> Dec {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|i| self.0[i].amount.clone())
            .unwrap_or_default()
    }

    /// Merge two sorted vectors denom by denom, dropping zero results.
    fn merge(&self, other: &DecCoins, op: impl Fn(&Dec, &Dec) -> Dec) -> DecCoins {
        let zero = Dec::zero();
        let mut out = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        loop {
            let (denom, amount) = match (self.0.get(i), other.0.get(j)) {
                (Some(a), Some(b)) if a.denom == b.denom => {
                    i += 1;
                    j += 1;
                    (a.denom.clone(), op(&a.amount, &b.amount))
                }
                (Some(a), Some(b)) if a.denom < b.denom => {
                    i += 1;
                    (a.denom.clone(), op(&a.amount, &zero))
                }
                (Some(_), Some(b)) => {
                    j += 1;
                    (b.denom.clone(), op(&zero, &b.amount))
                }
                (Some(a), None) => {
                    i += 1;
                    (a.denom.clone(), op(&a.amount, &zero))
                }
                (None, Some(b)) => {
                    j += 1;
                    (b.denom.clone(), op(&zero, &b.amount))
                }
                (None, None) => break,
            };
            if !amount.is_zero() {
                out.push(DecCoin::new(denom, amount));
            }
        }
        DecCoins(out)
    }

    pub fn add(&self, other: &DecCoins) -> DecCoins {
        self.merge(other, |a, b| a + b)
    }

    /// `self - other`, or `None` if any denom would go negative.
    pub fn checked_sub(&self, other: &DecCoins) -> Option<DecCoins> {
        let diff = self.merge(other, |a, b| a - b);
        if diff.is_any_negative() {
            None
        } else {
            Some(diff)
        }
    }

    /// Per-denom minimum; denoms missing from either side drop out.
    pub fn intersect(&self, other: &DecCoins) -> DecCoins {
        DecCoins(
            self.0
                .iter()
                .map(|c| {
                    let theirs = other.amount_of(&c.denom);
                    DecCoin::new(c.denom.clone(), c.amount.clone().min(theirs))
                })
                .filter(|c| !c.amount.is_zero())
                .collect(),
        )
    }

    fn map_amounts(&self, f: impl Fn(&Dec) -> Dec) -> DecCoins {
        DecCoins(
            self.0
                .iter()
                .map(|c| DecCoin::new(c.denom.clone(), f(&c.amount)))
                .filter(|c| !c.amount.is_zero())
                .collect(),
        )
    }

    pub fn mul_dec(&self, d: &Dec) -> DecCoins {
        self.map_amounts(|a| a.mul(d))
    }

    pub fn mul_dec_truncate(&self, d: &Dec) -> DecCoins {
        self.map_amounts(|a| a.mul_truncate(d))
    }

    /// Per-denom truncating division; `None` on a zero divisor.
    pub fn quo_dec_truncate(&self, d: &Dec) -> Option<DecCoins> {
        if d.is_zero() {
            return None;
        }
        Some(self.map_amounts(|a| a.checked_quo_truncate(d).unwrap_or_default()))
    }

    /// Split into whole coins and the fractional remainder.
    pub fn truncate_decimal(&self) -> Result<(Coins, DecCoins), MathError> {
        let mut whole = Vec::with_capacity(self.0.len());
        let mut change = Vec::new();
        for c in &self.0 {
            let int = c.amount.truncate_u128().ok_or(MathError::Overflow)?;
            if int > 0 {
                whole.push(Coin::new(c.denom.clone(), int));
            }
            let fract = c.amount.fract();
            if !fract.is_zero() {
                change.push(DecCoin::new(c.denom.clone(), fract));
            }
        }
        Ok((Coins::new(whole)?, DecCoins(change)))
    }

    pub fn is_all_gte(&self, other: &DecCoins) -> bool {
        other.0.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl From<&Coins> for DecCoins {
    fn from(coins: &Coins) -> Self {
        DecCoins::from_coins(coins)
    }
}

impl<'a> IntoIterator for &'a DecCoins {
    type Item = &'a DecCoin;
    type IntoIter = std::slice::Iter<'a, DecCoin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
