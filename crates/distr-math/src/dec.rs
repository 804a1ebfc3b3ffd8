// ─────────────────────────────────────────────────────────────────
// Dec — signed fixed-point decimal, 18 fractional digits
// ─────────────────────────────────────────────────────────────────
// Internally an integer scaled by 10^18, backed by BigInt so that
// products of two large amounts never overflow before rescaling.
//
// Rounding rules (consensus-critical, do not change):
//   mul / quo                  → round half to even on the 19th digit
//   mul_truncate / quo_truncate → chop toward zero
// ─────────────────────────────────────────────────────────────────

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use std::sync::OnceLock;

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::MathError;

/// Number of fractional decimal digits carried by every `Dec`.
pub const PRECISION: u32 = 18;

fn precision_multiplier() -> &'static BigInt {
    static P: OnceLock<BigInt> = OnceLock::new();
    P.get_or_init(|| BigInt::from(10u32).pow(PRECISION))
}

fn half_precision() -> &'static BigInt {
    static H: OnceLock<BigInt> = OnceLock::new();
    H.get_or_init(|| precision_multiplier() / BigInt::from(2u32))
}

fn double_precision_multiplier() -> &'static BigInt {
    static D: OnceLock<BigInt> = OnceLock::new();
    D.get_or_init(|| BigInt::from(10u32).pow(PRECISION * 2))
}

/// Remove 18 digits of precision, rounding half to even.
fn chop_precision_and_round(d: BigInt) -> BigInt {
    if d.is_negative() {
        return -chop_precision_and_round(-d);
    }
    let p = precision_multiplier();
    let quo = &d / p;
    let rem = &d % p;
    if rem.is_zero() {
        return quo;
    }
    match rem.cmp(half_precision()) {
        Ordering::Less => quo,
        Ordering::Greater => quo + BigInt::one(),
        Ordering::Equal => {
            if (&quo % BigInt::from(2u32)).is_zero() {
                quo
            } else {
                quo + BigInt::one()
            }
        }
    }
}

/// Remove 18 digits of precision, truncating toward zero.
fn chop_precision_and_truncate(d: &BigInt) -> BigInt {
    d / precision_multiplier()
}

#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(BigInt);

impl Dec {
    pub fn zero() -> Self {
        Dec(BigInt::zero())
    }

    pub fn one() -> Self {
        Dec(precision_multiplier().clone())
    }

    /// Smallest representable positive value, 10^-18.
    pub fn smallest() -> Self {
        Dec(BigInt::one())
    }

    pub fn from_u128(v: u128) -> Self {
        Dec(BigInt::from(v) * precision_multiplier())
    }

    pub fn from_i64(v: i64) -> Self {
        Dec(BigInt::from(v) * precision_multiplier())
    }

    pub fn from_bigint(v: &BigInt) -> Self {
        Dec(v * precision_multiplier())
    }

    /// `value × 10^-prec`, e.g. `Dec::with_prec(5, 1)` is 0.5.
    ///
    /// Panics if `prec` exceeds 18.
    pub fn with_prec(value: i64, prec: u32) -> Self {
        assert!(prec <= PRECISION, "precision {} exceeds {}", prec, PRECISION);
        Dec(BigInt::from(value) * BigInt::from(10u32).pow(PRECISION - prec))
    }

    /// Raw scaled integer (value × 10^18).
    pub fn raw(&self) -> &BigInt {
        &self.0
    }

    pub fn from_raw(raw: BigInt) -> Self {
        Dec(raw)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn abs(&self) -> Self {
        Dec(self.0.abs())
    }

    /// Product, rounded half to even.
    pub fn mul(&self, other: &Dec) -> Dec {
        Dec(chop_precision_and_round(&self.0 * &other.0))
    }

    /// Product, truncated toward zero.
    pub fn mul_truncate(&self, other: &Dec) -> Dec {
        Dec(chop_precision_and_truncate(&(&self.0 * &other.0)))
    }

    pub fn mul_int(&self, i: u128) -> Dec {
        Dec(&self.0 * BigInt::from(i))
    }

    /// Quotient, rounded half to even. `None` when dividing by zero.
    pub fn checked_quo(&self, other: &Dec) -> Option<Dec> {
        if other.is_zero() {
            return None;
        }
        let scaled = &self.0 * double_precision_multiplier();
        Some(Dec(chop_precision_and_round(scaled / &other.0)))
    }

    /// Quotient, truncated toward zero. `None` when dividing by zero.
    pub fn checked_quo_truncate(&self, other: &Dec) -> Option<Dec> {
        if other.is_zero() {
            return None;
        }
        let scaled = &self.0 * precision_multiplier();
        Some(Dec(scaled / &other.0))
    }

    pub fn checked_quo_int(&self, i: u128) -> Option<Dec> {
        if i == 0 {
            return None;
        }
        Some(Dec(&self.0 / BigInt::from(i)))
    }

    /// Integer part, truncated toward zero.
    pub fn truncate_int(&self) -> BigInt {
        chop_precision_and_truncate(&self.0)
    }

    /// Integer part as u128; `None` if negative or too large.
    pub fn truncate_u128(&self) -> Option<u128> {
        self.truncate_int().to_u128()
    }

    /// Same value with the fractional part dropped.
    pub fn truncate_dec(&self) -> Dec {
        Dec::from_bigint(&self.truncate_int())
    }

    /// Fractional part only (sign follows the value).
    pub fn fract(&self) -> Dec {
        Dec(&self.0 % precision_multiplier())
    }
}

// ─────────────────────────────────────────────────────────────────
// Operators (exact; no rounding involved)
// ─────────────────────────────────────────────────────────────────

impl Add for Dec {
    type Output = Dec;
    fn add(self, rhs: Dec) -> Dec {
        Dec(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Dec> for &'a Dec {
    type Output = Dec;
    fn add(self, rhs: &'a Dec) -> Dec {
        Dec(&self.0 + &rhs.0)
    }
}

impl Sub for Dec {
    type Output = Dec;
    fn sub(self, rhs: Dec) -> Dec {
        Dec(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Dec> for &'a Dec {
    type Output = Dec;
    fn sub(self, rhs: &'a Dec) -> Dec {
        Dec(&self.0 - &rhs.0)
    }
}

impl Neg for Dec {
    type Output = Dec;
    fn neg(self) -> Dec {
        Dec(-self.0)
    }
}

impl AddAssign<&Dec> for Dec {
    fn add_assign(&mut self, rhs: &Dec) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Dec> for Dec {
    fn sub_assign(&mut self, rhs: &Dec) {
        self.0 -= &rhs.0;
    }
}

// ─────────────────────────────────────────────────────────────────
// Text form: "<int>.<18 digits>"
// ─────────────────────────────────────────────────────────────────

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.abs().to_string();
        let width = PRECISION as usize;
        let (int_part, frac_part) = if digits.len() > width {
            let split = digits.len() - width;
            (digits[..split].to_string(), digits[split..].to_string())
        } else {
            ("0".to_string(), format!("{:0>width$}", digits, width = width))
        };
        let sign = if self.0.is_negative() { "-" } else { "" };
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = body.split('.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next().unwrap_or("");
        if parts.next().is_some()
            || int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || (body.ends_with('.') && frac_part.is_empty())
        {
            return Err(MathError::InvalidDecimal(s.to_string()));
        }
        if frac_part.len() > PRECISION as usize {
            return Err(MathError::TooManyDecimals(s.to_string()));
        }
        let padded = format!(
            "{}{}{}",
            int_part,
            frac_part,
            "0".repeat(PRECISION as usize - frac_part.len())
        );
        let raw = BigInt::parse_bytes(padded.as_bytes(), 10)
            .ok_or_else(|| MathError::InvalidDecimal(s.to_string()))?;
        Ok(Dec(if negative { -raw } else { raw }))
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

impl From<u128> for Dec {
    fn from(v: u128) -> Self {
        Dec::from_u128(v)
    }
}
