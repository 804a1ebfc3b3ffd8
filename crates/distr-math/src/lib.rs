// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// F1 DISTRIBUTION - MATH MODULE
//
// Arbitrary-precision decimals (18 fractional digits) and the coin vectors
// built on top of them. Every reward ratio, commission and community pool
// balance is a `Dec`; only payouts leave this world as integer `Coins`.
// No floating point anywhere: results must be bit-identical on every node.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod coins;
pub mod dec;
pub mod dec_coins;

pub use coins::{validate_denom, Coin, Coins};
pub use dec::{Dec, PRECISION};
pub use dec_coins::{DecCoin, DecCoins};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("invalid decimal string: {0:?}")]
    InvalidDecimal(String),

    #[error("too many fractional digits in {0:?} (max 18)")]
    TooManyDecimals(String),

    #[error("invalid denom: {0:?}")]
    InvalidDenom(String),

    #[error("duplicate denom: {0}")]
    DuplicateDenom(String),

    #[error("negative coin amount for {0}")]
    NegativeAmount(String),

    #[error("insufficient {denom}: have {have}, need {need}")]
    Insufficient {
        denom: String,
        have: String,
        need: String,
    },

    #[error("amount overflows u128")]
    Overflow,
}
