// ─────────────────────────────────────────────────────────────────
// Distribution state records and the staking-side views they reference
// ─────────────────────────────────────────────────────────────────

use distr_math::{Dec, DecCoins};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{DistrError, Result};

/// Global fee pool. Only the community pool lives here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePool {
    pub community_pool: DecCoins,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub community_tax: Dec,
    /// Deprecated; must stay zero.
    #[serde(default)]
    pub base_proposer_reward: Dec,
    /// Deprecated; must stay zero.
    #[serde(default)]
    pub bonus_proposer_reward: Dec,
    pub withdraw_addr_enabled: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            community_tax: Dec::with_prec(2, 2),
            base_proposer_reward: Dec::zero(),
            bonus_proposer_reward: Dec::zero(),
            withdraw_addr_enabled: true,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        if self.community_tax.is_negative() || self.community_tax > Dec::one() {
            return Err(DistrError::InvalidParams(format!(
                "community tax must be within [0, 1]: {}",
                self.community_tax
            )));
        }
        if !self.base_proposer_reward.is_zero() {
            return Err(DistrError::InvalidParams(
                "base proposer reward is deprecated and must be zero".into(),
            ));
        }
        if !self.bonus_proposer_reward.is_zero() {
            return Err(DistrError::InvalidParams(
                "bonus proposer reward is deprecated and must be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Cumulative reward ratio at the end of a period, plus how many
/// starting infos, slash events and current-reward records point at it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorHistoricalRewards {
    pub cumulative_reward_ratio: DecCoins,
    pub reference_count: u32,
}

/// Rewards accumulated in the open period. `period` is the id the
/// period will get when it is closed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCurrentRewards {
    pub rewards: DecCoins,
    pub period: u64,
}

impl ValidatorCurrentRewards {
    /// The last closed period. `None` only for a record that was never
    /// initialized, whose period is still 0.
    pub fn previous_period(&self) -> Option<u64> {
        self.period.checked_sub(1)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAccumulatedCommission {
    pub commission: DecCoins,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOutstandingRewards {
    pub rewards: DecCoins,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorStartingInfo {
    pub previous_period: u64,
    pub stake: Dec,
    pub height: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSlashEvent {
    pub validator_period: u64,
    pub fraction: Dec,
}

/// A delegation whose rewards belong to the holder of the share tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeShareRecord {
    pub id: u64,
    pub owner: Address,
    pub module_address: Address,
    pub validator: Address,
    pub share_denom: String,
}

impl TokenizeShareRecord {
    pub fn new(id: u64, owner: Address, validator: Address) -> Self {
        let share_denom = format!("share/{}/{}", validator.to_hex(), id);
        Self {
            id,
            owner,
            module_address: Address::tokenize_share_module(id),
            validator,
            share_denom,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Views supplied by the staking collaborator
// ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: Address,
    pub cons_address: Address,
    pub tokens: u128,
    pub delegator_shares: Dec,
    pub commission_rate: Dec,
    pub jailed: bool,
}

impl Validator {
    /// Token value of `shares`, rounded.
    pub fn tokens_from_shares(&self, shares: &Dec) -> Dec {
        shares
            .mul_int(self.tokens)
            .checked_quo(&self.delegator_shares)
            .unwrap_or_default()
    }

    /// Token value of `shares`, truncated.
    pub fn tokens_from_shares_truncated(&self, shares: &Dec) -> Dec {
        shares
            .mul_int(self.tokens)
            .checked_quo_truncate(&self.delegator_shares)
            .unwrap_or_default()
    }

    /// Shares minted for `amount` newly bonded tokens.
    pub fn shares_from_tokens(&self, amount: u128) -> Dec {
        if self.tokens == 0 || self.delegator_shares.is_zero() {
            return Dec::from_u128(amount);
        }
        self.delegator_shares
            .mul_int(amount)
            .checked_quo_int(self.tokens)
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: Address,
    pub shares: Dec,
}

/// One entry of the previous block's last commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub cons_address: Address,
    pub power: u64,
    pub signed_last_block: bool,
}
