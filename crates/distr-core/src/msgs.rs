// ─────────────────────────────────────────────────────────────────
// Message surface
// ─────────────────────────────────────────────────────────────────
// Wire form is JSON. Every message passes `validate_basic` (stateless)
// before it reaches the keeper, and the keeper runs it inside a branch
// so a rejected message leaves no trace.
// ─────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use distr_math::Coins;

use crate::address::Address;
use crate::context::Context;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::keeper::Keeper;
use crate::types::Params;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgSetWithdrawAddress {
    pub delegator_address: Address,
    pub withdraw_address: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgWithdrawDelegatorReward {
    pub delegator_address: Address,
    pub validator_address: Address,
}

/// Signed by the validator operator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgWithdrawValidatorCommission {
    pub validator_address: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgFundCommunityPool {
    pub amount: Coins,
    pub depositor: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgCommunityPoolSpend {
    pub authority: Address,
    pub recipient: Address,
    pub amount: Coins,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgUpdateParams {
    pub authority: Address,
    pub params: Params,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgWithdrawTokenizeShareRecordReward {
    pub owner_address: Address,
    pub record_id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MsgWithdrawAllTokenizeShareRecordReward {
    pub owner_address: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Msg {
    SetWithdrawAddress(MsgSetWithdrawAddress),
    WithdrawDelegatorReward(MsgWithdrawDelegatorReward),
    WithdrawValidatorCommission(MsgWithdrawValidatorCommission),
    FundCommunityPool(MsgFundCommunityPool),
    CommunityPoolSpend(MsgCommunityPoolSpend),
    UpdateParams(MsgUpdateParams),
    WithdrawTokenizeShareRecordReward(MsgWithdrawTokenizeShareRecordReward),
    WithdrawAllTokenizeShareRecordReward(MsgWithdrawAllTokenizeShareRecordReward),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MsgResponse {
    SetWithdrawAddress,
    WithdrawDelegatorReward { amount: Coins },
    WithdrawValidatorCommission { amount: Coins },
    FundCommunityPool,
    CommunityPoolSpend,
    UpdateParams,
    WithdrawTokenizeShareRecordReward { amount: Coins },
    WithdrawAllTokenizeShareRecordReward { amount: Coins },
}

/// Amounts arrive as raw JSON lists; reject anything not already in
/// canonical form, and anything empty.
fn validate_amount(amount: &Coins) -> Result<()> {
    let canonical = Coins::new(amount.as_slice().to_vec())
        .map_err(|e| DistrError::InvalidCoins(e.to_string()))?;
    if &canonical != amount {
        return Err(DistrError::InvalidCoins(format!(
            "{} is not sorted, deduplicated and free of zero amounts",
            amount
        )));
    }
    if amount.is_zero() {
        return Err(DistrError::InvalidCoins("amount cannot be empty".into()));
    }
    Ok(())
}

impl Msg {
    pub fn from_json(raw: &str) -> Result<Msg> {
        serde_json::from_str(raw).map_err(|e| DistrError::MalformedMsg(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| DistrError::MalformedMsg(e.to_string()))
    }

    /// Stateless checks. Addresses are already non-empty by construction.
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Msg::FundCommunityPool(m) => validate_amount(&m.amount),
            Msg::CommunityPoolSpend(m) => validate_amount(&m.amount),
            Msg::UpdateParams(m) => m.params.validate(),
            Msg::SetWithdrawAddress(_)
            | Msg::WithdrawDelegatorReward(_)
            | Msg::WithdrawValidatorCommission(_)
            | Msg::WithdrawTokenizeShareRecordReward(_)
            | Msg::WithdrawAllTokenizeShareRecordReward(_) => Ok(()),
        }
    }

    /// The account that must have signed the message.
    pub fn signer(&self) -> &Address {
        match self {
            Msg::SetWithdrawAddress(m) => &m.delegator_address,
            Msg::WithdrawDelegatorReward(m) => &m.delegator_address,
            Msg::WithdrawValidatorCommission(m) => &m.validator_address,
            Msg::FundCommunityPool(m) => &m.depositor,
            Msg::CommunityPoolSpend(m) => &m.authority,
            Msg::UpdateParams(m) => &m.authority,
            Msg::WithdrawTokenizeShareRecordReward(m) => &m.owner_address,
            Msg::WithdrawAllTokenizeShareRecordReward(m) => &m.owner_address,
        }
    }
}

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Validate and execute one message atomically.
    pub fn handle_msg(&self, ctx: &mut Context<'_>, msg: &Msg) -> Result<MsgResponse> {
        msg.validate_basic()?;
        ctx.branch(|ctx| self.dispatch(ctx, msg))
    }

    fn dispatch(&self, ctx: &mut Context<'_>, msg: &Msg) -> Result<MsgResponse> {
        match msg {
            Msg::SetWithdrawAddress(m) => {
                self.set_withdraw_addr(ctx, &m.delegator_address, &m.withdraw_address)?;
                Ok(MsgResponse::SetWithdrawAddress)
            }
            Msg::WithdrawDelegatorReward(m) => {
                let amount = self.withdraw_delegation_rewards(
                    ctx,
                    &m.delegator_address,
                    &m.validator_address,
                )?;
                Ok(MsgResponse::WithdrawDelegatorReward { amount })
            }
            Msg::WithdrawValidatorCommission(m) => {
                let amount = self.withdraw_validator_commission(ctx, &m.validator_address)?;
                Ok(MsgResponse::WithdrawValidatorCommission { amount })
            }
            Msg::FundCommunityPool(m) => {
                self.fund_community_pool(ctx, &m.amount, &m.depositor)?;
                Ok(MsgResponse::FundCommunityPool)
            }
            Msg::CommunityPoolSpend(m) => {
                self.check_authority(&m.authority)?;
                self.distribute_from_fee_pool(ctx, &m.amount, &m.recipient)?;
                Ok(MsgResponse::CommunityPoolSpend)
            }
            Msg::UpdateParams(m) => {
                self.update_params(ctx, &m.authority, &m.params)?;
                Ok(MsgResponse::UpdateParams)
            }
            Msg::WithdrawTokenizeShareRecordReward(m) => {
                let amount =
                    self.withdraw_single_share_record_reward(ctx, &m.owner_address, m.record_id)?;
                Ok(MsgResponse::WithdrawTokenizeShareRecordReward { amount })
            }
            Msg::WithdrawAllTokenizeShareRecordReward(m) => {
                let amount = self.withdraw_all_share_record_rewards(ctx, &m.owner_address)?;
                Ok(MsgResponse::WithdrawAllTokenizeShareRecordReward { amount })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::keeper::test_support::*;
    use crate::keeper::store;
    use distr_math::{Coin, Dec, DecCoins};
    use distr_store::MemStore;

    #[test]
    fn test_json_wire_form() {
        let msg = Msg::WithdrawDelegatorReward(MsgWithdrawDelegatorReward {
            delegator_address: addr(1),
            validator_address: addr(2),
        });
        let json = msg.to_json().unwrap();
        assert!(json.starts_with("{\"withdraw_delegator_reward\":"));
        assert!(json.contains(&addr(1).to_hex()));
        assert_eq!(Msg::from_json(&json).unwrap(), msg);

        assert!(matches!(
            Msg::from_json("{\"nope\":{}}"),
            Err(DistrError::MalformedMsg(_))
        ));
        assert!(matches!(
            Msg::from_json(
                "{\"withdraw_validator_commission\":{\"validator_address\":\"\"}}"
            ),
            Err(DistrError::MalformedMsg(_))
        ));
    }

    #[test]
    fn test_validate_basic_amounts() {
        let ok = Msg::FundCommunityPool(MsgFundCommunityPool {
            amount: Coins::single("stake", 5),
            depositor: addr(1),
        });
        assert!(ok.validate_basic().is_ok());

        let empty = Msg::FundCommunityPool(MsgFundCommunityPool {
            amount: Coins::empty(),
            depositor: addr(1),
        });
        assert!(matches!(empty.validate_basic(), Err(DistrError::InvalidCoins(_))));

        let raw = "{\"community_pool_spend\":{\"authority\":\"01\",\"recipient\":\"02\",\
                   \"amount\":[{\"denom\":\"zz\",\"amount\":1},{\"denom\":\"aa\",\"amount\":1}]}}";
        let unsorted = Msg::from_json(raw).unwrap();
        assert!(matches!(unsorted.validate_basic(), Err(DistrError::InvalidCoins(_))));

        let bad_params = Msg::UpdateParams(MsgUpdateParams {
            authority: addr(1),
            params: Params {
                community_tax: Dec::from_u128(2),
                ..Params::default()
            },
        });
        assert!(bad_params.validate_basic().is_err());
        assert_eq!(bad_params.signer(), &addr(1));
    }

    #[test]
    fn test_failed_message_rolls_back() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        let depositor = addr(1);
        bank.mint(&depositor, &Coins::single("stake", 100));
        let fund = Msg::FundCommunityPool(MsgFundCommunityPool {
            amount: Coins::single("stake", 40),
            depositor: depositor.clone(),
        });
        assert_eq!(k.handle_msg(&mut ctx, &fund).unwrap(), MsgResponse::FundCommunityPool);

        let spend = Msg::CommunityPoolSpend(MsgCommunityPoolSpend {
            authority: addr(9),
            recipient: addr(3),
            amount: Coins::single("stake", 10),
        });
        assert!(matches!(
            k.handle_msg(&mut ctx, &spend),
            Err(DistrError::Unauthorized { .. })
        ));

        let spend = Msg::CommunityPoolSpend(MsgCommunityPoolSpend {
            authority: k.authority().clone(),
            recipient: addr(3),
            amount: Coins::new(vec![Coin::new("stake", 10)]).unwrap(),
        });
        let events_before = ctx.events().len();
        k.handle_msg(&mut ctx, &spend).unwrap();
        assert_eq!(ctx.events().len(), events_before + 1);
        assert_eq!(
            store::get_fee_pool(&ctx).unwrap().community_pool,
            DecCoins::single("stake", Dec::from_u128(30))
        );

        let overspend = Msg::CommunityPoolSpend(MsgCommunityPoolSpend {
            authority: k.authority().clone(),
            recipient: addr(3),
            amount: Coins::single("stake", 31),
        });
        let events_before = ctx.events().len();
        assert!(k.handle_msg(&mut ctx, &overspend).is_err());
        assert_eq!(ctx.events().len(), events_before);
        assert_eq!(
            store::get_fee_pool(&ctx).unwrap().community_pool,
            DecCoins::single("stake", Dec::from_u128(30))
        );
    }
}
