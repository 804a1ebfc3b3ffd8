// ─────────────────────────────────────────────────────────────────
// Staking collaborator
// ─────────────────────────────────────────────────────────────────
// Bonding moves tokens into the bonded pool; unbonding pays them back at
// once (there is no unbonding queue). Slashing burns from the bonded pool
// and leaves shares untouched, so each remaining share is worth less.
// ─────────────────────────────────────────────────────────────────

use log::{debug, info};

use distr_core::{
    Address, BankKeeper, Context, Delegation, DistrError, Result, StakingHooks, StakingKeeper,
    TokenizeShareRecord, Validator, BONDED_POOL_NAME,
};
use distr_math::{Coins, Dec};

use crate::bank::SimBank;
use crate::kv;

const VALIDATOR_PREFIX: &[u8] = b"staking/validator/";
const CONS_INDEX_PREFIX: &[u8] = b"staking/cons/";
const DELEGATION_PREFIX: &[u8] = b"staking/delegation/";
const DELEGATOR_INDEX_PREFIX: &[u8] = b"staking/by_delegator/";
const RECORD_PREFIX: &[u8] = b"staking/record/";
const RECORD_OWNER_PREFIX: &[u8] = b"staking/record_owner/";
const NEXT_RECORD_ID_KEY: &[u8] = b"staking/next_record_id";

fn record_key(id: u64) -> Vec<u8> {
    let mut key = RECORD_PREFIX.to_vec();
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn record_owner_key(owner: &Address, id: u64) -> Vec<u8> {
    let mut key = kv::key(RECORD_OWNER_PREFIX, &[owner]);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

#[derive(Clone, Debug)]
pub struct SimStaking {
    bond_denom: String,
    /// Tokens per unit of consensus power.
    power_reduction: u128,
}

impl SimStaking {
    pub fn new(bond_denom: impl Into<String>, power_reduction: u128) -> Self {
        Self {
            bond_denom: bond_denom.into(),
            power_reduction: power_reduction.max(1),
        }
    }

    pub fn bond_denom(&self) -> &str {
        &self.bond_denom
    }

    pub fn bonded_pool() -> Address {
        Address::module(BONDED_POOL_NAME)
    }

    /// Consensus power of `val`.
    pub fn power(&self, val: &Validator) -> u64 {
        u64::try_from(val.tokens / self.power_reduction).unwrap_or(u64::MAX)
    }

    fn bond_coins(&self, amount: u128) -> Coins {
        Coins::single(self.bond_denom.clone(), amount)
    }

    fn require_validator(&self, ctx: &Context<'_>, val: &Address) -> Result<Validator> {
        self.validator(ctx, val)?
            .ok_or_else(|| DistrError::NoValidatorExists(val.to_hex()))
    }

    fn set_validator(&self, ctx: &mut Context<'_>, val: &Validator) -> Result<()> {
        kv::save(ctx, &kv::key(VALIDATOR_PREFIX, &[&val.operator]), val)
    }

    fn set_delegation(&self, ctx: &mut Context<'_>, del: &Delegation) -> Result<()> {
        kv::save(
            ctx,
            &kv::key(DELEGATION_PREFIX, &[&del.validator, &del.delegator]),
            del,
        )?;
        kv::save(
            ctx,
            &kv::key(DELEGATOR_INDEX_PREFIX, &[&del.delegator, &del.validator]),
            del,
        )
    }

    fn remove_delegation(&self, ctx: &mut Context<'_>, del: &Address, val: &Address) -> Result<()> {
        kv::remove(ctx, &kv::key(DELEGATION_PREFIX, &[val, del]))?;
        kv::remove(ctx, &kv::key(DELEGATOR_INDEX_PREFIX, &[del, val]))
    }

    // ─────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────

    /// Register a validator and bond `self_bond` tokens from the operator.
    pub fn create_validator(
        &self,
        ctx: &mut Context<'_>,
        bank: &SimBank,
        hooks: &dyn StakingHooks,
        operator: &Address,
        cons_address: &Address,
        self_bond: u128,
        commission_rate: Dec,
    ) -> Result<Validator> {
        if commission_rate.is_negative() || commission_rate > Dec::one() {
            return Err(DistrError::InvalidParams(format!(
                "commission rate must be within [0, 1]: {}",
                commission_rate
            )));
        }
        if self.validator(ctx, operator)?.is_some() {
            return Err(DistrError::InvalidParams(format!(
                "validator {} already exists",
                operator
            )));
        }

        let validator = Validator {
            operator: operator.clone(),
            cons_address: cons_address.clone(),
            tokens: 0,
            delegator_shares: Dec::zero(),
            commission_rate,
            jailed: false,
        };
        self.set_validator(ctx, &validator)?;
        kv::save(ctx, &kv::key(CONS_INDEX_PREFIX, &[cons_address]), operator)?;
        hooks.after_validator_created(ctx, operator)?;
        info!("created validator {} ({})", operator, cons_address);

        if self_bond > 0 {
            self.delegate(ctx, bank, hooks, operator, operator, self_bond)?;
        }
        self.require_validator(ctx, operator)
    }

    /// Bond `amount` tokens of `delegator` to `val`; returns the new shares.
    pub fn delegate(
        &self,
        ctx: &mut Context<'_>,
        bank: &SimBank,
        hooks: &dyn StakingHooks,
        delegator: &Address,
        val: &Address,
        amount: u128,
    ) -> Result<Dec> {
        let mut validator = self.require_validator(ctx, val)?;
        let existing = self.delegation(ctx, delegator, val)?;
        match existing {
            Some(_) => hooks.before_delegation_shares_modified(ctx, delegator, val)?,
            None => hooks.before_delegation_created(ctx, delegator, val)?,
        }

        bank.send_coins(ctx, delegator, &Self::bonded_pool(), &self.bond_coins(amount))?;

        let shares = validator.shares_from_tokens(amount);
        validator.tokens += amount;
        validator.delegator_shares = &validator.delegator_shares + &shares;
        self.set_validator(ctx, &validator)?;

        let mut delegation = existing.unwrap_or_else(|| Delegation {
            delegator: delegator.clone(),
            validator: val.clone(),
            shares: Dec::zero(),
        });
        delegation.shares = &delegation.shares + &shares;
        self.set_delegation(ctx, &delegation)?;

        hooks.after_delegation_modified(ctx, delegator, val)?;
        debug!("{} delegated {} to {}", delegator, amount, val);
        Ok(shares)
    }

    /// Unbond `shares` of `delegator` from `val` and pay the tokens back
    /// immediately. Returns the tokens paid.
    pub fn undelegate(
        &self,
        ctx: &mut Context<'_>,
        bank: &SimBank,
        hooks: &dyn StakingHooks,
        delegator: &Address,
        val: &Address,
        shares: &Dec,
    ) -> Result<u128> {
        let tokens = self.unbond(ctx, hooks, delegator, val, shares)?;
        bank.send_coins(ctx, &Self::bonded_pool(), delegator, &self.bond_coins(tokens))?;
        Ok(tokens)
    }

    fn unbond(
        &self,
        ctx: &mut Context<'_>,
        hooks: &dyn StakingHooks,
        delegator: &Address,
        val: &Address,
        shares: &Dec,
    ) -> Result<u128> {
        let mut delegation = self
            .delegation(ctx, delegator, val)?
            .ok_or(DistrError::EmptyDelegationDistInfo)?;
        if !shares.is_positive() || shares > &delegation.shares {
            return Err(DistrError::InsufficientFunds(format!(
                "cannot unbond {} shares, delegation holds {}",
                shares, delegation.shares
            )));
        }

        hooks.before_delegation_shares_modified(ctx, delegator, val)?;

        delegation.shares = &delegation.shares - shares;
        if delegation.shares.is_zero() {
            hooks.before_delegation_removed(ctx, delegator, val)?;
            self.remove_delegation(ctx, delegator, val)?;
        } else {
            self.set_delegation(ctx, &delegation)?;
            hooks.after_delegation_modified(ctx, delegator, val)?;
        }

        let mut validator = self.require_validator(ctx, val)?;
        let tokens = if shares == &validator.delegator_shares {
            validator.tokens
        } else {
            validator
                .tokens_from_shares_truncated(shares)
                .truncate_u128()
                .unwrap_or_default()
        };
        validator.tokens -= tokens;
        validator.delegator_shares = &validator.delegator_shares - shares;
        self.set_validator(ctx, &validator)?;
        debug!("{} unbonded {} tokens from {}", delegator, tokens, val);
        Ok(tokens)
    }

    /// Burn `fraction` of the validator's bonded tokens. Returns the amount
    /// burned.
    pub fn slash(
        &self,
        ctx: &mut Context<'_>,
        bank: &SimBank,
        hooks: &dyn StakingHooks,
        val: &Address,
        fraction: &Dec,
    ) -> Result<u128> {
        let mut validator = self.require_validator(ctx, val)?;
        hooks.before_validator_slashed(ctx, val, fraction)?;

        let burned = fraction
            .mul_int(validator.tokens)
            .truncate_u128()
            .unwrap_or_default()
            .min(validator.tokens);
        validator.tokens -= burned;
        self.set_validator(ctx, &validator)?;
        bank.burn(ctx, &Self::bonded_pool(), &self.bond_coins(burned))?;
        info!("slashed validator {} by {} ({} burned)", val, fraction, burned);
        Ok(burned)
    }

    pub fn set_commission_rate(
        &self,
        ctx: &mut Context<'_>,
        hooks: &dyn StakingHooks,
        val: &Address,
        rate: Dec,
    ) -> Result<()> {
        if rate.is_negative() || rate > Dec::one() {
            return Err(DistrError::InvalidParams(format!(
                "commission rate must be within [0, 1]: {}",
                rate
            )));
        }
        self.require_validator(ctx, val)?;
        hooks.before_validator_modified(ctx, val)?;
        let mut validator = self.require_validator(ctx, val)?;
        validator.commission_rate = rate;
        self.set_validator(ctx, &validator)
    }

    pub fn jail(&self, ctx: &mut Context<'_>, val: &Address, jailed: bool) -> Result<()> {
        let mut validator = self.require_validator(ctx, val)?;
        validator.jailed = jailed;
        self.set_validator(ctx, &validator)
    }

    /// Delete a validator with no remaining delegations.
    pub fn remove_validator(
        &self,
        ctx: &mut Context<'_>,
        hooks: &dyn StakingHooks,
        val: &Address,
    ) -> Result<()> {
        let validator = self.require_validator(ctx, val)?;
        if !self.validator_delegations(ctx, val)?.is_empty() {
            return Err(DistrError::InvalidParams(format!(
                "validator {} still has delegations",
                val
            )));
        }
        kv::remove(ctx, &kv::key(VALIDATOR_PREFIX, &[val]))?;
        kv::remove(ctx, &kv::key(CONS_INDEX_PREFIX, &[&validator.cons_address]))?;
        hooks.after_validator_removed(ctx, val)?;
        info!("removed validator {}", val);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Tokenized shares
    // ─────────────────────────────────────────────────────────────────

    /// Move `shares` of `delegator`'s delegation to a fresh record account
    /// and mint the matching share tokens to `owner`.
    pub fn tokenize_shares(
        &self,
        ctx: &mut Context<'_>,
        bank: &SimBank,
        hooks: &dyn StakingHooks,
        delegator: &Address,
        val: &Address,
        shares: &Dec,
        owner: &Address,
    ) -> Result<TokenizeShareRecord> {
        let id: u64 = kv::load(ctx, NEXT_RECORD_ID_KEY)?.unwrap_or(1);
        kv::save(ctx, NEXT_RECORD_ID_KEY, &(id + 1))?;
        let record = TokenizeShareRecord::new(id, owner.clone(), val.clone());

        let tokens = self.unbond(ctx, hooks, delegator, val, shares)?;
        bank.send_coins(
            ctx,
            &Self::bonded_pool(),
            &record.module_address,
            &self.bond_coins(tokens),
        )?;
        self.delegate(ctx, bank, hooks, &record.module_address, val, tokens)?;
        bank.mint(ctx, owner, &Coins::single(record.share_denom.clone(), tokens))?;

        kv::save(ctx, &record_key(id), &record)?;
        kv::save(ctx, &record_owner_key(owner, id), &id)?;
        info!(
            "tokenized {} shares of {} at {} into record {}",
            shares, delegator, val, id
        );
        Ok(record)
    }

    pub fn transfer_record(
        &self,
        ctx: &mut Context<'_>,
        id: u64,
        from: &Address,
        to: &Address,
    ) -> Result<()> {
        let mut record = self
            .tokenize_share_record(ctx, id)?
            .ok_or(DistrError::NoTokenizeShareRecord(id))?;
        if &record.owner != from {
            return Err(DistrError::NotTokenizeShareRecordOwner {
                id,
                owner: from.to_hex(),
            });
        }
        kv::remove(ctx, &record_owner_key(from, id))?;
        record.owner = to.clone();
        kv::save(ctx, &record_key(id), &record)?;
        kv::save(ctx, &record_owner_key(to, id), &id)
    }
}

impl StakingKeeper for SimStaking {
    fn validator(&self, ctx: &Context<'_>, operator: &Address) -> Result<Option<Validator>> {
        kv::load(ctx, &kv::key(VALIDATOR_PREFIX, &[operator]))
    }

    fn validator_by_cons_addr(
        &self,
        ctx: &Context<'_>,
        cons: &Address,
    ) -> Result<Option<Validator>> {
        let operator: Option<Address> = kv::load(ctx, &kv::key(CONS_INDEX_PREFIX, &[cons]))?;
        match operator {
            Some(op) => self.validator(ctx, &op),
            None => Ok(None),
        }
    }

    fn delegation(
        &self,
        ctx: &Context<'_>,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<Delegation>> {
        kv::load(ctx, &kv::key(DELEGATION_PREFIX, &[validator, delegator]))
    }

    fn validators(&self, ctx: &Context<'_>) -> Result<Vec<Validator>> {
        kv::scan(ctx, VALIDATOR_PREFIX)
    }

    fn delegator_delegations(
        &self,
        ctx: &Context<'_>,
        delegator: &Address,
    ) -> Result<Vec<Delegation>> {
        kv::scan(ctx, &kv::key(DELEGATOR_INDEX_PREFIX, &[delegator]))
    }

    fn validator_delegations(
        &self,
        ctx: &Context<'_>,
        validator: &Address,
    ) -> Result<Vec<Delegation>> {
        kv::scan(ctx, &kv::key(DELEGATION_PREFIX, &[validator]))
    }

    fn tokenize_share_record(
        &self,
        ctx: &Context<'_>,
        id: u64,
    ) -> Result<Option<TokenizeShareRecord>> {
        kv::load(ctx, &record_key(id))
    }

    fn tokenize_share_records_by_owner(
        &self,
        ctx: &Context<'_>,
        owner: &Address,
    ) -> Result<Vec<TokenizeShareRecord>> {
        let ids: Vec<u64> = kv::scan(ctx, &kv::key(RECORD_OWNER_PREFIX, &[owner]))?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let record = self
                .tokenize_share_record(ctx, id)?
                .ok_or(DistrError::NoTokenizeShareRecord(id))?;
            records.push(record);
        }
        Ok(records)
    }
}
