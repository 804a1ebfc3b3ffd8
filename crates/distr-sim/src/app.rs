// ─────────────────────────────────────────────────────────────────
// Simulated chain
// ─────────────────────────────────────────────────────────────────
// Wires the distribution keeper to the sim bank and staking module.
// Every staking operation runs in its own branch, so a failing hook
// leaves balances, delegations and distribution state untouched.
// ─────────────────────────────────────────────────────────────────

use log::debug;

use distr_core::{
    Address, Context, DistributionConfig, Keeper, Result, TokenizeShareRecord, Validator,
    VoteInfo,
};
use distr_math::{Coins, Dec};

use crate::bank::SimBank;
use crate::staking::SimStaking;

pub type SimKeeper = Keeper<SimBank, SimStaking>;

pub struct SimApp {
    keeper: SimKeeper,
}

impl SimApp {
    pub fn new(config: &DistributionConfig, power_reduction: u128) -> Result<Self> {
        let staking = SimStaking::new(config.bond_denom.clone(), power_reduction);
        let keeper = Keeper::new(SimBank::with_module_accounts(), staking, config)?;
        Ok(Self { keeper })
    }

    pub fn keeper(&self) -> &SimKeeper {
        &self.keeper
    }

    pub fn bank(&self) -> &SimBank {
        self.keeper.bank()
    }

    pub fn staking(&self) -> &SimStaking {
        self.keeper.staking()
    }

    pub fn init(&self, ctx: &mut Context<'_>) -> Result<()> {
        self.keeper.initialize(ctx)
    }

    pub fn bond_coins(&self, amount: u128) -> Coins {
        Coins::single(self.keeper.bond_denom(), amount)
    }

    pub fn mint(&self, ctx: &mut Context<'_>, to: &Address, amount: u128) -> Result<()> {
        self.bank().mint(ctx, to, &self.bond_coins(amount))
    }

    pub fn balance(&self, ctx: &Context<'_>, addr: &Address) -> Result<u128> {
        Ok(self
            .bank()
            .balance(ctx, addr)?
            .amount_of(self.keeper.bond_denom()))
    }

    /// Credit fees to the fee collector, as transaction processing would.
    pub fn collect_fees(&self, ctx: &mut Context<'_>, amount: &Coins) -> Result<()> {
        let collector = Address::module(self.keeper.fee_collector_name());
        self.bank().mint(ctx, &collector, amount)
    }

    // ─────────────────────────────────────────────────────────────────
    // Staking
    // ─────────────────────────────────────────────────────────────────

    pub fn create_validator(
        &self,
        ctx: &mut Context<'_>,
        operator: &Address,
        cons_address: &Address,
        self_bond: u128,
        commission_rate: Dec,
    ) -> Result<Validator> {
        ctx.branch(|ctx| {
            self.staking().create_validator(
                ctx,
                self.bank(),
                &self.keeper,
                operator,
                cons_address,
                self_bond,
                commission_rate,
            )
        })
    }

    pub fn delegate(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        validator: &Address,
        amount: u128,
    ) -> Result<Dec> {
        ctx.branch(|ctx| {
            self.staking()
                .delegate(ctx, self.bank(), &self.keeper, delegator, validator, amount)
        })
    }

    pub fn undelegate(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        validator: &Address,
        shares: &Dec,
    ) -> Result<u128> {
        ctx.branch(|ctx| {
            self.staking()
                .undelegate(ctx, self.bank(), &self.keeper, delegator, validator, shares)
        })
    }

    pub fn slash(&self, ctx: &mut Context<'_>, validator: &Address, fraction: &Dec) -> Result<u128> {
        ctx.branch(|ctx| {
            self.staking()
                .slash(ctx, self.bank(), &self.keeper, validator, fraction)
        })
    }

    pub fn set_commission_rate(
        &self,
        ctx: &mut Context<'_>,
        validator: &Address,
        rate: Dec,
    ) -> Result<()> {
        ctx.branch(|ctx| {
            self.staking()
                .set_commission_rate(ctx, &self.keeper, validator, rate)
        })
    }

    pub fn remove_validator(&self, ctx: &mut Context<'_>, validator: &Address) -> Result<()> {
        ctx.branch(|ctx| self.staking().remove_validator(ctx, &self.keeper, validator))
    }

    pub fn tokenize_shares(
        &self,
        ctx: &mut Context<'_>,
        delegator: &Address,
        validator: &Address,
        shares: &Dec,
        owner: &Address,
    ) -> Result<TokenizeShareRecord> {
        ctx.branch(|ctx| {
            self.staking().tokenize_shares(
                ctx,
                self.bank(),
                &self.keeper,
                delegator,
                validator,
                shares,
                owner,
            )
        })
    }

    pub fn transfer_record(
        &self,
        ctx: &mut Context<'_>,
        id: u64,
        from: &Address,
        to: &Address,
    ) -> Result<()> {
        ctx.branch(|ctx| self.staking().transfer_record(ctx, id, from, to))
    }

    // ─────────────────────────────────────────────────────────────────
    // Blocks
    // ─────────────────────────────────────────────────────────────────

    /// Last-commit votes with every unjailed validator signing.
    pub fn votes(&self, ctx: &Context<'_>) -> Result<Vec<VoteInfo>> {
        use distr_core::StakingKeeper;

        Ok(self
            .staking()
            .validators(ctx)?
            .iter()
            .filter(|v| !v.jailed)
            .map(|v| VoteInfo {
                cons_address: v.cons_address.clone(),
                power: self.staking().power(v),
                signed_last_block: true,
            })
            .collect())
    }

    /// Advance to the next height and run the distribution begin-block
    /// with the current validator set as signers.
    pub fn next_block(&self, ctx: &mut Context<'_>, proposer: &Address) -> Result<()> {
        let votes = self.votes(ctx)?;
        self.next_block_with_votes(ctx, &votes, proposer)
    }

    pub fn next_block_with_votes(
        &self,
        ctx: &mut Context<'_>,
        votes: &[VoteInfo],
        proposer: &Address,
    ) -> Result<()> {
        ctx.set_height(ctx.height() + 1);
        debug!("begin block {} with {} votes", ctx.height(), votes.len());
        self.keeper.begin_block(ctx, votes, proposer)
    }
}
