// ─────────────────────────────────────────────────────────────────
// Crisis invariants
// ─────────────────────────────────────────────────────────────────
// Each check returns (message, broken). None of them writes: the
// can-withdraw check does its withdrawing inside a simulation.
// ─────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;

use log::error;

use distr_math::DecCoins;

use crate::address::Address;
use crate::context::Context;
use crate::error::Result;
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::keeper::{store, Keeper};
use crate::MODULE_NAME;

fn format_invariant(name: &str, msg: &str, broken: bool) -> String {
    format!(
        "distribution: {} invariant\n{}\ninvariant broken: {}\n",
        name, msg, broken
    )
}

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Run every invariant; the first broken one is reported.
    pub fn all_invariants(&self, ctx: &mut Context<'_>) -> Result<(String, bool)> {
        let results = [
            self.nonnegative_outstanding_invariant(ctx)?,
            self.can_withdraw_invariant(ctx)?,
            self.reference_count_invariant(ctx)?,
            self.module_account_invariant(ctx)?,
        ];
        let mut last = (String::new(), false);
        for (msg, broken) in results {
            if broken {
                error!("{}", msg);
                return Ok((msg, true));
            }
            last = (msg, false);
        }
        Ok(last)
    }

    /// No validator's outstanding rewards may have a negative entry.
    pub fn nonnegative_outstanding_invariant(&self, ctx: &mut Context<'_>) -> Result<(String, bool)> {
        let mut msg = String::new();
        let mut count = 0;
        for (val, outstanding) in store::all_outstanding_rewards(ctx)? {
            if outstanding.rewards.is_any_negative() {
                count += 1;
                msg.push_str(&format!(
                    "\t{} has negative outstanding coins: {}\n",
                    val, outstanding.rewards
                ));
            }
        }
        let broken = count != 0;
        Ok((
            format_invariant(
                "nonnegative outstanding",
                &format!("found {} validators with negative outstanding rewards\n{}", count, msg),
                broken,
            ),
            broken,
        ))
    }

    /// Withdrawing all commission and every delegation must never overdraw
    /// a validator's outstanding rewards.
    pub fn can_withdraw_invariant(&self, ctx: &mut Context<'_>) -> Result<(String, bool)> {
        let validators = self.staking().validators(ctx)?;
        let remaining: Result<Vec<(Address, DecCoins)>> = ctx.simulate(|sim| {
            let mut remaining = Vec::new();
            for val in &validators {
                let operator = &val.operator;
                if !store::get_commission(sim, operator)?.commission.is_zero() {
                    self.withdraw_validator_commission(sim, operator)?;
                }
                for del in self.staking().validator_delegations(sim, operator)? {
                    if store::has_starting_info(sim, operator, &del.delegator)? {
                        self.withdraw_delegation_rewards_for(sim, val, &del)?;
                    }
                }
                remaining.push((
                    operator.clone(),
                    store::get_outstanding_rewards(sim, operator)?.rewards,
                ));
            }
            Ok(remaining)
        });

        let (broken, msg) = match remaining {
            Ok(remaining) => match remaining.iter().find(|(_, r)| r.is_any_negative()) {
                Some((val, r)) => (true, format!("{} left negative outstanding {}", val, r)),
                None => (false, String::new()),
            },
            Err(e) if e.is_fatal() => (true, format!("withdrawal failed: {}", e)),
            Err(e) => return Err(e),
        };
        Ok((
            format_invariant(
                "can withdraw",
                &format!("remaining coins: {}", msg),
                broken,
            ),
            broken,
        ))
    }

    /// Every historical record's reference count matches the starting
    /// infos, slash events and current-rewards records pointing at it.
    pub fn reference_count_invariant(&self, ctx: &mut Context<'_>) -> Result<(String, bool)> {
        let mut expected: BTreeMap<(Address, u64), u32> = BTreeMap::new();

        let mut msg = String::new();
        let mut broken = false;
        for (val, current) in store::all_current_rewards(ctx)? {
            match current.previous_period() {
                Some(period) => *expected.entry((val, period)).or_default() += 1,
                None => {
                    broken = true;
                    msg.push_str(&format!("\t{} current rewards at period 0\n", val));
                }
            }
        }
        for (val, _, info) in store::all_starting_infos(ctx)? {
            *expected.entry((val, info.previous_period)).or_default() += 1;
        }
        for (val, _, event) in store::all_slash_events(ctx)? {
            *expected
                .entry((val, event.validator_period.saturating_sub(1)))
                .or_default() += 1;
        }

        let historical = store::all_historical_rewards(ctx)?;
        for (val, period, record) in &historical {
            let want = expected.remove(&(val.clone(), *period)).unwrap_or(0);
            if record.reference_count != want {
                broken = true;
                msg.push_str(&format!(
                    "\t{} period {}: reference count {}, expected {}\n",
                    val, period, record.reference_count, want
                ));
            }
        }
        for ((val, period), want) in expected {
            broken = true;
            msg.push_str(&format!(
                "\t{} period {}: missing record with {} references\n",
                val, period, want
            ));
        }

        Ok((
            format_invariant(
                "reference count",
                &format!("checked {} historical records\n{}", historical.len(), msg),
                broken,
            ),
            broken,
        ))
    }

    /// The module account holds exactly the integer part of everything it
    /// still owes: outstanding rewards plus the community pool.
    pub fn module_account_invariant(&self, ctx: &mut Context<'_>) -> Result<(String, bool)> {
        let mut expected = store::get_fee_pool(ctx)?.community_pool;
        for (_, outstanding) in store::all_outstanding_rewards(ctx)? {
            expected = expected.add(&outstanding.rewards);
        }
        let (expected_int, _) = expected.truncate_decimal()?;
        let balance = self
            .bank()
            .get_all_balances(ctx, &Address::module(MODULE_NAME))?;

        let broken = balance != expected_int;
        Ok((
            format_invariant(
                "ModuleAccount coins",
                &format!(
                    "\texpected ModuleAccount coins:     {}\n\tdistribution ModuleAccount coins: {}\n",
                    expected_int, balance
                ),
                broken,
            ),
            broken,
        ))
    }
}
