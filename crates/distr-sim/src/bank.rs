use std::collections::BTreeSet;

use log::debug;

use distr_core::{Address, BankKeeper, Context, DistrError, Result};
use distr_core::{BONDED_POOL_NAME, FEE_COLLECTOR_NAME, MODULE_NAME};
use distr_math::Coins;

use crate::kv;

const BALANCE_PREFIX: &[u8] = b"bank/balance/";

/// Account balances kept in the shared store.
#[derive(Clone, Debug, Default)]
pub struct SimBank {
    blocked: BTreeSet<Address>,
}

impl SimBank {
    pub fn new(blocked: impl IntoIterator<Item = Address>) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }

    /// Bank with the usual module accounts blocked as payout targets.
    pub fn with_module_accounts() -> Self {
        Self::new(
            [MODULE_NAME, FEE_COLLECTOR_NAME, BONDED_POOL_NAME]
                .into_iter()
                .map(Address::module),
        )
    }

    pub fn balance(&self, ctx: &Context<'_>, addr: &Address) -> Result<Coins> {
        Ok(kv::load(ctx, &kv::key(BALANCE_PREFIX, &[addr]))?.unwrap_or_default())
    }

    fn set_balance(&self, ctx: &mut Context<'_>, addr: &Address, coins: &Coins) -> Result<()> {
        let key = kv::key(BALANCE_PREFIX, &[addr]);
        if coins.is_zero() {
            kv::remove(ctx, &key)
        } else {
            kv::save(ctx, &key, coins)
        }
    }

    pub fn mint(&self, ctx: &mut Context<'_>, to: &Address, amount: &Coins) -> Result<()> {
        let balance = self.balance(ctx, to)?.checked_add(amount)?;
        self.set_balance(ctx, to, &balance)?;
        debug!("minted {} to {}", amount, to);
        Ok(())
    }

    pub fn burn(&self, ctx: &mut Context<'_>, from: &Address, amount: &Coins) -> Result<()> {
        let balance = self
            .balance(ctx, from)?
            .checked_sub(amount)
            .map_err(|e| DistrError::InsufficientFunds(format!("{}: {}", from, e)))?;
        self.set_balance(ctx, from, &balance)
    }
}

impl BankKeeper for SimBank {
    fn get_all_balances(&self, ctx: &Context<'_>, addr: &Address) -> Result<Coins> {
        self.balance(ctx, addr)
    }

    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.burn(ctx, from, amount)?;
        let balance = self.balance(ctx, to)?.checked_add(amount)?;
        self.set_balance(ctx, to, &balance)
    }

    fn blocked_addr(&self, addr: &Address) -> bool {
        self.blocked.contains(addr)
    }
}
