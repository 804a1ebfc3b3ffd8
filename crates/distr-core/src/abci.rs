// ─────────────────────────────────────────────────────────────────
// Block driver
// ─────────────────────────────────────────────────────────────────

use log::error;

use crate::address::Address;
use crate::context::Context;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::keeper::{store, Keeper};
use crate::types::VoteInfo;

impl<B: BankKeeper, S: StakingKeeper> Keeper<B, S> {
    /// Allocate the fees collected in the previous block to its signers and
    /// remember this block's proposer. A fatal error here must halt the
    /// chain; callers should not continue with the block.
    pub fn begin_block(
        &self,
        ctx: &mut Context<'_>,
        votes: &[VoteInfo],
        proposer: &Address,
    ) -> Result<()> {
        let total_power = votes
            .iter()
            .filter(|v| v.signed_last_block)
            .try_fold(0u64, |sum, v| sum.checked_add(v.power))
            .ok_or_else(|| {
                DistrError::invariant(format!(
                    "signing power overflows at height {}",
                    ctx.height()
                ))
            })?;

        // Height 1 has no last commit to pay.
        if ctx.height() > 1 {
            if let Err(e) = self.allocate_tokens(ctx, total_power, votes) {
                if e.is_fatal() {
                    error!("allocation failed at height {}: {}", ctx.height(), e);
                }
                return Err(e);
            }
        }

        store::set_previous_proposer(ctx, proposer)
    }

    pub fn previous_proposer(&self, ctx: &Context<'_>) -> Result<Option<Address>> {
        store::get_previous_proposer(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::keeper::test_support::*;
    use crate::FEE_COLLECTOR_NAME;
    use distr_math::{Coins, Dec, DecCoins};
    use distr_store::MemStore;

    #[test]
    fn test_first_block_only_records_proposer() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 1);
        k.initialize(&mut ctx).unwrap();

        bank.mint(&Address::module(FEE_COLLECTOR_NAME), &Coins::single("stake", 10));
        k.begin_block(&mut ctx, &[], &addr(4)).unwrap();
        assert_eq!(k.previous_proposer(&ctx).unwrap(), Some(addr(4)));
        assert!(store::get_fee_pool(&ctx).unwrap().community_pool.is_zero());
    }

    #[test]
    fn test_power_overflow_halts_block() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 2);
        k.initialize(&mut ctx).unwrap();

        bank.mint(&Address::module(FEE_COLLECTOR_NAME), &Coins::single("stake", 100));
        let votes = vec![
            VoteInfo { cons_address: addr(1), power: u64::MAX, signed_last_block: true },
            VoteInfo { cons_address: addr(2), power: 1, signed_last_block: true },
        ];
        let err = k.begin_block(&mut ctx, &votes, &addr(1)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(k.previous_proposer(&ctx).unwrap(), None);
        assert!(store::get_fee_pool(&ctx).unwrap().community_pool.is_zero());
    }

    #[test]
    fn test_begin_block_sums_only_signers() {
        let (bank, staking) = (MapBank::default(), MapStaking::default());
        let k = Keeper::new(&bank, &staking, &DistributionConfig::default()).unwrap();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store, 2);
        k.initialize(&mut ctx).unwrap();

        let (v0, v1) = (addr(1), addr(2));
        staking.add_validator(&v0, 10, Dec::zero());
        staking.add_validator(&v1, 10, Dec::zero());
        k.initialize_validator(&mut ctx, &v0).unwrap();
        k.initialize_validator(&mut ctx, &v1).unwrap();

        bank.mint(&Address::module(FEE_COLLECTOR_NAME), &Coins::single("stake", 100));
        let votes = vec![
            VoteInfo { cons_address: v0.clone(), power: 10, signed_last_block: true },
            VoteInfo { cons_address: v1.clone(), power: 10, signed_last_block: false },
        ];
        k.begin_block(&mut ctx, &votes, &v0).unwrap();

        // The absent signer gets nothing and does not dilute the signer.
        assert_eq!(
            store::get_outstanding_rewards(&ctx, &v0).unwrap().rewards,
            DecCoins::single("stake", Dec::from_u128(98))
        );
        assert!(store::get_outstanding_rewards(&ctx, &v1)
            .unwrap()
            .rewards
            .is_zero());
    }
}
