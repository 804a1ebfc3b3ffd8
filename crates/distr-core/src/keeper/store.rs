// ─────────────────────────────────────────────────────────────────
// Typed accessors over the raw key layout
// ─────────────────────────────────────────────────────────────────
// Values are bincode-encoded. A value that fails to decode is store
// corruption and surfaces as a fatal Codec error.
// ─────────────────────────────────────────────────────────────────

use distr_store::prefix_end;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::address::Address;
use crate::context::Context;
use crate::error::{DistrError, Result};
use crate::keys;
use crate::types::{
    DelegatorStartingInfo, FeePool, Params, ValidatorAccumulatedCommission,
    ValidatorCurrentRewards, ValidatorHistoricalRewards, ValidatorOutstandingRewards,
    ValidatorSlashEvent,
};

fn load<T: DeserializeOwned>(ctx: &Context<'_>, key: &[u8]) -> Result<Option<T>> {
    match ctx.store().get(key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

fn save<T: Serialize>(ctx: &mut Context<'_>, key: &[u8], value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    ctx.store_mut().set(key, bytes)?;
    Ok(())
}

fn remove(ctx: &mut Context<'_>, key: &[u8]) -> Result<()> {
    ctx.store_mut().delete(key)?;
    Ok(())
}

fn scan<T: DeserializeOwned>(ctx: &Context<'_>, prefix: &[u8]) -> Result<Vec<(Vec<u8>, T)>> {
    ctx.store()
        .iter_prefix(prefix)?
        .into_iter()
        .map(|(k, v)| -> Result<(Vec<u8>, T)> { Ok((k, bincode::deserialize(&v)?)) })
        .collect()
}

// ── singletons ───────────────────────────────────────────────────

pub fn get_fee_pool(ctx: &Context<'_>) -> Result<FeePool> {
    load(ctx, &keys::fee_pool_key())?
        .ok_or_else(|| DistrError::invariant("fee pool not initialized"))
}

pub fn set_fee_pool(ctx: &mut Context<'_>, pool: &FeePool) -> Result<()> {
    save(ctx, &keys::fee_pool_key(), pool)
}

pub fn has_fee_pool(ctx: &Context<'_>) -> Result<bool> {
    Ok(ctx.store().has(&keys::fee_pool_key())?)
}

pub fn get_params(ctx: &Context<'_>) -> Result<Params> {
    load(ctx, &keys::params_key())?.ok_or_else(|| DistrError::invariant("params not initialized"))
}

pub fn set_params(ctx: &mut Context<'_>, params: &Params) -> Result<()> {
    save(ctx, &keys::params_key(), params)
}

pub fn has_params(ctx: &Context<'_>) -> Result<bool> {
    Ok(ctx.store().has(&keys::params_key())?)
}

pub fn get_previous_proposer(ctx: &Context<'_>) -> Result<Option<Address>> {
    load(ctx, &keys::proposer_key())
}

pub fn set_previous_proposer(ctx: &mut Context<'_>, cons: &Address) -> Result<()> {
    save(ctx, &keys::proposer_key(), cons)
}

// ── withdraw addresses ───────────────────────────────────────────

pub fn get_withdraw_addr(ctx: &Context<'_>, del: &Address) -> Result<Option<Address>> {
    load(ctx, &keys::withdraw_addr_key(del))
}

pub fn set_withdraw_addr(ctx: &mut Context<'_>, del: &Address, addr: &Address) -> Result<()> {
    save(ctx, &keys::withdraw_addr_key(del), addr)
}

pub fn delete_withdraw_addr(ctx: &mut Context<'_>, del: &Address) -> Result<()> {
    remove(ctx, &keys::withdraw_addr_key(del))
}

// ── outstanding rewards ──────────────────────────────────────────

/// Missing records read as empty.
pub fn get_outstanding_rewards(
    ctx: &Context<'_>,
    val: &Address,
) -> Result<ValidatorOutstandingRewards> {
    Ok(load(ctx, &keys::outstanding_rewards_key(val))?.unwrap_or_default())
}

pub fn set_outstanding_rewards(
    ctx: &mut Context<'_>,
    val: &Address,
    rewards: &ValidatorOutstandingRewards,
) -> Result<()> {
    save(ctx, &keys::outstanding_rewards_key(val), rewards)
}

pub fn delete_outstanding_rewards(ctx: &mut Context<'_>, val: &Address) -> Result<()> {
    remove(ctx, &keys::outstanding_rewards_key(val))
}

pub fn all_outstanding_rewards(
    ctx: &Context<'_>,
) -> Result<Vec<(Address, ValidatorOutstandingRewards)>> {
    scan(ctx, &[keys::VALIDATOR_OUTSTANDING_REWARDS_PREFIX])?
        .into_iter()
        .map(|(k, v)| -> Result<(Address, ValidatorOutstandingRewards)> {
            Ok((
                keys::parse_address_key(&k, keys::VALIDATOR_OUTSTANDING_REWARDS_PREFIX)?,
                v,
            ))
        })
        .collect()
}

// ── accumulated commission ───────────────────────────────────────

/// Missing records read as empty.
pub fn get_commission(ctx: &Context<'_>, val: &Address) -> Result<ValidatorAccumulatedCommission> {
    Ok(load(ctx, &keys::commission_key(val))?.unwrap_or_default())
}

pub fn set_commission(
    ctx: &mut Context<'_>,
    val: &Address,
    commission: &ValidatorAccumulatedCommission,
) -> Result<()> {
    save(ctx, &keys::commission_key(val), commission)
}

pub fn delete_commission(ctx: &mut Context<'_>, val: &Address) -> Result<()> {
    remove(ctx, &keys::commission_key(val))
}

// ── current rewards ──────────────────────────────────────────────

pub fn get_current_rewards(
    ctx: &Context<'_>,
    val: &Address,
) -> Result<Option<ValidatorCurrentRewards>> {
    load(ctx, &keys::current_rewards_key(val))
}

pub fn set_current_rewards(
    ctx: &mut Context<'_>,
    val: &Address,
    rewards: &ValidatorCurrentRewards,
) -> Result<()> {
    save(ctx, &keys::current_rewards_key(val), rewards)
}

pub fn delete_current_rewards(ctx: &mut Context<'_>, val: &Address) -> Result<()> {
    remove(ctx, &keys::current_rewards_key(val))
}

pub fn all_current_rewards(ctx: &Context<'_>) -> Result<Vec<(Address, ValidatorCurrentRewards)>> {
    scan(ctx, &[keys::VALIDATOR_CURRENT_REWARDS_PREFIX])?
        .into_iter()
        .map(|(k, v)| -> Result<(Address, ValidatorCurrentRewards)> {
            Ok((
                keys::parse_address_key(&k, keys::VALIDATOR_CURRENT_REWARDS_PREFIX)?,
                v,
            ))
        })
        .collect()
}

// ── historical rewards ───────────────────────────────────────────

pub fn get_historical_rewards(
    ctx: &Context<'_>,
    val: &Address,
    period: u64,
) -> Result<Option<ValidatorHistoricalRewards>> {
    load(ctx, &keys::historical_rewards_key(val, period))
}

pub fn set_historical_rewards(
    ctx: &mut Context<'_>,
    val: &Address,
    period: u64,
    rewards: &ValidatorHistoricalRewards,
) -> Result<()> {
    save(ctx, &keys::historical_rewards_key(val, period), rewards)
}

pub fn delete_historical_rewards(ctx: &mut Context<'_>, val: &Address, period: u64) -> Result<()> {
    remove(ctx, &keys::historical_rewards_key(val, period))
}

/// Every historical record, ordered by (validator, period).
pub fn all_historical_rewards(
    ctx: &Context<'_>,
) -> Result<Vec<(Address, u64, ValidatorHistoricalRewards)>> {
    scan(ctx, &[keys::VALIDATOR_HISTORICAL_REWARDS_PREFIX])?
        .into_iter()
        .map(|(k, v)| -> Result<(Address, u64, ValidatorHistoricalRewards)> {
            let (val, period) = keys::parse_historical_rewards_key(&k)?;
            Ok((val, period, v))
        })
        .collect()
}

pub fn delete_validator_historical_rewards(ctx: &mut Context<'_>, val: &Address) -> Result<()> {
    let prefix = keys::historical_rewards_prefix(val);
    let entries = ctx.store().iter_prefix(&prefix)?;
    for (key, _) in entries {
        remove(ctx, &key)?;
    }
    Ok(())
}

// ── delegator starting info ──────────────────────────────────────

pub fn get_starting_info(
    ctx: &Context<'_>,
    val: &Address,
    del: &Address,
) -> Result<Option<DelegatorStartingInfo>> {
    load(ctx, &keys::starting_info_key(val, del))
}

pub fn has_starting_info(ctx: &Context<'_>, val: &Address, del: &Address) -> Result<bool> {
    Ok(ctx.store().has(&keys::starting_info_key(val, del))?)
}

pub fn set_starting_info(
    ctx: &mut Context<'_>,
    val: &Address,
    del: &Address,
    info: &DelegatorStartingInfo,
) -> Result<()> {
    save(ctx, &keys::starting_info_key(val, del), info)
}

pub fn delete_starting_info(ctx: &mut Context<'_>, val: &Address, del: &Address) -> Result<()> {
    remove(ctx, &keys::starting_info_key(val, del))
}

/// Every starting info, ordered by (validator, delegator).
pub fn all_starting_infos(
    ctx: &Context<'_>,
) -> Result<Vec<(Address, Address, DelegatorStartingInfo)>> {
    scan(ctx, &[keys::DELEGATOR_STARTING_INFO_PREFIX])?
        .into_iter()
        .map(|(k, v)| -> Result<(Address, Address, DelegatorStartingInfo)> {
            let (val, del) = keys::parse_starting_info_key(&k)?;
            Ok((val, del, v))
        })
        .collect()
}

// ── slash events ─────────────────────────────────────────────────

pub fn set_slash_event(
    ctx: &mut Context<'_>,
    val: &Address,
    height: u64,
    period: u64,
    event: &ValidatorSlashEvent,
) -> Result<()> {
    save(ctx, &keys::slash_event_key(val, height, period), event)
}

/// Slash events of `val` with `start_height <= height <= end_height`,
/// ascending by height then period.
pub fn slash_events_between(
    ctx: &Context<'_>,
    val: &Address,
    start_height: u64,
    end_height: u64,
) -> Result<Vec<(u64, ValidatorSlashEvent)>> {
    if start_height > end_height {
        return Ok(Vec::new());
    }
    let start = keys::slash_event_height_prefix(val, start_height);
    let end = prefix_end(&keys::slash_event_height_prefix(val, end_height));
    ctx.store()
        .iter_range(&start, end.as_deref())?
        .into_iter()
        .map(|(k, v)| -> Result<(u64, ValidatorSlashEvent)> {
            let (_, height, _) = keys::parse_slash_event_key(&k)?;
            Ok((height, bincode::deserialize(&v)?))
        })
        .collect()
}

/// Every slash event, ordered by (validator, height, period).
pub fn all_slash_events(
    ctx: &Context<'_>,
) -> Result<Vec<(Address, u64, ValidatorSlashEvent)>> {
    scan(ctx, &[keys::VALIDATOR_SLASH_EVENT_PREFIX])?
        .into_iter()
        .map(|(k, v)| -> Result<(Address, u64, ValidatorSlashEvent)> {
            let (val, height, _) = keys::parse_slash_event_key(&k)?;
            Ok((val, height, v))
        })
        .collect()
}

pub fn delete_validator_slash_events(ctx: &mut Context<'_>, val: &Address) -> Result<()> {
    let prefix = keys::slash_event_prefix(val);
    let entries = ctx.store().iter_prefix(&prefix)?;
    for (key, _) in entries {
        remove(ctx, &key)?;
    }
    Ok(())
}
