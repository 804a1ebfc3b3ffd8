// bincode values under ASCII namespaces ("bank/", "staking/") that never
// collide with the distribution module's single-byte prefixes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use distr_core::{Address, Context, DistrError, Result};

pub(crate) fn key(namespace: &[u8], parts: &[&Address]) -> Vec<u8> {
    let mut key = namespace.to_vec();
    for addr in parts {
        key.push(addr.len() as u8);
        key.extend_from_slice(addr.as_bytes());
    }
    key
}

pub(crate) fn load<T: DeserializeOwned>(ctx: &Context<'_>, key: &[u8]) -> Result<Option<T>> {
    match ctx.store().get(key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn save<T: Serialize>(ctx: &mut Context<'_>, key: &[u8], value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    ctx.store_mut().set(key, bytes)?;
    Ok(())
}

pub(crate) fn remove(ctx: &mut Context<'_>, key: &[u8]) -> Result<()> {
    ctx.store_mut().delete(key)?;
    Ok(())
}

pub(crate) fn scan<T: DeserializeOwned>(ctx: &Context<'_>, prefix: &[u8]) -> Result<Vec<T>> {
    ctx.store()
        .iter_prefix(prefix)?
        .into_iter()
        .map(|(_, v)| -> Result<T> {
            bincode::deserialize(&v).map_err(|e| DistrError::Codec(e.to_string()))
        })
        .collect()
}
