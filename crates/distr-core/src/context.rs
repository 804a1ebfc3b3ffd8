// ─────────────────────────────────────────────────────────────────
// Execution context
// ─────────────────────────────────────────────────────────────────
// One Context per block (or per query). It owns nothing: the store is
// borrowed from the host, the height is fixed, events accumulate until
// the host drains them.
//
// branch():   run against a write-back snapshot; commit on Ok, drop on Err
// simulate(): run against a snapshot that is always dropped
// ─────────────────────────────────────────────────────────────────

use distr_store::{CacheStore, KvStore, StoreError};
use serde::Serialize;

/// Structured event emitted by a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Event kinds and attribute keys.
pub mod events {
    pub const COMMISSION: &str = "commission";
    pub const REWARDS: &str = "rewards";
    pub const SET_WITHDRAW_ADDRESS: &str = "set_withdraw_address";
    pub const WITHDRAW_REWARDS: &str = "withdraw_rewards";
    pub const WITHDRAW_COMMISSION: &str = "withdraw_commission";
    pub const WITHDRAW_TOKENIZE_SHARE_REWARD: &str = "withdraw_tokenize_share_reward";
    pub const FUND_COMMUNITY_POOL: &str = "fund_community_pool";
    pub const COMMUNITY_POOL_SPEND: &str = "community_pool_spend";
    pub const UPDATE_PARAMS: &str = "update_params";

    pub const ATTR_AMOUNT: &str = "amount";
    pub const ATTR_VALIDATOR: &str = "validator";
    pub const ATTR_DELEGATOR: &str = "delegator";
    pub const ATTR_WITHDRAW_ADDRESS: &str = "withdraw_address";
    pub const ATTR_DEPOSITOR: &str = "depositor";
    pub const ATTR_RECIPIENT: &str = "recipient";
    pub const ATTR_OWNER: &str = "owner";
    pub const ATTR_RECORD_ID: &str = "record_id";
    pub const ATTR_AUTHORITY: &str = "authority";
}

pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    height: u64,
    events: Vec<Event>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, height: u64) -> Self {
        Self {
            store,
            height,
            events: Vec::new(),
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn set_height(&mut self, height: u64) {
        self.height = height;
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut (dyn KvStore + 'a) {
        &mut *self.store
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Run `f` atomically: its writes and events land only if it returns Ok.
    pub fn branch<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Context<'_>) -> Result<T, E>,
    {
        let height = self.height;
        let mut cache = CacheStore::new(&mut *self.store);
        let (result, events) = {
            let mut sub = Context::new(&mut cache, height);
            let result = f(&mut sub);
            (result, sub.events)
        };
        let value = result?;
        cache.write()?;
        self.events.extend(events);
        Ok(value)
    }

    /// Run `f` against a throwaway snapshot; nothing it does persists.
    pub fn simulate<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Context<'_>) -> T,
    {
        let height = self.height;
        let mut cache = CacheStore::new(&mut *self.store);
        let mut sub = Context::new(&mut cache, height);
        f(&mut sub)
    }
}
