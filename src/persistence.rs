//! Maps ledger fields onto the four keys of a [`KeyValueStore`].

use crate::models::{Item, ItemKind};
use crate::storage::KeyValueStore;
use serde_json::Value;
use tracing::warn;

pub const CALORIE_LIMIT_KEY: &str = "calorieLimit";
pub const CALORIE_BALANCE_KEY: &str = "calorieBalance";

pub const DEFAULT_CALORIE_LIMIT: f64 = 2000.0;
pub const DEFAULT_CALORIE_BALANCE: f64 = 0.0;

#[derive(Debug, Clone, Default)]
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn calorie_limit(&self) -> f64 {
        self.number(CALORIE_LIMIT_KEY)
            .filter(|limit| *limit >= 0.0)
            .unwrap_or(DEFAULT_CALORIE_LIMIT)
    }

    pub fn set_calorie_limit(&mut self, limit: f64) {
        self.store.set(CALORIE_LIMIT_KEY, limit.to_string());
    }

    pub fn calorie_balance(&self) -> f64 {
        self.number(CALORIE_BALANCE_KEY)
            .unwrap_or(DEFAULT_CALORIE_BALANCE)
    }

    pub fn set_calorie_balance(&mut self, balance: f64) {
        self.store.set(CALORIE_BALANCE_KEY, balance.to_string());
    }

    /// Stored items of `kind`. Entries that do not decode as an item are
    /// skipped one by one; a list that is not a JSON array reads as empty.
    pub fn items(&self, kind: ItemKind) -> Vec<Item> {
        let key = kind.storage_key();
        let Some(raw) = self.store.get(key) else {
            return Vec::new();
        };
        let entries: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(key, "ignoring unreadable item list: {err}");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(key, index, "skipping unreadable item: {err}");
                    None
                }
            })
            .collect()
    }

    /// Replaces the whole stored list for `kind`.
    pub fn set_items(&mut self, kind: ItemKind, items: &[Item]) {
        match serde_json::to_string(items) {
            Ok(raw) => self.store.set(kind.storage_key(), raw),
            Err(err) => warn!(key = kind.storage_key(), "failed to encode items: {err}"),
        }
    }

    pub fn clear_all(&mut self) {
        self.store.clear();
    }

    fn number(&self, key: &str) -> Option<f64> {
        let raw = self.store.get(key)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                warn!(key, value = %raw, "ignoring unparsable number");
                None
            }
        }
    }
}
