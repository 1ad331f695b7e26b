//! Latest decoded value per signal
//!
//! The correlator is the only writer; rendering only reads. No history is
//! kept: the last write for a key wins, and a key that was never written
//! renders as [`NO_DATA`].
//!
//! Response frames that parse but name no catalog entry go to a separate
//! unmatched ledger so they can be surfaced without polluting the cache.

use std::collections::{BTreeMap, HashMap};

use crate::domain::SignalKey;

/// Placeholder for a signal that has not answered yet
pub const NO_DATA: &str = "—";

/// Live value store that grows as responses arrive
#[derive(Debug, Default)]
pub struct ValueCache {
    values: HashMap<SignalKey, String>,
    unmatched: BTreeMap<SignalKey, String>,
}

impl ValueCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest text for `key`
    ///
    /// Returns true when the stored text changed.
    pub fn update(&mut self, key: SignalKey, value: String) -> bool {
        match self.values.get_mut(&key) {
            Some(existing) if *existing == value => false,
            Some(existing) => {
                *existing = value;
                true
            }
            None => {
                self.values.insert(key, value);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &SignalKey) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Text to show for `key`, falling back to [`NO_DATA`]
    #[must_use]
    pub fn display(&self, key: &SignalKey) -> &str {
        self.get(key).unwrap_or(NO_DATA)
    }

    /// Remember the raw payload of a response with no catalog entry
    pub fn record_unmatched(&mut self, key: SignalKey, raw: String) {
        self.unmatched.insert(key, raw);
    }

    /// Unmatched responses, ordered by key
    pub fn unmatched(&self) -> impl Iterator<Item = (&SignalKey, &str)> {
        self.unmatched.iter().map(|(k, v)| (k, v.as_str()))
    }

    #[must_use]
    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    /// Number of signals holding a value
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
