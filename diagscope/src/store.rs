//! Active set and its on-disk store
//!
//! The file is a JSON array of `[node, service, parameter]` triples, one per
//! line. Order inside the file carries no meaning.
//!
//! Loading never fails: a missing, unreadable or unparsable file (or one whose
//! keys are all unknown to the catalog) yields the full catalog. A saved empty
//! array loads as an empty set. Saving reports errors to the caller, who
//! decides how loud to be about it.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::catalog::Catalog;
use crate::domain::{SignalKey, StoreError};

/// Default file name for the persisted active set
pub const DEFAULT_STATE_FILE: &str = "active_signals.json";

/// Catalog keys the operator chose to poll and display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    keys: HashSet<SignalKey>,
}

impl ActiveSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key in `catalog`
    #[must_use]
    pub fn all(catalog: &Catalog) -> Self {
        catalog.keys().collect()
    }

    #[must_use]
    pub fn contains(&self, key: &SignalKey) -> bool {
        self.keys.contains(key)
    }

    /// Flip membership of `key`; returns true if it is now active
    pub fn toggle(&mut self, key: SignalKey) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    pub fn insert(&mut self, key: SignalKey) -> bool {
        self.keys.insert(key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalKey> {
        self.keys.iter()
    }

    /// Active keys in catalog display order
    #[must_use]
    pub fn in_catalog_order(&self, catalog: &Catalog) -> Vec<SignalKey> {
        catalog.keys().filter(|k| self.keys.contains(k)).collect()
    }

    /// Keys sorted by value, for stable serialization
    fn sorted(&self) -> Vec<SignalKey> {
        let mut keys: Vec<_> = self.keys.iter().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl FromIterator<SignalKey> for ActiveSet {
    fn from_iter<I: IntoIterator<Item = SignalKey>>(iter: I) -> Self {
        Self { keys: iter.into_iter().collect() }
    }
}

/// JSON-file persistence for the [`ActiveSet`]
#[derive(Debug, Clone)]
pub struct ActiveSetStore {
    path: PathBuf,
}

impl ActiveSetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted set, falling back to every catalog key when the
    /// file is unusable
    #[must_use]
    pub fn load(&self, catalog: &Catalog) -> ActiveSet {
        let keys = match self.read() {
            Ok(keys) => keys,
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!("No active set at {}, activating all signals", self.path.display());
                return ActiveSet::all(catalog);
            }
            Err(e) => {
                warn!("Ignoring active set: {e}");
                return ActiveSet::all(catalog);
            }
        };

        let total = keys.len();
        let set: ActiveSet = keys.into_iter().filter(|k| catalog.contains(k)).collect();
        if set.len() < total {
            warn!(
                "Dropped {} unknown signal(s) from {}",
                total - set.len(),
                self.path.display()
            );
        }

        // A saved empty set is a choice; a set of nothing but unknown keys is not
        if set.is_empty() && total > 0 {
            warn!("No known signals in {}, activating all signals", self.path.display());
            return ActiveSet::all(catalog);
        }

        debug!("Loaded {} active signal(s) from {}", set.len(), self.path.display());
        set
    }

    /// Read the raw key list without any fallback
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the file cannot be read and
    /// [`StoreError::Json`] if it is not an array of integer triples
    pub fn read(&self) -> Result<Vec<SignalKey>, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write `set` to the store file
    ///
    /// # Errors
    /// Returns [`StoreError`] if serialization or the write fails
    pub fn save(&self, set: &ActiveSet) -> Result<(), StoreError> {
        let lines = set
            .sorted()
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let content = if lines.is_empty() {
            "[]\n".to_string()
        } else {
            format!("[\n  {}\n]\n", lines.join(",\n  "))
        };

        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        info!("Saved {} active signal(s) to {}", set.len(), self.path.display());
        Ok(())
    }
}
