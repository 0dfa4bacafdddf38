//! Registry persistence.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::manifest::Provider;
use super::RegistryError;

/// Persisted registry state: install order plus providers by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub providers: BTreeMap<String, Provider>,
}

impl RegistrySnapshot {
    /// Drop stale and duplicate ids from `order`, then append ids present in
    /// `providers` but missing from it. Returns whether anything changed.
    pub fn heal(&mut self) -> bool {
        let before = self.order.len();
        let mut seen = HashSet::new();
        self.order
            .retain(|id| self.providers.contains_key(id) && seen.insert(id.clone()));
        let mut changed = self.order.len() != before;

        for id in self.providers.keys() {
            if !seen.contains(id) {
                self.order.push(id.clone());
                changed = true;
            }
        }
        changed
    }

    /// Providers in install order.
    pub fn ordered(&self) -> Vec<Provider> {
        self.order
            .iter()
            .filter_map(|id| self.providers.get(id).cloned())
            .collect()
    }

    /// Insert or replace by id, appending to the order only when new.
    pub fn upsert(&mut self, provider: Provider) -> bool {
        let id = provider.id.clone();
        let is_new = self.providers.insert(id.clone(), provider).is_none();
        if is_new && !self.order.contains(&id) {
            self.order.push(id);
        }
        is_new
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.providers.remove(id).is_some();
        let before = self.order.len();
        self.order.retain(|o| o != id);
        removed || self.order.len() != before
    }
}

/// Where a registry keeps its snapshot.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<RegistrySnapshot, RegistryError>;
    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), RegistryError>;
}

/// `providers.json` on disk. A missing file is an empty registry.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<RegistrySnapshot, RegistryError> {
        if !self.path.exists() {
            return Ok(RegistrySnapshot::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(RegistrySnapshot::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Atomic replace via rename
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<RegistrySnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<RegistrySnapshot, RegistryError> {
        Ok(self
            .snapshot
            .lock()
            .map_err(|_| RegistryError::Poisoned)?
            .clone())
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
        *self.snapshot.lock().map_err(|_| RegistryError::Poisoned)? = snapshot.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn provider(id: &str) -> Provider {
        Provider {
            id: id.to_string(),
            name: id.to_uppercase(),
            version: "1.0.0".to_string(),
            base_url: format!("https://{id}.test"),
            original_manifest_url: format!("https://{id}.test/manifest.json"),
            supported_types: BTreeSet::from(["movie".to_string()]),
            stream_capable: true,
            id_prefixes: BTreeSet::new(),
            resource_id_prefixes: BTreeSet::new(),
            description: None,
            logo: None,
        }
    }

    #[test]
    fn heal_filters_stale_and_appends_missing() {
        let mut snapshot = RegistrySnapshot {
            order: vec!["gone".into(), "b".into(), "b".into()],
            providers: BTreeMap::from([("a".into(), provider("a")), ("b".into(), provider("b"))]),
        };
        assert!(snapshot.heal());
        assert_eq!(snapshot.order, ["b", "a"]);
        assert!(!snapshot.heal());
    }

    #[test]
    fn upsert_keeps_position() {
        let mut snapshot = RegistrySnapshot::default();
        assert!(snapshot.upsert(provider("a")));
        assert!(snapshot.upsert(provider("b")));

        let mut updated = provider("a");
        updated.version = "2.0.0".into();
        assert!(!snapshot.upsert(updated));

        let ordered = snapshot.ordered();
        assert_eq!(ordered[0].id, "a");
        assert_eq!(ordered[0].version, "2.0.0");
        assert_eq!(snapshot.order.len(), 2);
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("providers.json"));
        assert_eq!(store.load().unwrap(), RegistrySnapshot::default());

        let mut snapshot = RegistrySnapshot::default();
        snapshot.upsert(provider("a"));
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap(), snapshot);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(path).load(),
            Err(RegistryError::Serde(_))
        ));
    }
}
