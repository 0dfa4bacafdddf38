//! Installed third-party providers.
//!
//! The registry is built once and shared behind an `Arc`. Mutations
//! (install, remove) are serialized through an internal async mutex and
//! persisted immediately on the blocking pool; reads work on a snapshot.

pub mod manifest;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::fetch::{FetchOptions, ResilientFetcher};
use crate::stream::MediaKind;

pub use manifest::{Manifest, ManifestError, Provider};
pub use store::{JsonFileStore, MemoryStore, RegistrySnapshot, RegistryStore};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("registry lock poisoned")]
    Poisoned,

    #[error("registry write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Ordered set of installed providers.
pub struct ProviderRegistry {
    store: Arc<dyn RegistryStore>,
    state: Mutex<RegistrySnapshot>,
}

impl ProviderRegistry {
    /// Load a registry from `store`, healing the order list.
    pub fn open(store: impl RegistryStore + 'static) -> Result<Self, RegistryError> {
        let mut snapshot = store.load()?;
        if snapshot.heal() {
            debug!("Healed provider order list");
            store.save(&snapshot)?;
        }
        Ok(Self {
            store: Arc::new(store),
            state: Mutex::new(snapshot),
        })
    }

    /// Registry persisted to `path` (usually `providers.json`).
    pub fn open_file(path: &Path) -> Result<Self, RegistryError> {
        Self::open(JsonFileStore::new(path))
    }

    /// Empty registry that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            state: Mutex::new(RegistrySnapshot::default()),
        }
    }

    /// Fetch, parse and upsert the manifest at `manifest_url`.
    ///
    /// Failures leave already installed providers untouched.
    #[instrument(skip(self, fetcher, cancel))]
    pub async fn install(
        &self,
        fetcher: &ResilientFetcher,
        manifest_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Provider, RegistryError> {
        let (base_url, manifest_url) = manifest::normalize_install_url(manifest_url)?;

        let response = fetcher
            .fetch(&manifest_url, &FetchOptions::default(), cancel)
            .await
            .map_err(ManifestError::from)?;
        let parsed = Manifest::parse(response.bytes())?;
        let provider = Provider::from_manifest(parsed, &base_url, &manifest_url);

        if !provider.stream_capable {
            warn!(id = %provider.id, "Provider declares no stream resource");
        }

        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let is_new = next.upsert(provider.clone());
        *state = self.persist(next).await?;

        info!(id = %provider.id, name = %provider.name, is_new, "Provider installed");
        Ok(provider)
    }

    /// Remove a provider by id. Returns whether anything was removed.
    pub async fn remove(&self, id: &str) -> Result<bool, RegistryError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if !next.remove(id) {
            return Ok(false);
        }
        *state = self.persist(next).await?;

        info!(id, "Provider removed");
        Ok(true)
    }

    /// Write `snapshot` without blocking the runtime. The caller holds the
    /// state lock, so writes land in mutation order.
    async fn persist(&self, snapshot: RegistrySnapshot) -> Result<RegistrySnapshot, RegistryError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save(&snapshot).map(|()| snapshot)).await?
    }

    /// Providers in install order.
    pub async fn list(&self) -> Vec<Provider> {
        self.state.lock().await.ordered()
    }

    pub async fn get(&self, id: &str) -> Option<Provider> {
        self.state.lock().await.providers.get(id).cloned()
    }

    pub fn supports(provider: &Provider, kind: MediaKind, content_id: &str) -> bool {
        provider.supports(kind, content_id)
    }

    /// Installed providers able to serve `content_id`, in install order.
    pub async fn eligible(&self, kind: MediaKind, content_id: &str) -> Vec<Provider> {
        self.list()
            .await
            .into_iter()
            .filter(|p| Self::supports(p, kind, content_id))
            .collect()
    }
}
