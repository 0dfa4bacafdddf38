pub mod classify;
pub mod output;
pub mod providers;
pub mod resolve;
pub mod search;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use reelsource::config::{CONFIG_FILE, PROVIDERS_FILE};
use reelsource::{ProviderRegistry, Settings};

pub fn load_settings(config_dir: &Path) -> Result<Settings> {
    Settings::load_from(&config_dir.join(CONFIG_FILE))
        .with_context(|| format!("failed to load settings from {}", config_dir.display()))
}

pub fn open_registry(config_dir: &Path) -> Result<Arc<ProviderRegistry>> {
    let path = config_dir.join(PROVIDERS_FILE);
    let registry = ProviderRegistry::open_file(&path)
        .with_context(|| format!("failed to open provider registry {}", path.display()))?;
    Ok(Arc::new(registry))
}
