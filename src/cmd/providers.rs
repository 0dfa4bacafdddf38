use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use reelsource::ResilientFetcher;

use super::{load_settings, open_registry};

pub async fn cmd_list(config_dir: &Path) -> Result<()> {
    let registry = open_registry(config_dir)?;
    let providers = registry.list().await;
    if providers.is_empty() {
        println!("No providers installed");
        return Ok(());
    }

    for p in &providers {
        let types = p.supported_types.iter().cloned().collect::<Vec<_>>().join(",");
        let streams = if p.stream_capable { "" } else { " (no streams)" };
        println!("{:<32} {:<24} v{:<8} [{types}]{streams}", p.id, p.name, p.version);
        println!("    {}", p.original_manifest_url);
    }
    println!("\n({} providers)", providers.len());
    Ok(())
}

pub async fn cmd_install(config_dir: &Path, url: &str) -> Result<()> {
    let settings = load_settings(config_dir)?;
    let registry = open_registry(config_dir)?;
    let fetcher =
        ResilientFetcher::with_proxies(settings.proxy_routes(), settings.selected_proxy.clone())?;

    let provider = registry
        .install(&fetcher, url, &CancellationToken::new())
        .await
        .with_context(|| format!("failed to install {url}"))?;

    println!("✅ Installed {} ({}) v{}", provider.name, provider.id, provider.version);
    Ok(())
}

pub async fn cmd_remove(config_dir: &Path, id: &str) -> Result<()> {
    let registry = open_registry(config_dir)?;
    if registry.remove(id).await? {
        println!("🗑️  Removed {id}");
    } else {
        anyhow::bail!("no provider with id {id}");
    }
    Ok(())
}
