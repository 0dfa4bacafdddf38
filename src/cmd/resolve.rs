use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use reelsource::{InfoHash, ResilientFetcher, Resolver, TorboxClient};

use super::load_settings;
use super::output::human_size;

pub async fn cmd_resolve(config_dir: &Path, info_hash: &str, file: Option<u32>) -> Result<()> {
    let hash = InfoHash::parse(info_hash)?;
    let settings = load_settings(config_dir)?;
    let token = settings
        .credential()
        .context("resolve needs a debrid token (debrid_token or REELSOURCE_DEBRID_TOKEN)")?;

    let fetcher = Arc::new(ResilientFetcher::new()?);
    let client = TorboxClient::with_base_url(fetcher, &settings.debrid_url, token)
        .with_timeout(settings.debrid_timeout());
    let resolver = Resolver::new(Arc::new(client));

    let streams = resolver
        .resolve_hash(&hash, file, &CancellationToken::new())
        .await
        .with_context(|| format!("failed to resolve {hash}"))?;

    if streams.is_empty() {
        anyhow::bail!("debrid service returned no files for {hash}");
    }
    for s in &streams {
        let size = human_size(s.size_hint.unwrap_or(0));
        let index = s.file_index.map_or_else(|| "-".to_string(), |i| i.to_string());
        println!("[{index}] {size:>9}  {}", s.title);
        if let Some(url) = &s.url {
            println!("    {url}");
        }
    }
    Ok(())
}
