use std::path::Path;

use anyhow::{Context, Result};

use reelsource::{AggregationRequest, Orchestrator};

use super::output::print_result;
use super::{load_settings, open_registry};

pub async fn cmd_search(config_dir: &Path, request: &AggregationRequest, json: bool) -> Result<()> {
    let settings = load_settings(config_dir)?;
    let registry = open_registry(config_dir)?;
    let orchestrator = Orchestrator::from_settings(settings, registry)?;

    let result = orchestrator
        .search(request)
        .await
        .with_context(|| format!("search for {} failed", request.content_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}
