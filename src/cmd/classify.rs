use anyhow::Result;

use reelsource::classify::classify_text;

use super::output::human_size;

pub fn cmd_classify(text: &str, json: bool) -> Result<()> {
    let c = classify_text(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&c)?);
        return Ok(());
    }

    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
    println!("Tier:       {}", c.quality_tier);
    println!("Resolution: {}", show(&c.resolution));
    println!("Codec:      {}", show(&c.codec));
    println!("HDR:        {}", show(&c.hdr));
    println!("Audio:      {}", show(&c.audio));
    println!("Source:     {}", show(&c.source_type));
    if !c.languages.is_empty() {
        println!(
            "Languages:  {}",
            c.languages.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    if let Some(seeds) = c.seed_count {
        println!("Seeders:    {seeds}");
    }
    if let Some(size) = c.size_bytes {
        println!("Size:       {}", human_size(size));
    }
    if c.cached {
        println!("Cached:     yes");
    }
    Ok(())
}
