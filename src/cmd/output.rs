use reelsource::aggregate::AggregationResult;
use reelsource::{ClassifiedStream, SourceKind};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Binary-multiple size, e.g. `18.3 GB`.
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: u64) -> String {
    if bytes == 0 {
        return "?".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn stream_line(stream: &ClassifiedStream) -> String {
    let mut tags: Vec<&str> = Vec::new();
    tags.push(stream.quality_tier.label());
    for tag in [&stream.codec, &stream.hdr, &stream.audio, &stream.source_type]
        .into_iter()
        .flatten()
    {
        tags.push(tag);
    }

    let cached = if stream.cached_hint { "⚡" } else { " " };
    let seeds = if stream.seed_count > 0 {
        format!(" 👤 {}", stream.seed_count)
    } else {
        String::new()
    };
    let langs = if stream.languages.is_empty() {
        String::new()
    } else {
        format!(
            " [{}]",
            stream.languages.iter().cloned().collect::<Vec<_>>().join(",")
        )
    };

    format!(
        "{cached} {:>9}  {:<28} {}{seeds}{langs}",
        human_size(stream.size_bytes),
        tags.join(" "),
        stream.stream.title
    )
}

pub fn print_result(result: &AggregationResult) {
    let counts = &result.tier_counts;
    println!(
        "🎬 {} streams via {:?} (4K: {}, 1080p: {}, Other: {})",
        result.len(),
        result.mode,
        counts.four_k,
        counts.full_hd,
        counts.other
    );

    for group in &result.groups {
        println!("\n── {} ({}) ──", group.name, group.streams.len());
        for stream in &group.streams {
            println!("{}", stream_line(stream));
            match stream.stream.source_kind {
                SourceKind::Torrent => {
                    if let Some(magnet) = stream.stream.magnet() {
                        println!("             {magnet}");
                    }
                }
                SourceKind::DirectUrl => {
                    if let Some(url) = &stream.stream.url {
                        println!("             {url}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(human_size(0), "?");
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(19_649_710_243), "18.3 GB");
    }
}
