//! Heuristic classification of free-text stream titles.
//!
//! Providers describe the same release in wildly different ways (dotted
//! scene names, emoji-decorated summaries, structured DMM fields rendered
//! as text). Classification runs over the newline-joined name, title and
//! description so a hint in any field is picked up.
//!
//! Each category is extracted independently:
//! - resolution, size, seeders: single patterns, first match wins
//! - codec, HDR, audio, source type: [`rules`] table, highest priority wins
//! - languages: [`language`] dictionary, all matches collected
//! - cached hint: marker set or an explicit upstream flag
//!
//! Classification is pure: the same text always yields the same result.

pub mod language;
pub mod rules;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::stream::{ClassifiedStream, QualityTier, Stream};

use rules::{best_match, Category};

static RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(2160p|4k|uhd|\d{3,4}p)\b").expect("resolution pattern")
});

static SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(\d{1,3}(?:,\d{3})+(?:\.\d+)?)|(\d+(?:[.,]\d+)?))\s?(TiB|TB|GiB|GB|MiB|MB)\b")
        .expect("size pattern")
});

static SEEDERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:👤|👥|🌱|\bseeders?:|\bseeds?:|\bs:)\s*(\d+)").expect("seeders pattern")
});

static CACHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)⚡|\[(?:rd|tb|ad|pm|dl|oc|ed)\+\]|\b(not[\s_-]*|un)?cached\b")
        .expect("cached pattern")
});

/// A marker counts unless it is a negated `not cached` / `uncached`.
fn has_cached_marker(text: &str) -> bool {
    CACHED.captures_iter(text).any(|caps| caps.get(1).is_none())
}

/// Attributes extracted from a stream's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// `4K`, `1080p`, `720p`, ... (2160p and UHD are reported as `4K`).
    pub resolution: Option<String>,
    pub quality_tier: QualityTier,
    pub codec: Option<String>,
    pub hdr: Option<String>,
    pub audio: Option<String>,
    pub source_type: Option<String>,
    pub languages: BTreeSet<String>,
    pub seed_count: Option<u32>,
    pub size_bytes: Option<u64>,
    /// A debrid-cached marker was present in the text.
    pub cached: bool,
}

/// Newline-join the non-empty text fields of a payload.
pub fn join_text<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classify a stream from its three text fields.
pub fn classify(name: Option<&str>, title: Option<&str>, description: Option<&str>) -> Classification {
    classify_text(&join_text([name, title, description]))
}

/// Classify already-joined text.
pub fn classify_text(text: &str) -> Classification {
    let resolution = parse_resolution(text);
    Classification {
        quality_tier: QualityTier::from_resolution(resolution.as_deref()),
        resolution,
        codec: best_match(Category::Codec, text),
        hdr: best_match(Category::Hdr, text),
        audio: best_match(Category::Audio, text),
        source_type: best_match(Category::SourceType, text),
        languages: language::detect(text),
        seed_count: parse_seeders(text),
        size_bytes: parse_size(text),
        cached: has_cached_marker(text),
    }
}

/// Attach classification to a normalized stream.
///
/// Structured hints on the stream fill in what the text does not say.
pub fn classify_stream(stream: Stream) -> ClassifiedStream {
    let c = classify_text(&stream.raw_text);
    let cached_hint = c.cached || stream.upstream_cached == Some(true);
    let size_bytes = c.size_bytes.or(stream.size_hint).unwrap_or(0);

    ClassifiedStream {
        quality_tier: c.quality_tier,
        resolution: c.resolution,
        codec: c.codec,
        hdr: c.hdr,
        audio: c.audio,
        source_type: c.source_type,
        languages: c.languages,
        seed_count: c.seed_count.unwrap_or(0),
        size_bytes,
        cached_hint,
        stream,
    }
}

fn parse_resolution(text: &str) -> Option<String> {
    let raw = RESOLUTION.captures(text)?.get(1)?.as_str().to_ascii_lowercase();
    Some(match raw.as_str() {
        "2160p" | "4k" | "uhd" => "4K".to_string(),
        _ => raw,
    })
}

fn parse_seeders(text: &str) -> Option<u32> {
    SEEDERS.captures(text)?.get(1)?.as_str().parse().ok()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn parse_size(text: &str) -> Option<u64> {
    let caps = SIZE.captures(text)?;
    // `1,234.5` groups thousands; a lone comma is a decimal separator
    let value: f64 = match caps.get(1) {
        Some(grouped) => grouped.as_str().replace(',', ""),
        None => caps.get(2)?.as_str().replace(',', "."),
    }
    .parse()
    .ok()?;
    let multiplier: u64 = match caps.get(3)?.as_str().to_ascii_uppercase().as_str() {
        "TB" | "TIB" => 1 << 40,
        "GB" | "GIB" => 1 << 30,
        _ => 1 << 20,
    };
    Some((value * multiplier as f64).round() as u64)
}
