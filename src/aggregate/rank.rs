//! Tier filtering, capping, size sorting and grouping for presentation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SourceMode;
use crate::stream::{ClassifiedStream, QualityTier};

/// Result cap for the aggregator when third-party mode is off.
pub const AGGREGATOR_CAP: usize = 10;

/// Name of the group holding every stream.
pub const ALL_GROUP: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankOptions {
    pub sort: SizeOrder,
    pub include_other: bool,
    pub cap: Option<usize>,
}

impl RankOptions {
    /// Presentation rules for results produced by `mode`.
    pub fn for_mode(mode: SourceMode, sort: SizeOrder) -> Self {
        Self {
            sort,
            include_other: mode == SourceMode::DmmCache,
            cap: (mode == SourceMode::Aggregator).then_some(AGGREGATOR_CAP),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    #[serde(rename = "4K")]
    pub four_k: usize,
    #[serde(rename = "1080p")]
    pub full_hd: usize,
    #[serde(rename = "Other")]
    pub other: usize,
}

impl TierCounts {
    pub fn of(streams: &[ClassifiedStream]) -> Self {
        streams.iter().fold(Self::default(), |mut counts, s| {
            match s.quality_tier {
                QualityTier::FourK => counts.four_k += 1,
                QualityTier::FullHd => counts.full_hd += 1,
                QualityTier::Other => counts.other += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.four_k + self.full_hd + self.other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamGroup {
    pub name: String,
    pub streams: Vec<ClassifiedStream>,
}

/// Final output of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub mode: SourceMode,
    /// Ranked streams, the contents of the "All" group.
    pub streams: Vec<ClassifiedStream>,
    /// "All" first, then one group per provider name in first-seen order.
    pub groups: Vec<StreamGroup>,
    pub tier_counts: TierCounts,
    pub provider_counts: BTreeMap<String, usize>,
}

impl AggregationResult {
    pub fn empty(mode: SourceMode) -> Self {
        Self::from_ranked(mode, Vec::new())
    }

    pub fn from_ranked(mode: SourceMode, streams: Vec<ClassifiedStream>) -> Self {
        let mut groups: Vec<StreamGroup> = Vec::new();
        let mut provider_counts = BTreeMap::new();

        for stream in &streams {
            let name = stream.provider_name();
            *provider_counts.entry(name.to_string()).or_insert(0) += 1;
            match groups.iter_mut().find(|g| g.name == name) {
                Some(group) => group.streams.push(stream.clone()),
                None => groups.push(StreamGroup {
                    name: name.to_string(),
                    streams: vec![stream.clone()],
                }),
            }
        }

        groups.insert(
            0,
            StreamGroup {
                name: ALL_GROUP.to_string(),
                streams: streams.clone(),
            },
        );

        Self {
            mode,
            tier_counts: TierCounts::of(&streams),
            streams,
            groups,
            provider_counts,
        }
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// Drop hidden tiers, apply the cap, then sort by size.
///
/// The cap keeps the first entries in merge order. Sorting is stable, so
/// equal sizes keep merge order too.
pub fn rank(streams: Vec<ClassifiedStream>, options: RankOptions) -> Vec<ClassifiedStream> {
    let mut ranked: Vec<ClassifiedStream> = streams
        .into_iter()
        .filter(|s| options.include_other || s.quality_tier != QualityTier::Other)
        .collect();

    if let Some(cap) = options.cap {
        ranked.truncate(cap);
    }

    match options.sort {
        SizeOrder::Ascending => ranked.sort_by_key(|s| s.size_bytes),
        SizeOrder::Descending => ranked.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
    }
    ranked
}
