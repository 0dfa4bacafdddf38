//! Benchmarks for release-title classification and the merge/rank pipeline.
//!
//! Measures per-title pattern extraction and the cost of deduplicating and
//! ranking a realistic multi-provider result set.
//!
//! Run with: `cargo bench --bench classify_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reelsource::aggregate::rank::{rank, RankOptions};
use reelsource::aggregate::{SizeOrder, SourceMode};
use reelsource::classify::{classify_stream, classify_text};
use reelsource::merge::merge;
use reelsource::{ClassifiedStream, InfoHash, Stream};

// ---------------------------------------------------------------------------
// Title datasets
// ---------------------------------------------------------------------------

/// Aggregator-style multi-line descriptions.
const RICH_TITLES: &[&str] = &[
    "Torrentio\n4k DV | HDR\nMovie.2023.2160p.BluRay.REMUX.HEVC.TrueHD.Atmos\n👤 42 💾 58.3 GB ⚙️ TGx\n🇬🇧 / 🇮🇹",
    "Torrentio\n1080p\nShow.S02E05.1080p.WEB-DL.DDP5.1.H.264\n👤 311 💾 2.4 GB ⚙️ EZTV",
    "[TB+] Torrentio\n4k HDR10+\nMovie.2021.2160p.AMZN.WEB-DL.DDP5.1.HDR10+.HEVC\n👤 18 💾 19.7 GB\nMulti Audio / 🇫🇷 / 🇪🇸",
];

/// Bare release names.
const PLAIN_TITLES: &[&str] = &[
    "Movie.2019.720p.BluRay.x264",
    "Show.S01E01.480p.HDTV.XviD",
    "Documentary.2020.1080p.WEBRip.AAC2.0.x264",
];

/// Text with nothing to extract.
const EMPTY_TITLES: &[&str] = &["Episode one", "", "Stream"];

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn bench_classify_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_text");

    group.bench_function("rich", |b| {
        b.iter(|| {
            for title in RICH_TITLES {
                black_box(classify_text(black_box(title)));
            }
        });
    });

    group.bench_function("plain", |b| {
        b.iter(|| {
            for title in PLAIN_TITLES {
                black_box(classify_text(black_box(title)));
            }
        });
    });

    group.bench_function("nothing_to_extract", |b| {
        b.iter(|| {
            for title in EMPTY_TITLES {
                black_box(classify_text(black_box(title)));
            }
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Merge + rank
// ---------------------------------------------------------------------------

/// `providers` result lists of `per_provider` torrents each, with every
/// provider overlapping half of the previous one.
fn provider_results(providers: usize, per_provider: usize) -> Vec<Vec<Stream>> {
    (0..providers)
        .map(|p| {
            let start = p * per_provider / 2;
            (start..start + per_provider)
                .map(|i| {
                    let hash = InfoHash::parse(&format!("{i:040x}")).expect("valid hash");
                    let title = RICH_TITLES[i % RICH_TITLES.len()];
                    Stream::torrent(hash, format!("p{p}"), format!("Provider {p}"), title, title)
                })
                .collect()
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_rank");

    for &(providers, per_provider) in &[(3, 20), (8, 50), (16, 100)] {
        let input = provider_results(providers, per_provider);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{providers}x{per_provider}")),
            &input,
            |b, input| {
                b.iter(|| {
                    let classified: Vec<Vec<ClassifiedStream>> = input
                        .iter()
                        .map(|streams| streams.iter().cloned().map(classify_stream).collect())
                        .collect();
                    let merged = merge(classified);
                    black_box(rank(
                        merged,
                        RankOptions::for_mode(SourceMode::ThirdParty, SizeOrder::Descending),
                    ))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_classify_text, bench_pipeline);
criterion_main!(benches);
