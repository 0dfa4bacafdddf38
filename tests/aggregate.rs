//! End-to-end searches against mock sources.

mod common;

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{any, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{addon_stream, fetcher, hash, manifest, settings_for, streams_body};
use reelsource::aggregate::rank::AGGREGATOR_CAP;
use reelsource::{
    ActiveSource, AggregationRequest, CachePolicy, Orchestrator, ProviderRegistry, SourceMode,
};

fn orchestrator(settings: reelsource::Settings, registry: Arc<ProviderRegistry>) -> Orchestrator {
    Orchestrator::new(settings, registry, fetcher())
}

#[tokio::test]
async fn third_party_mode_without_providers_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let settings = reelsource::Settings {
        third_party_mode: true,
        ..settings_for(&server.uri())
    };
    let result = orchestrator(settings, Arc::new(ProviderRegistry::in_memory()))
        .search(&AggregationRequest::movie("tt0111161"))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.mode, SourceMode::ThirdParty);
}

#[tokio::test]
async fn empty_prefiltered_aggregator_falls_back_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/torbox=tok/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![
            addon_stream(&hash('a'), "Movie.1994.1080p.BluRay.x264 💾 8 GB"),
            addon_stream(&hash('b'), "Movie.1994.2160p.WEB-DL.HEVC 💾 20 GB"),
            addon_stream(&hash('c'), "Movie.1994.1080p.WEBRip 💾 2 GB"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/api/torrents/checkcached"))
        .and(query_param("format", "object"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { hash('a'): { "name": "Movie", "size": 1 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Fallback results are cached-only regardless of the requested policy
    let request =
        AggregationRequest::movie("tt0111161").with_cache_policy(CachePolicy::Exploratory);
    let result = orchestrator(
        settings_for(&server.uri()),
        Arc::new(ProviderRegistry::in_memory()),
    )
    .search(&request)
    .await
    .unwrap();

    assert_eq!(result.mode, SourceMode::Aggregator);
    assert_eq!(result.len(), 1);
    assert_eq!(result.streams[0].info_hash().unwrap().as_str(), hash('a'));
    assert!(result.streams[0].cached_hint);
}

#[tokio::test]
async fn prefiltered_aggregator_is_capped_and_not_reverified() {
    let server = MockServer::start().await;
    let entries = (0..15u8)
        .map(|i| {
            let h = format!("{:040x}", u64::from(i) + 1);
            addon_stream(&h, &format!("Movie.1080p.x264 💾 {} GB", i + 1))
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/torbox=tok/stream/series/tt0903747:1:2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(entries)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stream/series/tt0903747:1:2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/api/torrents/checkcached"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {}})))
        .expect(0)
        .mount(&server)
        .await;

    let result = orchestrator(
        settings_for(&server.uri()),
        Arc::new(ProviderRegistry::in_memory()),
    )
    .search(&AggregationRequest::episode("tt0903747", 1, 2))
    .await
    .unwrap();

    assert_eq!(result.len(), AGGREGATOR_CAP);
    assert!(result.streams.iter().all(|s| s.cached_hint));
    // Descending by size within the first ten
    assert_eq!(result.streams[0].size_bytes, 10 * 1024 * 1024 * 1024);
}

#[tokio::test]
async fn dmm_source_has_no_cap_and_keeps_other_tier() {
    let server = MockServer::start().await;
    let records: Vec<_> = (0..12u8)
        .map(|i| {
            json!({
                "raw_title": format!("Movie.{}.720p.WEB", i),
                "info_hash": format!("{:040x}", u64::from(i) + 100),
                "resolution": "720p",
                "size": 1_000_000 * (u64::from(i) + 1),
                "codec": "x264",
                "audio": [],
                "hdr": [],
                "languages": [],
                "group": null
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/dmm/filtered"))
        .and(query_param("ImdbId", "tt0111161"))
        .and(query_param("onlyCached", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": records })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = reelsource::Settings {
        active_source: ActiveSource::Dmm,
        dmm_prefilter: true,
        ..settings_for(&server.uri())
    };
    let result = orchestrator(settings, Arc::new(ProviderRegistry::in_memory()))
        .search(&AggregationRequest::movie("tt0111161"))
        .await
        .unwrap();

    assert_eq!(result.mode, SourceMode::DmmCache);
    assert_eq!(result.len(), 12);
    assert_eq!(result.tier_counts.other, 12);
}

#[tokio::test]
async fn third_party_results_merge_in_provider_order() {
    let server = MockServer::start().await;
    for (prefix, id, name) in [
        ("/first", "org.first", "First"),
        ("/second", "org.second", "Second"),
        ("/broken", "org.broken", "Broken"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("{prefix}/manifest.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(manifest(id, name)))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/first/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![
            addon_stream(&hash('a'), "Movie 1080p 4 GB"),
            addon_stream(&hash('b'), "Movie 2160p 16 GB"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![
            addon_stream(&hash('A'), "Movie duplicate 1080p 4 GB"),
            addon_stream(&hash('c'), "Movie 1080p 6 GB"),
            addon_stream(&hash('d'), "Movie 480p 1 GB"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = Arc::new(ProviderRegistry::in_memory());
    let cancel = CancellationToken::new();
    let fetcher = fetcher();
    for prefix in ["/first", "/second", "/broken"] {
        registry
            .install(&fetcher, &format!("{}{prefix}", server.uri()), &cancel)
            .await
            .unwrap();
    }

    let settings = reelsource::Settings {
        third_party_mode: true,
        debrid_token: None,
        ..settings_for(&server.uri())
    };
    let result = orchestrator(settings, registry)
        .search(&AggregationRequest::movie("tt0111161"))
        .await
        .unwrap();

    // a, b, c survive; duplicate A dropped, 480p hidden, broken provider absorbed
    assert_eq!(result.len(), 3);
    let a = result
        .streams
        .iter()
        .find(|s| s.info_hash().unwrap().as_str() == hash('a'))
        .unwrap();
    assert_eq!(a.provider_name(), "First");
    assert_eq!(result.provider_counts["First"], 2);
    assert_eq!(result.provider_counts["Second"], 1);
    assert_eq!(result.groups[0].name, "All");
    assert_eq!(result.streams[0].size_bytes, 16 * 1024 * 1024 * 1024);
}

#[tokio::test]
async fn cancelled_search_returns_empty_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest("org.p", "P")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let registry = Arc::new(ProviderRegistry::in_memory());
    registry
        .install(&fetcher(), &format!("{}/p", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    let settings = reelsource::Settings {
        third_party_mode: true,
        ..settings_for(&server.uri())
    };
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = orchestrator(settings, registry)
        .search_cancellable(&AggregationRequest::movie("tt0111161"), &cancel)
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn library_files_join_search_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/torbox=tok/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![
            addon_stream(&hash('a'), "Movie.1994.1080p.BluRay.x264 💾 8 GB"),
            addon_stream(&hash('b'), "Movie.1994.2160p.WEB-DL.HEVC 💾 20 GB"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    // Specific torrent lookups are mounted ahead of the library listing
    Mock::given(method("GET"))
        .and(path("/v1/api/torrents/mylist"))
        .and(query_param("id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": 5,
                "hash": hash('a'),
                "name": "Movie.1994.1080p.BluRay.x264",
                "size": 4_294_967_296u64,
                "files": [
                    { "id": 1, "name": "Movie.1994.1080p.BluRay.x264.mkv", "size": 4_294_967_296u64 }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/api/torrents/mylist"))
        .and(query_param("id", "6"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/api/torrents/mylist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                { "id": 5, "hash": hash('a'), "name": "Movie.1994.1080p.BluRay.x264", "size": 1, "files": [] },
                { "id": 6, "hash": hash('c'), "name": "Unrelated", "size": 1, "files": [] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = AggregationRequest::movie("tt0111161").with_library();
    let result = orchestrator(
        settings_for(&server.uri()),
        Arc::new(ProviderRegistry::in_memory()),
    )
    .search(&request)
    .await
    .unwrap();

    assert_eq!(result.len(), 3);
    let library = &result.streams[2];
    assert_eq!(library.provider_name(), "Debrid library");
    assert_eq!(library.info_hash().unwrap().as_str(), hash('a'));
    assert_eq!(
        library.stream.url.as_deref(),
        Some(
            format!(
                "{}/v1/api/torrents/requestdl?token=tok&torrent_id=5&file_id=1&redirect=true",
                server.uri()
            )
            .as_str()
        )
    );
    assert_eq!(library.size_bytes, 4 * 1024 * 1024 * 1024);
    assert!(library.cached_hint);
    assert_eq!(result.provider_counts["Debrid library"], 1);
}

#[tokio::test]
async fn failed_library_lookup_keeps_source_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/torbox=tok/stream/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(streams_body(vec![
            addon_stream(&hash('a'), "Movie.1994.1080p.BluRay.x264 💾 8 GB"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/api/torrents/mylist"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1..)
        .mount(&server)
        .await;

    let request = AggregationRequest::movie("tt0111161").with_library();
    let result = orchestrator(
        settings_for(&server.uri()),
        Arc::new(ProviderRegistry::in_memory()),
    )
    .search(&request)
    .await
    .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.streams[0].info_hash().unwrap().as_str(), hash('a'));
}
