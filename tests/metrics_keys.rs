//! The cache and revalidation paths emit the documented metric keys.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use balera::cache::{CacheConfig, CachedPage, PageCache, StaleMarker};
use balera::domain::entities::EventRecord;
use balera::revalidate::{
    ChangeEvent, ChangeKind, ChangeNotifier, Operation, RevalidationConfig, apply,
};
use bytes::Bytes;
use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

fn metric_names(snapshotter: &Snapshotter) -> HashSet<String> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect()
}

fn sample_record() -> EventRecord {
    let now = OffsetDateTime::now_utc();
    EventRecord {
        id: Uuid::new_v4(),
        slug: "salsa-night".to_string(),
        title: "Salsa Night".to_string(),
        venue: "Rialto".to_string(),
        city: "Montreal".to_string(),
        starts_at: now,
        description: String::new(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn cache_and_revalidation_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Page cache hit/miss/evict/entries
    let cache = PageCache::new(&CacheConfig {
        page_limit: 1,
        ..Default::default()
    });
    assert!(cache.get("/events").is_none());
    cache.store(
        "/events",
        CachedPage::new(Bytes::from_static(b"listing"), "text/html"),
    );
    assert!(cache.get("/events").is_some());
    cache.store(
        "/events/salsa-night",
        CachedPage::new(Bytes::from_static(b"detail"), "text/html"),
    );

    // Revalidation marked counter + latency
    let marker: Arc<dyn StaleMarker> = Arc::new(PageCache::new(&CacheConfig::default()));
    let event = ChangeEvent::new(
        ChangeKind::Created,
        Some("42".to_string()),
        Some("salsa-night".to_string()),
    )
    .expect("valid event");
    apply(marker.as_ref(), &event).await;

    // Notifier delivery latency: the attempt against a dead endpoint still
    // records its duration once it fails.
    let config = RevalidationConfig {
        token: Some("sekrit".to_string()),
        endpoint_url: Url::parse("http://127.0.0.1:9/api/revalidate").expect("url"),
        request_timeout: Duration::from_millis(500),
        queue_capacity: 8,
    };
    let notifier = ChangeNotifier::from_config(&config).expect("notifier");
    notifier.notify(&sample_record(), Operation::Update);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !metric_names(&snapshotter).contains("balera_notify_ms") {
        assert!(
            tokio::time::Instant::now() < deadline,
            "delivery attempt never recorded its latency"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let names = metric_names(&snapshotter);
    let expected = [
        "balera_page_cache_hit_total",
        "balera_page_cache_miss_total",
        "balera_page_cache_evict_total",
        "balera_page_cache_entries",
        "balera_revalidate_marked_total",
        "balera_revalidate_ms",
        "balera_notify_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
