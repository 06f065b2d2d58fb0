use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use marginalia::cache::{CacheConfig, CacheStatus, Fingerprint, ListQuery, QueryCache};
use marginalia::infra::http::ApiError;
use marginalia::infra::telemetry;
use tokio::sync::Notify;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let cache: QueryCache<String> = QueryCache::new(CacheConfig {
        retry_count: 1,
        retry_delay: Duration::ZERO,
        gc_time: Duration::ZERO,
        ..CacheConfig::default()
    });

    // miss, fetch latency, then hit
    let books = Fingerprint::BookList(ListQuery::new());
    let loaded = cache
        .resolve(&books, || async { Ok("books".to_string()) })
        .await
        .expect("first read");
    assert_eq!(loaded.as_str(), "books");
    cache
        .resolve(&books, || async { Ok("unused".to_string()) })
        .await
        .expect("cached read");

    // join: the first fetch yields so the second caller finds it in flight
    let notes = Fingerprint::NoteList(ListQuery::new());
    let fetch = || async {
        tokio::task::yield_now().await;
        Ok("notes".to_string())
    };
    let (first, second) = tokio::join!(cache.resolve(&notes, fetch), cache.resolve(&notes, fetch));
    assert_eq!(first.expect("leader"), second.expect("follower"));

    // retry then error
    let tags = Fingerprint::TagList(ListQuery::new());
    let failed = cache
        .resolve(&tags, || async {
            Err::<String, _>(ApiError::Server {
                status: 503,
                message: "unavailable".into(),
            })
        })
        .await;
    assert!(failed.is_err());
    assert_eq!(cache.status(&tags), Some(CacheStatus::Error));

    // a response that lands after invalidation is discarded
    let note = Fingerprint::Note(5);
    let gate = Arc::new(Notify::new());
    let task = {
        let cache = cache.clone();
        let note = note.clone();
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            cache
                .resolve(&note, move || {
                    let gate = Arc::clone(&gate);
                    async move {
                        gate.notified().await;
                        Ok("late".to_string())
                    }
                })
                .await
        })
    };
    while cache.status(&note) != Some(CacheStatus::Fetching) {
        tokio::task::yield_now().await;
    }
    assert!(cache.invalidate(|fingerprint| fingerprint == &note) >= 1);
    gate.notify_one();
    let late = task.await.expect("join").expect("caller still gets the response");
    assert_eq!(late.as_str(), "late");
    assert_eq!(cache.status(&note), Some(CacheStatus::Stale));

    // idle entries are collected immediately with a zero gc time
    assert!(cache.collect_garbage() > 0);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "marginalia_cache_hit_total",
        "marginalia_cache_miss_total",
        "marginalia_cache_join_total",
        "marginalia_cache_retry_total",
        "marginalia_cache_discard_total",
        "marginalia_cache_invalidate_total",
        "marginalia_cache_evict_total",
        "marginalia_fetch_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
