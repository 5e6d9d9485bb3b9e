use super::record_harness::{START_MS, memory_harness};
use mindstore::RecordError;
use serde_json::json;

#[tokio::test]
async fn counts_rise_within_the_window() {
    let h = memory_harness();
    assert_eq!(h.manager.bump_counter("steve", "chat").await.unwrap(), 1);
    h.clock.advance(10_000);
    assert_eq!(h.manager.bump_counter("steve", "chat").await.unwrap(), 2);
    h.clock.advance(10_000);
    assert_eq!(h.manager.bump_counter("steve", "chat").await.unwrap(), 3);
}

#[tokio::test]
async fn entries_older_than_sixty_seconds_fall_out() {
    let h = memory_harness();
    h.manager.bump_counter("steve", "chat").await.unwrap();
    h.manager.bump_counter("steve", "chat").await.unwrap();

    h.clock.advance(60_001);
    assert_eq!(h.manager.bump_counter("steve", "chat").await.unwrap(), 1);

    let record = h.manager.get("steve").await.unwrap();
    let chat = record["counters"]["vision_calls_60s"]["chat"]
        .as_array()
        .unwrap();
    assert_eq!(chat, &vec![json!(START_MS + 60_001)]);
}

#[tokio::test]
async fn idle_buckets_are_pruned_on_every_bump() {
    let h = memory_harness();
    h.manager.bump_counter("steve", "tactical").await.unwrap();
    h.manager.bump_counter("steve", "auto").await.unwrap();

    h.clock.advance(60_001);
    h.manager.bump_counter("steve", "chat").await.unwrap();

    let record = h.manager.get("steve").await.unwrap();
    let buckets = &record["counters"]["vision_calls_60s"];
    assert_eq!(buckets["tactical"], json!([]));
    assert_eq!(buckets["auto"], json!([]));
    assert_eq!(buckets["chat"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn buckets_are_independent_within_the_window() {
    let h = memory_harness();
    assert_eq!(h.manager.bump_counter("steve", "chat").await.unwrap(), 1);
    assert_eq!(h.manager.bump_counter("steve", "tactical").await.unwrap(), 1);
    assert_eq!(h.manager.bump_counter("steve", "chat").await.unwrap(), 2);
}

#[tokio::test]
async fn unknown_reason_is_invalid_argument() {
    let h = memory_harness();
    let err = h.manager.bump_counter("steve", "panic").await.unwrap_err();
    assert!(matches!(err, RecordError::InvalidArgument(_)));
}

#[tokio::test]
async fn bump_stamps_last_seen() {
    let h = memory_harness();
    h.clock.advance(250);
    h.manager.bump_counter("steve", "auto").await.unwrap();

    let record = h.manager.get("steve").await.unwrap();
    assert_eq!(record["meta"]["last_seen"], json!(START_MS + 250));
}
