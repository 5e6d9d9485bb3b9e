use super::record_harness::{START_MS, memory_harness};
use mindstore::{RecordError, Speaker};
use serde_json::json;

#[tokio::test]
async fn lock_stamps_until_relative_to_lock_time() {
    let h = memory_harness();
    h.clock.advance(5_000);

    let lock = h.manager
        .acquire_speech_lock("steve", "GPT", Some(3000.0))
        .await
        .unwrap();
    assert_eq!(lock.speaker, Speaker::Gpt);
    assert_eq!(lock.speech_lock_until, Some(START_MS + 5_000 + 3_000));

    let record = h.manager.get("steve").await.unwrap();
    assert_eq!(record["flags"]["speaker"], json!("GPT"));
    assert_eq!(record["speech_lock_until"], json!(START_MS + 8_000));
    assert_eq!(record["meta"]["last_seen"], json!(START_MS + 5_000));
}

#[tokio::test]
async fn later_lock_overwrites_speaker_and_cooldown() {
    let h = memory_harness();
    h.manager
        .acquire_speech_lock("steve", "GPT", Some(3000.0))
        .await
        .unwrap();

    let lock = h.manager
        .acquire_speech_lock("steve", "VISION", None)
        .await
        .unwrap();
    assert_eq!(lock.speaker, Speaker::Vision);
    assert_eq!(lock.speech_lock_until, None);

    let record = h.manager.get("steve").await.unwrap();
    assert_eq!(record["flags"]["speaker"], json!("VISION"));
    assert_eq!(record["speech_lock_until"], json!(null));
}

#[tokio::test]
async fn legacy_alias_resolves_before_commit() {
    let h = memory_harness();
    let lock = h.manager
        .acquire_speech_lock("steve", "LLM", Some(100.0))
        .await
        .unwrap();
    assert_eq!(lock.speaker, Speaker::Gpt);
    assert_eq!(
        h.manager.get("steve").await.unwrap()["flags"]["speaker"],
        json!("GPT")
    );
}

#[tokio::test]
async fn bad_speaker_or_cooldown_is_invalid_argument() {
    let h = memory_harness();
    for attempt in [
        h.manager.acquire_speech_lock("steve", "HAL9000", None).await,
        h.manager.acquire_speech_lock("steve", "gpt", None).await,
        h.manager.acquire_speech_lock("steve", "GPT", Some(-1.0)).await,
        h.manager.acquire_speech_lock("steve", "GPT", Some(f64::INFINITY)).await,
    ] {
        assert!(matches!(attempt, Err(RecordError::InvalidArgument(_))));
    }
}

#[tokio::test]
async fn fractional_cooldown_floors_to_milliseconds() {
    let h = memory_harness();
    let lock = h.manager
        .acquire_speech_lock("steve", "NONE", Some(1500.9))
        .await
        .unwrap();
    assert_eq!(lock.speech_lock_until, Some(START_MS + 1_500));
}
