use super::record_harness::sqlite_harness;
use mindstore::Clock;
use mindstore::schema::default_record;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn committed_records_survive_reopening_the_database() {
    let dir = TempDir::new().unwrap();

    {
        let h = sqlite_harness(&dir).await;
        h.manager
            .patch("steve", &json!({ "flags": { "speaker": "VISION" } }))
            .await
            .unwrap();
    }

    let reopened = sqlite_harness(&dir).await;
    let record = reopened.manager.get("steve").await.unwrap();
    assert_eq!(record["flags"]["speaker"], json!("VISION"));
}

#[tokio::test]
async fn record_and_contact_slots_are_stored_separately() {
    let dir = TempDir::new().unwrap();
    let h = sqlite_harness(&dir).await;

    h.manager.bump_counter("steve", "chat").await.unwrap();

    let record_bytes = h.store.get("record:steve").await.unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_slice(&record_bytes).unwrap();
    assert_eq!(
        stored["counters"]["vision_calls_60s"]["chat"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let contact_bytes = h.store.get("contact:steve").await.unwrap().unwrap();
    let contact: i64 = String::from_utf8(contact_bytes).unwrap().parse().unwrap();
    assert_eq!(contact, h.clock.now_ms());
}

#[tokio::test]
async fn corrupt_speaker_is_sanitized_without_losing_the_record() {
    let dir = TempDir::new().unwrap();
    let h = sqlite_harness(&dir).await;

    let poisoned = json!({
        "flags": { "speaker": "HAL9000" },
        "speech_lock_until": 555
    });
    h.store
        .put("record:steve", serde_json::to_vec(&poisoned).unwrap().as_slice())
        .await
        .unwrap();

    let record = h.manager.get("steve").await.unwrap();
    assert_eq!(record["flags"]["speaker"], json!("NONE"));
    assert_eq!(record["speech_lock_until"], json!(555));
}

#[tokio::test]
async fn undecodable_stored_bytes_fall_back_to_the_default() {
    let dir = TempDir::new().unwrap();
    let h = sqlite_harness(&dir).await;

    h.store.put("record:steve", b"not json at all").await.unwrap();

    let record = h.manager.get("steve").await.unwrap();
    assert_eq!(record, default_record());
}
