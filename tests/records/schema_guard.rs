use super::record_harness::memory_harness;
use mindstore::schema::default_record;
use mindstore::{RecordError, SchemaError};
use serde_json::json;

#[tokio::test]
async fn forbidden_keys_report_every_path_and_leave_storage_unchanged() {
    let h = memory_harness();
    let err = h.manager
        .patch(
            "steve",
            &json!({
                "scene_state": { "narration": "a tale of two biomes" },
                "dialogue": [
                    { "speaker": "player", "text": "hi", "ts": 1 },
                    { "speaker": "system", "text": "yo", "ts": 2, "spoken_line": "no" }
                ]
            }),
        )
        .await
        .unwrap_err();

    let RecordError::Schema(SchemaError::ForbiddenKey { paths }) = err else {
        panic!("expected ForbiddenKey, got {err:?}");
    };
    assert!(paths.contains(&"scene_state.narration".to_string()));
    assert!(paths.contains(&"dialogue[1].spoken_line".to_string()));

    assert_eq!(h.manager.get("steve").await.unwrap(), default_record());
}

#[tokio::test]
async fn unknown_root_keys_are_enumerated_exhaustively() {
    let h = memory_harness();
    let err = h.manager
        .patch("steve", &json!({ "hp": 20, "mood": "happy" }))
        .await
        .unwrap_err();

    let RecordError::Schema(SchemaError::UnknownKeys { scope, keys }) = err else {
        panic!("expected UnknownKeys, got {err:?}");
    };
    assert_eq!(scope, "root");
    assert_eq!(keys, vec!["hp".to_string(), "mood".to_string()]);
}

#[tokio::test]
async fn unknown_nested_keys_name_their_scope() {
    let h = memory_harness();
    let err = h.manager
        .patch("steve", &json!({ "meta": { "lastSeen": 7 } }))
        .await
        .unwrap_err();

    let RecordError::Schema(SchemaError::UnknownKeys { scope, .. }) = err else {
        panic!("expected UnknownKeys, got {err:?}");
    };
    assert_eq!(scope, "meta");
}

#[tokio::test]
async fn non_object_patch_is_rejected() {
    let h = memory_harness();
    let err = h.manager.patch("steve", &json!([1, 2, 3])).await.unwrap_err();
    assert!(matches!(
        err,
        RecordError::Schema(SchemaError::NotAnObject)
    ));
}

#[tokio::test]
async fn type_mismatch_names_the_failing_path() {
    let h = memory_harness();
    let err = h.manager
        .patch("steve", &json!({ "speech_lock_until": "soon" }))
        .await
        .unwrap_err();

    let RecordError::Schema(SchemaError::TypeMismatch { path, expected }) = err else {
        panic!("expected TypeMismatch, got {err:?}");
    };
    assert_eq!(path, "speech_lock_until");
    assert_eq!(expected, "number or null");
}

#[tokio::test]
async fn legacy_speaker_alias_is_stored_normalized() {
    let h = memory_harness();
    let committed = h.manager
        .patch("steve", &json!({ "flags": { "speaker": "LLM" } }))
        .await
        .unwrap();
    assert_eq!(committed["flags"]["speaker"], json!("GPT"));
    assert_eq!(
        h.manager.get("steve").await.unwrap()["flags"]["speaker"],
        json!("GPT")
    );
}

#[tokio::test]
async fn over_long_dialogue_patch_keeps_most_recent_ten() {
    let h = memory_harness();
    let entries: Vec<_> = (0..12)
        .map(|i| json!({ "speaker": "player", "text": format!("m{i}"), "ts": i }))
        .collect();

    let committed = h.manager
        .patch("steve", &json!({ "dialogue": entries }))
        .await
        .unwrap();
    let dialogue = committed["dialogue"].as_array().unwrap();
    assert_eq!(dialogue.len(), 10);
    assert_eq!(dialogue[0]["text"], json!("m2"));
    assert_eq!(dialogue[9]["text"], json!("m11"));
}
