use super::record_harness::memory_harness;
use serde_json::json;

#[tokio::test]
async fn concurrent_appends_on_one_player_both_survive() {
    let h = memory_harness();
    let (a, b) = tokio::join!(
        h.manager.append_dialogue("steve", "player", "hello?"),
        h.manager.append_dialogue("steve", "system", "right behind you"),
    );
    a.unwrap();
    b.unwrap();

    let record = h.manager.get("steve").await.unwrap();
    let dialogue = record["dialogue"].as_array().unwrap();
    assert_eq!(dialogue.len(), 2);

    let texts: Vec<&str> = dialogue
        .iter()
        .map(|entry| entry["text"].as_str().unwrap())
        .collect();
    assert!(texts.contains(&"hello?"));
    assert!(texts.contains(&"right behind you"));
}

#[tokio::test]
async fn concurrent_patches_to_different_fields_both_apply() {
    let h = memory_harness();
    let speaker_patch = json!({ "flags": { "speaker": "GPT" } });
    let health_patch = json!({ "scene_state": { "player": { "health": 9.0 } } });
    let (a, b) = tokio::join!(
        h.manager.patch("steve", &speaker_patch),
        h.manager.patch("steve", &health_patch),
    );
    a.unwrap();
    b.unwrap();

    let record = h.manager.get("steve").await.unwrap();
    assert_eq!(record["flags"]["speaker"], json!("GPT"));
    assert_eq!(record["scene_state"]["player"]["health"], json!(9.0));
}

#[tokio::test]
async fn players_do_not_block_each_other() {
    let h = memory_harness();
    let (a, b) = tokio::join!(
        h.manager.append_dialogue("steve", "player", "mine"),
        h.manager.append_dialogue("alex", "player", "craft"),
    );
    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 1);

    assert_eq!(
        h.manager.get("steve").await.unwrap()["dialogue"][0]["text"],
        json!("mine")
    );
    assert_eq!(
        h.manager.get("alex").await.unwrap()["dialogue"][0]["text"],
        json!("craft")
    );
}

#[tokio::test]
async fn interleaved_bumps_never_lose_counts() {
    let h = memory_harness();
    let (a, b, c) = tokio::join!(
        h.manager.bump_counter("steve", "chat"),
        h.manager.bump_counter("steve", "chat"),
        h.manager.bump_counter("steve", "chat"),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let record = h.manager.get("steve").await.unwrap();
    let chat = record["counters"]["vision_calls_60s"]["chat"]
        .as_array()
        .unwrap();
    assert_eq!(chat.len(), 3);
}
