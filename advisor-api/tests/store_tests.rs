//! User store integration tests against real temp files

use advisor_api::store::{TokenStatus, UserStore};
use advisor_common::config::MAX_SESSIONS_PER_USER;
use advisor_common::types::{ChatMessage, ChatSession, Profile};
use std::fs;
use tempfile::TempDir;

fn temp_store(dir: &TempDir) -> UserStore {
    UserStore::new(dir.path().join("users.json"))
}

fn session(id: &str, title: &str) -> ChatSession {
    ChatSession {
        id: id.to_string(),
        title: title.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: "推薦一首歌".to_string(),
        }],
    }
}

fn profile(name: &str) -> Profile {
    Profile {
        name: name.to_string(),
        level: "十段".to_string(),
        star_pref: "★9".to_string(),
        style: "穩定型".to_string(),
    }
}

#[tokio::test]
async fn unknown_code_does_not_validate() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    assert!(!store.validate("no-such-code").await.unwrap());
    assert_eq!(
        store.check_token("no-such-code").await.unwrap(),
        TokenStatus::Unknown
    );
}

#[tokio::test]
async fn created_code_validates() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    assert!(store.create("TAIKO-001").await.unwrap());
    assert!(store.validate("TAIKO-001").await.unwrap());
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    assert!(store.create("TAIKO-001").await.unwrap());
    assert!(!store.create("TAIKO-001").await.unwrap());
}

#[tokio::test]
async fn delete_revokes_the_code() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    store.create("TAIKO-001").await.unwrap();
    assert!(store.delete("TAIKO-001").await.unwrap());
    assert!(!store.validate("TAIKO-001").await.unwrap());
    assert!(!store.delete("TAIKO-001").await.unwrap());
}

#[tokio::test]
async fn expired_record_is_deleted_on_check() {
    let dir = TempDir::new().unwrap();
    // Negative window so any record is already past expiry.
    let store = UserStore::with_limits(dir.path().join("users.json"), MAX_SESSIONS_PER_USER, -1.0);

    store.create("TAIKO-001").await.unwrap();
    assert_eq!(
        store.check_token("TAIKO-001").await.unwrap(),
        TokenStatus::Expired
    );
    // The expired record is gone, so a second check reports Unknown.
    assert_eq!(
        store.check_token("TAIKO-001").await.unwrap(),
        TokenStatus::Unknown
    );
}

#[tokio::test]
async fn corrupt_created_at_deletes_the_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");
    fs::write(
        &path,
        r#"{"TAIKO-001": {"created_at": "not a number", "profile": null, "chat_sessions": []}}"#,
    )
    .unwrap();
    let store = UserStore::new(&path);

    assert_eq!(
        store.check_token("TAIKO-001").await.unwrap(),
        TokenStatus::Unknown
    );

    let raw = fs::read_to_string(&path).unwrap();
    let map: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(map.get("TAIKO-001").is_none());
}

#[tokio::test]
async fn legacy_record_without_timestamp_is_backfilled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");
    fs::write(
        &path,
        r#"{"TAIKO-001": {"profile": null, "chat_sessions": []}}"#,
    )
    .unwrap();
    let store = UserStore::new(&path);

    assert!(matches!(
        store.check_token("TAIKO-001").await.unwrap(),
        TokenStatus::Active { .. }
    ));

    let raw = fs::read_to_string(&path).unwrap();
    let map: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(map["TAIKO-001"]["created_at"].is_f64());
}

#[tokio::test]
async fn profile_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    store.create("TAIKO-001").await.unwrap();
    assert!(store.get_profile("TAIKO-001").await.unwrap().is_none());

    assert!(store
        .update_profile("TAIKO-001", profile("どんちゃん"))
        .await
        .unwrap());
    let stored = store.get_profile("TAIKO-001").await.unwrap().unwrap();
    assert_eq!(stored.name, "どんちゃん");
    assert_eq!(stored.level, "十段");

    // Replacement is wholesale, not a merge.
    assert!(store
        .update_profile("TAIKO-001", profile("かっちゃん"))
        .await
        .unwrap());
    let stored = store.get_profile("TAIKO-001").await.unwrap().unwrap();
    assert_eq!(stored.name, "かっちゃん");
}

#[tokio::test]
async fn profile_update_for_unknown_code_fails() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    assert!(!store
        .update_profile("no-such-code", profile("どんちゃん"))
        .await
        .unwrap());
}

#[tokio::test]
async fn session_capacity_is_enforced_without_eviction() {
    let dir = TempDir::new().unwrap();
    let store = UserStore::with_limits(dir.path().join("users.json"), 2, 3600.0);

    store.create("TAIKO-001").await.unwrap();
    assert!(store
        .add_session("TAIKO-001", session("s1", "first"))
        .await
        .unwrap());
    assert!(store
        .add_session("TAIKO-001", session("s2", "second"))
        .await
        .unwrap());
    assert!(!store
        .add_session("TAIKO-001", session("s3", "third"))
        .await
        .unwrap());

    // Existing sessions are untouched by the rejected append.
    let sessions = store.list_sessions("TAIKO-001").await.unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2"]);
}

#[tokio::test]
async fn sessions_keep_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    store.create("TAIKO-001").await.unwrap();
    for (id, title) in [("a", "早い曲"), ("b", "遅い曲"), ("c", "難しい曲")] {
        assert!(store
            .add_session("TAIKO-001", session(id, title))
            .await
            .unwrap());
    }

    let sessions = store.list_sessions("TAIKO-001").await.unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn delete_session_distinguishes_no_match() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(&dir);

    store.create("TAIKO-001").await.unwrap();
    store
        .add_session("TAIKO-001", session("s1", "first"))
        .await
        .unwrap();

    assert!(!store.delete_session("TAIKO-001", "missing").await.unwrap());
    assert!(store.delete_session("TAIKO-001", "s1").await.unwrap());
    assert!(store.list_sessions("TAIKO-001").await.unwrap().is_empty());
}

#[tokio::test]
async fn validating_an_active_record_does_not_rewrite_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");
    // Compact JSON: any rewrite would pretty-print it, changing the bytes.
    let raw =
        r#"{"TAIKO-001":{"created_at":4000000000.0,"profile":null,"chat_sessions":[]}}"#;
    fs::write(&path, raw).unwrap();
    let store = UserStore::new(&path);

    assert!(store.validate("TAIKO-001").await.unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), raw);

    // Unknown codes leave the file alone too.
    assert!(!store.validate("no-such-code").await.unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), raw);
}

#[test]
fn missing_parent_directory_counts_as_writable() {
    let dir = TempDir::new().unwrap();
    let store = UserStore::new(dir.path().join("nested").join("users.json"));
    assert!(store.is_writable());
}

#[tokio::test]
async fn store_survives_missing_and_empty_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");

    // Missing file: reads succeed with nothing in them.
    let store = UserStore::new(&path);
    assert!(store.list_sessions("TAIKO-001").await.unwrap().is_empty());

    // Empty file: same.
    fs::write(&path, "").unwrap();
    assert!(!store.validate("TAIKO-001").await.unwrap());
}
