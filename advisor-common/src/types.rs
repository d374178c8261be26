//! Data model shared between the store, the retriever, and the API layer
//!
//! The on-disk shapes mirror the flat-file JSON store and the corpus
//! `songs.json` produced by the offline scraper, so existing data files
//! load unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Roles allowed in chat history and saved sessions.
pub const ALLOWED_ROLES: [&str; 2] = ["user", "model"];

/// One message in a conversation, as sent by the client and as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Whether the role is one of the allowed conversation roles.
    pub fn role_is_valid(&self) -> bool {
        ALLOWED_ROLES.contains(&self.role.as_str())
    }
}

/// A saved conversation. Immutable once stored, except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

/// Player profile, replaced wholesale on update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub name: String,
    pub level: String,
    pub star_pref: String,
    pub style: String,
}

/// One user record, keyed by access code in the store.
///
/// `created_at` is kept as a raw JSON value: legacy records may lack it
/// (backfilled on first validation) and corrupt records may hold a
/// non-numeric value (deleted on next validation). Only
/// [`UserRecord::created_at_secs`] interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub chat_sessions: Vec<ChatSession>,
}

impl UserRecord {
    /// Fresh record for a newly provisioned access code.
    pub fn new(created_at: f64) -> Self {
        Self {
            created_at: Some(Value::from(created_at)),
            profile: None,
            chat_sessions: Vec::new(),
        }
    }

    /// Interpret `created_at` as finite float seconds.
    ///
    /// `Ok(None)` means absent (legacy record, to be backfilled);
    /// `Err(())` means present but unusable (corrupt record).
    pub fn created_at_secs(&self) -> std::result::Result<Option<f64>, ()> {
        match &self.created_at {
            None | Some(Value::Null) => Ok(None),
            Some(value) => match value.as_f64() {
                Some(secs) if secs.is_finite() => Ok(Some(secs)),
                _ => Err(()),
            },
        }
    }
}

/// Candidate song reference data. Never mutated by the backend.
///
/// Lenient defaults keep partially scraped entries loadable; `bpm` stays
/// a raw value because the scraper emits both numbers and range strings
/// such as `"140-200"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Song {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub difficulty: BTreeMap<String, Value>,
    #[serde(default)]
    pub bpm: Value,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub detail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_combo: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn created_at_absent_is_backfill_candidate() {
        let record: UserRecord = serde_json::from_value(json!({
            "profile": null,
            "chat_sessions": []
        }))
        .unwrap();
        assert_eq!(record.created_at_secs(), Ok(None));
    }

    #[test]
    fn created_at_non_numeric_is_corrupt() {
        let record: UserRecord = serde_json::from_value(json!({
            "created_at": "last tuesday",
            "profile": null,
            "chat_sessions": []
        }))
        .unwrap();
        assert_eq!(record.created_at_secs(), Err(()));
    }

    #[test]
    fn created_at_numeric_parses() {
        let record = UserRecord::new(1_700_000_000.5);
        assert_eq!(record.created_at_secs(), Ok(Some(1_700_000_000.5)));
    }

    #[test]
    fn song_loads_from_minimal_corpus_entry() {
        let song: Song = serde_json::from_value(json!({
            "id": 800001,
            "title": "さいたま2000",
            "genre": "ナムコオリジナル",
            "difficulty": {"oni": 7},
            "bpm": "200",
            "detail_url": "https://example.test/2000"
        }))
        .unwrap();
        assert_eq!(song.id, 800001);
        assert!(song.features.is_empty());
        assert!(song.max_combo.is_none());
    }

    #[test]
    fn role_validation() {
        let ok = ChatMessage { role: "model".into(), content: "hi".into() };
        let bad = ChatMessage { role: "system".into(), content: "hi".into() };
        assert!(ok.role_is_valid());
        assert!(!bad.role_is_valid());
    }
}
