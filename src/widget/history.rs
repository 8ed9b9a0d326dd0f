use crate::db::models::Message;
use crate::db::Database;
use serde_json::Value;
use std::sync::Arc;

pub const STORAGE_PREFIX: &str = "gpt-chat-history-";

pub fn storage_key(chat_id: &str) -> String {
    format!("{STORAGE_PREFIX}{chat_id}")
}

/// Persisted conversation of one chat. Failures are logged and swallowed;
/// the conversation carries on in memory.
#[derive(Clone)]
pub struct History {
    db: Arc<Database>,
    key: String,
}

impl History {
    pub fn new(db: Arc<Database>, chat_id: &str) -> Self {
        Self {
            db,
            key: storage_key(chat_id),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrite the stored list with `messages`.
    pub fn save(&self, messages: &[Message]) {
        let encoded = match serde_json::to_string(messages) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Failed to encode history");
                return;
            }
        };
        if let Err(e) = self.db.set_item(&self.key, &encoded) {
            tracing::error!(key = %self.key, error = %e, "Failed to save history");
        }
    }

    pub fn load(&self) -> Vec<Message> {
        let raw = match self.db.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Failed to load history");
                return Vec::new();
            }
        };
        match decode(&raw) {
            Some(messages) => messages,
            None => {
                tracing::error!(key = %self.key, "Stored history is not a JSON array, ignoring it");
                Vec::new()
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.db.remove_item(&self.key) {
            tracing::error!(key = %self.key, error = %e, "Failed to clear history");
        }
    }
}

/// Decode entry by entry so one stale record does not cost the rest.
/// Untyped entries carrying `text` predate the `type` tag and are read as
/// text messages.
fn decode(raw: &str) -> Option<Vec<Message>> {
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw) else {
        return None;
    };
    let messages = entries
        .into_iter()
        .filter_map(|mut entry| {
            if let Value::Object(obj) = &mut entry {
                if !obj.contains_key("type") && obj.contains_key("text") {
                    obj.insert("type".to_string(), Value::from("message"));
                }
            }
            match serde_json::from_value::<Message>(entry.clone()) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!(error = %e, entry = %entry, "Dropping unreadable history entry");
                    None
                }
            }
        })
        .collect();
    Some(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history() -> History {
        History::new(Arc::new(Database::in_memory().unwrap()), "abc123")
    }

    #[test]
    fn key_is_namespaced_by_chat() {
        assert_eq!(storage_key("abc123"), "gpt-chat-history-abc123");
        assert_eq!(history().key(), "gpt-chat-history-abc123");
    }

    #[test]
    fn save_then_load() {
        let h = history();
        let messages = vec![Message::user("hello"), Message::bot("hi there")];
        h.save(&messages);
        assert_eq!(h.load(), messages);

        h.clear();
        assert!(h.load().is_empty());
    }

    #[test]
    fn stale_entries_are_dropped_individually() {
        let h = history();
        let raw = json!([
            { "type": "message", "text": "kept", "isUser": true, "time": "2025-01-01T00:00:00Z" },
            { "type": "audio", "url": "x" },
            42,
            { "text": "legacy", "isUser": false },
            { "type": "result", "data": [{ "id": "1", "title": "Loft", "beds": "many" }] },
            { "type": "message", "isUser": true }
        ]);
        h.db.set_item(h.key(), &raw.to_string()).unwrap();

        let loaded = h.load();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].text(), Some("kept"));
        assert_eq!(loaded[1].text(), Some("legacy"));
        assert!(matches!(&loaded[2], Message::Results { data, .. } if data[0].beds.is_none()));
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let h = history();
        h.db.set_item(h.key(), "{not json").unwrap();
        assert!(h.load().is_empty());
        h.db.set_item(h.key(), "{\"a\":1}").unwrap();
        assert!(h.load().is_empty());
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let db = Arc::new(Database::in_memory().unwrap());
        let h = History::new(db.clone(), "x");
        db.break_storage();
        h.save(&[Message::user("lost")]);
        assert!(h.load().is_empty());
        h.clear();
    }
}
