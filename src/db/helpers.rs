//! Typed query helpers over the message store.
//!
//! Shared by retrieval and dispatch so both resolve handles and read messages
//! the same way.
//!
//! CHANGELOG:
//! - 10/19/2026 - Rewritten around handle sets and time-windowed retrieval
//! - 01/10/2026 - Initial extraction from analytics.rs

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter};
use std::collections::HashMap;

use super::connection::Store;
use super::queries;
use crate::error::StoreError;
use crate::phone;

// ============================================================================
// Data Structures
// ============================================================================

/// One row of the `message` table joined with its sender handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub rowid: i64,
    /// Store-epoch nanoseconds (legacy rows: seconds).
    pub date: i64,
    pub text: Option<String>,
    pub attributed_body: Option<Vec<u8>>,
    pub handle_id: Option<String>,
    pub is_from_me: bool,
    pub room_name: Option<String>,
}

/// All handle ROWIDs that belong to one logical phone number or address.
///
/// A single person commonly has one handle per protocol (iMessage, SMS, RCS),
/// and messages must be unioned across all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleSet(Vec<i64>);

impl HandleSet {
    pub fn new(mut ids: Vec<i64>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    pub fn ids(&self) -> &[i64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Room name to group display name.
pub type ChatMapping = HashMap<String, String>;

/// A group conversation that can be addressed by the dispatch engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupChat {
    pub chat_identifier: Option<String>,
    pub room_name: Option<String>,
    pub display_name: Option<String>,
}

// ============================================================================
// Handle Resolution
// ============================================================================

/// Every handle stored under any format of the given phone number.
pub fn handles_for_phone(store: &Store, phone_number: &str) -> Result<HandleSet, StoreError> {
    let normalized = phone::normalize(phone_number);
    if normalized.is_empty() {
        return Ok(HandleSet::default());
    }

    let formats = phone::stored_formats(&normalized);
    let ids = store.query(
        &queries::handles_by_ids_sql(formats.len()),
        params_from_iter(formats.iter()),
        |row| row.get::<_, i64>(0),
    )?;
    Ok(HandleSet::new(ids))
}

/// Handles whose id exactly equals an address.
pub fn handles_for_address(store: &Store, address: &str) -> Result<HandleSet, StoreError> {
    let ids = store.query(queries::HANDLE_BY_ADDRESS, [address], |row| row.get::<_, i64>(0))?;
    Ok(HandleSet::new(ids))
}

/// Number of messages whose handle id contains `fragment`.
pub fn count_messages_like_handle(store: &Store, fragment: &str) -> Result<i64, StoreError> {
    let counts = store.query(queries::MESSAGE_COUNT_LIKE_HANDLE, [fragment], |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(counts.into_iter().next().unwrap_or(0))
}

// ============================================================================
// Message Queries
// ============================================================================

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        rowid: row.get(0)?,
        date: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
        text: row.get(2)?,
        attributed_body: row.get(3)?,
        is_from_me: row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
        handle_id: row.get(5)?,
        room_name: row.get(6)?,
    })
}

/// Messages newer than `since` (store epoch), newest first, at most `limit`.
/// With a handle set, only messages on those handles.
pub fn messages_since(
    store: &Store,
    since: i64,
    limit: u32,
    handles: Option<&HandleSet>,
) -> Result<Vec<Message>, StoreError> {
    match handles {
        None => store.query(queries::MESSAGES_SINCE, params![since, i64::from(limit)], map_message),
        Some(set) => {
            let mut bound: Vec<SqlValue> = vec![SqlValue::Integer(since), SqlValue::Integer(i64::from(limit))];
            bound.extend(set.ids().iter().map(|id| SqlValue::Integer(*id)));
            store.query(
                &queries::messages_for_handles_sql(set.len()),
                params_from_iter(bound),
                map_message,
            )
        }
    }
}

// ============================================================================
// Chats
// ============================================================================

/// Room name to display name for every named chat.
pub fn chat_mapping(store: &Store) -> Result<ChatMapping, StoreError> {
    let rows = store.query(queries::CHAT_MAPPING, [], |row| {
        Ok((
            row.get::<_, Option<String>>(0)?,
            row.get::<_, Option<String>>(1)?,
        ))
    })?;

    Ok(rows
        .into_iter()
        .filter_map(|(room, name)| match (room, name) {
            (Some(room), Some(name)) if !name.is_empty() => Some((room, name)),
            _ => None,
        })
        .collect())
}

/// Group chats known to the store.
pub fn group_chats(store: &Store) -> Result<Vec<GroupChat>, StoreError> {
    store.query(queries::GROUP_CHATS, [], |row| {
        Ok(GroupChat {
            chat_identifier: row.get(0)?,
            room_name: row.get(1)?,
            display_name: row.get(2)?,
        })
    })
}

/// Display name of a chat the handle takes part in, if any is named.
pub fn chat_display_name_for_handle(
    store: &Store,
    handle_id: &str,
) -> Result<Option<String>, StoreError> {
    let names = store.query(queries::CHAT_DISPLAY_NAME_FOR_HANDLE, [handle_id], |row| {
        row.get::<_, String>(0)
    })?;
    Ok(names.into_iter().next())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Minimal Messages.db schema for store-backed tests.

    use rusqlite::{params, Connection};
    use std::path::{Path, PathBuf};

    pub const SCHEMA: &str = r#"
        CREATE TABLE handle (ROWID INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT NOT NULL, service TEXT);
        CREATE TABLE chat (
            ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_identifier TEXT,
            room_name TEXT,
            display_name TEXT
        );
        CREATE TABLE message (
            ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
            date INTEGER,
            text TEXT,
            attributedBody BLOB,
            is_from_me INTEGER DEFAULT 0,
            handle_id INTEGER DEFAULT 0,
            cache_roomnames TEXT
        );
        CREATE TABLE chat_handle_join (chat_id INTEGER, handle_id INTEGER);
        CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
    "#;

    pub struct MessagesDb {
        pub path: PathBuf,
        conn: Connection,
    }

    impl MessagesDb {
        pub fn create(dir: &Path) -> Self {
            let path = dir.join("chat.db");
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
            Self { path, conn }
        }

        pub fn handle(&self, id: &str, service: &str) -> i64 {
            self.conn
                .execute("INSERT INTO handle (id, service) VALUES (?1, ?2)", params![id, service])
                .unwrap();
            self.conn.last_insert_rowid()
        }

        pub fn chat(&self, identifier: &str, room_name: Option<&str>, display_name: Option<&str>) -> i64 {
            self.conn
                .execute(
                    "INSERT INTO chat (chat_identifier, room_name, display_name) VALUES (?1, ?2, ?3)",
                    params![identifier, room_name, display_name],
                )
                .unwrap();
            self.conn.last_insert_rowid()
        }

        pub fn join_chat_handle(&self, chat_id: i64, handle_id: i64) {
            self.conn
                .execute(
                    "INSERT INTO chat_handle_join (chat_id, handle_id) VALUES (?1, ?2)",
                    params![chat_id, handle_id],
                )
                .unwrap();
        }

        pub fn message(&self, date: i64, text: Option<&str>, handle_id: i64, is_from_me: bool) -> i64 {
            self.message_full(date, text, None, handle_id, is_from_me, None)
        }

        pub fn message_full(
            &self,
            date: i64,
            text: Option<&str>,
            attributed_body: Option<&[u8]>,
            handle_id: i64,
            is_from_me: bool,
            room_name: Option<&str>,
        ) -> i64 {
            self.conn
                .execute(
                    "INSERT INTO message (date, text, attributedBody, is_from_me, handle_id, cache_roomnames)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![date, text, attributed_body, is_from_me as i64, handle_id, room_name],
                )
                .unwrap();
            self.conn.last_insert_rowid()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::MessagesDb;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_handles_for_phone_unions_protocols() {
        let dir = TempDir::new().unwrap();
        let db = MessagesDb::create(dir.path());
        let imessage = db.handle("+15551234567", "iMessage");
        let sms = db.handle("5551234567", "SMS");
        db.handle("+15559999999", "iMessage");

        let store = Store::messages(&db.path);
        let set = handles_for_phone(&store, "(555) 123-4567").unwrap();
        assert_eq!(set.ids(), &[imessage, sms]);
    }

    #[test]
    fn test_handles_for_address_is_exact() {
        let dir = TempDir::new().unwrap();
        let db = MessagesDb::create(dir.path());
        let alice = db.handle("alice@example.com", "iMessage");
        db.handle("malice@example.com", "iMessage");

        let store = Store::messages(&db.path);
        assert_eq!(handles_for_address(&store, "alice@example.com").unwrap().ids(), &[alice]);
        assert!(handles_for_address(&store, "bob@example.com").unwrap().is_empty());
    }

    #[test]
    fn test_messages_since_filters_and_orders() {
        let dir = TempDir::new().unwrap();
        let db = MessagesDb::create(dir.path());
        let a = db.handle("+15551234567", "iMessage");
        let b = db.handle("+15550000000", "iMessage");
        db.message(100, Some("old"), a, false);
        db.message(300, Some("newest"), a, true);
        db.message(200, Some("middle"), b, false);

        let store = Store::messages(&db.path);
        let all = messages_since(&store, 150, 10, None).unwrap();
        let texts: Vec<_> = all.iter().map(|m| m.text.clone().unwrap()).collect();
        assert_eq!(texts, vec!["newest", "middle"]);
        assert!(all[0].is_from_me);
        assert_eq!(all[1].handle_id.as_deref(), Some("+15550000000"));

        let only_a = messages_since(&store, 0, 10, Some(&HandleSet::new(vec![a]))).unwrap();
        assert_eq!(only_a.len(), 2);

        let capped = messages_since(&store, 0, 1, None).unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_chat_mapping_skips_unnamed() {
        let dir = TempDir::new().unwrap();
        let db = MessagesDb::create(dir.path());
        db.chat("chat111", Some("chat111"), Some("Climbing Crew"));
        db.chat("chat222", Some("chat222"), Some(""));
        db.chat("+15551234567", None, None);

        let mapping = chat_mapping(&Store::messages(&db.path)).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("chat111").map(String::as_str), Some("Climbing Crew"));
    }

    #[test]
    fn test_chat_display_name_for_handle() {
        let dir = TempDir::new().unwrap();
        let db = MessagesDb::create(dir.path());
        let h = db.handle("+15551234567", "iMessage");
        let chat = db.chat("chat1", Some("chat1"), Some("Family"));
        db.join_chat_handle(chat, h);

        let store = Store::messages(&db.path);
        assert_eq!(
            chat_display_name_for_handle(&store, "+15551234567").unwrap(),
            Some("Family".to_string())
        );
        assert_eq!(chat_display_name_for_handle(&store, "+1000").unwrap(), None);
    }
}
