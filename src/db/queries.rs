//! SQL for Messages.db and AddressBook, plus store-epoch conversions.
//!
//! CHANGELOG:
//! - 10/19/2026 - Replaced analytics queries with retrieval/handle/address-book set
//! - 01/10/2026 - Initial stub with query constants

use chrono::{DateTime, Local, TimeZone, Utc};

// ============================================================================
// MESSAGE STORE
// ============================================================================

/// Messages newer than ?1 (store-epoch nanoseconds), newest first, capped at ?2.
/// The handle-filtered variant is built by [`messages_for_handles_sql`].
pub const MESSAGES_SINCE: &str = r#"
SELECT
    m.ROWID,
    m.date,
    m.text,
    m.attributedBody,
    m.is_from_me,
    h.id as handle_id,
    m.cache_roomnames
FROM message m
LEFT JOIN handle h ON m.handle_id = h.ROWID
WHERE m.date > ?1
ORDER BY m.date DESC
LIMIT ?2
"#;

/// Same as [`MESSAGES_SINCE`] restricted to a set of handle ROWIDs bound from ?3 on.
pub fn messages_for_handles_sql(handle_count: usize) -> String {
    let placeholders = (0..handle_count)
        .map(|i| format!("?{}", i + 3))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
SELECT
    m.ROWID,
    m.date,
    m.text,
    m.attributedBody,
    m.is_from_me,
    h.id as handle_id,
    m.cache_roomnames
FROM message m
LEFT JOIN handle h ON m.handle_id = h.ROWID
WHERE m.date > ?1
  AND m.handle_id IN ({})
ORDER BY m.date DESC
LIMIT ?2
"#,
        placeholders
    )
}

/// Handle ROWIDs whose id is any of the bound values.
pub fn handles_by_ids_sql(id_count: usize) -> String {
    let placeholders = (0..id_count)
        .map(|i| format!("?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT ROWID FROM handle WHERE id IN ({}) ORDER BY ROWID", placeholders)
}

/// Handle ROWID for an exact address match.
pub const HANDLE_BY_ADDRESS: &str = r#"
SELECT ROWID FROM handle WHERE id = ?1 ORDER BY ROWID
"#;

/// Count messages whose handle id contains ?1 (diagnostic probe).
pub const MESSAGE_COUNT_LIKE_HANDLE: &str = r#"
SELECT COUNT(*)
FROM message m
JOIN handle h ON m.handle_id = h.ROWID
WHERE h.id LIKE '%' || ?1 || '%'
"#;

/// Room name to display name for every chat.
pub const CHAT_MAPPING: &str = r#"
SELECT room_name, display_name FROM chat
"#;

/// Group chats with their identifiers, for targeting groups by name.
pub const GROUP_CHATS: &str = r#"
SELECT chat_identifier, room_name, display_name
FROM chat
WHERE room_name IS NOT NULL OR chat_identifier LIKE 'chat%'
"#;

/// Display name of any chat the handle participates in.
pub const CHAT_DISPLAY_NAME_FOR_HANDLE: &str = r#"
SELECT c.display_name
FROM handle h
JOIN chat_handle_join chj ON h.ROWID = chj.handle_id
JOIN chat c ON chj.chat_id = c.ROWID
WHERE h.id = ?1
  AND c.display_name IS NOT NULL
  AND c.display_name != ''
LIMIT 1
"#;

// ============================================================================
// ADDRESS BOOK
// ============================================================================

/// Contact names, nicknames and phone numbers.
pub const ADDRESSBOOK_CONTACTS: &str = r#"
SELECT
    ZABCDRECORD.ZFIRSTNAME as first_name,
    ZABCDRECORD.ZLASTNAME as last_name,
    ZABCDRECORD.ZNICKNAME as nickname,
    ZABCDPHONENUMBER.ZFULLNUMBER as phone
FROM
    ZABCDRECORD
    LEFT JOIN ZABCDPHONENUMBER ON ZABCDRECORD.Z_PK = ZABCDPHONENUMBER.ZOWNER
WHERE
    ZABCDPHONENUMBER.ZFULLNUMBER IS NOT NULL
ORDER BY
    ZABCDRECORD.ZLASTNAME,
    ZABCDRECORD.ZFIRSTNAME,
    ZABCDPHONENUMBER.ZORDERINGINDEX ASC
"#;

pub const ADDRESSBOOK_RECORD_COUNT: &str = "SELECT COUNT(*) FROM ZABCDRECORD";

// ============================================================================
// STORE EPOCH
// ============================================================================

/// Cocoa epoch offset (2001-01-01 in Unix time).
pub const COCOA_EPOCH_OFFSET: i64 = 978_307_200;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Stored dates below this are legacy second-resolution values.
const LEGACY_SECONDS_CEILING: i64 = 100_000_000_000;

/// Convert a stored date (nanoseconds, or legacy seconds) to Unix seconds.
pub fn cocoa_to_unix(cocoa: i64) -> i64 {
    if cocoa.abs() < LEGACY_SECONDS_CEILING {
        cocoa + COCOA_EPOCH_OFFSET
    } else {
        (cocoa / NANOS_PER_SEC) + COCOA_EPOCH_OFFSET
    }
}

/// Store-epoch nanoseconds for an instant.
pub fn datetime_to_cocoa(at: DateTime<Utc>) -> i64 {
    let secs = at.timestamp() - COCOA_EPOCH_OFFSET;
    secs.saturating_mul(NANOS_PER_SEC)
        .saturating_add(i64::from(at.timestamp_subsec_nanos()))
}

/// Store-epoch nanoseconds for `hours` before `now`.
pub fn hours_ago_cocoa(now: DateTime<Utc>, hours: i64) -> i64 {
    datetime_to_cocoa(now - chrono::Duration::hours(hours))
}

/// Stored date as a UTC instant.
pub fn cocoa_to_utc(cocoa: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(cocoa_to_unix(cocoa), 0).single()
}

/// Stored date rendered in local time as `YYYY-MM-DD HH:MM:SS`.
pub fn cocoa_to_display(cocoa: i64) -> String {
    match cocoa_to_utc(cocoa) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "Unknown date".to_string(),
    }
}
