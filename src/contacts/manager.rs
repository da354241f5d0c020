//! Contact directory - phone to name map built from the macOS AddressBook.
//!
//! The map is built lazily and cached for a fixed TTL. Every
//! `Sources/*/AddressBook-v22.abcddb` is read and unioned; when none of them
//! yields rows through SQLite, the `sqlite3` command-line tool is tried over
//! the same files before giving up.
//!
//! CHANGELOG:
//! - 10/19/2026 - AddressBook sources, TTL cache, nickname-aware fuzzy lookup
//! - 01/10/2026 - Added fuzzy matching with score threshold
//! - 01/10/2026 - Initial stub

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::fuzzy;
use crate::db::connection::Store;
use crate::db::queries;
use crate::error::{MessagesError, Result};
use crate::phone;

/// AddressBook database file name inside each source directory.
pub const ADDRESSBOOK_FILE: &str = "AddressBook-v22.abcddb";

/// Trailing metadata some exports append to phone values.
const IMAGE_METADATA_MARKER: &str = "X-IMAGETYPE";

// ============================================================================
// Data Structures
// ============================================================================

/// One raw row from an address-book store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactRecord {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A contact keyed by its normalized phone number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub phone: String,
    /// First and last name joined by a space.
    pub name: String,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
}

/// A fuzzy lookup hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMatch {
    pub name: String,
    pub phone: String,
    pub score: f64,
    /// The name or nickname that produced the score.
    pub matched_on: String,
}

// ============================================================================
// Sources
// ============================================================================

/// Where contact rows come from.
pub trait ContactSource: Send {
    fn load(&self) -> Result<Vec<ContactRecord>>;
}

/// Runs a read-only query through an external SQLite client, returning its
/// JSON output.
pub trait SqliteJsonRunner: Send {
    fn run(&self, path: &Path, sql: &str) -> anyhow::Result<String>;
}

/// The `sqlite3` command-line tool in JSON mode.
pub struct SqliteCli;

impl SqliteJsonRunner for SqliteCli {
    fn run(&self, path: &Path, sql: &str) -> anyhow::Result<String> {
        let output = Command::new("sqlite3")
            .arg("-readonly")
            .arg("-json")
            .arg(path)
            .arg(sql)
            .output()?;

        if !output.status.success() {
            anyhow::bail!("{}", String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The user's AddressBook directory.
pub struct AddressBookSource {
    root: PathBuf,
    cli: Box<dyn SqliteJsonRunner>,
}

impl AddressBookSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cli: Box::new(SqliteCli),
        }
    }

    /// Replace the client used when direct reads yield nothing.
    pub fn with_cli(mut self, cli: Box<dyn SqliteJsonRunner>) -> Self {
        self.cli = cli;
        self
    }

    /// Every `Sources/*/AddressBook-v22.abcddb` that exists, sorted.
    pub fn database_paths(&self) -> Vec<PathBuf> {
        let sources = self.root.join("Sources");
        let Ok(entries) = std::fs::read_dir(&sources) else {
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().join(ADDRESSBOOK_FILE))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        paths
    }

    fn load_direct(&self, paths: &[PathBuf]) -> Vec<ContactRecord> {
        let mut records = Vec::new();
        for path in paths {
            let store = Store::addressbook(path);
            match store.query(queries::ADDRESSBOOK_CONTACTS, [], |row| {
                Ok(ContactRecord {
                    first_name: row.get(0)?,
                    last_name: row.get(1)?,
                    nickname: row.get(2)?,
                    phone: row.get(3)?,
                })
            }) {
                Ok(rows) => records.extend(rows),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping AddressBook source"),
            }
        }
        records
    }

    /// `sqlite3 -readonly -json` over each source.
    fn load_via_cli(&self, paths: &[PathBuf]) -> Vec<ContactRecord> {
        let mut records = Vec::new();
        for path in paths {
            match self
                .cli
                .run(path, queries::ADDRESSBOOK_CONTACTS)
                .and_then(|stdout| parse_json_rows(&stdout))
            {
                Ok(rows) => records.extend(rows),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "sqlite3 fallback failed"),
            }
        }
        records
    }
}

impl ContactSource for AddressBookSource {
    fn load(&self) -> Result<Vec<ContactRecord>> {
        let paths = self.database_paths();
        if paths.is_empty() {
            return Err(MessagesError::NotFound(format!(
                "No AddressBook sources found under {}",
                self.root.join("Sources").display()
            )));
        }

        let records = self.load_direct(&paths);
        if !records.is_empty() {
            return Ok(records);
        }

        tracing::info!(sources = paths.len(), "no rows via SQLite, trying sqlite3 tool");
        let records = self.load_via_cli(&paths);
        if records.is_empty() {
            tracing::warn!("AddressBook yielded no contacts");
        }
        Ok(records)
    }
}

/// `sqlite3 -json` prints nothing at all for an empty result.
fn parse_json_rows(stdout: &str) -> anyhow::Result<Vec<ContactRecord>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(stdout)?)
}

// ============================================================================
// Processing
// ============================================================================

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("").trim().to_string()
}

/// Turn raw rows into a map keyed by normalized phone.
///
/// Rows without a phone or without any name are skipped. A later row for the
/// same phone replaces an earlier one.
pub fn process_contacts(records: Vec<ContactRecord>) -> BTreeMap<String, Contact> {
    let mut contacts = BTreeMap::new();

    for record in records {
        let Some(raw_phone) = record.phone.as_deref() else {
            continue;
        };
        let raw_phone = raw_phone
            .split(IMAGE_METADATA_MARKER)
            .next()
            .unwrap_or(raw_phone);

        let first_name = trimmed(&record.first_name);
        let last_name = trimmed(&record.last_name);
        let name = [first_name.as_str(), last_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            continue;
        }

        let normalized = phone::normalize(raw_phone);
        if normalized.is_empty() {
            continue;
        }

        contacts.insert(
            normalized.clone(),
            Contact {
                phone: normalized,
                name,
                nickname: trimmed(&record.nickname),
                first_name,
                last_name,
            },
        );
    }

    contacts
}

// ============================================================================
// Directory
// ============================================================================

struct CacheEntry {
    built_at: DateTime<Utc>,
    contacts: BTreeMap<String, Contact>,
}

/// TTL-cached contact map with fuzzy lookup.
pub struct ContactDirectory {
    source: Box<dyn ContactSource>,
    ttl: Duration,
    threshold: f64,
    cache: Option<CacheEntry>,
}

impl ContactDirectory {
    pub fn new(source: Box<dyn ContactSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            threshold: fuzzy::DEFAULT_THRESHOLD,
            cache: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match &self.cache {
            None => true,
            Some(entry) => {
                let elapsed_ms = (now - entry.built_at).num_milliseconds();
                elapsed_ms > self.ttl.as_millis() as i64
            }
        }
    }

    /// The contact map, rebuilt when more than the TTL has passed since the last build.
    ///
    /// A failed build caches an empty map so the store isn't hammered until
    /// the TTL lapses again.
    pub fn contacts(&mut self, now: DateTime<Utc>) -> &BTreeMap<String, Contact> {
        if self.is_stale(now) {
            let contacts = match self.source.load() {
                Ok(records) => process_contacts(records),
                Err(e) => {
                    tracing::warn!(error = %e, "contact directory unavailable");
                    BTreeMap::new()
                }
            };
            tracing::debug!(count = contacts.len(), "contact cache rebuilt");
            self.cache = Some(CacheEntry {
                built_at: now,
                contacts,
            });
        }

        static EMPTY: BTreeMap<String, Contact> = BTreeMap::new();
        self.cache.as_ref().map(|entry| &entry.contacts).unwrap_or(&EMPTY)
    }

    /// Display name for a message-store handle, trying the raw digits and
    /// the with/without country code variants.
    pub fn name_for_handle(&mut self, handle: &str, now: DateTime<Utc>) -> Option<String> {
        let normalized = phone::normalize(handle);
        if normalized.is_empty() {
            return None;
        }
        let contacts = self.contacts(now);
        phone::lookup_variants(&normalized)
            .iter()
            .find_map(|variant| contacts.get(variant).map(|c| c.name.clone()))
    }

    /// Contacts whose full name or nickname fuzzily matches `query`, best
    /// first, one entry per phone.
    pub fn find_by_name(&mut self, query: &str, now: DateTime<Utc>) -> Vec<ContactMatch> {
        let threshold = self.threshold;
        let contacts = self.contacts(now);

        let mut candidates: Vec<(String, &Contact)> = Vec::new();
        for contact in contacts.values() {
            candidates.push((contact.name.clone(), contact));
            if !contact.nickname.is_empty() {
                candidates.push((contact.nickname.clone(), contact));
            }
        }

        let mut best: BTreeMap<&str, ContactMatch> = BTreeMap::new();
        for hit in fuzzy::fuzzy_match(query, candidates, threshold) {
            let keep = best
                .get(hit.value.phone.as_str())
                .map_or(true, |existing| hit.score > existing.score);
            if keep {
                best.insert(
                    hit.value.phone.as_str(),
                    ContactMatch {
                        name: hit.value.name.clone(),
                        phone: hit.value.phone.clone(),
                        score: hit.score,
                        matched_on: hit.candidate,
                    },
                );
            }
        }

        let mut matches: Vec<ContactMatch> = best.into_values().collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        matches
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! AddressBook-v22 schema subset for store-backed tests.

    use rusqlite::{params, Connection};
    use std::path::{Path, PathBuf};

    pub struct AddressBookDb {
        pub path: PathBuf,
        conn: Connection,
    }

    impl AddressBookDb {
        /// Creates `<root>/Sources/<source>/AddressBook-v22.abcddb`.
        pub fn create(root: &Path, source: &str) -> Self {
            let dir = root.join("Sources").join(source);
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join(super::ADDRESSBOOK_FILE);
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE ZABCDRECORD (
                     Z_PK INTEGER PRIMARY KEY, ZFIRSTNAME TEXT, ZLASTNAME TEXT, ZNICKNAME TEXT
                 );
                 CREATE TABLE ZABCDPHONENUMBER (
                     Z_PK INTEGER PRIMARY KEY, ZOWNER INTEGER, ZFULLNUMBER TEXT, ZORDERINGINDEX INTEGER
                 );",
            )
            .unwrap();
            Self { path, conn }
        }

        pub fn person(&self, first: Option<&str>, last: Option<&str>, nickname: Option<&str>, phone: &str) {
            self.conn
                .execute(
                    "INSERT INTO ZABCDRECORD (ZFIRSTNAME, ZLASTNAME, ZNICKNAME) VALUES (?1, ?2, ?3)",
                    params![first, last, nickname],
                )
                .unwrap();
            let owner = self.conn.last_insert_rowid();
            self.conn
                .execute(
                    "INSERT INTO ZABCDPHONENUMBER (ZOWNER, ZFULLNUMBER, ZORDERINGINDEX) VALUES (?1, ?2, 0)",
                    params![owner, phone],
                )
                .unwrap();
        }
    }
}
