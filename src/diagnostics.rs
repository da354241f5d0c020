//! Access diagnostics for the Messages store and the AddressBook sources.
//!
//! Uses the same failure classification as every query, so the report only
//! suggests Full Disk Access when the file exists but can't be read.

use serde::Serialize;

use crate::contacts::manager::{process_contacts, AddressBookSource, ContactSource};
use crate::db::connection::Store;
use crate::db::queries;
use crate::error::{StoreError, FULL_DISK_ACCESS_HINT};

const MESSAGES_TABLES: &[&str] = &["message", "handle", "chat"];
const ADDRESSBOOK_TABLES: &[&str] = &["ZABCDRECORD", "ZABCDPHONENUMBER"];

#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub path: String,
    pub readable: bool,
    pub tables: Vec<String>,
    pub missing_tables: Vec<String>,
    /// Row count of the store's primary table, when it could be read.
    pub records: Option<i64>,
    pub permission_denied: bool,
    pub error: Option<String>,
}

impl StoreStatus {
    fn probe(store: &Store, required: &[&str], count_sql: Option<&str>) -> Self {
        let mut status = StoreStatus {
            path: store.path().display().to_string(),
            readable: false,
            tables: Vec::new(),
            missing_tables: Vec::new(),
            records: None,
            permission_denied: false,
            error: None,
        };

        let tables = match store.check_readable().and_then(|_| store.table_names()) {
            Ok(tables) => tables,
            Err(e) => {
                status.fail(e);
                return status;
            }
        };

        status.readable = true;
        status.missing_tables = required
            .iter()
            .filter(|name| !tables.iter().any(|t| t == *name))
            .map(|name| name.to_string())
            .collect();
        status.tables = tables;

        if let (Some(sql), true) = (count_sql, status.missing_tables.is_empty()) {
            match store.query(sql, [], |row| row.get::<_, i64>(0)) {
                Ok(counts) => status.records = counts.into_iter().next(),
                Err(e) => status.fail(e),
            }
        }
        status
    }

    fn fail(&mut self, err: StoreError) {
        self.permission_denied = err.is_permission_denied();
        self.error = Some(err.to_string());
    }

    fn ok(&self) -> bool {
        self.readable && self.missing_tables.is_empty() && self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessReport {
    pub messages: StoreStatus,
    pub addressbook_root: String,
    pub addressbook: Vec<StoreStatus>,
    /// Contacts with a phone number and a name.
    pub contacts: usize,
}

impl AccessReport {
    pub fn gather(messages: &Store, addressbook: &AddressBookSource, addressbook_root: &str) -> Self {
        let sources = addressbook
            .database_paths()
            .iter()
            .map(|path| {
                StoreStatus::probe(
                    &Store::addressbook(path),
                    ADDRESSBOOK_TABLES,
                    Some(queries::ADDRESSBOOK_RECORD_COUNT),
                )
            })
            .collect();

        let contacts = match addressbook.load() {
            Ok(records) => process_contacts(records).len(),
            Err(e) => {
                tracing::debug!(error = %e, "contact load failed during access check");
                0
            }
        };

        Self {
            messages: StoreStatus::probe(messages, MESSAGES_TABLES, None),
            addressbook_root: addressbook_root.to_string(),
            addressbook: sources,
            contacts,
        }
    }

    pub fn ok(&self) -> bool {
        self.messages.ok() && !self.addressbook.is_empty() && self.addressbook.iter().all(StoreStatus::ok)
    }

    fn needs_full_disk_access(&self) -> bool {
        self.messages.permission_denied || self.addressbook.iter().any(|s| s.permission_denied)
    }

    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        lines.push("Messages database:".to_string());
        describe(&mut lines, &self.messages);

        lines.push(String::new());
        if self.addressbook.is_empty() {
            lines.push(format!(
                "ERROR: No AddressBook database files found under {}",
                self.addressbook_root
            ));
        } else {
            lines.push(format!(
                "Found {} AddressBook database files:",
                self.addressbook.len()
            ));
            for source in &self.addressbook {
                describe(&mut lines, source);
                if let Some(count) = source.records {
                    lines.push(format!("  Database contains {} contacts", count));
                }
            }
        }

        if self.contacts > 0 {
            lines.push(format!(
                "Successfully retrieved {} contacts with phone numbers",
                self.contacts
            ));
        } else {
            lines.push("WARNING: No contacts with phone numbers found.".to_string());
        }

        if self.needs_full_disk_access() {
            lines.push(String::new());
            lines.push(FULL_DISK_ACCESS_HINT.to_string());
        }
        lines.join("\n")
    }
}

fn describe(lines: &mut Vec<String>, status: &StoreStatus) {
    lines.push(format!(" - {}", status.path));
    if let Some(error) = &status.error {
        lines.push(format!("  ERROR: {}", error));
        if !status.readable {
            return;
        }
    }
    lines.push("  File is readable".to_string());
    if status.missing_tables.is_empty() {
        lines.push("  Required tables are present".to_string());
    } else {
        lines.push(format!(
            "  WARNING: Some required tables are missing: {}",
            status.missing_tables.join(", ")
        ));
    }
}
