//! Reading commands: recent, search, latest.
//!
//! CHANGELOG:
//! - 10/19/2026 - Time-windowed retrieval, fuzzy search and latest-message lookup
//! - 01/10/2026 - Initial stub implementation

use anyhow::Result;
use serde_json::json;

use super::finish;
use crate::output::OutputControls;
use crate::session::MessagesSession;

/// Messages from the last `hours`, optionally for one contact.
pub fn recent(
    session: &mut MessagesSession,
    hours: i64,
    contact: Option<&str>,
    output: &OutputControls,
) -> Result<()> {
    finish(output, "messages", session.try_get_recent_messages(hours, contact))
}

/// Messages whose text fuzzily matches `term`, best first.
pub fn search(
    session: &mut MessagesSession,
    term: &str,
    hours: i64,
    threshold: f64,
    output: &OutputControls,
) -> Result<()> {
    finish(
        output,
        "results",
        session.try_fuzzy_search_messages(term, hours, threshold),
    )
}

/// Newest message exchanged with a contact.
///
/// Finding nothing is not a failure: JSON callers poll this and get
/// `{"ok": false, "error": "No message found"}`.
pub fn latest(
    session: &mut MessagesSession,
    contact: &str,
    hours: i64,
    output: &OutputControls,
) -> Result<()> {
    match session.try_get_latest_message_from_contact(contact, hours) {
        Ok(Some(message)) => {
            if output.json {
                output.print(&json!({
                    "ok": true,
                    "body": message.body,
                    "is_from_me": message.is_from_me,
                    "date": message.date,
                }));
            } else {
                let who = if message.is_from_me { "You" } else { contact };
                println!("[{}] {}: {}", message.date, who, message.body);
            }
            Ok(())
        }
        Ok(None) => {
            if output.json {
                output.print(&json!({"ok": false, "error": "No message found"}));
            } else {
                println!("No message found");
            }
            Ok(())
        }
        Err(e) => {
            output.print_error(e.code(), &e.to_string());
            Err(e.into())
        }
    }
}
