//! Daemon service - dispatches requests to the session it owns.
//!
//! The session keeps the contact cache and the pending disambiguation
//! between requests.
//!
//! CHANGELOG:
//! - 10/19/2026 - Methods backed by MessagesSession, typed parameter errors
//! - 01/10/2026 - Implemented all command handlers (Phase 5)
//! - 01/10/2026 - Initial implementation (Phase 4C)

use serde::Serialize;
use serde_json::{json, Value};

use crate::daemon::protocol::Params;
use crate::error::{MessagesError, Result};
use crate::phone;
use crate::retrieval::DEFAULT_SEARCH_THRESHOLD;
use crate::session::MessagesSession;

const DEFAULT_HOURS: i64 = 24;

/// Daemon service holding one long-lived session.
pub struct DaemonService {
    session: MessagesSession,
    started_at: String,
}

impl DaemonService {
    pub fn new(session: MessagesSession) -> Self {
        Self {
            session,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Dispatch request to appropriate handler.
    pub fn dispatch(&mut self, method: &str, params: &Params) -> Result<Value> {
        match method {
            "health" => self.health(),
            "recent" => self.recent(params),
            "search" => self.search(params),
            "latest" => self.latest(params),
            "send" => self.send(params),
            "find_contact" => self.find_contact(params),
            "countries" => to_json(&phone::list_countries()).map(|c| json!({ "countries": c })),
            "check_access" => self.check_access(),
            _ => Err(MessagesError::InvalidInput(format!("Unknown method: {}", method))),
        }
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    fn health(&self) -> Result<Value> {
        Ok(json!({
            "pid": std::process::id(),
            "started_at": self.started_at,
            "version": "v1",
            "messages_db": self.session.config().messages_db.display().to_string(),
            "pending_selection": self.session.disambiguation().pending().len(),
        }))
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Params: hours (default 24), contact (optional)
    fn recent(&mut self, params: &Params) -> Result<Value> {
        let hours = int_param(params, "hours", DEFAULT_HOURS)?;
        let contact = optional_str(params, "contact")?;
        let messages = self.session.try_get_recent_messages(hours, contact)?;
        Ok(json!({ "messages": messages }))
    }

    /// Params: term, hours (default 24), threshold (default 0.6)
    fn search(&mut self, params: &Params) -> Result<Value> {
        let term = required_str(params, "term")?;
        let hours = int_param(params, "hours", DEFAULT_HOURS)?;
        let threshold = float_param(params, "threshold", DEFAULT_SEARCH_THRESHOLD)?;
        let results = self.session.try_fuzzy_search_messages(term, hours, threshold)?;
        Ok(json!({ "results": results }))
    }

    /// Params: contact, hours (default 24)
    fn latest(&mut self, params: &Params) -> Result<Value> {
        let contact = required_str(params, "contact")?;
        let hours = int_param(params, "hours", DEFAULT_HOURS)?;
        let message = self.session.try_get_latest_message_from_contact(contact, hours)?;
        Ok(json!({ "message": to_json(&message)? }))
    }

    // ========================================================================
    // Sending and contacts
    // ========================================================================

    /// Params: recipient, message, group (default false), dial_code (optional)
    fn send(&mut self, params: &Params) -> Result<Value> {
        let recipient = required_str(params, "recipient")?;
        let message = required_str(params, "message")?;
        let group = bool_param(params, "group")?;
        let dial_code = optional_str(params, "dial_code")?;

        let status = match (group, dial_code) {
            (true, Some(_)) => {
                return Err(MessagesError::InvalidInput(
                    "dial_code cannot be combined with group".to_string(),
                ))
            }
            (true, None) => self.session.try_send_message(recipient, message, true)?,
            (false, code) => self
                .session
                .try_send_message_with_dial_code(recipient, message, code)?,
        };
        Ok(json!({ "status": status }))
    }

    /// Params: name
    fn find_contact(&mut self, params: &Params) -> Result<Value> {
        let name = required_str(params, "name")?;
        let matches = self.session.find_contact_by_name(name);
        Ok(json!({ "count": matches.len(), "matches": to_json(&matches)? }))
    }

    fn check_access(&self) -> Result<Value> {
        let report = self.session.access_report();
        Ok(json!({ "ok": report.ok(), "report": to_json(&report)? }))
    }
}

// ============================================================================
// Parameter helpers
// ============================================================================

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| MessagesError::Unknown(e.to_string()))
}

fn invalid(key: &str, kind: &str) -> MessagesError {
    MessagesError::InvalidInput(format!("Parameter '{}' must be {}.", key, kind))
}

fn required_str<'a>(params: &'a Params, key: &str) -> Result<&'a str> {
    optional_str(params, key)?.ok_or_else(|| {
        MessagesError::InvalidInput(format!("Missing required parameter '{}'.", key))
    })
}

fn optional_str<'a>(params: &'a Params, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(key, "a string")),
    }
}

fn int_param(params: &Params, key: &str, default: i64) -> Result<i64> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v.as_i64().ok_or_else(|| invalid(key, "an integer")),
    }
}

fn float_param(params: &Params, key: &str, default: f64) -> Result<f64> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| invalid(key, "a number")),
    }
}

fn bool_param(params: &Params, key: &str) -> Result<bool> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(v) => v.as_bool().ok_or_else(|| invalid(key, "a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::contacts::manager::fixtures::AddressBookDb;
    use crate::db::helpers::fixtures::MessagesDb;
    use crate::dispatch::fakes::RecordingRunner;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        runner: RecordingRunner,
        service: DaemonService,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let db = MessagesDb::create(tmp.path());
        let ab_root = tmp.path().join("AddressBook");
        let book = AddressBookDb::create(&ab_root, "SRC1");
        book.person(Some("John"), Some("Doe"), None, "5551110000");
        book.person(Some("John"), Some("Roe"), None, "5552220000");

        let runner = RecordingRunner::default();
        let config = Config {
            messages_db: db.path.clone(),
            addressbook_dir: ab_root,
            send_pause: Duration::ZERO,
            ..Config::default()
        };
        let session = MessagesSession::new(config)
            .with_clock(Box::new(ManualClock::new(
                Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            )))
            .with_runner(Box::new(runner.clone()));

        Fixture {
            _tmp: tmp,
            runner,
            service: DaemonService::new(session),
        }
    }

    fn params(value: Value) -> Params {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_selection_survives_between_requests() {
        let mut f = fixture();

        let first = f
            .service
            .dispatch("send", &params(json!({"recipient": "john", "message": "hi"})))
            .unwrap();
        assert!(first["status"]
            .as_str()
            .unwrap()
            .starts_with("Multiple contacts found matching 'john'"));
        assert!(f.runner.scripts().is_empty());

        let health = f.service.dispatch("health", &Params::new()).unwrap();
        assert_eq!(health["pending_selection"], json!(2));

        let second = f
            .service
            .dispatch("send", &params(json!({"recipient": "contact:2", "message": "hi"})))
            .unwrap();
        assert_eq!(
            second["status"],
            json!("Message sent successfully via iMessage to John Roe [method: scripted]")
        );
        assert_eq!(f.runner.scripts().len(), 1);
    }

    #[test]
    fn test_find_contact_lists_matches() {
        let mut f = fixture();
        let result = f
            .service
            .dispatch("find_contact", &params(json!({"name": "john"})))
            .unwrap();
        assert_eq!(result["count"], json!(2));
        assert_eq!(result["matches"][0]["name"], json!("John Doe"));
    }

    #[test]
    fn test_parameter_errors() {
        let mut f = fixture();

        let err = f.service.dispatch("search", &Params::new()).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(err.to_string(), "Missing required parameter 'term'.");

        let err = f
            .service
            .dispatch("recent", &params(json!({"hours": "lots"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Parameter 'hours' must be an integer.");

        let err = f.service.dispatch("nope", &Params::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown method: nope");
    }

    #[test]
    fn test_errors_keep_their_codes() {
        let mut f = fixture();
        let err = f
            .service
            .dispatch("recent", &params(json!({"contact": "contact:1"})))
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let err = f
            .service
            .dispatch("recent", &params(json!({"hours": -1})))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_group_send_rejects_dial_code() {
        let mut f = fixture();
        let err = f
            .service
            .dispatch(
                "send",
                &params(json!({"recipient": "chat1", "message": "hi", "group": true, "dial_code": "+44"})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(f.runner.scripts().is_empty());
    }

    #[test]
    fn test_countries() {
        let mut f = fixture();
        let result = f.service.dispatch("countries", &Params::new()).unwrap();
        let countries = result["countries"].as_array().unwrap();
        assert!(countries.iter().any(|c| c["alpha2"] == json!("GB")));
    }
}
