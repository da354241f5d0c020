//! Time-windowed message retrieval and fuzzy message search.
//!
//! Output lines look like `[2025-01-01 09:30:00] [Group] Sender: body`.
//! Retrieval is newest first; search is ordered by score.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::contacts::{fuzzy, ContactDirectory};
use crate::db::blob_parser::BodyDecoder;
use crate::db::connection::Store;
use crate::db::helpers::{self, ChatMapping, HandleSet, Message};
use crate::db::queries;
use crate::error::{MessagesError, Result};
use crate::phone;
use crate::resolve::Target;

/// Default minimum score for message search.
pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.6;

/// Ten years, in hours.
pub const MAX_HOURS: i64 = 10 * 365 * 24;

pub fn validate_hours(hours: i64) -> Result<()> {
    if hours < 0 {
        return Err(MessagesError::InvalidInput(
            "Hours cannot be negative. Please provide a positive number.".to_string(),
        ));
    }
    if hours > MAX_HOURS {
        return Err(MessagesError::InvalidInput(format!(
            "Hours value too large. Maximum allowed is {} hours (10 years).",
            MAX_HOURS
        )));
    }
    Ok(())
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(MessagesError::InvalidInput(
            "Threshold must be between 0.0 and 1.0.".to_string(),
        ));
    }
    Ok(())
}

/// Most recent message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestMessage {
    pub body: String,
    pub is_from_me: bool,
    pub date: String,
}

/// Text of a message: the plain column, else the decoded rich payload.
pub fn message_body(message: &Message, decoder: &dyn BodyDecoder) -> Option<String> {
    if let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) {
        return Some(text.to_string());
    }
    let blob = message.attributed_body.as_deref()?;
    let decoded = decoder.decode(blob);
    if decoded.is_none() {
        tracing::debug!(rowid = message.rowid, decoder = decoder.version(), "skipping undecodable message body");
    }
    decoded
}

/// Explains why a target has no handles.
pub fn missing_handles_message(store: &Store, target: &Target) -> String {
    let raw = target.handle();
    let fragment = match target {
        Target::Address { address, .. } => address.clone(),
        Target::Phone { number, .. } => phone::normalize(number),
    };

    match helpers::count_messages_like_handle(store, &fragment) {
        Ok(0) => format!("No message history found with '{}'.", raw),
        _ => format!(
            "Could not find any messages with contact '{}'. Verify the phone number or email is correct.",
            raw
        ),
    }
}

/// Reads messages and puts names on them.
pub struct Retriever<'a> {
    store: &'a Store,
    directory: &'a mut ContactDirectory,
    decoder: &'a dyn BodyDecoder,
    now: DateTime<Utc>,
    chats: Option<ChatMapping>,
    chat_names: HashMap<String, Option<String>>,
}

impl<'a> Retriever<'a> {
    pub fn new(
        store: &'a Store,
        directory: &'a mut ContactDirectory,
        decoder: &'a dyn BodyDecoder,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            store,
            directory,
            decoder,
            now,
            chats: None,
            chat_names: HashMap::new(),
        }
    }

    fn group_name(&mut self, room: Option<&str>) -> Option<String> {
        let room = room?;
        let store = self.store;
        let chats = self.chats.get_or_insert_with(|| {
            helpers::chat_mapping(store).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "chat names unavailable");
                ChatMapping::new()
            })
        });
        chats.get(room).cloned()
    }

    /// "You", a contact name, the conversation's display name, or the raw handle.
    fn sender(&mut self, message: &Message) -> String {
        if message.is_from_me {
            return "You".to_string();
        }
        let Some(handle) = message.handle_id.as_deref() else {
            return "Unknown".to_string();
        };
        if let Some(name) = self.directory.name_for_handle(handle, self.now) {
            return name;
        }

        // Any named chat the handle belongs to, groups included, so a direct
        // message from an unknown number can carry a group's name.
        let store = self.store;
        let chat_name = self
            .chat_names
            .entry(handle.to_string())
            .or_insert_with(|| {
                helpers::chat_display_name_for_handle(store, handle).unwrap_or_else(|e| {
                    tracing::debug!(handle, error = %e, "chat display name lookup failed");
                    None
                })
            })
            .clone();
        chat_name.unwrap_or_else(|| handle.to_string())
    }

    fn format(&mut self, message: &Message, body: &str, score: Option<f64>) -> String {
        let mut prefix = format!("[{}]", queries::cocoa_to_display(message.date));
        if let Some(score) = score {
            prefix.push_str(&format!(" (Score: {:.2})", score));
        }
        if let Some(group) = self.group_name(message.room_name.as_deref()) {
            prefix.push_str(&format!(" [{}]", group));
        }
        format!("{} {}: {}", prefix, self.sender(message), body)
    }

    /// Formatted lines for messages in the last `hours`, newest first.
    pub fn recent(&mut self, hours: i64, handles: Option<&HandleSet>, limit: u32) -> Result<Vec<String>> {
        let since = queries::hours_ago_cocoa(self.now, hours);
        let messages = helpers::messages_since(self.store, since, limit, handles)?;

        let mut lines = Vec::with_capacity(messages.len());
        for message in &messages {
            let Some(body) = message_body(message, self.decoder) else {
                continue;
            };
            lines.push(self.format(message, &body, None));
        }
        Ok(lines)
    }

    /// Newest decodable message in the window.
    pub fn latest(&mut self, hours: i64, handles: &HandleSet, limit: u32) -> Result<Option<LatestMessage>> {
        let since = queries::hours_ago_cocoa(self.now, hours);
        let messages = helpers::messages_since(self.store, since, limit, Some(handles))?;

        Ok(messages.iter().find_map(|message| {
            message_body(message, self.decoder).map(|body| LatestMessage {
                body,
                is_from_me: message.is_from_me,
                date: queries::cocoa_to_display(message.date),
            })
        }))
    }

    /// Score every message in the window against `term`; best first.
    pub fn search(&mut self, term: &str, hours: i64, threshold: f64, window: u32) -> Result<String> {
        let since = queries::hours_ago_cocoa(self.now, hours);
        let messages = helpers::messages_since(self.store, since, window, None)?;
        if messages.is_empty() {
            return Ok(format!("No messages found in the last {} hours to search.", hours));
        }

        let candidates: Vec<(String, &Message)> = messages
            .iter()
            .filter_map(|m| {
                message_body(m, self.decoder)
                    .filter(|body| !body.trim().is_empty())
                    .map(|body| (body, m))
            })
            .collect();
        if candidates.is_empty() {
            return Ok(format!(
                "No message content found to search in the last {} hours.",
                hours
            ));
        }

        let mut scored: Vec<(f64, String, &Message)> = candidates
            .into_iter()
            .map(|(body, m)| (fuzzy::weighted_ratio(term, &body) / 100.0, body, m))
            .filter(|(score, _, _)| *score >= threshold)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        if scored.is_empty() {
            return Ok(format!(
                "No messages found matching '{}' with a threshold of {} in the last {} hours.",
                term, threshold, hours
            ));
        }

        let lines: Vec<String> = scored
            .iter()
            .map(|(score, body, message)| self.format(message, body, Some(*score)))
            .collect();
        Ok(format!(
            "Found {} messages matching '{}':\n{}",
            lines.len(),
            term,
            lines.join("\n")
        ))
    }
}
