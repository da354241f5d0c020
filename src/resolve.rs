//! Contact selector resolution shared by retrieval and dispatch.
//!
//! A selector is tried, in order, as a `contact:N` selection, an address
//! (contains `@`), a phone number, and finally a contact name.

use chrono::{DateTime, Utc};

use crate::contacts::{ContactDirectory, ContactMatch};
use crate::db::connection::Store;
use crate::db::helpers::{self, HandleSet};
use crate::disambiguation::{parse_selection, Disambiguation};
use crate::error::{MessagesError, Result};
use crate::phone;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Select(usize),
    Address(String),
    Phone(String),
    Name(String),
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MessagesError::InvalidInput("Contact cannot be empty.".to_string()));
        }
        if let Some(selection) = parse_selection(input) {
            return selection.map(Selector::Select);
        }
        if input.contains('@') {
            return Ok(Selector::Address(input.to_string()));
        }
        if phone::is_phone_shaped(input) {
            return Ok(Selector::Phone(input.to_string()));
        }
        Ok(Selector::Name(input.to_string()))
    }
}

/// A single resolved person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Address { address: String, name: Option<String> },
    /// `number` is in send form: digits, with a leading `+` when one was given.
    Phone { number: String, name: Option<String> },
}

impl Target {
    /// Raw address or number.
    pub fn handle(&self) -> &str {
        match self {
            Target::Address { address, .. } => address,
            Target::Phone { number, .. } => number,
        }
    }

    /// Contact name when known, else the raw handle.
    pub fn display(&self) -> &str {
        match self {
            Target::Address { name: Some(name), .. } | Target::Phone { name: Some(name), .. } => name,
            _ => self.handle(),
        }
    }

    /// All message-store handles belonging to this target.
    pub fn handles(&self, store: &Store) -> Result<HandleSet> {
        let set = match self {
            Target::Address { address, .. } => helpers::handles_for_address(store, address)?,
            Target::Phone { number, .. } => helpers::handles_for_phone(store, number)?,
        };
        Ok(set)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Target),
    /// Numbered prompt; the matches are now pending selection.
    Ambiguous(String),
}

/// A selector looked up without deciding what to do about several hits.
enum Lookup {
    Found(Target),
    /// Two or more name matches, best first.
    Candidates { query: String, matches: Vec<ContactMatch> },
}

fn lookup(
    input: &str,
    directory: &mut ContactDirectory,
    disambiguation: &mut Disambiguation,
    now: DateTime<Utc>,
) -> Result<Lookup> {
    let target = match Selector::parse(input)? {
        Selector::Select(index) => {
            let chosen = disambiguation.select(index)?;
            tracing::debug!(index, phone = %chosen.phone, "selection resolved");
            Target::Phone {
                number: chosen.phone,
                name: Some(chosen.name),
            }
        }
        Selector::Address(address) => Target::Address { address, name: None },
        Selector::Phone(raw) => Target::Phone {
            name: directory.name_for_handle(&raw, now),
            number: phone::send_form(&raw),
        },
        Selector::Name(query) => {
            let mut matches = directory.find_by_name(&query, now);
            match matches.len() {
                0 => {
                    return Err(MessagesError::NotFound(format!(
                        "No contacts found matching '{}'.",
                        query
                    )))
                }
                1 => matched_target(matches.swap_remove(0)),
                _ => return Ok(Lookup::Candidates { query, matches }),
            }
        }
    };
    Ok(Lookup::Found(target))
}

fn matched_target(best: ContactMatch) -> Target {
    Target::Phone {
        number: best.phone,
        name: Some(best.name),
    }
}

/// Resolve a selector to a target, or list several name hits and leave them
/// pending selection.
pub fn resolve(
    input: &str,
    directory: &mut ContactDirectory,
    disambiguation: &mut Disambiguation,
    now: DateTime<Utc>,
) -> Result<Resolution> {
    match lookup(input, directory, disambiguation, now)? {
        Lookup::Found(target) => Ok(Resolution::Resolved(target)),
        Lookup::Candidates { query, matches } => {
            Ok(Resolution::Ambiguous(disambiguation.offer(&query, matches)))
        }
    }
}

/// Resolve a selector to a target, taking the best of several name hits.
/// Pending state is left untouched unless the input is itself a selection.
pub fn resolve_best(
    input: &str,
    directory: &mut ContactDirectory,
    disambiguation: &mut Disambiguation,
    now: DateTime<Utc>,
) -> Result<Target> {
    match lookup(input, directory, disambiguation, now)? {
        Lookup::Found(target) => Ok(target),
        Lookup::Candidates { mut matches, .. } => Ok(matched_target(matches.swap_remove(0))),
    }
}

/// A group chat to send to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTarget {
    /// Identifier passed to Messages.app.
    pub chat_id: String,
    pub display: String,
}

/// Map a room identifier or group display name to a chat.
///
/// Unknown input is passed through as the identifier; Messages.app makes the
/// final call.
pub fn resolve_group(store: &Store, input: &str) -> GroupTarget {
    let input = input.trim();
    let chats = match helpers::group_chats(store) {
        Ok(chats) => chats,
        Err(e) => {
            tracing::warn!(error = %e, "group lookup unavailable, using identifier as given");
            Vec::new()
        }
    };

    let by_id = chats.iter().find(|chat| {
        chat.chat_identifier.as_deref() == Some(input) || chat.room_name.as_deref() == Some(input)
    });
    let by_name = || {
        chats.iter().find(|chat| {
            chat.display_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(input))
        })
    };

    match by_id.or_else(by_name) {
        Some(chat) => {
            let chat_id = chat
                .chat_identifier
                .clone()
                .or_else(|| chat.room_name.clone())
                .unwrap_or_else(|| input.to_string());
            let display = chat
                .display_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| chat_id.clone());
            GroupTarget { chat_id, display }
        }
        None => GroupTarget {
            chat_id: input.to_string(),
            display: input.to_string(),
        },
    }
}
