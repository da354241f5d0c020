//! Pending contact choices between an ambiguous name lookup and a
//! `contact:N` selection.
//!
//! `Idle -> Pending -> (selected) -> Idle`. A new ambiguous lookup replaces
//! whatever was pending; nothing expires.

use crate::contacts::ContactMatch;
use crate::error::{MessagesError, Result};

/// Matches listed (and kept) per ambiguous lookup.
pub const MAX_LISTED: usize = 10;

/// Prefix of the selection syntax.
pub const SELECT_PREFIX: &str = "contact:";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Disambiguation {
    #[default]
    Idle,
    Pending(Vec<ContactMatch>),
}

impl Disambiguation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Disambiguation::Pending(_))
    }

    pub fn pending(&self) -> &[ContactMatch] {
        match self {
            Disambiguation::Idle => &[],
            Disambiguation::Pending(matches) => matches,
        }
    }

    /// Store the first [`MAX_LISTED`] matches and return the numbered prompt.
    pub fn offer(&mut self, query: &str, mut matches: Vec<ContactMatch>) -> String {
        matches.truncate(MAX_LISTED);
        let listing = matches
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {} ({})", i + 1, m.name, m.phone))
            .collect::<Vec<_>>()
            .join("\n");

        *self = Disambiguation::Pending(matches);
        format!(
            "Multiple contacts found matching '{}'. Please specify which one using 'contact:N' where N is the number:\n{}",
            query, listing
        )
    }

    /// Consume the pending set, returning the 1-based `index`th entry.
    ///
    /// An out-of-range index leaves the set pending.
    pub fn select(&mut self, index: usize) -> Result<ContactMatch> {
        let count = match self {
            Disambiguation::Idle => {
                return Err(MessagesError::NotFound(
                    "No recent contact matches available. Please search for a contact first."
                        .to_string(),
                ))
            }
            Disambiguation::Pending(matches) => matches.len(),
        };

        if index == 0 || index > count {
            return Err(MessagesError::InvalidInput(format!(
                "Invalid selection. Please choose a number between 1 and {}.",
                count
            )));
        }

        match std::mem::take(self) {
            Disambiguation::Pending(mut matches) => Ok(matches.swap_remove(index - 1)),
            Disambiguation::Idle => Err(MessagesError::Unknown("selection state lost".to_string())),
        }
    }
}

/// Parse `contact:N`. `None` when the input isn't a selection at all.
pub fn parse_selection(input: &str) -> Option<Result<usize>> {
    let trimmed = input.trim();
    let head = trimmed.get(..SELECT_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(SELECT_PREFIX) {
        return None;
    }

    let raw = trimmed[SELECT_PREFIX.len()..].trim();
    if raw.is_empty() {
        return Some(Err(MessagesError::InvalidInput(
            "Invalid contact selection format. Use 'contact:N' where N is a positive number."
                .to_string(),
        )));
    }

    Some(match raw.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n as usize),
        Ok(_) => Err(MessagesError::InvalidInput(
            "Contact selection must be a positive number (starting from 1).".to_string(),
        )),
        Err(_) => Err(MessagesError::InvalidInput(
            "Contact selection must be a number. Use 'contact:N' where N is a positive number."
                .to_string(),
        )),
    })
}
