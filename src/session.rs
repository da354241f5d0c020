//! `MessagesSession`: one owner for the contact cache, the pending
//! disambiguation, and the send ladder.
//!
//! Every public operation returns text or a plain record; failures are
//! rendered as `Error: ...` rather than propagated.

use crate::applescript::{OsascriptRunner, ScriptRunner};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::contacts::{AddressBookSource, ContactDirectory, ContactMatch, ContactSource};
use crate::db::blob_parser::{BodyDecoder, StreamTypedDecoder};
use crate::db::connection::Store;
use crate::diagnostics::AccessReport;
use crate::disambiguation::Disambiguation;
use crate::dispatch::{Destination, Dispatcher};
use crate::error::{MessagesError, Result};
use crate::phone;
use crate::resolve::{self, Resolution};
use crate::retrieval::{self, LatestMessage, Retriever};

pub struct MessagesSession {
    config: Config,
    messages: Store,
    directory: ContactDirectory,
    disambiguation: Disambiguation,
    dispatcher: Dispatcher,
    clock: Box<dyn Clock>,
    decoder: Box<dyn BodyDecoder>,
}

impl MessagesSession {
    pub fn new(config: Config) -> Self {
        let directory = ContactDirectory::new(
            Box::new(AddressBookSource::new(&config.addressbook_dir)),
            config.contacts_ttl,
        )
        .with_threshold(config.match_threshold);

        Self {
            messages: Store::messages(&config.messages_db),
            dispatcher: Dispatcher::new(Box::new(OsascriptRunner), config.send_pause),
            directory,
            disambiguation: Disambiguation::default(),
            clock: Box::new(SystemClock),
            decoder: Box::new(StreamTypedDecoder),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_runner(mut self, runner: Box<dyn ScriptRunner>) -> Self {
        self.dispatcher = Dispatcher::new(runner, self.config.send_pause);
        self
    }

    pub fn with_contact_source(mut self, source: Box<dyn ContactSource>) -> Self {
        self.directory = ContactDirectory::new(source, self.config.contacts_ttl)
            .with_threshold(self.config.match_threshold);
        self
    }

    pub fn with_decoder(mut self, decoder: Box<dyn BodyDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn disambiguation(&self) -> &Disambiguation {
        &self.disambiguation
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// Messages from the last `hours`, optionally for one contact.
    pub fn get_recent_messages(&mut self, hours: i64, contact: Option<&str>) -> String {
        render(self.try_get_recent_messages(hours, contact))
    }

    /// [`get_recent_messages`](Self::get_recent_messages) with the error kept typed.
    pub fn try_get_recent_messages(&mut self, hours: i64, contact: Option<&str>) -> Result<String> {
        retrieval::validate_hours(hours)?;
        let now = self.clock.now();

        let handles = match contact.map(str::trim).filter(|c| !c.is_empty()) {
            None => None,
            Some(contact) => {
                let target = match resolve::resolve(
                    contact,
                    &mut self.directory,
                    &mut self.disambiguation,
                    now,
                )? {
                    Resolution::Ambiguous(listing) => return Ok(listing),
                    Resolution::Resolved(target) => target,
                };
                let handles = target.handles(&self.messages)?;
                if handles.is_empty() {
                    return Ok(retrieval::missing_handles_message(&self.messages, &target));
                }
                Some(handles)
            }
        };

        let mut retriever = Retriever::new(&self.messages, &mut self.directory, self.decoder.as_ref(), now);
        let lines = retriever.recent(hours, handles.as_ref(), self.config.recent_limit)?;
        if lines.is_empty() {
            return Ok("No messages found in the specified time period.".to_string());
        }
        Ok(lines.join("\n"))
    }

    /// Messages from the last `hours` whose text fuzzily matches `term`.
    pub fn fuzzy_search_messages(&mut self, term: &str, hours: i64, threshold: f64) -> String {
        render(self.try_fuzzy_search_messages(term, hours, threshold))
    }

    pub fn try_fuzzy_search_messages(&mut self, term: &str, hours: i64, threshold: f64) -> Result<String> {
        if term.trim().is_empty() {
            return Err(MessagesError::InvalidInput("Search term cannot be empty.".to_string()));
        }
        retrieval::validate_hours(hours)?;
        retrieval::validate_threshold(threshold)?;

        let now = self.clock.now();
        let window = self.config.search_window;
        Retriever::new(&self.messages, &mut self.directory, self.decoder.as_ref(), now)
            .search(term, hours, threshold, window)
    }

    /// Newest message exchanged with `contact` in the last `hours`, or `None`.
    ///
    /// An ambiguous name takes the best match and leaves any pending
    /// selection alone. Lookup failures are logged and read as `None`.
    pub fn get_latest_message_from_contact(&mut self, contact: &str, hours: i64) -> Option<LatestMessage> {
        match self.try_get_latest_message_from_contact(contact, hours) {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!(contact, code = e.code(), error = %e, "latest message lookup failed");
                None
            }
        }
    }

    pub fn try_get_latest_message_from_contact(
        &mut self,
        contact: &str,
        hours: i64,
    ) -> Result<Option<LatestMessage>> {
        retrieval::validate_hours(hours)?;
        let now = self.clock.now();

        let target = resolve::resolve_best(contact, &mut self.directory, &mut self.disambiguation, now)?;

        let handles = target.handles(&self.messages)?;
        if handles.is_empty() {
            return Ok(None);
        }
        let limit = self.config.recent_limit;
        Retriever::new(&self.messages, &mut self.directory, self.decoder.as_ref(), now)
            .latest(hours, &handles, limit)
    }

    // ========================================================================
    // Contacts
    // ========================================================================

    pub fn find_contact_by_name(&mut self, name: &str) -> Vec<ContactMatch> {
        let now = self.clock.now();
        self.directory.find_by_name(name, now)
    }

    // ========================================================================
    // Sending
    // ========================================================================

    pub fn send_message(&mut self, recipient: &str, body: &str, is_group: bool) -> String {
        render(self.try_send_message(recipient, body, is_group))
    }

    /// Like [`send_message`](Self::send_message), composing E.164 first when
    /// `dial_code` is given and the recipient starts with a digit.
    pub fn send_message_with_dial_code(
        &mut self,
        recipient: &str,
        body: &str,
        dial_code: Option<&str>,
    ) -> String {
        render(self.try_send_message_with_dial_code(recipient, body, dial_code))
    }

    pub fn try_send_message_with_dial_code(
        &mut self,
        recipient: &str,
        body: &str,
        dial_code: Option<&str>,
    ) -> Result<String> {
        let recipient = recipient.trim();
        let recipient = match dial_code {
            Some(code) if recipient.starts_with(|c: char| c.is_ascii_digit()) => {
                phone::format_e164(code, recipient)
            }
            _ => recipient.to_string(),
        };
        self.try_send_message(&recipient, body, false)
    }

    pub fn try_send_message(&mut self, recipient: &str, body: &str, is_group: bool) -> Result<String> {
        if recipient.trim().is_empty() {
            return Err(MessagesError::InvalidInput("Recipient cannot be empty.".to_string()));
        }
        if body.is_empty() {
            return Err(MessagesError::InvalidInput("Message cannot be empty.".to_string()));
        }

        let destination = if is_group {
            Destination::Group(resolve::resolve_group(&self.messages, recipient))
        } else {
            let now = self.clock.now();
            match resolve::resolve(
                recipient,
                &mut self.directory,
                &mut self.disambiguation,
                now,
            )? {
                Resolution::Ambiguous(listing) => return Ok(listing),
                Resolution::Resolved(target) => Destination::Person(target),
            }
        };

        Ok(self.dispatcher.send(&destination, body)?.status())
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Readability, schema and contact count for both stores.
    pub fn access_report(&self) -> AccessReport {
        AccessReport::gather(
            &self.messages,
            &AddressBookSource::new(&self.config.addressbook_dir),
            &self.config.addressbook_dir.display().to_string(),
        )
    }

    /// [`access_report`](Self::access_report) as text.
    pub fn check_access(&self) -> String {
        self.access_report().to_text()
    }
}

fn render(result: Result<String>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(code = e.code(), error = %e, "operation failed");
            format!("Error: {}", e)
        }
    }
}
