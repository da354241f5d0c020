//! mac-messages - command-line front end for macOS Messages
//!
//! Direct SQLite reads of chat.db and the AddressBook, AppleScript for sending.
//!
//! CHANGELOG:
//! - 10/19/2026 - Recent, search, latest, send, find-contact, countries, check-access
//! - 01/10/2026 - Initial scaffold with CLI skeleton

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use mac_messages::commands;
use mac_messages::output::OutputControls;
use mac_messages::retrieval::DEFAULT_SEARCH_THRESHOLD;
use mac_messages::{Config, MessagesSession};

/// Read, search and send macOS Messages from the terminal.
#[derive(Parser, Debug)]
#[command(name = "mac-messages")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Compact JSON output (no whitespace)
    #[arg(long, global = true)]
    compact: bool,

    /// Comma-separated field allowlist
    #[arg(long, global = true)]
    fields: Option<String>,

    /// Truncate text fields to this length
    #[arg(long, global = true)]
    max_text_chars: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    // =========================================================================
    // READING
    // =========================================================================
    /// Messages from the last N hours, optionally with one contact
    Recent {
        /// Hours to look back (1-87600)
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Contact name, phone number, email address or contact:N
        #[arg(short, long)]
        contact: Option<String>,
    },

    /// Fuzzy search of message text
    Search {
        /// Text to look for
        term: String,

        /// Hours to look back (1-87600)
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Minimum match score (0.0-1.0)
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_THRESHOLD)]
        threshold: f64,
    },

    /// Newest message exchanged with a contact
    Latest {
        /// Contact name, phone number or email address
        contact: String,

        /// Hours to look back (1-87600)
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },

    // =========================================================================
    // MESSAGING
    // =========================================================================
    /// Send a message
    Send {
        /// Contact name, phone number, email address, contact:N or group chat
        recipient: String,

        /// Message text
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,

        /// Treat the recipient as a group chat
        #[arg(short, long)]
        group: bool,

        /// Dial code for a local number, e.g. +44
        #[arg(long)]
        dial_code: Option<String>,
    },

    // =========================================================================
    // CONTACTS
    // =========================================================================
    /// Fuzzy-match contacts by name
    FindContact {
        /// Name or nickname
        name: String,
    },

    /// List supported dial codes
    Countries,

    // =========================================================================
    // SETUP
    // =========================================================================
    /// Check access to the Messages and AddressBook databases
    CheckAccess,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output_controls = OutputControls {
        json: cli.json,
        compact: cli.compact,
        fields: cli.fields.clone(),
        max_text_chars: cli.max_text_chars,
    };

    let mut session = MessagesSession::new(Config::from_env());

    let result = match cli.command {
        Command::Recent { hours, contact } => {
            commands::reading::recent(&mut session, hours, contact.as_deref(), &output_controls)
        }
        Command::Search { term, hours, threshold } => {
            commands::reading::search(&mut session, &term, hours, threshold, &output_controls)
        }
        Command::Latest { contact, hours } => {
            commands::reading::latest(&mut session, &contact, hours, &output_controls)
        }
        Command::Send { recipient, message, group, dial_code } => commands::messaging::send(
            &mut session,
            &recipient,
            &message.join(" "),
            group,
            dial_code.as_deref(),
            &output_controls,
        ),
        Command::FindContact { name } => {
            commands::contacts::find(&mut session, &name, &output_controls)
        }
        Command::Countries => commands::contacts::countries(&output_controls),
        Command::CheckAccess => commands::setup::check_access(&session, &output_controls),
    };

    match result {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
