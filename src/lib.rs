//! mac-messages library
//!
//! Reads the macOS Messages store and AddressBook directly, resolves
//! contacts by fuzzy name, and sends through Messages.app with a
//! method and channel fallback ladder. [`MessagesSession`] is the entry
//! point; the CLI and daemon binaries are thin wrappers around it.
//!
//! CHANGELOG:
//! - 10/19/2026 - Session API, resolution, dispatch ladder, diagnostics
//! - 01/10/2026 - Initial library structure (Phase 4C)

// Core modules
pub mod applescript;
pub mod clock;
pub mod config;
pub mod contacts;
pub mod db;
pub mod diagnostics;
pub mod disambiguation;
pub mod dispatch;
pub mod error;
pub mod phone;
pub mod resolve;
pub mod retrieval;
pub mod session;

// Front ends
pub mod commands;
pub mod daemon;
pub mod output;

pub use config::Config;
pub use contacts::ContactMatch;
pub use error::MessagesError;
pub use retrieval::LatestMessage;
pub use session::MessagesSession;
