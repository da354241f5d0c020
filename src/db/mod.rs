//! Read-only SQLite access to Messages.db and the AddressBook.
//!
//! CHANGELOG:
//! - 10/19/2026 - Typed helpers for handle sets and windowed retrieval
//! - 01/10/2026 - Initial module structure

pub mod blob_parser;
pub mod connection;
pub mod helpers;
pub mod queries;
