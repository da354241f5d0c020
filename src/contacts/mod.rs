//! Contact resolution against the macOS AddressBook.
//!
//! CHANGELOG:
//! - 10/19/2026 - AddressBook-backed directory replaces contacts.json
//! - 01/10/2026 - Initial module structure

pub mod fuzzy;
pub mod manager;

pub use manager::{AddressBookSource, Contact, ContactDirectory, ContactMatch, ContactSource};
