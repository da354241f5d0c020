//! Command implementations.
//!
//! Each command drives one `MessagesSession` operation and prints the result
//! as text or JSON.
//!
//! CHANGELOG:
//! - 10/19/2026 - Commands routed through MessagesSession
//! - 01/10/2026 - Initial module structure

pub mod contacts;
pub mod messaging;
pub mod reading;
pub mod setup;

use crate::error::MessagesError;
use crate::output::OutputControls;

/// Print a text result under `key`, or report the error and hand it back.
pub(crate) fn finish(
    output: &OutputControls,
    key: &str,
    result: Result<String, MessagesError>,
) -> anyhow::Result<()> {
    match result {
        Ok(text) => {
            output.print_text(key, &text);
            Ok(())
        }
        Err(e) => {
            output.print_error(e.code(), &e.to_string());
            Err(e.into())
        }
    }
}
