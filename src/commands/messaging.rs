//! Messaging commands: send.
//!
//! CHANGELOG:
//! - 10/19/2026 - Send through the dispatch ladder, group and dial-code support
//! - 01/10/2026 - Implemented send and send_by_phone with AppleScript
//! - 01/10/2026 - Initial stub implementation

use anyhow::{bail, Result};

use super::finish;
use crate::output::OutputControls;
use crate::session::MessagesSession;

/// Send `message` to a contact, number, address, `contact:N` or group.
pub fn send(
    session: &mut MessagesSession,
    recipient: &str,
    message: &str,
    group: bool,
    dial_code: Option<&str>,
    output: &OutputControls,
) -> Result<()> {
    if group && dial_code.is_some() {
        bail!("--dial-code cannot be combined with --group");
    }

    let result = if group {
        session.try_send_message(recipient, message, true)
    } else {
        session.try_send_message_with_dial_code(recipient, message, dial_code)
    };
    finish(output, "status", result)
}
