//! AppleScript command building and execution for Messages.app.
//!
//! Every send goes through [`SendCommand::render`], which escapes all
//! interpolated values, and a [`ScriptRunner`], so the dispatch ladder can be
//! driven by a fake in tests.
//!
//! CHANGELOG:
//! - 10/19/2026 - Typed send command (participant/chat, inline/file body), runner trait
//! - 01/10/2026 - Initial implementation

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use crate::error::AutomationError;

/// Escape a string for safe inclusion in AppleScript.
///
/// CRITICAL: Order matters!
/// 1. Escape backslashes FIRST
/// 2. Then escape quotes
///
/// This prevents injection attacks where user data breaks the string context.
pub fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', "\\\\") // Backslashes FIRST
        .replace('"', "\\\"") // Then quotes
}

// ============================================================================
// Command Builder
// ============================================================================

/// Messages.app service a participant is addressed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    IMessage,
    Sms,
}

impl Service {
    fn selector(self) -> &'static str {
        match self {
            Service::IMessage => "1st service whose service type = iMessage",
            Service::Sms => "1st account whose service type = SMS and enabled is true",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Participant { handle: String, service: Service },
    /// A group chat by room identifier or display name.
    Chat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Inline(String),
    /// UTF-8 text file read by the script at send time.
    File(PathBuf),
}

impl Body {
    fn expression(&self) -> String {
        match self {
            Body::Inline(text) => format!("\"{}\"", escape_applescript_string(text)),
            Body::File(path) => format!(
                "(read (POSIX file \"{}\") as \u{ab}class utf8\u{bb})",
                escape_applescript_string(&path.to_string_lossy())
            ),
        }
    }
}

/// One `send` to Messages.app, followed by a pause so immediate delivery
/// errors surface before the script returns.
#[derive(Debug, Clone, PartialEq)]
pub struct SendCommand {
    pub recipient: Recipient,
    pub body: Body,
    pub pause: Duration,
}

impl SendCommand {
    /// Script that returns `success`, or `error:<message>` when Messages refuses.
    pub fn render(&self) -> String {
        let target = match &self.recipient {
            Recipient::Participant { handle, service } => format!(
                "participant \"{}\" of ({})",
                escape_applescript_string(handle),
                service.selector()
            ),
            Recipient::Chat(id) => format!("chat \"{}\"", escape_applescript_string(id)),
        };

        format!(
            r#"
tell application "Messages"
    try
        send {} to {}
        delay {}
        return "success"
    on error errMsg
        return "error:" & errMsg
    end try
end tell
"#,
            self.body.expression(),
            target,
            self.pause.as_secs_f64()
        )
    }
}

/// Interpret a rendered script's output.
pub fn check_result(output: &str) -> Result<(), AutomationError> {
    let output = output.trim();
    if let Some(reason) = output.strip_prefix("error:") {
        return Err(AutomationError::Rejected(reason.trim().to_string()));
    }
    if output == "success" {
        Ok(())
    } else {
        Err(AutomationError::Script(format!("unexpected result: {}", output)))
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Runs an AppleScript source and returns its trimmed stdout.
pub trait ScriptRunner: Send {
    fn run(&mut self, script: &str) -> Result<String, AutomationError>;
}

/// `osascript -e <script>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsascriptRunner;

impl ScriptRunner for OsascriptRunner {
    fn run(&mut self, script: &str) -> Result<String, AutomationError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .map_err(AutomationError::Spawn)?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AutomationError::Script(stderr.trim().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_simple() {
        assert_eq!(escape_applescript_string("Hello"), "Hello");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_applescript_string(r#"Say "Hi""#), r#"Say \"Hi\""#);
    }

    #[test]
    fn test_escape_backslash() {
        assert_eq!(escape_applescript_string(r"Path\to\file"), r"Path\\to\\file");
    }

    #[test]
    fn test_escape_order_matters() {
        let input = r#"\"test\""#;
        let expected = r#"\\\"test\\\""#;
        assert_eq!(escape_applescript_string(input), expected);
    }

    #[test]
    fn test_render_inline_participant() {
        let script = SendCommand {
            recipient: Recipient::Participant {
                handle: "+15551234567".into(),
                service: Service::IMessage,
            },
            body: Body::Inline(r#"say "hi" \o/"#.into()),
            pause: Duration::from_secs(1),
        }
        .render();

        assert!(script.contains(r#"send "say \"hi\" \\o/" to participant "+15551234567" of (1st service whose service type = iMessage)"#));
        assert!(script.contains("delay 1"));
        assert!(script.contains(r#"return "error:" & errMsg"#));
    }

    #[test]
    fn test_render_file_body_to_chat() {
        let script = SendCommand {
            recipient: Recipient::Chat("chat123456".into()),
            body: Body::File(PathBuf::from("/tmp/body.txt")),
            pause: Duration::from_millis(500),
        }
        .render();

        assert!(script.contains("read (POSIX file \"/tmp/body.txt\") as \u{ab}class utf8\u{bb}"));
        assert!(script.contains("to chat \"chat123456\""));
        assert!(script.contains("delay 0.5"));
    }

    #[test]
    fn test_sms_service_selector() {
        let script = SendCommand {
            recipient: Recipient::Participant {
                handle: "5551234567".into(),
                service: Service::Sms,
            },
            body: Body::Inline("x".into()),
            pause: Duration::ZERO,
        }
        .render();
        assert!(script.contains("service type = SMS and enabled is true"));
    }

    #[test]
    fn test_check_result() {
        assert!(check_result("success\n").is_ok());
        assert!(matches!(
            check_result("error:Can't get participant"),
            Err(AutomationError::Rejected(msg)) if msg == "Can't get participant"
        ));
        assert!(matches!(check_result("huh"), Err(AutomationError::Script(_))));
    }
}
