//! Send ladder: method (scripted, then direct) x channel (iMessage, then SMS).
//!
//! The ladder is a table. Each method runs the target's channel list in
//! order; the first channel that Messages.app accepts wins. Groups only ever
//! use their chat, addresses only iMessage, phone numbers fall back to SMS.

use std::io::Write;
use std::time::Duration;

use crate::applescript::{check_result, Body, Recipient, ScriptRunner, SendCommand, Service};
use crate::error::{AutomationError, MessagesError, Result};
use crate::resolve::{GroupTarget, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Body staged in a temporary file that the script reads.
    Scripted,
    /// Body inlined into the script.
    Direct,
}

impl Method {
    pub fn label(self) -> &'static str {
        match self {
            Method::Scripted => "scripted",
            Method::Direct => "direct",
        }
    }
}

const METHODS: [Method; 2] = [Method::Scripted, Method::Direct];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Chat,
    IMessage,
    Sms,
}

impl Channel {
    pub fn label(self) -> &'static str {
        match self {
            Channel::Chat => "group chat",
            Channel::IMessage => "iMessage",
            Channel::Sms => "SMS",
        }
    }
}

/// Who a message goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Group(GroupTarget),
    Person(Target),
}

impl Destination {
    fn channels(&self) -> &'static [Channel] {
        match self {
            Destination::Group(_) => &[Channel::Chat],
            Destination::Person(Target::Address { .. }) => &[Channel::IMessage],
            Destination::Person(Target::Phone { .. }) => &[Channel::IMessage, Channel::Sms],
        }
    }

    fn display(&self) -> &str {
        match self {
            Destination::Group(group) => &group.display,
            Destination::Person(target) => target.display(),
        }
    }

    fn recipient(&self, channel: Channel) -> Recipient {
        match (self, channel) {
            (Destination::Group(group), _) => Recipient::Chat(group.chat_id.clone()),
            (Destination::Person(target), Channel::Sms) => Recipient::Participant {
                handle: target.handle().to_string(),
                service: Service::Sms,
            },
            (Destination::Person(target), _) => Recipient::Participant {
                handle: target.handle().to_string(),
                service: Service::IMessage,
            },
        }
    }
}

/// A successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub method: Method,
    pub channel: Channel,
    pub display: String,
}

impl Delivery {
    pub fn status(&self) -> String {
        let method = self.method.label();
        match self.channel {
            Channel::Chat => format!(
                "Group message sent successfully to {} [method: {}]",
                self.display, method
            ),
            Channel::IMessage => format!(
                "Message sent successfully via iMessage to {} [method: {}]",
                self.display, method
            ),
            Channel::Sms => format!(
                "Message sent successfully via SMS to {} (iMessage not available) [method: {}]",
                self.display, method
            ),
        }
    }
}

/// One failed rung of the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub method: Method,
    pub channel: Channel,
    pub error: String,
}

pub struct Dispatcher {
    runner: Box<dyn ScriptRunner>,
    pause: Duration,
}

impl Dispatcher {
    pub fn new(runner: Box<dyn ScriptRunner>, pause: Duration) -> Self {
        Self { runner, pause }
    }

    /// Walk the ladder until a rung succeeds.
    pub fn send(&mut self, destination: &Destination, text: &str) -> Result<Delivery> {
        let mut attempts: Vec<Attempt> = Vec::new();

        for method in METHODS {
            // Kept alive until every channel of this method has run.
            let staged = match method {
                Method::Scripted => match stage_body(text) {
                    Ok(file) => Some(file),
                    Err(e) => {
                        tracing::warn!(error = %e, "could not stage message body, skipping scripted send");
                        continue;
                    }
                },
                Method::Direct => None,
            };
            let body = match &staged {
                Some(file) => Body::File(file.path().to_path_buf()),
                None => Body::Inline(text.to_string()),
            };

            for &channel in destination.channels() {
                let command = SendCommand {
                    recipient: destination.recipient(channel),
                    body: body.clone(),
                    pause: self.pause,
                };

                let outcome = self
                    .runner
                    .run(&command.render())
                    .and_then(|output| check_result(&output));

                match outcome {
                    Ok(()) => {
                        tracing::info!(method = method.label(), channel = channel.label(), "message sent");
                        return Ok(Delivery {
                            method,
                            channel,
                            display: destination.display().to_string(),
                        });
                    }
                    Err(e) => {
                        tracing::debug!(method = method.label(), channel = channel.label(), error = %e, "send attempt failed");
                        attempts.push(Attempt {
                            method,
                            channel,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        Err(failure(destination, &attempts))
    }
}

fn stage_body(text: &str) -> std::result::Result<tempfile::NamedTempFile, AutomationError> {
    let mut file = tempfile::Builder::new()
        .prefix("mac-messages-")
        .suffix(".txt")
        .tempfile()
        .map_err(AutomationError::TransientFile)?;
    file.write_all(text.as_bytes())
        .and_then(|_| file.flush())
        .map_err(AutomationError::TransientFile)?;
    Ok(file)
}

/// Summarize the failed ladder. The last method's errors are the ones shown.
fn failure(destination: &Destination, attempts: &[Attempt]) -> MessagesError {
    let last = |channel: Channel| {
        attempts
            .iter()
            .rev()
            .find(|a| a.channel == channel)
            .map(|a| a.error.as_str())
            .unwrap_or("not attempted")
    };

    let summary = match destination {
        Destination::Group(_) => format!("Error sending group message: {}", last(Channel::Chat)),
        Destination::Person(Target::Address { .. }) => format!(
            "Error sending message: iMessage failed and SMS not available for email addresses - {}",
            last(Channel::IMessage)
        ),
        Destination::Person(Target::Phone { .. }) => format!(
            "Error sending message: Both iMessage and SMS failed - iMessage: {} SMS: {}",
            last(Channel::IMessage),
            last(Channel::Sms)
        ),
    };

    let trail = attempts
        .iter()
        .map(|a| format!("  [{}] {}: {}", a.method.label(), a.channel.label(), a.error))
        .collect::<Vec<_>>()
        .join("\n");

    if trail.is_empty() {
        MessagesError::ChannelFailure(summary)
    } else {
        MessagesError::ChannelFailure(format!("{}\nAttempts:\n{}", summary, trail))
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::RecordingRunner;
    use super::*;

    const IMESSAGE: &str = "service type = iMessage";
    const SMS: &str = "service type = SMS";
    const FILE_BODY: &str = "POSIX file";

    fn phone() -> Destination {
        Destination::Person(Target::Phone {
            number: "+15551234567".into(),
            name: Some("John Doe".into()),
        })
    }

    fn dispatcher(runner: &RecordingRunner) -> Dispatcher {
        Dispatcher::new(Box::new(runner.clone()), Duration::ZERO)
    }

    #[test]
    fn test_first_rung_wins() {
        let runner = RecordingRunner::default();
        let delivery = dispatcher(&runner).send(&phone(), "hi").unwrap();
        assert_eq!(delivery.method, Method::Scripted);
        assert_eq!(delivery.channel, Channel::IMessage);
        assert_eq!(
            delivery.status(),
            "Message sent successfully via iMessage to John Doe [method: scripted]"
        );
        assert_eq!(runner.scripts().len(), 1);
        assert!(runner.scripts()[0].contains(FILE_BODY));
    }

    #[test]
    fn test_phone_falls_back_to_sms() {
        let runner = RecordingRunner::rejecting(vec![IMESSAGE]);
        let delivery = dispatcher(&runner).send(&phone(), "hi").unwrap();
        assert_eq!(delivery.channel, Channel::Sms);
        assert_eq!(delivery.method, Method::Scripted);
        assert!(delivery.status().contains("via SMS to John Doe (iMessage not available)"));
    }

    #[test]
    fn test_scripted_falls_back_to_direct() {
        let runner = RecordingRunner::rejecting(vec![FILE_BODY]);
        let delivery = dispatcher(&runner).send(&phone(), "hi \"there\"").unwrap();
        assert_eq!(delivery.method, Method::Direct);
        assert_eq!(delivery.channel, Channel::IMessage);

        let scripts = runner.scripts();
        // scripted iMessage, scripted SMS, direct iMessage
        assert_eq!(scripts.len(), 3);
        assert!(scripts[2].contains(r#"send "hi \"there\"" to participant "+15551234567""#));
    }

    #[test]
    fn test_group_never_tries_sms() {
        let runner = RecordingRunner::rejecting(vec!["chat \"chat123\""]);
        let group = Destination::Group(GroupTarget {
            chat_id: "chat123".into(),
            display: "Climbing Crew".into(),
        });
        let err = dispatcher(&runner).send(&group, "hi").unwrap_err();

        assert!(matches!(err, MessagesError::ChannelFailure(_)));
        let scripts = runner.scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts.iter().all(|s| !s.contains(SMS)));
        assert!(err.to_string().starts_with("Error sending group message: Can't send to this buddy"));
    }

    #[test]
    fn test_address_surfaces_primary_failure() {
        let runner = RecordingRunner::rejecting(vec![IMESSAGE]);
        let address = Destination::Person(Target::Address {
            address: "alice@example.com".into(),
            name: None,
        });
        let err = dispatcher(&runner).send(&address, "hi").unwrap_err();

        let scripts = runner.scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts.iter().all(|s| !s.contains(SMS)));
        assert!(err
            .to_string()
            .contains("SMS not available for email addresses - Can't send to this buddy"));
    }

    #[test]
    fn test_total_failure_lists_every_attempt() {
        let runner = RecordingRunner::rejecting(vec![IMESSAGE, SMS]);
        let err = dispatcher(&runner).send(&phone(), "hi").unwrap_err();

        assert_eq!(runner.scripts().len(), 4);
        let message = err.to_string();
        assert!(message.contains("Both iMessage and SMS failed"));
        assert!(message.contains("[scripted] iMessage"));
        assert!(message.contains("[direct] SMS"));
        assert_eq!(err.code(), "CHANNEL_FAILURE");
    }
}
