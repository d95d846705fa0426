//! Outbound message types.

use serde::{Deserialize, Serialize};

use super::ids::MessageId;

/// Caller-facing request to notify one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendParam {
    /// Recipient address.
    pub contact: String,
    /// Notification topic; used as the subject when no title is given.
    #[serde(default)]
    pub topic: String,
    /// Notification title.
    #[serde(default)]
    pub title: String,
    /// HTML body.
    pub message: String,
}

/// A fully built message, opaque to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl Message {
    /// Build a message from a send request and the resolved sender address.
    #[must_use]
    pub fn compose(from: impl Into<String>, param: &SendParam) -> Self {
        let subject = if param.title.is_empty() {
            &param.topic
        } else {
            &param.title
        };
        Self {
            id: MessageId::generate(),
            from: from.into(),
            to: param.contact.clone(),
            subject: single_line(subject),
            html_body: param.message.clone(),
        }
    }
}

/// Fold CR/LF into spaces so a subject can never start a new header.
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// One message of a batch that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub contact: String,
    pub reason: String,
}
