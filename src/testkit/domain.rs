//! Builders for domain primitives used across tests.

use crate::domain::{Message, SendParam};

/// A send request for `contact`.
pub fn param(contact: &str) -> SendParam {
    SendParam {
        contact: contact.to_string(),
        topic: "alerts".to_string(),
        title: "Disk usage above 90%".to_string(),
        message: "<p>host-1 /var is 93% full</p>".to_string(),
    }
}

/// `n` send requests for `user0@example.com`, `user1@example.com`, ...
pub fn params(n: usize) -> Vec<SendParam> {
    (0..n).map(|i| param(&format!("user{i}@example.com"))).collect()
}

/// A composed message for `contact`.
pub fn message(contact: &str) -> Message {
    Message::compose("noreply@example.com", &param(contact))
}
