//! Transport port.
//!
//! The wire protocol (handshake, authentication, framing) lives behind
//! these traits. The pool only needs to open a connection, push a message
//! through it, and close it again.

use async_trait::async_trait;

use crate::domain::{ConnectionSettings, Message};
use crate::error::TransportError;

/// Opens connections to a mail server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dial and authenticate a new connection.
    async fn dial(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn Connection>, TransportError>;

    /// Transport name for logging.
    fn name(&self) -> &'static str;
}

/// A live, reusable connection.
///
/// Owned by exactly one worker; never shared.
#[async_trait]
pub trait Connection: Send {
    /// Send one message and check the server accepted it.
    async fn send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    ///
    /// On failure the connection stays usable from the caller's point of
    /// view; it may retry or drop it.
    async fn close(&mut self) -> Result<(), TransportError>;
}
