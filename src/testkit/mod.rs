//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] - Mock [`Transport`](crate::port::Transport)
//!   implementation: `ScriptedTransport`.
//! - [`domain`] - Builders for messages and send requests.
//! - [`config`] - Canonical test configurations (pool sizing, SMTP keys).
//! - [`smtp`] - In-process SMTP server for exercising the real transport.

pub mod config;
pub mod domain;
pub mod smtp;
pub mod transport;
