//! Courier - Notification delivery over a pool of reusable mail connections.
//!
//! Callers hand messages to a [`Dispatcher`](dispatcher::Dispatcher), which
//! queues them for a fixed set of connection workers. Each worker owns one
//! transport connection, dials it lazily, reuses it while traffic flows and
//! closes it after an idle window. `send` returns once a worker reports, or
//! after a fixed timeout.
//!
//! # Modules
//!
//! - [`dispatcher`] - Shared queue, worker pool, restart protocol, validation
//! - [`port`] - Transport and configuration store traits
//! - [`adapter`] - In-memory store and the SMTP transport
//! - [`domain`] - Settings, messages, identifiers
//! - [`config`] - TOML configuration and logging setup
//! - [`error`] - Error types for the crate
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use courier::adapter::{MemoryConfigStore, MailTransport};
//! use courier::config::PoolConfig;
//! use courier::dispatcher::Dispatcher;
//! use courier::domain::SendParam;
//!
//! # async fn run() -> courier::error::Result<()> {
//! let dispatcher = Dispatcher::new(
//!     Arc::new(MemoryConfigStore::new()),
//!     Arc::new(MailTransport::new()),
//!     PoolConfig::default(),
//! );
//! dispatcher
//!     .update_config(
//!         [("hostname", "smtp.example.com"), ("hostport", "587"), ("username", "alerts@example.com"), ("password", "secret")]
//!             .into_iter()
//!             .map(|(k, v)| (k.to_string(), v.to_string()))
//!             .collect(),
//!     )
//!     .await?;
//! dispatcher
//!     .notify(&SendParam {
//!         contact: "ops@example.com".into(),
//!         topic: "alerts".into(),
//!         title: "Disk full".into(),
//!         message: "<p>/var is full</p>".into(),
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
