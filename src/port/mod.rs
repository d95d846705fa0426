//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams to the collaborators the sender does not own:
//!
//! ```text
//!                ┌──────────────────────────┐
//!                │        Dispatcher        │
//!                │  queue + worker pool     │
//!                └──────────────────────────┘
//!                  │                      │
//!                  ▼                      ▼
//!           ┌─────────────┐        ┌─────────────┐
//!           │  Transport  │        │ ConfigStore │
//!           │   Adapter   │        │   Adapter   │
//!           └─────────────┘        └─────────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`Transport`], [`Connection`] - Dialing and using a mail server connection
//! - [`ConfigStore`] - Key/value configuration cache

mod config_store;
mod transport;

pub use config_store::ConfigStore;
pub use transport::{Connection, Transport};
