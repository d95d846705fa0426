//! Adapters implementing the ports against concrete backends.

mod mail;
mod memory_store;

pub use mail::MailTransport;
pub use memory_store::MemoryConfigStore;
