//! Transport-agnostic domain types.

mod ids;
mod message;

pub mod settings;

pub use ids::{MessageId, WorkerId};
pub use message::{FailedRecord, Message, SendParam};
pub use settings::{keys, ConnectionSettings, Encryption};
