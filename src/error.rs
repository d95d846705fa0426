use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("require {key}")]
    Missing { key: String },

    #[error("invalid hostport {0}")]
    InvalidPort(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Why a single message could not be delivered.
///
/// Every variant is local to one message: the pool keeps running and the
/// caller decides whether to resend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("sender is not ready, configuration has not been applied")]
    NotReady,

    #[error("send error: connect failed: {0}")]
    Dial(String),

    #[error("send error: {0}")]
    Send(String),

    #[error("send error, time out")]
    Timeout,

    #[error("send error: pool restarted before the message was picked up")]
    Restarted,

    #[error("send error: abandoned by the caller")]
    Cancelled,

    #[error("send error: worker dropped the message without reporting")]
    Dropped,
}

/// Error reported by a transport implementation.
///
/// Carries the transport's own wording so callers can classify it
/// (for example an SMTP `535 Error` reply).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(ConfigError::Parse(err.to_string()))
    }
}
