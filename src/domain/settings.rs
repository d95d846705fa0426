//! Connection settings resolved from the configuration store.

use std::collections::HashMap;
use std::fmt;

use crate::error::ConfigError;

/// Configuration keys understood by the sender.
pub mod keys {
    pub const HOSTNAME: &str = "hostname";
    pub const HOSTPORT: &str = "hostport";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    /// Per-instance implicit TLS flag.
    pub const SSL: &str = "ssl";
    /// Global implicit TLS override; wins over [`SSL`] when `"true"`.
    pub const GLOBAL_SSL: &str = "global_ssl";
    /// Optional `From` address; the username is used when absent.
    pub const SENDER_ADDRESS: &str = "sender_address";

    /// Keys that must be present before a pool can start.
    pub const REQUIRED: [&str; 4] = [HOSTNAME, HOSTPORT, USERNAME, PASSWORD];
}

/// How the transport secures the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    /// TLS from the first byte.
    Ssl,
    /// Plain connect upgraded with STARTTLS; certificate checks are relaxed.
    StartTls,
}

impl Encryption {
    fn from_flags(global: Option<&str>, instance: Option<&str>) -> Self {
        if global == Some("true") || instance == Some("true") {
            Self::Ssl
        } else {
            Self::StartTls
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssl => write!(f, "ssl"),
            Self::StartTls => write!(f, "starttls"),
        }
    }
}

/// Immutable snapshot used to dial a transport connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub encryption: Encryption,
}

impl ConnectionSettings {
    /// Resolve settings through a key lookup.
    ///
    /// Required keys are checked in [`keys::REQUIRED`] order; the first
    /// absent or empty one is reported.
    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(keys::REQUIRED.len());
        for key in keys::REQUIRED {
            match lookup(key) {
                Some(v) if !v.is_empty() => values.push(v),
                _ => {
                    return Err(ConfigError::Missing {
                        key: key.to_string(),
                    })
                }
            }
        }
        Self::from_required(values, &lookup)
    }

    /// Resolve settings from a plain key/value map.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::resolve(|key| map.get(key).cloned())
    }

    /// Build settings from values already fetched in [`keys::REQUIRED`] order.
    pub(crate) fn from_required<F>(values: Vec<String>, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let [host, port, username, password]: [String; 4] =
            values.try_into().map_err(|v: Vec<String>| ConfigError::InvalidValue {
                field: "settings",
                reason: format!("expected 4 values, got {}", v.len()),
            })?;

        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;

        let encryption = Encryption::from_flags(
            lookup(keys::GLOBAL_SSL).as_deref(),
            lookup(keys::SSL).as_deref(),
        );

        Ok(Self {
            host,
            port,
            username,
            password,
            encryption,
        })
    }

    /// `host:port` form for dialing and logging.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("encryption", &self.encryption)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full() -> HashMap<String, String> {
        map(&[
            (keys::HOSTNAME, "smtp.example.com"),
            (keys::HOSTPORT, "587"),
            (keys::USERNAME, "u"),
            (keys::PASSWORD, "p"),
        ])
    }

    #[test]
    fn resolves_complete_map() {
        let s = ConnectionSettings::from_map(&full()).unwrap();
        assert_eq!(s.address(), "smtp.example.com:587");
        assert_eq!(s.encryption, Encryption::StartTls);
    }

    #[test]
    fn reports_first_missing_key() {
        let mut m = full();
        m.remove(keys::PASSWORD);
        let err = ConnectionSettings::from_map(&m).unwrap_err();
        assert_eq!(err.to_string(), "require password");
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut m = full();
        m.insert(keys::USERNAME.into(), String::new());
        assert_eq!(
            ConnectionSettings::from_map(&m).unwrap_err(),
            ConfigError::Missing {
                key: "username".into()
            }
        );
    }

    #[test]
    fn rejects_non_numeric_port() {
        let mut m = full();
        m.insert(keys::HOSTPORT.into(), "smtp".into());
        assert_eq!(
            ConnectionSettings::from_map(&m).unwrap_err().to_string(),
            "invalid hostport smtp"
        );
    }

    #[test]
    fn either_ssl_flag_enables_ssl() {
        let mut m = full();
        m.insert(keys::GLOBAL_SSL.into(), "true".into());
        m.insert(keys::SSL.into(), "false".into());
        assert_eq!(
            ConnectionSettings::from_map(&m).unwrap().encryption,
            Encryption::Ssl
        );

        let mut m = full();
        m.insert(keys::SSL.into(), "true".into());
        assert_eq!(
            ConnectionSettings::from_map(&m).unwrap().encryption,
            Encryption::Ssl
        );
    }

    #[test]
    fn debug_redacts_password() {
        let s = ConnectionSettings::from_map(&full()).unwrap();
        let out = format!("{s:?}");
        assert!(out.contains("<redacted>"));
        assert!(!out.contains("\"p\""));
    }
}
