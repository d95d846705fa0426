//! Out-of-band validation of candidate settings.
//!
//! Runs a single dial-and-close against the candidate configuration in its
//! own task. Nothing here touches the configuration store, the queue or the
//! workers, so a bad candidate never reaches the live pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::ConnectionSettings;
use crate::error::{Result, TransportError};
use crate::port::Transport;

/// Upper bound on the trial connection.
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a trial connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    /// Human-readable reason when invalid; empty otherwise.
    pub message: String,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Check candidate settings by dialing the server once.
///
/// # Errors
///
/// Returns a configuration error (`require <key>`, `invalid hostport <v>`)
/// when the candidate cannot even be turned into settings. Connection
/// failures are not errors: they come back as an invalid [`Validation`]
/// with a classified message.
pub async fn validate_config(
    transport: Arc<dyn Transport>,
    configs: &HashMap<String, String>,
) -> Result<Validation> {
    let settings = ConnectionSettings::from_map(configs)?;
    debug!(address = %settings.address(), encryption = %settings.encryption, "Validating settings");

    match trial_connection(transport, settings).await {
        Ok(()) => Ok(Validation::ok()),
        Err(e) => {
            let message = classify(&e.to_string());
            info!(error = %e, reason = %message, "Settings rejected");
            Ok(Validation::invalid(message))
        }
    }
}

async fn trial_connection(
    transport: Arc<dyn Transport>,
    settings: ConnectionSettings,
) -> std::result::Result<(), TransportError> {
    let task = tokio::spawn(async move {
        let mut conn = transport.dial(&settings).await?;
        conn.close().await
    });
    let abort = task.abort_handle();

    match tokio::time::timeout(VALIDATION_TIMEOUT, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(TransportError::new(join.to_string())),
        Err(_) => {
            abort.abort();
            Err(TransportError::new("timeout"))
        }
    }
}

/// Map well-known transport failures to operator-facing wording.
fn classify(error: &str) -> String {
    if error.contains("535 Error") || error.starts_with("535 ") {
        "Authentication failed".to_string()
    } else if error.contains("timeout") {
        "Connect timeout".to_string()
    } else if error.contains("no such host") || error.contains("failed to lookup address") {
        "No such host".to_string()
    } else {
        error.to_string()
    }
}
