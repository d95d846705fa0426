//! `courier check` subcommands.

use std::path::Path;
use std::sync::Arc;

use crate::adapter::MailTransport;
use crate::cli::output;
use crate::config::{Config, PASSWORD_ENV};
use crate::dispatcher::validate_config;
use crate::domain::{keys, ConnectionSettings};
use crate::error::{Error, Result, TransportError};

/// Validate the configuration file without connecting anywhere.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    output::note(&format!("Checking configuration: {}", path.display()));

    let config = Config::load(path)?;
    output::ok("Configuration file is valid");

    output::section("Pool");
    output::key_value("Queue", config.pool.queue_capacity);
    output::key_value("Workers", config.pool.worker_count);

    output::section("Mail server");
    let smtp = config.smtp_settings();
    let settings = ConnectionSettings::from_map(&smtp)?;
    output::key_value("Address", settings.address());
    output::key_value("Username", &settings.username);
    output::key_value("Encryption", settings.encryption);
    match smtp.get(keys::SENDER_ADDRESS) {
        Some(from) if !from.is_empty() => output::key_value("From", from),
        _ => output::key_value("From", format!("{} (username)", settings.username)),
    }
    if std::env::var(PASSWORD_ENV).is_ok() {
        output::ok(&format!("Password taken from {PASSWORD_ENV}"));
    }

    println!();
    output::ok("Configuration is ready to use.");
    Ok(())
}

/// Trial-connect with the configured settings.
pub async fn execute_connection<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    let smtp = config.smtp_settings();

    output::note(&format!(
        "Testing connection to {}:{}...",
        smtp.get(keys::HOSTNAME).map(String::as_str).unwrap_or("?"),
        smtp.get(keys::HOSTPORT).map(String::as_str).unwrap_or("?"),
    ));

    let validation = validate_config(Arc::new(MailTransport::new()), &smtp).await?;
    if validation.valid {
        output::ok("Connection succeeded");
        Ok(())
    } else {
        output::error(&validation.message);
        Err(Error::Transport(TransportError::new(validation.message)))
    }
}
