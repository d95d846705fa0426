//! `courier send`: deliver notifications through a short-lived pool.

use std::sync::Arc;

use tracing::info;

use crate::adapter::{MemoryConfigStore, MailTransport};
use crate::cli::{output, SendArgs};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::domain::SendParam;
use crate::error::{ConfigError, Result};

/// Load the batch (or the single message from flags).
fn load_params(args: &SendArgs) -> Result<Vec<SendParam>> {
    if let Some(path) = &args.batch {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile(e.to_string()))?;
        return Ok(serde_json::from_str(&content)?);
    }

    let contact = args.to.clone().ok_or(ConfigError::Missing {
        key: "to".to_string(),
    })?;
    Ok(vec![SendParam {
        contact,
        topic: String::new(),
        title: args.subject.clone(),
        message: args.body.clone(),
    }])
}

pub async fn execute(args: SendArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".into();
    }
    config.logging.init();

    let params = load_params(&args)?;
    let dispatcher = Dispatcher::new(
        Arc::new(MemoryConfigStore::new()),
        Arc::new(MailTransport::new()),
        config.pool.clone(),
    );
    dispatcher.update_config(config.smtp_settings()).await?;
    info!(messages = params.len(), "Dispatching");

    let failed = dispatcher.batch_send(&params).await?;
    dispatcher.shutdown().await;

    let delivered = params.len() - failed.len();
    if failed.is_empty() {
        output::ok(&format!("Delivered {delivered} message(s)"));
        return Ok(());
    }

    output::warn(&format!(
        "Delivered {delivered}, failed {} message(s)",
        failed.len()
    ));
    println!("{}", serde_json::to_string_pretty(&failed)?);
    Err(crate::error::DeliveryError::Send(format!("{} message(s) failed", failed.len())).into())
}
