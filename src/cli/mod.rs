//! Command-line interface definitions.

pub mod check;
pub mod output;
pub mod send;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Courier - Notification delivery over pooled mail connections.
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Send one notification, or a batch from a JSON file
    Send(SendArgs),
}

/// Subcommands for `courier check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
    /// Trial-connect to the mail server with the configured settings
    Connection(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `send` subcommand.
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Recipient address
    #[arg(long, required_unless_present = "batch", conflicts_with = "batch")]
    pub to: Option<String>,

    /// Message subject
    #[arg(long, default_value = "")]
    pub subject: String,

    /// HTML body
    #[arg(long, default_value = "")]
    pub body: String,

    /// JSON file holding an array of `{contact, topic, title, message}`
    #[arg(long)]
    pub batch: Option<PathBuf>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}
