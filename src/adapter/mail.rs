//! SMTP transport built on `lettre`.
//!
//! Each dialed connection wraps its own `AsyncSmtpTransport` limited to a
//! single pooled session, so one worker maps to one authenticated SMTP
//! session that is reused until the worker closes it.
//!
//! - [`Encryption::Ssl`] connects with implicit TLS and verifies the
//!   server certificate.
//! - [`Encryption::StartTls`] upgrades with STARTTLS when the server
//!   advertises it, accepting any certificate.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::{Error as SmtpError, PoolConfig};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

use crate::domain::{ConnectionSettings, Encryption, Message};
use crate::error::TransportError;
use crate::port::{Connection, Transport};

const CLIENT_NAME: &str = "courier";

/// Bound on every network step (connect, handshake, send).
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

type Smtp = AsyncSmtpTransport<Tokio1Executor>;

/// Dials authenticated SMTP connections.
#[derive(Debug, Clone)]
pub struct MailTransport {
    io_timeout: Duration,
}

impl MailTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Override the per-step network timeout.
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    fn build(&self, settings: &ConnectionSettings) -> Result<Smtp, TransportError> {
        let tls = match settings.encryption {
            Encryption::Ssl => {
                Tls::Wrapper(TlsParameters::new(settings.host.clone()).map_err(transport_error)?)
            }
            Encryption::StartTls => Tls::Opportunistic(
                TlsParameters::builder(settings.host.clone())
                    .dangerous_accept_invalid_certs(true)
                    .build()
                    .map_err(transport_error)?,
            ),
        };

        Ok(Smtp::builder_dangerous(settings.host.as_str())
            .port(settings.port)
            .tls(tls)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .hello_name(ClientId::Domain(CLIENT_NAME.to_string()))
            .timeout(Some(self.io_timeout))
            .pool_config(PoolConfig::new().max_size(1))
            .build())
    }
}

impl Default for MailTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MailTransport {
    async fn dial(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let smtp = self.build(settings)?;

        // Opens the pooled session: greeting, EHLO, STARTTLS, AUTH.
        if !bounded(self.io_timeout, "dial timeout", smtp.test_connection()).await? {
            return Err(TransportError::new("connection test failed"));
        }
        debug!(address = %settings.address(), encryption = %settings.encryption, "SMTP session established");

        Ok(Box::new(MailConnection {
            smtp: Some(smtp),
            io_timeout: self.io_timeout,
        }))
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

struct MailConnection {
    smtp: Option<Smtp>,
    io_timeout: Duration,
}

#[async_trait]
impl Connection for MailConnection {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let email = build_email(message)?;
        let smtp = self
            .smtp
            .as_ref()
            .ok_or_else(|| TransportError::new("connection closed"))?;
        bounded(self.io_timeout, "send timeout", smtp.send(email)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the transport quits its pooled session.
        self.smtp.take();
        Ok(())
    }
}

/// Build the MIME message. Addresses that fail to parse (including any
/// carrying CR/LF) are rejected here, before anything reaches the wire.
fn build_email(message: &Message) -> Result<lettre::Message, TransportError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e| TransportError::new(format!("invalid from address {:?}: {e}", message.from)))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| TransportError::new(format!("invalid to address {:?}: {e}", message.to)))?;

    lettre::Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(message.html_body.clone())
        .map_err(|e| TransportError::new(format!("invalid message: {e}")))
}

async fn bounded<T, F>(limit: Duration, what: &str, step: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, SmtpError>>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(result) => result.map_err(transport_error),
        Err(_) => Err(TransportError::new(format!("{what}: {limit:?}"))),
    }
}

/// Lead with the reply code so "535 ..." survives into the message.
fn transport_error(e: SmtpError) -> TransportError {
    if e.is_timeout() {
        return TransportError::new(format!("dial timeout: {e}"));
    }
    match e.status() {
        Some(code) => TransportError::new(format!("{code} {e}")),
        None => TransportError::new(e.to_string()),
    }
}
