//! Best-effort outbound email. Delivery failure is reported to the caller as
//! an outcome flag and never propagated as a request failure.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("mailer is not configured")]
    NotConfigured,
}

/// Result of a best-effort delivery attempt, surfaced in intake responses.
#[derive(Debug, Clone, Serialize, Default)]
pub struct MailOutcome {
    pub sent: bool,
    pub error: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP-backed mailer
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();
        let from: Mailbox = cfg.from.parse()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .body(body.to_string())?;
        self.transport.send(message).await?;
        info!(to, subject, "Confirmation email sent");
        Ok(())
    }
}

/// Mailer used when SMTP is not configured and in tests
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        warn!(to, subject, "Mailer not configured; dropping email");
        Err(MailError::NotConfigured)
    }
}

/// Mailer that records nothing and always succeeds; used by integration
/// tests asserting `email_sent: true` paths.
pub struct AcceptAllMailer;

#[async_trait]
impl Mailer for AcceptAllMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
        Ok(())
    }
}
