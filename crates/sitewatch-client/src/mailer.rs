use std::sync::Arc;
use std::time::Duration;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use sitewatch_core::config::{ClientConfig, ServerConfig};
use sitewatch_core::error::AppError;
use sitewatch_core::models::Envelope;
use sitewatch_core::traits::Mailer;

/// SMTP mailer using lettre.
///
/// Plain SMTP by default, STARTTLS when the server config asks for it.
/// Authenticates with the sender credential when a password is set.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn from_config(
        server: &ServerConfig,
        client: &ClientConfig,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let builder = if server.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&server.host)
                .map_err(|e| AppError::ConfigError(format!("Invalid SMTP relay: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&server.host)
        };

        let mut builder = builder.port(server.port).timeout(Some(timeout));
        if !client.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                client.email.clone(),
                client.password.clone(),
            ));
        }

        tracing::debug!(
            server = %server.address(),
            starttls = server.starttls,
            "SMTP transport configured"
        );

        Ok(Self {
            transport: Arc::new(builder.build()),
        })
    }
}

/// Build the plain-text message for one notification.
pub fn build_message(envelope: &Envelope, body: &str) -> Result<Message, AppError> {
    let from: Mailbox = envelope
        .from
        .parse()
        .map_err(|e| AppError::DeliveryError(format!("Invalid sender {}: {e}", envelope.from)))?;
    let to: Mailbox = envelope
        .to
        .parse()
        .map_err(|e| AppError::DeliveryError(format!("Invalid recipient {}: {e}", envelope.to)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(envelope.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| AppError::DeliveryError(e.to_string()))
}

impl Mailer for SmtpMailer {
    async fn deliver(&self, envelope: &Envelope, body: &str) -> Result<(), AppError> {
        let message = build_message(envelope, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::DeliveryError(e.to_string()))?;
        tracing::debug!(to = %envelope.to, "Mail accepted by server");
        Ok(())
    }
}
