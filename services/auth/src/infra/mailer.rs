use std::time::Duration;

use anyhow::Context as _;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::AuthConfig;
use crate::domain::repository::Mailer;
use crate::error::AuthError;

const ACCESS_CODE_SUBJECT: &str = "Seu código de acesso - Conecta Uniforme";

/// SMTP-backed access code delivery.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    max_attempts: u32,
}

impl SmtpMailer {
    /// Builds the relay once at startup; bad SMTP settings fail here instead
    /// of on the first login attempt.
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .context("configure smtp relay")?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.smtp_timeout_secs)));
        // Credentials are optional; local relays accept anonymous submission.
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = format!("{} <{}>", config.smtp_from_name, config.smtp_from)
            .parse::<Mailbox>()
            .context("parse smtp sender mailbox")?;

        Ok(Self {
            transport: builder.build(),
            from,
            max_attempts: config.smtp_max_attempts.max(1),
        })
    }
}

impl Mailer for SmtpMailer {
    async fn send_access_code(
        &self,
        to: &str,
        name: &str,
        code: &str,
        ttl_hours: i64,
    ) -> Result<(), AuthError> {
        let recipient = format!("{name} <{to}>")
            .parse::<Mailbox>()
            .or_else(|_| to.parse::<Mailbox>())
            .context("parse recipient mailbox")?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(ACCESS_CODE_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(render_access_code_body(name, code, ttl_hours))
            .context("build access code email")?;

        // Each attempt is bounded by the transport timeout.
        for attempt in 1..=self.max_attempts {
            match self.transport.send(message.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "access code email send failed");
                }
            }
        }
        Err(AuthError::DeliveryFailed)
    }
}

fn render_access_code_body(name: &str, code: &str, ttl_hours: i64) -> String {
    let name = escape_html(name);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="margin: 0; padding: 0; background-color: #f4f4f4; font-family: Arial, Helvetica, sans-serif;">
  <div style="max-width: 520px; margin: 24px auto; padding: 32px; background-color: #ffffff; border-radius: 8px;">
    <h2 style="margin-top: 0; color: #2c5aa0;">Conecta Uniforme</h2>
    <p>Olá, <strong>{name}</strong>!</p>
    <p>Você solicitou um código de acesso para entrar no sistema.</p>
    <div style="margin: 24px 0; padding: 16px; background-color: #f0f4fa; border-radius: 6px; text-align: center; font-size: 32px; font-weight: bold; letter-spacing: 8px; color: #2c5aa0;">{code}</div>
    <p>Este código é válido por {ttl_hours} horas.</p>
    <p>Se você não solicitou este código, ignore este email.</p>
    <hr style="border: none; border-top: 1px solid #e0e0e0; margin: 24px 0;">
    <p style="font-size: 12px; color: #888888;">Este é um email automático. Por favor, não responda.</p>
  </div>
</body>
</html>"#
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
