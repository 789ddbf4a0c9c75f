//! services/mail_transport.rs
//! Envío de un email HTML a un destinatario, por SMTP (lettre) o por API HTTP.
//!
//! Los problemas de configuración nunca llegan al proveedor: se detectan antes
//! y se devuelven como `SendOutcome` fallido, no como error.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::{
    config::app_config::{AppConfig, HttpMailConfig, MailProvider, SmtpConfig},
    errors::DispatchError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    pub message: String,
}

impl SendOutcome {
    pub fn sent() -> Self {
        SendOutcome {
            success: true,
            message: "Email sent successfully.".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        SendOutcome {
            success: false,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// `Ok` con `success=false` = el proveedor rechazó o falta configuración.
    /// `Err` = fallo inesperado (red caída, destinatario ilegible...).
    async fn send(&self, to: &str, subject: &str, html: &str)
        -> Result<SendOutcome, DispatchError>;
}

/// Valida una dirección de destino.
pub fn parse_recipient(to: &str) -> Result<Address, DispatchError> {
    to.trim()
        .parse::<Address>()
        .map_err(|e| DispatchError::Validation(format!("Invalid recipient '{}': {}", to, e)))
}

/// Texto del fallo de configuración tal cual lo ve el usuario.
fn config_message(e: &DispatchError) -> String {
    match e {
        DispatchError::Configuration(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Elige el transporte según MAIL_PROVIDER.
pub fn build_transport(config: &AppConfig) -> Arc<dyn MailTransport> {
    match config.mail_provider {
        MailProvider::Smtp => Arc::new(SmtpMailTransport::new(config.smtp.clone())),
        MailProvider::Http => Arc::new(HttpApiMailTransport::new(config.http_mail.clone())),
    }
}

// ========================================================================
// SMTP
// ========================================================================

pub struct SmtpMailTransport {
    mailer: Result<(AsyncSmtpTransport<Tokio1Executor>, Mailbox), DispatchError>,
}

impl SmtpMailTransport {
    pub fn new(config: SmtpConfig) -> Self {
        let mailer = Self::build_mailer(&config);
        if let Err(e) = &mailer {
            log::warn!("(smtp) Transport disabled: {}", e);
        }
        Self { mailer }
    }

    fn build_mailer(
        config: &SmtpConfig,
    ) -> Result<(AsyncSmtpTransport<Tokio1Executor>, Mailbox), DispatchError> {
        config.validate()?;

        // validate() ya garantizó que existen
        let (host, port, user, pass) = match (&config.host, config.port, &config.user, &config.pass)
        {
            (Some(h), Some(p), Some(u), Some(pw)) => (h, p, u, pw),
            _ => {
                return Err(DispatchError::Configuration(
                    "SMTP configuration is incomplete.".to_string(),
                ))
            }
        };

        let from: Mailbox = format!("\"{}\" <{}>", config.from_name, user)
            .parse()
            .map_err(|e| {
                DispatchError::Configuration(format!("Invalid SMTP_USER as sender address: {e}"))
            })?;

        // 465 = TLS implícito; el resto negocia STARTTLS
        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| DispatchError::Configuration(format!("Invalid SMTP host '{}': {}", host, e)))?;

        let mailer = builder
            .port(port)
            .credentials(Credentials::new(user.clone(), pass.clone()))
            .build();

        Ok((mailer, from))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<SendOutcome, DispatchError> {
        let (mailer, from) = match &self.mailer {
            Ok(ready) => ready,
            Err(config_error) => {
                log::error!("(smtp) {}", config_error);
                return Ok(SendOutcome::failure(config_message(config_error)));
            }
        };

        let to_addr = parse_recipient(to)?;
        let message = Message::builder()
            .from(from.clone())
            .to(Mailbox::new(None, to_addr))
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| DispatchError::Validation(format!("Failed to build message: {e}")))?;

        match mailer.send(message).await {
            Ok(_) => Ok(SendOutcome::sent()),
            Err(e) => {
                log::error!("(smtp) Send to {} failed: {}", to, e);
                Ok(SendOutcome::failure(format!(
                    "Failed to send email. Reason: {e}"
                )))
            }
        }
    }
}

// ========================================================================
// API HTTP (proveedor transaccional con endpoint JSON)
// ========================================================================

#[derive(Clone)]
pub struct HttpApiMailTransport {
    config: HttpMailConfig,
    http_client: Client,
}

impl HttpApiMailTransport {
    pub fn new(config: HttpMailConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpApiMailTransport {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<SendOutcome, DispatchError> {
        if let Err(config_error) = self.config.validate() {
            log::error!("(http_mail) {}", config_error);
            return Ok(SendOutcome::failure(config_message(&config_error)));
        }
        let (Some(url), Some(key), Some(from)) =
            (&self.config.api_url, &self.config.api_key, &self.config.from)
        else {
            return Ok(SendOutcome::failure("Mail API configuration is incomplete."));
        };

        parse_recipient(to)?;

        let resp = self
            .http_client
            .post(url)
            .bearer_auth(key)
            .json(&json!({
                "from": from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| DispatchError::Transport(format!("Mail API request failed: {e}")))?;

        if resp.status().is_success() {
            Ok(SendOutcome::sent())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            log::error!("(http_mail) Provider answered {} for {}: {}", status, to, body);
            Ok(SendOutcome::failure(format!(
                "Failed to send email. Reason: provider returned {status}: {body}"
            )))
        }
    }
}
