//! Outbound email delivery
//!
//! The reset flow hands a finished message to a `Mailer` and treats any error
//! as a delivery failure. `LogMailer` is the local-development sender;
//! `HttpMailer` posts JSON to a transactional mail API.

use async_trait::async_trait;
use exploria_core::EmailConfig;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl std::fmt::Debug for EmailMessage {
    // Bodies can carry one-time reset links
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailMessage")
            .field("to", &self.to)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail API rejected message with status {status}")]
    Rejected { status: u16 },

    #[error("Mail delivery timed out")]
    Timeout,

    #[error("Mailer is not configured: {0}")]
    NotConfigured(String),
}

/// Email delivery abstraction
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or report why it could not be delivered
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

/// Development sender: records the dispatch in the log and succeeds
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Email dispatched (log provider)"
        );
        Ok(())
    }
}

/// Payload accepted by the mail API
#[derive(Debug, Serialize)]
struct MailApiRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends mail through an HTTP API with a bearer key
#[derive(Clone, Debug)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, DeliveryError> {
        let api_url = config
            .api_url
            .clone()
            .ok_or_else(|| DeliveryError::NotConfigured("EMAIL_API_URL".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let payload = MailApiRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DeliveryError::Timeout
            } else {
                DeliveryError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(to = %message.to, subject = %message.subject, "Email accepted by mail API");
        Ok(())
    }
}

/// Body of the password reset email
pub fn reset_message(to: &str, reset_url: &str, ttl_mins: u64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Your password reset link (valid for {ttl_mins} minutes)"),
        body: format!(
            "Forgot your password? Submit a PATCH request with your new password and \
             passwordConfirm to: {reset_url}\n\
             If you didn't forget your password, please ignore this email."
        ),
    }
}
