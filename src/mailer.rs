//! Outbound mail collaborator.
//!
//! Accounts only hand over a recipient, a subject and a rendered body; how
//! the message travels is up to the [`Mailer`] implementation. Failures are
//! reported back to the caller and never retried here.

use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::AccountError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), AccountError>;
}

/// Posts each message as JSON to a mail relay API.
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>, token: Option<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AccountError> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.body,
        };
        let mut req = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| AccountError::MailDelivery(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AccountError::MailDelivery(format!(
                "relay answered {}",
                resp.status()
            )));
        }
        debug!("mail relayed to {}", message.to);
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AccountError> {
        info!(
            "mail to={} subject={:?}\n{}",
            message.to, message.subject, message.body
        );
        Ok(())
    }
}

pub fn from_config(config: &AppConfig) -> Box<dyn Mailer> {
    match &config.mail_api_url {
        Some(url) => Box::new(HttpMailer::new(
            url.clone(),
            config.mail_api_token.clone(),
            config.mail_from.clone(),
        )),
        None => Box::new(LogMailer),
    }
}
