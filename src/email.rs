/**
 * Email
 * Transactional mail for verification and password reset
 */
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Email provider returned {status}")]
    Provider { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    pub fn verification(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify your email".to_string(),
            html: format!(
                "<p>Welcome! Confirm your address by following <a href=\"{0}\">{0}</a>.</p>",
                link
            ),
        }
    }

    pub fn password_reset(to: &str, link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            html: format!(
                "<p>Reset your password at <a href=\"{0}\">{0}</a>. The link expires in one hour.</p>",
                link
            ),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Posts messages to an HTTP mail API with bearer authentication.
pub struct HttpEmailSender {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let body = SendRequest {
            from: &self.config.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Email send failed with status {}", status);
            return Err(EmailError::Provider {
                status: status.as_u16(),
            });
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Development sender: writes the message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email delivery disabled, message body: {}",
            message.html
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_message_contains_link() {
        let msg = EmailMessage::password_reset("a@example.com", "https://x/reset?token=abc");
        assert_eq!(msg.to, "a@example.com");
        assert!(msg.html.contains("https://x/reset?token=abc"));
    }

    #[tokio::test]
    async fn test_log_sender_never_fails() {
        let msg = EmailMessage::verification("a@example.com", "https://x/verify?token=abc");
        assert!(LogEmailSender.send(&msg).await.is_ok());
    }
}
