use anyhow::{Context, Result};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::SmtpConfig;

pub trait Mailer: Send + Sync {
    fn send(&self, subject: &str, html: &str) -> Result<()>;
}

/// Sends the digest over an authenticated STARTTLS session, one session per send.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, subject: &str, html: &str) -> Result<()> {
        let message = build_message(&self.config, subject, html)?;

        let transport = SmtpTransport::starttls_relay(&self.config.host)
            .with_context(|| format!("Failed to set up SMTP relay {}", self.config.host))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        transport
            .send(&message)
            .with_context(|| format!("Failed to send digest via {}:{}", self.config.host, self.config.port))?;

        info!(to = %self.config.to, "Email sent");
        Ok(())
    }
}

pub fn build_message(config: &SmtpConfig, subject: &str, html: &str) -> Result<Message> {
    let from: Mailbox = config
        .from
        .parse()
        .with_context(|| format!("Invalid sender address: {}", config.from))?;
    let to: Mailbox = config
        .to
        .parse()
        .with_context(|| format!("Invalid recipient address: {}", config.to))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .multipart(MultiPart::alternative().singlepart(SinglePart::html(html.to_string())))
        .context("Failed to build digest email")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every message instead of sending it.
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, subject: &str, html: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), html.to_string()));
            Ok(())
        }
    }

    fn smtp_config(from: &str, to: &str) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "agent@example.com".to_string(),
            password: "secret".to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_build_message_is_html_alternative() {
        let config = smtp_config("agent@example.com", "me@example.com");
        let message = build_message(&config, "Your Top Jobs Today", "<h1>Digest</h1>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("From: agent@example.com"));
        assert!(raw.contains("Subject: Your Top Jobs Today"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let config = smtp_config("agent@example.com", "not an address");
        let err = build_message(&config, "s", "<p></p>").unwrap_err();
        assert!(err.to_string().contains("Invalid recipient address"));
    }
}
