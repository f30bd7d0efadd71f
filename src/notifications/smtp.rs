use std::fmt;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, instrument};

use super::{Mailer, NotificationError, OutboundEmail};
use crate::config::SmtpConfig;

/// Mailer backed by an SMTP relay
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        let from = parse_mailbox(&config.from)?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotificationError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = builder.port(config.port);
        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(subject = %email.subject))]
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        let to = parse_mailbox(&email.to)?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| NotificationError::Message(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        debug!(code = %response.code(), "SMTP relay accepted message");
        Ok(())
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, NotificationError> {
    raw.trim()
        .parse::<Mailbox>()
        .map_err(|e| NotificationError::InvalidAddress {
            address: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn local_config() -> SmtpConfig {
        SmtpConfig {
            host: "127.0.0.1".into(),
            port: 1025,
            starttls: false,
            ..SmtpConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_sender() {
        let cfg = SmtpConfig {
            from: "not a mailbox".into(),
            ..local_config()
        };
        assert_matches!(
            SmtpMailer::new(&cfg),
            Err(NotificationError::InvalidAddress { .. })
        );
    }

    #[tokio::test]
    async fn debug_output_omits_credentials() {
        let cfg = SmtpConfig {
            username: Some("orders@honeypalace.in".into()),
            password: Some("hunter2".into()),
            ..local_config()
        };
        let mailer = SmtpMailer::new(&cfg).unwrap();
        let rendered = format!("{mailer:?}");
        assert!(rendered.starts_with("SmtpMailer"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn parses_display_name_mailbox() {
        let mailbox = parse_mailbox("Honey Palace <no-reply@honeypalace.in>").unwrap();
        assert_eq!(mailbox.email.to_string(), "no-reply@honeypalace.in");
    }

    #[tokio::test]
    async fn invalid_recipient_fails_before_connecting() {
        let mailer = SmtpMailer::new(&local_config()).unwrap();
        let result = mailer
            .send(OutboundEmail {
                to: "nobody".into(),
                subject: "OTP".into(),
                body: "123456".into(),
            })
            .await;
        assert_matches!(result, Err(NotificationError::InvalidAddress { .. }));
    }
}
