pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::{error, info, instrument};

pub use smtp::SmtpMailer;

/// Notification errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("could not build message: {0}")]
    Message(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Plain-text mail ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError>;
}

/// Six digit code, uniform over 100000..=999999.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// Mails order confirmation codes
#[derive(Clone)]
pub struct OtpNotifier {
    mailer: Arc<dyn Mailer>,
}

impl OtpNotifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Sends `code` to each recipient in turn. The first failure aborts;
    /// mails already handed to the transport are not recalled.
    #[instrument(skip(self, code), fields(recipients = recipients.len()))]
    pub async fn dispatch(&self, code: &str, recipients: &[String]) -> Result<(), NotificationError> {
        for recipient in recipients {
            self.mailer
                .send(otp_email(recipient, code))
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to send OTP email");
                    e
                })?;
        }
        info!("OTP email dispatched");
        Ok(())
    }
}

fn otp_email(to: &str, code: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: "Your Honey Palace order OTP".to_string(),
        body: format!(
            "Thank you for shopping with Honey Palace.\n\n\
             Your order confirmation code is {code}.\n\n\
             If you did not place this order, please ignore this email."
        ),
    }
}
