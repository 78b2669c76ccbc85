//! Console mailer for development
//!
//! Writes email metadata to the log instead of sending anything. Body
//! content is redacted unless full output is switched on, since logs are
//! often shipped elsewhere.

use crate::error::Result;
use crate::traits::mailer::{Email, Mailer};
use async_trait::async_trait;

/// A mailer that logs emails instead of sending them
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::email::ConsoleMailer;
///
/// let mailer = ConsoleMailer::new().with_full_output(true);
/// mailer.send(&Email::new("from@example.com", "to@example.com", "Hi").text("Hello!")).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsoleMailer {
    show_full_content: bool,
}

impl ConsoleMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable full email content output
    ///
    /// Default: `false` (body content is redacted)
    pub fn with_full_output(mut self, enabled: bool) -> Self {
        if enabled {
            tracing::warn!(
                "ConsoleMailer: full output enabled - email content will be visible in logs"
            );
        }
        self.show_full_content = enabled;
        self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        email.validate()?;

        if self.show_full_content {
            tracing::info!(
                from = %email.from,
                to = ?email.to,
                subject = %email.subject,
                text = email.text.as_deref().unwrap_or_default(),
                html = email.html.as_deref().unwrap_or_default(),
                "Email (console)"
            );
        } else {
            tracing::info!(
                from = %email.from,
                recipients = email.to.len(),
                subject = %email.subject,
                text_bytes = email.text.as_ref().map_or(0, String::len),
                html_bytes = email.html.as_ref().map_or(0, String::len),
                "Email (console, body redacted)"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_mailer_sends_without_error() {
        let mailer = ConsoleMailer::new();
        let email = Email::new("from@test.com", "to@test.com", "Test Subject").text("Test body");

        assert!(mailer.send(&email).await.is_ok());
    }

    #[tokio::test]
    async fn test_console_mailer_validates_email() {
        let mailer = ConsoleMailer::new().with_full_output(true);
        let email = Email::new("from@test.com", "to@test.com", "Test Subject");

        assert!(mailer.send(&email).await.is_err());
    }
}
