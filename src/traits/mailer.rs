//! Mailer trait for outbound notifications
//!
//! Invitation notifications go through this trait. Delivery is the host's
//! concern; a failed send never fails the operation that triggered it.

use crate::error::{Result, StockroomError};
use async_trait::async_trait;

/// An email message to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    /// Plain text body (optional if html is provided)
    pub text: Option<String>,
    /// HTML body (optional if text is provided)
    pub html: Option<String>,
}

impl Email {
    /// Create a new email with the required fields
    pub fn new(from: impl Into<String>, to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
            subject: subject.into(),
            text: None,
            html: None,
        }
    }

    /// Set the plain text body
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    /// Set the HTML body
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    /// Validate the email has required fields
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() {
            return Err(StockroomError::bad_request("Email 'from' is required"));
        }
        if self.to.is_empty() {
            return Err(StockroomError::bad_request("Email 'to' is required"));
        }
        if self.subject.is_empty() {
            return Err(StockroomError::bad_request("Email 'subject' is required"));
        }
        if self.text.is_none() && self.html.is_none() {
            return Err(StockroomError::bad_request(
                "Email must have either 'text' or 'html' body",
            ));
        }
        Ok(())
    }
}

/// Mailer trait for sending emails
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::traits::mailer::{Email, Mailer};
///
/// struct ResendMailer { client: resend::Client }
///
/// #[async_trait]
/// impl Mailer for ResendMailer {
///     async fn send(&self, email: &Email) -> Result<()> {
///         self.client.send(email).await.map_err(StockroomError::from)
///     }
/// }
/// ```
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an email
    async fn send(&self, email: &Email) -> Result<()>;
}
