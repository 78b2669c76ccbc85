//! A mailer that records what it is asked to send.

use crate::error::{Result, StockroomError};
use crate::traits::mailer::{Email, Mailer};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records sent emails for assertions.
///
/// Clones share the same outbox. Notifications are sent from background
/// tasks, so assert through [`RecordingMailer::wait_for`].
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails. Nothing is recorded.
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    /// Emails sent so far.
    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Wait until at least `count` emails were sent, for up to two seconds.
    pub async fn wait_for(&self, count: usize) -> Vec<Email> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        if self.fail {
            return Err(StockroomError::internal("Mail delivery failed"));
        }
        email.validate()?;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}
