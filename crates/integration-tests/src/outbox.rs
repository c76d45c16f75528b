//! Notifier that keeps everything it is asked to send.

use async_trait::async_trait;
use std::sync::Mutex;

use domains::{DomainResult, Notification, Notifier, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub email: String,
    pub notification: Notification,
}

#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<Sent>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Sent> {
        self.sent.lock().expect("outbox lock poisoned").clone()
    }

    /// Most recent verification link mailed to `email`.
    pub fn verification_url(&self, email: &str) -> Option<String> {
        self.all().into_iter().rev().find_map(|sent| match sent.notification {
            Notification::VerifyEmail { url } if sent.email == email => Some(url),
            _ => None,
        })
    }

    /// Most recent reset token mailed to `email`.
    pub fn reset_token(&self, email: &str) -> Option<String> {
        self.all().into_iter().rev().find_map(|sent| match sent.notification {
            Notification::ResetPassword { token } if sent.email == email => Some(token),
            _ => None,
        })
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn notify(&self, user: &User, notification: Notification) -> DomainResult<()> {
        self.sent.lock().expect("outbox lock poisoned").push(Sent {
            email: user.email.clone(),
            notification,
        });
        Ok(())
    }
}
