//! Notification sink that writes to the log instead of sending mail.

use async_trait::async_trait;

use domains::{DomainResult, Notification, Notifier, User};

#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user: &User, notification: Notification) -> DomainResult<()> {
        match notification {
            Notification::VerifyEmail { url } => {
                tracing::info!(user_id = %user.id, email = %user.email, %url, "verify email");
            }
            Notification::ResetPassword { token } => {
                tracing::info!(
                    user_id = %user.id,
                    email = %user.email,
                    reset_path = %format!("/password/reset/{token}"),
                    "reset password"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::UserId;

    #[tokio::test]
    async fn never_fails() {
        let user = User {
            id: UserId(1),
            username: "peter".into(),
            email: "peter@example.com".into(),
            password_hash: String::new(),
            email_verified_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        LogNotifier
            .notify(&user, Notification::ResetPassword { token: "t".into() })
            .await
            .unwrap();
    }
}
