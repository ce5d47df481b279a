use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::MailerConfig;
use crate::error::{AppError, AppResult};
use crate::services::CodeSender;

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: String,
}

/// Verification-code delivery over an HTTP email API.
#[derive(Clone)]
pub struct MailerService {
    client: Client,
    config: MailerConfig,
}

impl MailerService {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CodeSender for MailerService {
    async fn send_code(&self, email: &str, code: &str) -> AppResult<()> {
        let url = format!("{}/emails", self.config.base_url);

        let body = SendEmailRequest {
            from: &self.config.from_email,
            to: vec![email],
            subject: "Your Login Verification Code",
            text: format!("Your verification code is: {code}. It expires in 5 minutes."),
        };

        // a connection-level failure is still a delivery failure
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::NotificationFailure(e.to_string()))?;

        if response.status().is_success() {
            log::info!("Verification code email sent to {email}");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Verification code email to {email} failed: {error_text}");
            Err(AppError::NotificationFailure(error_text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailerConfig;

    #[tokio::test]
    async fn test_unreachable_mail_api_is_a_notification_failure() {
        let mailer = MailerService::new(MailerConfig {
            // nothing listens here; the connection is refused
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "test-key".to_string(),
            from_email: "noreply@studenthelp.test".to_string(),
        });

        let err = mailer.send_code("a@x.com", "123456").await.unwrap_err();
        assert!(matches!(err, AppError::NotificationFailure(_)));
    }
}
