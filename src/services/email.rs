//! Email service for borrower notifications
//!
//! With `email.enabled = false` messages are written to the log instead of
//! being sent.

use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

const SUBJECT_PREFIX: &str = "[BoxBox]";

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Confirmation after a successful borrow
    pub async fn send_borrow_confirmation(
        &self,
        to: &str,
        user_name: &str,
        box_name: &str,
        item_count: usize,
        days: i32,
        borrowed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let subject = format!("{} Borrow confirmed: {}", SUBJECT_PREFIX, box_name);
        let body = format!(
            r#"Dear {user_name},

You borrowed the box "{box_name}".
Items: {item_count}
Duration: {days} day(s)
Borrowed at: {borrowed_at}
"#,
            borrowed_at = borrowed_at.format("%Y-%m-%d %H:%M UTC"),
        );

        self.send_email(to, &subject, &body).await
    }

    pub async fn send_return_approved(&self, to: &str, user_name: &str, item_name: &str) -> AppResult<()> {
        let subject = format!("{} Return approved: {}", SUBJECT_PREFIX, item_name);
        let body = format!(
            r#"Dear {user_name},

Your return request for "{item_name}" has been approved.
"#
        );

        self.send_email(to, &subject, &body).await
    }

    pub async fn send_return_rejected(
        &self,
        to: &str,
        user_name: &str,
        item_name: &str,
        reason: &str,
    ) -> AppResult<()> {
        let subject = format!("{} Return not approved: {}", SUBJECT_PREFIX, item_name);
        let body = format!(
            r#"Dear {user_name},

Your return request for "{item_name}" was not approved.
Reason: {reason}
"#
        );

        self.send_email(to, &subject, &body).await
    }

    /// Reminder sent one day before the due date
    pub async fn send_due_soon(
        &self,
        to: &str,
        user_name: &str,
        box_name: &str,
        due_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let subject = format!("{} Reminder: \"{}\" is due soon", SUBJECT_PREFIX, box_name);
        let body = format!(
            r#"Dear {user_name},

Your borrowed box "{box_name}" is due on {due} (in about 1 day).
Please get ready to return it on time.

Thank you.
"#,
            due = due_at.format("%Y-%m-%d"),
        );

        self.send_email(to, &subject, &body).await
    }

    /// Free-form message from an administrator
    pub async fn send_admin_message(&self, to: &str, subject: &str, message: &str) -> AppResult<()> {
        self.send_email(to, subject, message).await
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        if !self.config.enabled {
            tracing::info!(to, subject, body, "Email delivery disabled, message logged");
            return Ok(());
        }

        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("BoxBox");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><p>{}</p></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => mailer_builder,
        };

        mailer_builder
            .build()
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::debug!(to, subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_delivery_only_logs() {
        let service = EmailService::new(EmailConfig::default());
        service
            .send_return_rejected("user@example.com", "User", "Tent", "Missing pegs")
            .await
            .unwrap();
    }
}
