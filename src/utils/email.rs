//! Outbound mail: the notification collaborator for account activation.

use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, instrument};

use crate::config::email::EmailConfig;
use crate::utils::errors::AppError;

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, activation_code))]
    pub async fn send_activation_email(
        &self,
        to_email: &str,
        to_name: &str,
        activation_code: &str,
    ) -> Result<(), AppError> {
        if !self.config.enabled {
            info!(to = %to_email, "SMTP disabled, skipping activation email");
            return Ok(());
        }

        let activation_link = format!(
            "{}/confirm-account?code={}",
            self.config.frontend_url, activation_code
        );

        let html_body = self.activation_template(to_name, &activation_link);
        let text_body = format!(
            "Hi {},\n\n\
             Welcome to Slateboard!\n\n\
             Click the link below to activate your account:\n\
             {}\n\n\
             The link expires in 24 hours. If you didn't create this account,\n\
             please ignore this email.\n\n\
             Best regards,\n\
             Slateboard Team",
            to_name, activation_link
        );

        self.send_email(to_email, "Activate your account", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::Internal(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP relay: {}", e)))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        mailer
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        info!(to = %to_email, subject = %subject, "email sent");
        Ok(())
    }

    fn activation_template(&self, name: &str, link: &str) -> String {
        format!(
            r#"<html>
  <body style="font-family: sans-serif; color: #1f2933;">
    <h2>Welcome to Slateboard, {name}!</h2>
    <p>Your account has been created. Click the button below to activate it.</p>
    <p>
      <a href="{link}" style="background: #2563eb; color: #fff; padding: 10px 18px;
         border-radius: 6px; text-decoration: none;">Activate account</a>
    </p>
    <p>The link expires in 24 hours. If you didn't create this account, you can ignore this email.</p>
    <p>Slateboard Team</p>
  </body>
</html>"#
        )
    }
}
