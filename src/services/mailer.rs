use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

/// SMTP delivery through lettre's tokio transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = if config.smtp_username.is_empty() {
            debug!("Using unauthenticated SMTP relay {}:{}", config.smtp_host, config.smtp_port);
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_host.as_str())
                .port(config.smtp_port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .build()
        };

        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let message = build_message(&mail)?;
        self.transport.send(message).await?;
        info!("Sent \"{}\" to {} recipient(s)", mail.subject, mail.to.len());
        Ok(())
    }
}

fn build_message(mail: &OutgoingMail) -> Result<Message> {
    if mail.to.is_empty() {
        return Err(AppError::Email("No recipients configured".to_string()));
    }

    let mut builder = Message::builder()
        .from(mail.from.parse::<Mailbox>()?)
        .subject(mail.subject.as_str())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &mail.to {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }

    Ok(builder.body(mail.body.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: Vec<&str>) -> OutgoingMail {
        OutgoingMail {
            subject: "New comment".to_string(),
            from: "noreply@example.com".to_string(),
            to: to.into_iter().map(String::from).collect(),
            body: "body".to_string(),
        }
    }

    #[test]
    fn test_build_message_with_several_recipients() {
        let message = build_message(&mail(vec!["a@example.com", "b@example.com"])).unwrap();
        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 2);
    }

    #[test]
    fn test_build_message_rejects_bad_input() {
        assert!(matches!(build_message(&mail(vec![])), Err(AppError::Email(_))));
        assert!(matches!(
            build_message(&mail(vec!["not an address"])),
            Err(AppError::Email(_))
        ));
    }
}
