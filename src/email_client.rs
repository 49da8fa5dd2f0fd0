use async_trait::async_trait;
use lettre::message::{Mailbox, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::config::{SmtpSettings, SmtpTls};
use crate::domain::subscriber_email::SubscriberEmail;

pub const UNSUBSCRIBE_PLACEHOLDER: &str = "{{UNSUBSCRIBE_LINK}}";

/// Delivers one message to a group of recipients that must not see each other.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_batch(
        &self,
        recipients: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
    ) -> Result<(), TransportError>;
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("SMTP credentials not configured. Set smtp.email and smtp.password.")]
    MissingCredentials,
    #[error("{0} is not a valid sender address")]
    InvalidSender(String),
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("{0} is not a valid recipient address")]
    InvalidAddress(String),
    #[error("Failed to build the email message.")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed.")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("SMTP delivery timed out after {0:?}")]
    Timeout(time::Duration),
}

#[derive(Debug)]
pub struct SmtpEmailClient {
    host: String,
    port: u16,
    tls: SmtpTls,
    timeout: time::Duration,
    sender: Mailbox,
    username: String,
    password: Secret<String>,
}

impl SmtpEmailClient {
    /// Fails fast when the credentials are missing, before any connection is attempted.
    pub fn new(settings: &SmtpSettings) -> Result<SmtpEmailClient, ConfigurationError> {
        let (username, password) = settings
            .get_credentials()
            .ok_or(ConfigurationError::MissingCredentials)?;
        let address: Address = username
            .parse()
            .map_err(|_| ConfigurationError::InvalidSender(username.clone()))?;
        let sender = Mailbox::new(Some(settings.from_name.clone()), address);

        Ok(SmtpEmailClient {
            host: settings.host.clone(),
            port: settings.port,
            tls: settings.tls,
            timeout: settings.get_timeout(),
            sender,
            username,
            password,
        })
    }

    pub fn sender(&self) -> &Mailbox {
        &self.sender
    }

    /// Every call builds a new transport, so each batch gets its own SMTP session.
    fn open_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
        let builder = match self.tls {
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host),
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)?,
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?,
        };

        Ok(builder
            .port(self.port)
            .timeout(Some(self.timeout))
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.expose_secret().clone(),
            ))
            .build())
    }

    /// The sending account is the visible recipient; the batch only appears in the envelope.
    pub fn build_batch_message(
        &self,
        recipients: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
    ) -> Result<Message, TransportError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .reply_to(self.sender.clone())
            .to(self.sender.clone())
            .subject(subject);

        for recipient in recipients {
            builder = builder.bcc(parse_mailbox(recipient)?);
        }

        Ok(builder.singlepart(SinglePart::html(html_content.to_string()))?)
    }

    #[tracing::instrument(
        name = "Send a single email",
        skip(self, html_content, unsubscribe_url),
        fields(recipient = %recipient)
    )]
    pub async fn send_single_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
        unsubscribe_url: Option<&str>,
    ) -> Result<(), TransportError> {
        let html_content =
            html_content.replace(UNSUBSCRIBE_PLACEHOLDER, unsubscribe_url.unwrap_or("#"));
        let message = Message::builder()
            .from(self.sender.clone())
            .reply_to(self.sender.clone())
            .to(parse_mailbox(recipient)?)
            .subject(subject)
            .singlepart(SinglePart::html(html_content))?;

        self.open_transport()?.send(message).await?;

        Ok(())
    }

    /// Connects and authenticates without sending anything.
    pub async fn verify_connection(&self) -> Result<bool, TransportError> {
        Ok(self.open_transport()?.test_connection().await?)
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailClient {
    async fn send_batch(
        &self,
        recipients: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
    ) -> Result<(), TransportError> {
        let message = self.build_batch_message(recipients, subject, html_content)?;

        self.open_transport()?.send(message).await?;

        Ok(())
    }
}

fn parse_mailbox(email: &SubscriberEmail) -> Result<Mailbox, TransportError> {
    email
        .as_ref()
        .parse()
        .map_err(|_| TransportError::InvalidAddress(email.to_string()))
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every batch it receives and fails the ones listed in `failing_batches`.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        failing_batches: HashSet<usize>,
        pub(crate) sent: Mutex<Vec<SentBatch>>,
    }

    #[derive(Clone, Debug)]
    pub(crate) struct SentBatch {
        pub(crate) recipients: Vec<String>,
        pub(crate) subject: String,
        pub(crate) html_content: String,
    }

    impl RecordingTransport {
        pub(crate) fn failing_on(batches: impl IntoIterator<Item = usize>) -> Self {
            Self {
                failing_batches: batches.into_iter().collect(),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn batches(&self) -> Vec<SentBatch> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn send_batch(
            &self,
            recipients: &[SubscriberEmail],
            subject: &str,
            html_content: &str,
        ) -> Result<(), TransportError> {
            let mut sent = self.sent.lock().unwrap();
            let batch_index = sent.len();

            sent.push(SentBatch {
                recipients: recipients.iter().map(|r| r.to_string()).collect(),
                subject: subject.to_string(),
                html_content: html_content.to_string(),
            });

            if self.failing_batches.contains(&batch_index) {
                // Stands in for a stalled or dropped connection
                return Err(TransportError::Timeout(time::Duration::ZERO));
            }

            Ok(())
        }
    }
}
