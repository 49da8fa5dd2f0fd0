use crate::batch_mailer::{BatchMailer, RunStats};
use crate::content::ContentGenerator;
use crate::domain::send_log::SendLog;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::config::SmtpSettings;
use crate::email_client::{ConfigurationError, EmailTransport, SmtpEmailClient};
use crate::store::{StoreError, SubscriberStore};
use crate::utils::error_chain_fmt;

pub const FAILED_RUN_SUBJECT: &str = "Newsletter Generation Failed";

#[derive(thiserror::Error)]
pub enum WeeklySendError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Failed to fetch subscribers: {0}")]
    FetchSubscribers(#[source] StoreError),
}

impl std::fmt::Debug for WeeklySendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing to do, nobody is subscribed.
    NoSubscribers,
    Sent {
        subject: String,
        used_fallback: bool,
        stats: RunStats,
        /// `None` when the statistics could not be stored.
        send_log: Option<SendLog>,
    },
}

/// One weekly run: subscribers, content, delivery, statistics.
pub struct WeeklySend<T> {
    store: SubscriberStore,
    content: ContentGenerator,
    mailer: BatchMailer<T>,
    unsubscribe_url: String,
}

impl<T: EmailTransport> WeeklySend<T> {
    pub fn new(
        store: SubscriberStore,
        content: ContentGenerator,
        mailer: BatchMailer<T>,
        unsubscribe_url: String,
    ) -> Self {
        Self {
            store,
            content,
            mailer,
            unsubscribe_url,
        }
    }

    #[tracing::instrument(name = "Weekly newsletter run", skip(self))]
    pub async fn run(&self) -> Result<RunOutcome, WeeklySendError> {
        tracing::info!("Fetching active subscribers");
        let recipients: Vec<SubscriberEmail> = self
            .store
            .list_active()
            .await
            .map_err(WeeklySendError::FetchSubscribers)?
            .into_iter()
            .map(|subscriber| subscriber.email)
            .collect();

        if recipients.is_empty() {
            tracing::warn!("No active subscribers found. Nothing to send.");
            return Ok(RunOutcome::NoSubscribers);
        }

        tracing::info!("Found {} active subscribers", recipients.len());

        let generated = self.content.generate().await;
        let used_fallback = generated.is_fallback();
        let content = generated.into_content();

        tracing::info!(
            subject = %content.subject,
            html_length = content.html.len(),
            used_fallback,
            "Newsletter content ready"
        );

        let stats = self
            .mailer
            .send_newsletter(&recipients, &content.subject, &content.html, &self.unsubscribe_url)
            .await;

        let error_details = failed_emails_details(&stats);
        let send_log = match self
            .store
            .record_send(
                stats.sent as i64,
                stats.failed as i64,
                stats.latency_ms(),
                error_details.as_deref(),
                Some(&content.subject),
            )
            .await
        {
            Ok(send_log) => Some(send_log),
            Err(err) => {
                tracing::warn!("Failed to log sending statistics: {:?}", err);
                None
            }
        };

        Ok(RunOutcome::Sent {
            subject: content.subject,
            used_fallback,
            stats,
            send_log,
        })
    }

    /// Runs once and, when the run fails, stores a zero-sent log describing the error.
    pub async fn run_and_record(&self) -> Result<RunOutcome, WeeklySendError> {
        match self.run().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!("Newsletter automation failed: {:?}", err);
                record_failed_run(&self.store, &err.to_string()).await;
                Err(err)
            }
        }
    }
}

pub fn failed_emails_details(stats: &RunStats) -> Option<String> {
    if stats.failed_emails.is_empty() {
        return None;
    }

    Some(format!("Failed emails: {}", stats.failed_emails.join(", ")))
}

/// Pre-flight check of the SMTP settings. An invalid configuration is recorded
/// as a failed run before it is returned.
pub async fn prepare_email_client(
    store: &SubscriberStore,
    settings: &SmtpSettings,
) -> Result<SmtpEmailClient, WeeklySendError> {
    match SmtpEmailClient::new(settings) {
        Ok(email_client) => Ok(email_client),
        Err(err) => {
            let err = WeeklySendError::from(err);
            tracing::error!("Newsletter automation failed: {:?}", err);
            record_failed_run(store, &err.to_string()).await;
            Err(err)
        }
    }
}

/// Best effort: a failure to write the log is only reported.
pub async fn record_failed_run(store: &SubscriberStore, error_details: &str) -> Option<SendLog> {
    match store
        .record_send(0, 0, 0, Some(error_details), Some(FAILED_RUN_SUBJECT))
        .await
    {
        Ok(send_log) => Some(send_log),
        Err(err) => {
            tracing::warn!("Failed to log the failed run: {:?}", err);
            None
        }
    }
}
