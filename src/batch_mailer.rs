use std::time;
use tokio::time::Instant;

use crate::config::NewsletterSettings;
use crate::domain::send_log::round_two;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::{EmailTransport, TransportError, UNSUBSCRIBE_PLACEHOLDER};

/// Gmail rejects messages with more Bcc recipients than this.
pub const MAX_BATCH_SIZE: usize = 50;

const DEFAULT_BATCH_DELAY: time::Duration = time::Duration::from_secs(2);
const DEFAULT_SEND_TIMEOUT: time::Duration = time::Duration::from_secs(120);

/// Outcome of a single batch. A batch either goes out as a whole or fails as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub sent: usize,
    pub failed: usize,
    pub failed_emails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunStats {
    pub total_recipients: usize,
    pub sent: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub total_time_seconds: f64,
    pub failed_emails: Vec<String>,
    pub batches_processed: usize,
}

impl RunStats {
    pub fn latency_ms(&self) -> i64 {
        (self.total_time_seconds * 1000.0).round() as i64
    }
}

pub struct BatchMailer<T> {
    transport: T,
    batch_size: usize,
    batch_delay: time::Duration,
    send_timeout: time::Duration,
}

/// Splits `recipients` into consecutive chunks of at most `batch_size`, clamped to
/// `1..=MAX_BATCH_SIZE`.
pub fn create_batches<T>(recipients: &[T], batch_size: usize) -> std::slice::Chunks<'_, T> {
    recipients.chunks(batch_size.clamp(1, MAX_BATCH_SIZE))
}

impl<T: EmailTransport> BatchMailer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            batch_size: MAX_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn from_settings(transport: T, settings: &NewsletterSettings) -> Self {
        Self::new(transport)
            .with_batch_size(settings.batch_size)
            .with_batch_delay(settings.get_batch_delay())
            .with_send_timeout(settings.get_send_timeout())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn with_batch_delay(mut self, batch_delay: time::Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: time::Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[tracing::instrument(
        name = "Sending newsletter in batches",
        skip(self, recipients, html_content, unsubscribe_base_url),
        fields(total_recipients = recipients.len(), subject = %subject)
    )]
    pub async fn send_newsletter(
        &self,
        recipients: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
        unsubscribe_base_url: &str,
    ) -> RunStats {
        let started_at = Instant::now();
        let batches: Vec<&[SubscriberEmail]> =
            create_batches(recipients, self.batch_size).collect();
        let mut sent = 0;
        let mut failed = 0;
        let mut failed_emails = Vec::new();

        // The link is shared by the whole Bcc batch, so `{email}` stays a literal token
        let unsubscribe_link = format!("{}?email={{email}}", unsubscribe_base_url);
        let html_content = html_content.replace(UNSUBSCRIBE_PLACEHOLDER, &unsubscribe_link);

        for (index, batch) in batches.iter().enumerate() {
            tracing::info!(
                "Sending batch {}/{} ({} recipients)",
                index + 1,
                batches.len(),
                batch.len()
            );

            let result = self.send_batch(batch, subject, &html_content).await;

            sent += result.sent;
            failed += result.failed;
            failed_emails.extend(result.failed_emails);

            if index + 1 < batches.len() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let total_recipients = recipients.len();
        let success_rate = if total_recipients > 0 {
            sent as f64 / total_recipients as f64 * 100.0
        } else {
            0.0
        };

        let stats = RunStats {
            total_recipients,
            sent,
            failed,
            success_rate: round_two(success_rate),
            total_time_seconds: round_two(started_at.elapsed().as_secs_f64()),
            failed_emails,
            batches_processed: batches.len(),
        };

        tracing::info!(
            sent = stats.sent,
            failed = stats.failed,
            success_rate = stats.success_rate,
            total_time_seconds = stats.total_time_seconds,
            "Newsletter sending completed"
        );

        stats
    }

    async fn send_batch(
        &self,
        batch: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
    ) -> BatchResult {
        let outcome = tokio::time::timeout(
            self.send_timeout,
            self.transport.send_batch(batch, subject, html_content),
        )
        .await
        .unwrap_or(Err(TransportError::Timeout(self.send_timeout)));

        match outcome {
            Ok(()) => BatchResult {
                sent: batch.len(),
                failed: 0,
                failed_emails: Vec::new(),
            },
            Err(err) => {
                tracing::error!("Batch of {} recipients failed: {:?}", batch.len(), err);

                BatchResult {
                    sent: 0,
                    failed: batch.len(),
                    failed_emails: batch.iter().map(|email| email.to_string()).collect(),
                }
            }
        }
    }
}
