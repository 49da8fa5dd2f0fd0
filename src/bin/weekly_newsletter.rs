//! Weekly newsletter run, meant to be triggered by cron:
//!
//! ```text
//! 0 9 * * 1 cd /path/to/newsletter-dispatch && weekly_newsletter
//! ```
//!
//! `weekly_newsletter test` checks the database, content generation and SMTP
//! setup, and sends a single test email to the sending account.

use newsletter_dispatch::batch_mailer::BatchMailer;
use newsletter_dispatch::config::{get_configuration, Settings};
use newsletter_dispatch::content::ContentGenerator;
use newsletter_dispatch::domain::subscriber_email::SubscriberEmail;
use newsletter_dispatch::email_client::SmtpEmailClient;
use newsletter_dispatch::store::{get_connection_pool, SubscriberStore};
use newsletter_dispatch::telemetry::{get_subscriber, init_subscriber};
use newsletter_dispatch::weekly_send::{prepare_email_client, RunOutcome, WeeklySend};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = get_subscriber(
        String::from("weekly_newsletter"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber);

    let config = match get_configuration() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {:?}", err);
            return ExitCode::FAILURE;
        }
    };

    let store = match get_connection_pool(&config.database).await {
        Ok(db_pool) => SubscriberStore::new(db_pool),
        Err(err) => {
            tracing::error!("Failed to open the database: {:?}", err);
            return ExitCode::FAILURE;
        }
    };

    let is_test_run = std::env::args().nth(1).as_deref() == Some("test");
    let result = if is_test_run {
        check_system(&config, &store).await
    } else {
        send_weekly_newsletter(&config, &store).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // Non-zero so cron and other schedulers notice
        Err(()) => ExitCode::FAILURE,
    }
}

async fn send_weekly_newsletter(config: &Settings, store: &SubscriberStore) -> Result<(), ()> {
    tracing::info!("Starting weekly newsletter automation");

    let email_client = prepare_email_client(store, &config.smtp)
        .await
        .map_err(|_| ())?;

    let weekly_send = WeeklySend::new(
        store.clone(),
        ContentGenerator::new(&config.content),
        BatchMailer::from_settings(email_client, &config.newsletter),
        config.newsletter.unsubscribe_url.clone(),
    );

    match weekly_send.run_and_record().await {
        Ok(RunOutcome::NoSubscribers) => Ok(()),
        Ok(RunOutcome::Sent { stats, .. }) => {
            tracing::info!(
                total_recipients = stats.total_recipients,
                sent = stats.sent,
                failed = stats.failed,
                success_rate = stats.success_rate,
                total_time_seconds = stats.total_time_seconds,
                "Newsletter automation completed"
            );

            if !stats.failed_emails.is_empty() {
                tracing::warn!("Failed recipients: {}", stats.failed_emails.join(", "));
            }

            Ok(())
        }
        Err(_) => Err(()),
    }
}

async fn check_system(config: &Settings, store: &SubscriberStore) -> Result<(), ()> {
    tracing::info!("Testing newsletter system");

    let counts = store.counts_by_status().await.map_err(|err| {
        tracing::error!("Database check failed: {:?}", err);
    })?;
    tracing::info!(active = counts.active, total = counts.total, "Database OK");

    let generator = ContentGenerator::new(&config.content);
    let generated = generator.generate().await;
    tracing::info!(
        backend = generator.backend_name(),
        used_fallback = generated.is_fallback(),
        subject = %generated.content().subject,
        "Content generation OK"
    );

    let email_client = SmtpEmailClient::new(&config.smtp).map_err(|err| {
        tracing::error!("SMTP configuration is invalid: {:?}", err);
    })?;

    match email_client.verify_connection().await {
        Ok(true) => tracing::info!("SMTP connection OK"),
        Ok(false) => {
            tracing::error!("SMTP server refused the connection test");
            return Err(());
        }
        Err(err) => {
            tracing::error!("SMTP connection failed: {:?}", err);
            return Err(());
        }
    }

    let sender = SubscriberEmail::parse(email_client.sender().email.to_string()).map_err(|err| {
        tracing::error!("Sender address is invalid: {}", err);
    })?;

    email_client
        .send_single_email(
            &sender,
            "Newsletter System Test",
            &generated.content().html,
            Some(config.newsletter.unsubscribe_url.as_str()),
        )
        .await
        .map_err(|err| {
            tracing::error!("Test email failed: {:?}", err);
        })?;

    tracing::info!("Test email sent to {}", sender);

    Ok(())
}
