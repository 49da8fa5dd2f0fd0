use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::domain::send_log::{SendLog, SendStatistics};
use crate::domain::subscriber::{Subscriber, SubscriberCounts};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::utils::error_chain_fmt;

const CREATE_SUBSCRIBERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS subscribers (
        id BLOB PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_SEND_LOGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS send_logs (
        id BLOB PRIMARY KEY NOT NULL,
        date TEXT NOT NULL,
        sent_count INTEGER NOT NULL DEFAULT 0,
        failures INTEGER NOT NULL DEFAULT 0,
        latency_ms INTEGER NOT NULL DEFAULT 0,
        error_details TEXT,
        newsletter_subject TEXT
    )
"#;

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("Email {0} is already subscribed")]
    AlreadySubscribed(String),
    #[error("Email {0} not found in subscriber list")]
    NotFound(String),
    #[error("Email {0} is already unsubscribed")]
    AlreadyUnsubscribed(String),
    #[error("Stored record is invalid: {0}")]
    InvalidRecord(String),
    #[error("Failed to execute a database query.")]
    Database(#[from] sqlx::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Opens the pool and creates both tables if they do not exist yet.
///
/// Idle connections are never reaped, so an in-memory database lives as long
/// as the pool does.
pub async fn get_connection_pool(config: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(std::time::Duration::from_secs(2))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(config.get_db_options()?)
        .await?;

    init_schema(&db_pool).await?;

    Ok(db_pool)
}

pub async fn init_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_SUBSCRIBERS_TABLE).execute(db_pool).await?;
    sqlx::query(CREATE_SEND_LOGS_TABLE).execute(db_pool).await?;

    tracing::debug!("Database schema is ready");

    Ok(())
}

/// Subscribers and send logs, backed by SQLite.
#[derive(Clone)]
pub struct SubscriberStore {
    db_pool: SqlitePool,
}

impl SubscriberStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }

    /// Each lifecycle change is a single statement, so concurrent requests for
    /// the same address cannot both succeed.
    #[tracing::instrument(name = "Create or reactivate a subscriber", skip(self), fields(subscriber_email = %email))]
    pub async fn create_subscriber(&self, email: &SubscriberEmail) -> Result<Subscriber, StoreError> {
        let now = Utc::now();
        let inserted = sqlx::query(
            r#"
            INSERT INTO subscribers (id, email, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            RETURNING id, email, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email.as_ref())
        .bind(SubscriberStatus::Active.as_ref())
        .bind(now)
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?;

        if let Some(row) = inserted {
            return subscriber_from_row(&row);
        }

        self.change_status(email, SubscriberStatus::Unsubscribed, SubscriberStatus::Active)
            .await?
            .ok_or_else(|| StoreError::AlreadySubscribed(email.to_string()))
    }

    #[tracing::instrument(name = "Unsubscribe a subscriber", skip(self), fields(subscriber_email = %email))]
    pub async fn unsubscribe(&self, email: &SubscriberEmail) -> Result<(), StoreError> {
        let changed = self
            .change_status(email, SubscriberStatus::Active, SubscriberStatus::Unsubscribed)
            .await?;

        if changed.is_some() {
            return Ok(());
        }

        match self.find_by_email(email).await? {
            Some(_) => Err(StoreError::AlreadyUnsubscribed(email.to_string())),
            None => Err(StoreError::NotFound(email.to_string())),
        }
    }

    pub async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, status, created_at, updated_at
            FROM subscribers
            WHERE email = ?
            "#,
        )
        .bind(email.as_ref())
        .fetch_optional(&self.db_pool)
        .await?;

        row.as_ref().map(subscriber_from_row).transpose()
    }

    #[tracing::instrument(name = "Fetch active subscribers", skip(self))]
    pub async fn list_active(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, status, created_at, updated_at
            FROM subscribers
            WHERE status = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(SubscriberStatus::Active.as_ref())
        .fetch_all(&self.db_pool)
        .await?;

        rows.iter().map(subscriber_from_row).collect()
    }

    pub async fn counts_by_status(&self) -> Result<SubscriberCounts, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0) AS active,
                COALESCE(SUM(CASE WHEN status = 'unsubscribed' THEN 1 ELSE 0 END), 0) AS unsubscribed
            FROM subscribers
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        Ok(SubscriberCounts {
            active: row.try_get("active")?,
            total: row.try_get("total")?,
            unsubscribed: row.try_get("unsubscribed")?,
        })
    }

    #[tracing::instrument(name = "Record a newsletter send", skip(self, error_details))]
    pub async fn record_send(
        &self,
        sent_count: i64,
        failures: i64,
        latency_ms: i64,
        error_details: Option<&str>,
        newsletter_subject: Option<&str>,
    ) -> Result<SendLog, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO send_logs (id, date, sent_count, failures, latency_ms, error_details, newsletter_subject)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, date, sent_count, failures, latency_ms, error_details, newsletter_subject
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .bind(sent_count)
        .bind(failures)
        .bind(latency_ms)
        .bind(error_details)
        .bind(newsletter_subject)
        .fetch_one(&self.db_pool)
        .await?;

        send_log_from_row(&row)
    }

    pub async fn recent_sends(&self, limit: u32) -> Result<Vec<SendLog>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, date, sent_count, failures, latency_ms, error_details, newsletter_subject
            FROM send_logs
            ORDER BY date DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.db_pool)
        .await?;

        rows.iter().map(send_log_from_row).collect()
    }

    pub async fn send_statistics(&self) -> Result<SendStatistics, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(sent_count), 0) AS total_sent,
                COALESCE(SUM(failures), 0) AS total_failures,
                COALESCE(AVG(latency_ms), 0.0) AS average_latency
            FROM send_logs
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        Ok(SendStatistics::from_totals(
            row.try_get("total_sent")?,
            row.try_get("total_failures")?,
            row.try_get("average_latency")?,
        ))
    }

    /// Moves `email` from `from` to `to`. `None` when no row had status `from`.
    async fn change_status(
        &self,
        email: &SubscriberEmail,
        from: SubscriberStatus,
        to: SubscriberStatus,
    ) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE subscribers
            SET status = ?, updated_at = ?
            WHERE email = ? AND status = ?
            RETURNING id, email, status, created_at, updated_at
            "#,
        )
        .bind(to.as_ref())
        .bind(Utc::now())
        .bind(email.as_ref())
        .bind(from.as_ref())
        .fetch_optional(&self.db_pool)
        .await?;

        row.as_ref().map(subscriber_from_row).transpose()
    }
}

fn subscriber_from_row(row: &SqliteRow) -> Result<Subscriber, StoreError> {
    Ok(Subscriber {
        id: row.try_get("id")?,
        email: SubscriberEmail::parse(row.try_get("email")?).map_err(StoreError::InvalidRecord)?,
        status: SubscriberStatus::parse(row.try_get("status")?)
            .map_err(StoreError::InvalidRecord)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn send_log_from_row(row: &SqliteRow) -> Result<SendLog, StoreError> {
    Ok(SendLog {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        sent_count: row.try_get("sent_count")?,
        failures: row.try_get("failures")?,
        latency_ms: row.try_get("latency_ms")?,
        error_details: row.try_get("error_details")?,
        newsletter_subject: row.try_get("newsletter_subject")?,
    })
}
