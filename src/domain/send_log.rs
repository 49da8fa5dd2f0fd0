use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One row per newsletter send attempt. Failed runs are recorded too, with a
/// `sent_count` of zero.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SendLog {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub sent_count: i64,
    pub failures: i64,
    pub latency_ms: i64,
    pub error_details: Option<String>,
    pub newsletter_subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SendStatistics {
    pub total_sent: i64,
    pub total_failures: i64,
    pub average_latency_ms: f64,
    pub success_rate_pct: f64,
}

impl SendStatistics {
    pub fn from_totals(total_sent: i64, total_failures: i64, average_latency_ms: f64) -> Self {
        let attempted = total_sent + total_failures;
        let success_rate_pct = if attempted > 0 {
            total_sent as f64 / attempted as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_sent,
            total_failures,
            average_latency_ms: round_two(average_latency_ms),
            success_rate_pct: round_two(success_rate_pct),
        }
    }
}

pub(crate) fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
