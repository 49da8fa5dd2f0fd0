use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use chrono::Utc;

use crate::store::{StoreError, SubscriberStore};
use crate::utils::error_chain_fmt;

const RECENT_SENDS_LIMIT: u32 = 10;

#[derive(thiserror::Error)]
#[error("An error occurred while fetching statistics.")]
pub struct StatsError(#[from] StoreError);

impl std::fmt::Debug for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for StatsError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "detail": self.to_string() }))
    }
}

/// Subscriber counts plus delivery statistics for the admin dashboard.
#[tracing::instrument(name = "Stats handler", skip(store))]
pub async fn get_stats(store: web::Data<SubscriberStore>) -> Result<HttpResponse, StatsError> {
    let subscriber_stats = store.counts_by_status().await?;
    let send_stats = store.send_statistics().await?;
    let recent_sends = store.recent_sends(RECENT_SENDS_LIMIT).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "subscriber_stats": subscriber_stats,
        "send_stats": send_stats,
        "recent_sends": recent_sends,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
