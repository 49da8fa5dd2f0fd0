use actix_web::{HttpRequest, HttpResponse, Responder};
use chrono::Utc;

/// Endpoint used by clients to know if the server is working
#[tracing::instrument(name = "Health Check handler", skip(_request))]
pub async fn health_check(_request: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
