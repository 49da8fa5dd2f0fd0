use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use chrono::Utc;

use crate::{
    domain::new_subscriber::{SubscriptionBody, SubscriptionRequest},
    routes::ApiResponse,
    store::{StoreError, SubscriberStore},
    utils::error_chain_fmt,
};

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    ValidationError(String),
    #[error("An error occurred while processing your request. Please try again later.")]
    UnexpectedError(#[source] StoreError),
}

impl std::fmt::Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "detail": self.to_string() }))
    }
}

#[tracing::instrument(
    name = "Subscribe handler",
    skip(body, store),
    fields(subscriber_email = %body.email)
)]
pub async fn handle_subscribe(
    body: web::Json<SubscriptionBody>,
    store: web::Data<SubscriberStore>,
) -> Result<HttpResponse, SubscriptionError> {
    let request: SubscriptionRequest = body
        .try_into()
        .map_err(SubscriptionError::ValidationError)?;

    match store.create_subscriber(&request.email).await {
        Ok(subscriber) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Successfully subscribed to newsletter!",
            serde_json::json!({
                "email": subscriber.email,
                "status": subscriber.status,
                "subscribed_at": subscriber.created_at.to_rfc3339(),
            }),
        ))),
        Err(StoreError::AlreadySubscribed(_)) => Ok(HttpResponse::Ok().json(
            ApiResponse::failure("This email is already subscribed to our newsletter."),
        )),
        Err(err) => {
            tracing::error!("Failed to subscribe: {:?}", err);
            Err(SubscriptionError::UnexpectedError(err))
        }
    }
}

#[tracing::instrument(
    name = "Unsubscribe handler",
    skip(body, store),
    fields(subscriber_email = %body.email)
)]
pub async fn handle_unsubscribe(
    body: web::Json<SubscriptionBody>,
    store: web::Data<SubscriberStore>,
) -> Result<HttpResponse, SubscriptionError> {
    let request: SubscriptionRequest = body
        .try_into()
        .map_err(SubscriptionError::ValidationError)?;

    match store.unsubscribe(&request.email).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Successfully unsubscribed from newsletter. We're sorry to see you go!",
            serde_json::json!({
                "email": request.email,
                "unsubscribed_at": Utc::now().to_rfc3339(),
            }),
        ))),
        Err(StoreError::NotFound(_)) => Ok(HttpResponse::Ok().json(ApiResponse::failure(
            "This email address is not in our subscriber list.",
        ))),
        Err(StoreError::AlreadyUnsubscribed(_)) => Ok(HttpResponse::Ok().json(
            ApiResponse::failure("This email is already unsubscribed from our newsletter."),
        )),
        Err(err) => {
            tracing::error!("Failed to unsubscribe: {:?}", err);
            Err(SubscriptionError::UnexpectedError(err))
        }
    }
}
