use actix_web::web;
use serde::Deserialize;

use crate::domain::subscriber_email::SubscriberEmail;

/// Validated payload shared by the subscribe and unsubscribe endpoints.
pub struct SubscriptionRequest {
    pub email: SubscriberEmail,
}

#[derive(Deserialize)]
pub struct SubscriptionBody {
    pub email: String,
}

impl TryFrom<web::Json<SubscriptionBody>> for SubscriptionRequest {
    type Error = String;

    fn try_from(body: web::Json<SubscriptionBody>) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.into_inner().email)?;

        Ok(SubscriptionRequest { email })
    }
}
