mod health_check;
mod stats;
mod subscriptions;

pub use health_check::health_check;
pub use stats::get_stats;
pub use subscriptions::{handle_subscribe, handle_unsubscribe};

/// Envelope returned by the subscription endpoints. Expected outcomes such as
/// a duplicate subscription are reported with `success: false` and a 200.
#[derive(Debug, serde::Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn success(message: &str, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            data: None,
        }
    }
}
