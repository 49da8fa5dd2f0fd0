use serde_json::Value;

use crate::helpers::TestApp;

#[tokio::test]
async fn health_check_works() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get("/health").await;

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}
