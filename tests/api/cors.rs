use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
use reqwest::Method;

use crate::helpers::TestApp;

#[tokio::test]
async fn configured_origin_may_call_the_api() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .api_client
        .get(format!("{}/health", test_app.address))
        .header(ORIGIN, "http://localhost:3000")
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn preflight_for_subscribe_is_answered_for_a_configured_origin() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .api_client
        .request(Method::OPTIONS, format!("{}/subscribe", test_app.address))
        .header(ORIGIN, "http://127.0.0.1:8080")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://127.0.0.1:8080"
    );
}

#[tokio::test]
async fn unknown_origin_is_not_allowed() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .api_client
        .request(Method::OPTIONS, format!("{}/subscribe", test_app.address))
        .header(ORIGIN, "https://elsewhere.example.com")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
