use fake::{faker::internet::en::SafeEmail, Fake};
use serde_json::{json, Value};

use crate::helpers::TestApp;

#[tokio::test]
async fn unsubscribe_marks_an_active_subscriber_as_unsubscribed() {
    let test_app = TestApp::spawn_app().await;
    let email: String = SafeEmail().fake();
    let body = json!({ "email": email });

    test_app.post_subscribe(&body).await;
    let response = test_app.post_unsubscribe(&body).await;

    assert_eq!(200, response.status().as_u16());

    let response_body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(response_body["success"], true);
    assert_eq!(response_body["data"]["email"], email.as_str());
    assert!(response_body["data"]["unsubscribed_at"].is_string());

    let counts = test_app.store.counts_by_status().await.unwrap();

    assert_eq!(counts.active, 0);
    assert_eq!(counts.unsubscribed, 1);
}

#[tokio::test]
async fn unsubscribe_reports_an_unknown_email() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_unsubscribe(&json!({ "email": "nobody@example.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("not in our subscriber list"));
}

#[tokio::test]
async fn unsubscribe_twice_reports_already_unsubscribed() {
    let test_app = TestApp::spawn_app().await;
    let body = json!({ "email": SafeEmail().fake::<String>() });

    test_app.post_subscribe(&body).await;
    test_app.post_unsubscribe(&body).await;
    let response = test_app.post_unsubscribe(&body).await;

    let response_body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(response_body["success"], false);
    assert!(response_body["message"]
        .as_str()
        .unwrap()
        .contains("already unsubscribed"));
}

#[tokio::test]
async fn unsubscribe_returns_400_when_email_is_invalid() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_unsubscribe(&json!({ "email": "readertest.com" }))
        .await;

    assert_eq!(400, response.status().as_u16());
}
