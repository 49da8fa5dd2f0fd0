use claim::assert_some;
use fake::{faker::internet::en::SafeEmail, Fake};
use serde_json::{json, Value};

use crate::helpers::TestApp;
use newsletter_dispatch::domain::{
    subscriber_email::SubscriberEmail, subscriber_status::SubscriberStatus,
};

fn email() -> String {
    SafeEmail().fake()
}

#[tokio::test]
async fn subscribe_returns_200_when_body_is_valid() {
    let test_app = TestApp::spawn_app().await;
    let email = email();

    let response = test_app.post_subscribe(&json!({ "email": email })).await;

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully subscribed to newsletter!");
    assert_eq!(body["data"]["email"], email.as_str());
    assert_eq!(body["data"]["status"], "active");
}

#[tokio::test]
async fn subscribe_persists_the_new_subscriber() {
    let test_app = TestApp::spawn_app().await;
    let email = SubscriberEmail::parse(email()).unwrap();

    test_app
        .post_subscribe(&json!({ "email": email.as_ref() }))
        .await;

    let subscriber = test_app
        .store
        .find_by_email(&email)
        .await
        .expect("Failed to fetch the subscriber.")
        .expect("The subscriber was not stored.");

    assert_eq!(subscriber.email, email);
    assert_eq!(subscriber.status, SubscriberStatus::Active);
}

#[tokio::test]
async fn subscribe_twice_reports_an_already_subscribed_failure() {
    let test_app = TestApp::spawn_app().await;
    let body = json!({ "email": email() });

    test_app.post_subscribe(&body).await;
    let response = test_app.post_subscribe(&body).await;

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("already subscribed"));

    let counts = test_app.store.counts_by_status().await.unwrap();

    assert_eq!(counts.total, 1);
}

#[tokio::test]
async fn subscribe_reactivates_an_unsubscribed_email() {
    let test_app = TestApp::spawn_app().await;
    let body = json!({ "email": email() });

    test_app.post_subscribe(&body).await;
    test_app.post_unsubscribe(&body).await;
    let response = test_app.post_subscribe(&body).await;

    let response_body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(response_body["success"], true);
    assert_eq!(response_body["data"]["status"], "active");

    let counts = test_app.store.counts_by_status().await.unwrap();

    assert_eq!(counts.total, 1);
    assert_eq!(counts.active, 1);
    assert_eq!(counts.unsubscribed, 0);
}

#[tokio::test]
async fn subscribe_returns_400_when_email_is_invalid_or_missing() {
    let test_app = TestApp::spawn_app().await;
    let test_cases = vec![
        (json!({ "email": "" }), "empty email"),
        (json!({ "email": "not-an-email" }), "email without @"),
        (json!({ "email": "@test.com" }), "email without local part"),
        (json!({}), "missing email"),
        (json!({ "name": "Reader" }), "unrelated fields only"),
    ];

    for (body, description) in test_cases {
        let response = test_app.post_subscribe(&body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            description
        );
    }

    let counts = test_app.store.counts_by_status().await.unwrap();

    assert_eq!(counts.total, 0);
}

#[tokio::test]
async fn subscribe_trims_the_email_before_storing_it() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscribe(&json!({ "email": "  reader@example.com  " }))
        .await;

    let stored = test_app
        .store
        .find_by_email(&SubscriberEmail::parse(String::from("reader@example.com")).unwrap())
        .await
        .unwrap();

    assert_some!(stored);
}
