use fake::{faker::internet::en::SafeEmail, Fake};
use serde_json::{json, Value};

use crate::helpers::TestApp;

#[tokio::test]
async fn stats_are_empty_for_a_fresh_database() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get("/stats").await;

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Body is not JSON.");

    assert_eq!(body["subscriber_stats"]["total"], 0);
    assert_eq!(body["send_stats"]["total_sent"], 0);
    assert_eq!(body["send_stats"]["success_rate_pct"], 0.0);
    assert_eq!(body["recent_sends"], json!([]));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn stats_report_subscribers_and_recorded_sends() {
    let test_app = TestApp::spawn_app().await;
    let leaving = json!({ "email": SafeEmail().fake::<String>() });

    test_app
        .post_subscribe(&json!({ "email": SafeEmail().fake::<String>() }))
        .await;
    test_app.post_subscribe(&leaving).await;
    test_app.post_unsubscribe(&leaving).await;

    test_app
        .store
        .record_send(70, 50, 12_000, Some("first batch failed"), Some("Weekly digest"))
        .await
        .unwrap();
    test_app
        .store
        .record_send(30, 0, 4_000, None, Some("Second digest"))
        .await
        .unwrap();

    let body: Value = test_app
        .get("/stats")
        .await
        .json()
        .await
        .expect("Body is not JSON.");

    assert_eq!(body["subscriber_stats"]["active"], 1);
    assert_eq!(body["subscriber_stats"]["unsubscribed"], 1);
    assert_eq!(body["subscriber_stats"]["total"], 2);

    assert_eq!(body["send_stats"]["total_sent"], 100);
    assert_eq!(body["send_stats"]["total_failures"], 50);
    assert_eq!(body["send_stats"]["average_latency_ms"], 8000.0);
    assert_eq!(body["send_stats"]["success_rate_pct"], 66.67);

    let recent_sends = body["recent_sends"].as_array().unwrap();

    assert_eq!(recent_sends.len(), 2);
    assert_eq!(recent_sends[0]["newsletter_subject"], "Second digest");
}

#[tokio::test]
async fn stats_list_at_most_ten_recent_sends() {
    let test_app = TestApp::spawn_app().await;

    for _ in 0..12 {
        test_app
            .store
            .record_send(1, 0, 10, None, Some("Digest"))
            .await
            .unwrap();
    }

    let body: Value = test_app
        .get("/stats")
        .await
        .json()
        .await
        .expect("Body is not JSON.");

    assert_eq!(body["recent_sends"].as_array().unwrap().len(), 10);
}
