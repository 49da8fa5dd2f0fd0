use once_cell::sync::Lazy;
use reqwest::Response;
use serde_json::Value;

use newsletter_dispatch::{
    config::get_configuration,
    startup::Application,
    store::SubscriberStore,
    telemetry::{get_subscriber, init_subscriber},
};

// Logs are noisy, so they are only printed when TEST_LOG is set
static TRACING: Lazy<()> = Lazy::new(|| {
    let subscriber_name = String::from("test");
    let env_filter = String::from("debug");

    if std::env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(subscriber_name, env_filter, std::io::stdout));
    } else {
        init_subscriber(get_subscriber(subscriber_name, env_filter, std::io::sink));
    }
});

pub struct TestApp {
    pub address: String,
    pub store: SubscriberStore,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        Lazy::force(&TRACING);

        let mut config = get_configuration().expect("Missing configuration file.");

        // Every test gets its own private in-memory database
        config.set_db_url(String::from("sqlite::memory:"));
        config.database.max_connections = 1;
        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);

        let application = Application::build(config)
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());
        let store = application.store();

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            store,
            api_client: reqwest::Client::new(),
        }
    }

    pub async fn post_subscribe(&self, body: &Value) -> Response {
        self.api_client
            .post(format!("{}/subscribe", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_unsubscribe(&self, body: &Value) -> Response {
        self.api_client
            .post(format!("{}/unsubscribe", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.api_client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}
