pub mod batch_mailer;
pub mod config;
pub mod content;
pub mod domain;
pub mod email_client;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
pub mod weekly_send;
