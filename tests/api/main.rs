mod cors;
mod health_check;
mod helpers;
mod stats;
mod subscriptions;
mod unsubscriptions;
