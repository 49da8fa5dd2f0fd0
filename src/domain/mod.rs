pub mod new_subscriber;
pub mod newsletter_content;
pub mod send_log;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_status;
