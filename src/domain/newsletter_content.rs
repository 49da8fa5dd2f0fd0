use unicode_segmentation::UnicodeSegmentation;

/// Subjects longer than this are still sent, mail clients just cut them off.
pub const SUBJECT_SOFT_LIMIT: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NewsletterContent {
    pub subject: String,
    pub html: String,
}

impl NewsletterContent {
    /// Accepts a generated subject/html pair, rejecting blank fields.
    pub fn parse(subject: String, html: String) -> Result<NewsletterContent, String> {
        let subject = subject.trim().to_string();

        if subject.is_empty() {
            return Err(String::from("newsletter subject is empty"));
        }

        if html.trim().is_empty() {
            return Err(String::from("newsletter html is empty"));
        }

        if subject.graphemes(true).count() > SUBJECT_SOFT_LIMIT {
            tracing::warn!(
                subject = %subject,
                "Newsletter subject is longer than {} characters",
                SUBJECT_SOFT_LIMIT
            );
        }

        Ok(Self { subject, html })
    }
}
