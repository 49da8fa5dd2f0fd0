use chrono::NaiveDate;

use crate::domain::newsletter_content::NewsletterContent;

pub const SAMPLE_SECTIONS: &str = r#"
<div class="section">
    <h2 class="section-title">This Week's Highlights</h2>
    <div class="item">
        <div class="item-title">Smaller models, sharper tools</div>
        <div class="item-description">
            Compact instruction-tuned models now run comfortably on a laptop, which makes
            local assistants a realistic option for everyday development work.
        </div>
    </div>
</div>
<hr class="divider">
<div class="section">
    <h2 class="section-title">Tools &amp; Resources</h2>
    <div class="item">
        <div class="item-title">Faster container builds</div>
        <div class="item-description">
            Multi-stage builds and a tight .dockerignore routinely halve image build times.
        </div>
    </div>
</div>
<hr class="divider">
<div class="section">
    <h2 class="section-title">Quick Tips</h2>
    <div class="item">
        <div class="item-description">
            Profile before you optimize: the slow part is rarely where you expect it.
        </div>
    </div>
</div>
"#;

/// Wraps generated sections in the newsletter layout. The footer carries the
/// unsubscribe placeholder that the mailer fills in.
pub fn wrap_in_email_template(subject: &str, content_sections: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{subject}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, 'Segoe UI', sans-serif; color: #374151;">
    <div style="max-width: 580px; margin: 0 auto; padding: 40px 20px;">
        <div style="margin-bottom: 40px; padding-bottom: 20px; border-bottom: 1px solid #e5e7eb;">
            <h1 style="font-size: 20px; color: #111827; margin: 0;">DataDispatch</h1>
            <p style="font-size: 14px; color: #6b7280; margin: 8px 0 0 0;">{subject}</p>
        </div>
        <div style="line-height: 1.7;">
            {content_sections}
        </div>
        <div style="margin-top: 48px; padding-top: 24px; border-top: 1px solid #e5e7eb; text-align: center; font-size: 13px; color: #6b7280;">
            <p>Curated insights for developers and tech professionals</p>
            <p><a href="{{{{UNSUBSCRIBE_LINK}}}}" style="color: #6b7280;">Unsubscribe</a></p>
            <p style="font-size: 12px; color: #9ca3af;">You received this email because you subscribed to our newsletter.</p>
        </div>
    </div>
</body>
</html>
"#,
        subject = subject,
        content_sections = content_sections,
    )
}

/// Static content used whenever generation is unavailable or fails.
pub fn fallback_content(today: NaiveDate) -> NewsletterContent {
    let subject = format!("Tech Update for {}", today.format("%B %d, %Y"));
    let html = wrap_in_email_template(&subject, SAMPLE_SECTIONS);

    NewsletterContent { subject, html }
}
