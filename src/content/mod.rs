//! Newsletter content generation.
//!
//! A [`ContentGenerator`] talks to at most one language-model backend and
//! always produces usable content. When the backend fails or answers with
//! something other than the expected JSON, it falls back to a static sample
//! and says so through [`GeneratedContent::Fallback`].

mod ollama;
mod openai;
pub mod prompts;
pub mod template;

pub use ollama::{normalize_model, OllamaClient};
pub use openai::OpenAiClient;

use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;

use crate::config::{AiProvider, ContentSettings};
use crate::domain::newsletter_content::NewsletterContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedContent {
    Generated(NewsletterContent),
    Fallback(NewsletterContent),
}

impl GeneratedContent {
    pub fn is_fallback(&self) -> bool {
        matches!(self, GeneratedContent::Fallback(_))
    }

    pub fn content(&self) -> &NewsletterContent {
        match self {
            GeneratedContent::Generated(content) | GeneratedContent::Fallback(content) => content,
        }
    }

    pub fn into_content(self) -> NewsletterContent {
        match self {
            GeneratedContent::Generated(content) | GeneratedContent::Fallback(content) => content,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("Failed to reach the content backend.")]
    Request(#[from] reqwest::Error),
    #[error("Content backend answered with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Content backend returned malformed output: {0}")]
    Malformed(String),
}

enum Backend {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
}

pub struct ContentGenerator {
    backend: Option<Backend>,
}

#[derive(serde::Deserialize)]
struct GeneratedJson {
    subject: String,
    html: String,
}

/// Parses the `{"subject": .., "html": ..}` object a backend is asked to produce
/// and wraps the html in the newsletter template.
pub(crate) fn parse_generated_json(raw: &str) -> Result<NewsletterContent, GenerationError> {
    let generated: GeneratedJson =
        serde_json::from_str(raw).map_err(|err| GenerationError::Malformed(err.to_string()))?;

    if generated.html.trim().is_empty() {
        return Err(GenerationError::Malformed(String::from("html is empty")));
    }

    let subject = generated.subject.trim().to_string();
    let html = template::wrap_in_email_template(&subject, &generated.html);

    NewsletterContent::parse(subject, html).map_err(GenerationError::Malformed)
}

impl ContentGenerator {
    /// OpenAI is only used when explicitly selected and given an API key;
    /// otherwise the local Ollama backend is used when configured.
    pub fn new(settings: &ContentSettings) -> ContentGenerator {
        let timeout = settings.get_timeout();
        let openai = settings
            .openai
            .as_ref()
            .filter(|openai| settings.provider == AiProvider::OpenAi && openai.has_api_key());

        let backend = match (openai, settings.ollama.as_ref()) {
            (Some(openai), _) => openai.api_key.clone().map(|api_key| {
                Backend::OpenAi(OpenAiClient::new(
                    openai.base_url.clone(),
                    api_key,
                    openai.model.clone(),
                    timeout,
                ))
            }),
            (None, Some(ollama)) => Some(Backend::Ollama(OllamaClient::new(
                ollama.base_url.clone(),
                &ollama.model,
                timeout,
            ))),
            (None, None) => None,
        };

        ContentGenerator { backend }
    }

    /// A generator with no backend, producing the static sample every time.
    pub fn fallback_only() -> ContentGenerator {
        ContentGenerator { backend: None }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Some(Backend::Ollama(_)) => "ollama",
            Some(Backend::OpenAi(_)) => "openai",
            None => "none",
        }
    }

    #[tracing::instrument(name = "Generating newsletter content", skip(self), fields(backend = self.backend_name()))]
    pub async fn generate(&self) -> GeneratedContent {
        let today = Utc::now().date_naive();

        match self.generate_with_backend(today).await {
            Some(Ok(content)) => GeneratedContent::Generated(content),
            Some(Err(err)) => {
                tracing::warn!("Content generation failed, using fallback content: {:?}", err);
                GeneratedContent::Fallback(template::fallback_content(today))
            }
            None => {
                tracing::info!("No content backend configured, using fallback content");
                GeneratedContent::Fallback(template::fallback_content(today))
            }
        }
    }

    async fn generate_with_backend(
        &self,
        today: NaiveDate,
    ) -> Option<Result<NewsletterContent, GenerationError>> {
        let current_date = today.format("%B %d, %Y").to_string();

        match self.backend.as_ref()? {
            Backend::Ollama(client) => Some(client.generate(&current_date).await),
            Backend::OpenAi(client) => Some(client.generate(&current_date).await),
        }
    }
}
