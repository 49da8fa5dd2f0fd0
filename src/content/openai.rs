use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use super::{parse_generated_json, prompts, GenerationError};
use crate::domain::newsletter_content::NewsletterContent;

pub struct OpenAiClient {
    http_client: Client,
    base_url: String,
    api_key: Secret<String>,
    model: String,
    timeout: time::Duration,
}

#[derive(serde::Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        base_url: String,
        api_key: Secret<String>,
        model: String,
        timeout: time::Duration,
    ) -> OpenAiClient {
        OpenAiClient {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout,
        }
    }

    #[tracing::instrument(name = "Generate newsletter content with OpenAI", skip(self), fields(model = %self.model))]
    pub async fn generate(&self, current_date: &str) -> Result<NewsletterContent, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let user_prompt = prompts::content_prompt(current_date);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompts::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: 0.7,
            max_tokens: 2000,
        };

        let response = self
            .http_client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Malformed(String::from("completion has no content")))?;

        parse_generated_json(content.trim())
    }
}
