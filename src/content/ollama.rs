use reqwest::Client;
use std::time;

use super::{parse_generated_json, prompts, GenerationError};
use crate::domain::newsletter_content::NewsletterContent;

const INSTRUCT_MODEL: &str = "llama3.2:1b-instruct";

pub struct OllamaClient {
    http_client: Client,
    base_url: String,
    model: String,
    timeout: time::Duration,
}

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    format: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(serde::Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Maps the shorthand names people tend to type to the tag Ollama actually serves.
pub fn normalize_model(model: &str) -> String {
    match model.trim().to_lowercase().as_str() {
        "llama:3.2:1b" | "llama3.2:1b" | "llama-3.2-1b" | "llama-3.2:1b" | "llama3.2" => {
            INSTRUCT_MODEL.to_string()
        }
        _ => model.trim().to_string(),
    }
}

impl OllamaClient {
    pub fn new(base_url: String, model: &str, timeout: time::Duration) -> OllamaClient {
        OllamaClient {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: normalize_model(model),
            timeout,
        }
    }

    #[tracing::instrument(name = "Generate newsletter content with Ollama", skip(self), fields(model = %self.model))]
    pub async fn generate(&self, current_date: &str) -> Result<NewsletterContent, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: format!(
                "{}\n\n{}",
                prompts::SYSTEM_PROMPT,
                prompts::content_prompt(current_date)
            ),
            // Ask Ollama to constrain the output to JSON
            format: "json",
            stream: false,
            options: GenerateOptions {
                temperature: 0.7,
                top_p: 0.9,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .timeout(self.timeout)
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

        let generated: GenerateResponse = response.json().await?;

        parse_generated_json(generated.response.trim())
    }
}
