//! OpenRouter provider: chat completions and image generation
//!
//! Both operations speak the OpenAI-compatible wire format, so one provider
//! covers the `/chat/completions` and `/images/generations` endpoints with a
//! shared client and credential.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::conversation::Message;

use super::ProviderError;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: String,
}

pub struct OpenRouterProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    image_model: String,
}

impl OpenRouterProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        chat_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            chat_model: chat_model.into(),
            image_model: image_model.into(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("OPENROUTER_API_KEY"))
    }

    /// Send the full ordered history and return the first choice's content.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, upstream_body = %body, "chat completion rejected upstream");
            return Err(ProviderError::InvalidResponse(format!(
                "chat completion returned HTTP {status}"
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("malformed completion: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in completion".into()))
    }

    /// Generate one 1024x1024 image and return its URL.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let request = ImageGenerationRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: "1024x1024",
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, upstream_body = %body, "image generation rejected upstream");
            return Err(ProviderError::InvalidResponse(format!(
                "image generation returned HTTP {status}"
            )));
        }

        let generation: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("malformed generation: {e}")))?;

        generation
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or_else(|| ProviderError::InvalidResponse("no images in generation".into()))
    }
}
