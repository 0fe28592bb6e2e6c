//! Speech transcription via the OpenAI Whisper API

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::ProviderError;

const TRANSCRIPTION_MODEL: &str = "whisper-1";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct WhisperProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WhisperProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Upload the audio file and return the transcribed text.
    pub async fn transcribe(&self, path: &Path) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("OPENAI_API_KEY"))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".into());
        let bytes = tokio::fs::read(path).await?;

        let form = Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, upstream_body = %body, "transcription rejected upstream");
            return Err(ProviderError::InvalidResponse(format!(
                "transcription returned HTTP {status}"
            )));
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("malformed transcription: {e}")))?;

        Ok(transcription.text)
    }
}
