//! Image text recognition via a hosted OCR API
//!
//! Speaks the ocr.space parse format: multipart upload with an `apikey`
//! header and a `language` hint field, parsed text returned per region in
//! `ParsedResults`.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::ProviderError;

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored: bool,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}

pub struct OcrProvider {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl OcrProvider {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key,
        }
    }

    /// Upload the image and return the extracted text.
    ///
    /// `language_hints` narrows recognition (e.g. `["eng", "ara"]`); hints are
    /// joined with `+` in the request.
    pub async fn recognize(
        &self,
        path: &Path,
        language_hints: &[&str],
    ) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("OCR_API_KEY"))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".into());
        let bytes = tokio::fs::read(path).await?;

        let form = Form::new()
            .text("language", language_hints.join("+"))
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(&self.url)
            .header("apikey", api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, upstream_body = %body, "OCR rejected upstream");
            return Err(ProviderError::InvalidResponse(format!(
                "OCR returned HTTP {status}"
            )));
        }

        let ocr: OcrResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("malformed OCR response: {e}")))?;

        if ocr.is_errored {
            return Err(ProviderError::InvalidResponse(
                "OCR reported a processing error".into(),
            ));
        }

        Ok(ocr
            .parsed_results
            .into_iter()
            .map(|r| r.parsed_text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
