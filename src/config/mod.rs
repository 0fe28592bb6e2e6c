//! Application configuration

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default bound on messages kept per conversation log, system prompt included.
const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub openrouter_api_key: Option<String>,
    pub openrouter_url: String,
    pub openai_api_key: Option<String>,
    pub openai_url: String,
    pub ocr_api_key: Option<String>,
    pub ocr_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub history_limit: usize,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            openrouter_api_key: env::var("OPENROUTER_API_KEY").ok(),
            openrouter_url: env::var("OPENROUTER_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".into()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_url: env::var("OPENAI_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            ocr_api_key: env::var("OCR_API_KEY").ok(),
            ocr_url: env::var("OCR_URL")
                .unwrap_or_else(|_| "https://api.ocr.space/parse/image".into()),
            chat_model: env::var("CHAT_MODEL")
                .unwrap_or_else(|_| "mistralai/mistral-7b-instruct".into()),
            image_model: env::var("IMAGE_MODEL").unwrap_or_else(|_| "openai/dall-e-3".into()),
            history_limit: env::var("HISTORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
        })
    }
}
