//! Upstream AI service integrations
//!
//! Each provider wraps one external HTTP API behind a small typed surface.
//! Calls are independent and stateless; every request carries its own
//! credential and no retries or timeouts are layered on top of the client
//! defaults. Upstream error payloads are logged server-side and never find
//! their way into the error values handed back to routes.

mod ocr;
mod openrouter;
mod whisper;

use thiserror::Error;

pub use ocr::OcrProvider;
pub use openrouter::OpenRouterProvider;
pub use whisper::WhisperProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}
