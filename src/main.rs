//! Verve - Versatile AI Backend API
//!
//! One HTTP surface proxying chat, image generation, OCR, and voice
//! transcription to third-party AI services. Every endpoint validates its
//! input, forwards it upstream with the right credential, and relays the
//! result as JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod intent;
mod providers;
mod routes;
mod upload;

use config::Config;
use conversation::SessionStore;
use intent::IntentClassifier;
use providers::{OcrProvider, OpenRouterProvider, WhisperProvider};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub classifier: Arc<IntentClassifier>,
    pub openrouter: Arc<OpenRouterProvider>,
    pub whisper: Arc<WhisperProvider>,
    pub ocr: Arc<OcrProvider>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verve_ai=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = AppState {
        sessions: Arc::new(SessionStore::new(config.history_limit)),
        classifier: Arc::new(IntentClassifier::new()),
        openrouter: Arc::new(OpenRouterProvider::new(
            &config.openrouter_url,
            config.openrouter_api_key.clone(),
            &config.chat_model,
            &config.image_model,
        )),
        whisper: Arc::new(WhisperProvider::new(
            &config.openai_url,
            config.openai_api_key.clone(),
        )),
        ocr: Arc::new(OcrProvider::new(&config.ocr_url, config.ocr_api_key.clone())),
        config,
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("⚡ Verve API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
