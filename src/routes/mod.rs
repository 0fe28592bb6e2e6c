//! API routes

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::conversation::SessionStore;
use crate::intent::Intent;
use crate::providers::ProviderError;
use crate::upload::{StagedUpload, UploadError};
use crate::AppState;

/// Language hints for the OCR upload route.
const OCR_LANGUAGES: [&str; 2] = ["eng", "ara"];

/// Route-level failures, serialized as `{ "error": "..." }`.
///
/// Client mistakes carry a field-specific message; upstream and IO failures
/// map to a generic 500 body with the cause logged server-side only.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    MissingInput(&'static str),

    #[error("Please provide a description for the image.")]
    MissingPrompt,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingInput(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            ApiError::MissingPrompt => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Upload(UploadError::MissingFile(_)) | ApiError::Upload(UploadError::Malformed(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Upload(UploadError::Io(e)) => {
                error!(error = %e, "upload staging failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process request".to_string(),
                )
            }
            ApiError::Provider(e) => {
                error!(error = %e, "upstream request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process request".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChatReply {
    Image {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    Text {
        response: String,
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageResponse {
    #[serde(rename = "imageUrl")]
    image_url: String,
}

#[derive(Debug, Serialize)]
struct TextResponse {
    text: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Chat endpoint. Image-intent messages are diverted to image generation
/// before any conversation state is touched.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let message = match request.message.as_deref() {
        Some(m) if !m.trim().is_empty() => m,
        _ => return Err(ApiError::MissingInput("Message is required")),
    };

    if let Intent::GenerateImage { prompt } = state.classifier.classify(message) {
        if prompt.is_empty() {
            return Err(ApiError::MissingPrompt);
        }
        let image_url = state.openrouter.generate_image(&prompt).await?;
        return Ok(Json(ChatReply::Image { image_url }));
    }

    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(SessionStore::new_session_id);
    let log = state.sessions.log(&session_id);

    log.lock().unwrap().push_user(message);
    let history = log.lock().unwrap().messages().to_vec();

    let response = state.openrouter.chat(&history).await?;
    log.lock().unwrap().push_assistant(&response);

    Ok(Json(ChatReply::Text {
        response,
        session_id,
    }))
}

/// OCR endpoint: stage the uploaded image, extract text, delete the file.
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TextResponse>, ApiError> {
    let staged = StagedUpload::receive(&state.config.upload_dir, "image", &mut multipart).await?;
    let text = state.ocr.recognize(staged.path(), &OCR_LANGUAGES).await?;
    Ok(Json(TextResponse { text }))
}

/// Transcription endpoint: stage the uploaded audio, transcribe, delete.
async fn upload_voice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TextResponse>, ApiError> {
    let staged = StagedUpload::receive(&state.config.upload_dir, "voice", &mut multipart).await?;
    let text = state.whisper.transcribe(staged.path()).await?;
    Ok(Json(TextResponse { text }))
}

async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<GenerateImageRequest>,
) -> Result<Json<ImageResponse>, ApiError> {
    let prompt = match request.prompt.as_deref() {
        Some(p) if !p.trim().is_empty() => p,
        _ => return Err(ApiError::MissingInput("Prompt is required")),
    };

    let image_url = state.openrouter.generate_image(prompt).await?;
    Ok(Json(ImageResponse { image_url }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/upload-image", post(upload_image))
        .route("/api/upload-voice", post(upload_voice))
        .route("/api/generate-image", post(generate_image))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::conversation::Role;
    use crate::intent::IntentClassifier;
    use crate::providers::{OcrProvider, OpenRouterProvider, WhisperProvider};

    /// Build app state against the given upstream base URL. Port 9 is used
    /// for tests that must never reach an upstream: a connection there fails,
    /// so an accidental call shows up as a 500 instead of the expected 400.
    fn test_state(upstream: &str) -> AppState {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            openrouter_api_key: Some("test-key".into()),
            openrouter_url: upstream.into(),
            openai_api_key: Some("test-key".into()),
            openai_url: upstream.into(),
            ocr_api_key: Some("test-key".into()),
            ocr_url: format!("{upstream}/parse/image"),
            chat_model: "mistralai/mistral-7b-instruct".into(),
            image_model: "openai/dall-e-3".into(),
            history_limit: 10,
            upload_dir: std::env::temp_dir().join("verve-ai-tests"),
        };
        AppState {
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
        }
    }

    fn app(state: AppState) -> Router {
        router().with_state(state)
    }

    /// Stub OpenRouter serving a fixed completion and image URL.
    async fn spawn_stub_upstream() -> String {
        let app = Router::new()
            .route(
                "/chat/completions",
                post(|| async {
                    Json(json!({
                        "choices": [{"message": {"role": "assistant", "content": "stubbed reply"}}]
                    }))
                }),
            )
            .route(
                "/images/generations",
                post(|| async {
                    Json(json!({"data": [{"url": "https://img.example/out.png"}]}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn json_post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn chat_without_message_is_400_and_offline() {
        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(json_post("/api/chat", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Message is required");
    }

    #[tokio::test]
    async fn chat_with_empty_message_is_400() {
        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(json_post("/api/chat", json!({"message": "   "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bare_image_trigger_is_400_and_offline() {
        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(json_post("/api/chat", json!({"message": "create an image"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Please provide a description for the image.");
    }

    #[tokio::test]
    async fn generate_image_without_prompt_is_400() {
        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(json_post("/api/generate-image", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Prompt is required");
    }

    #[tokio::test]
    async fn upload_image_without_file_is_400() {
        let body = "--boundary\r\n\
                    Content-Disposition: form-data; name=\"note\"\r\n\r\n\
                    not a file\r\n\
                    --boundary--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload-image")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=boundary",
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No file uploaded in field 'image'");
    }

    #[tokio::test]
    async fn upload_voice_without_file_is_400() {
        let body = "--boundary\r\n\
                    Content-Disposition: form-data; name=\"image\"; filename=\"a.png\"\r\n\
                    Content-Type: image/png\r\n\r\n\
                    bytes\r\n\
                    --boundary--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload-voice")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=boundary",
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_generic_500() {
        let response = app(test_state("http://127.0.0.1:9"))
            .oneshot(json_post("/api/generate-image", json!({"prompt": "a cat"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Failed to process request");
    }

    #[tokio::test]
    async fn chat_round_trip_records_both_sides() {
        let upstream = spawn_stub_upstream().await;
        let state = test_state(&upstream);
        let app = app(state.clone());

        let response = app
            .clone()
            .oneshot(json_post("/api/chat", json!({"message": "hello there"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"], "stubbed reply");
        let session_id = json["sessionId"].as_str().unwrap().to_string();

        let response = app
            .oneshot(json_post(
                "/api/chat",
                json!({"message": "and again", "sessionId": session_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let log = state.sessions.log(&session_id);
        let log = log.lock().unwrap();
        let roles: Vec<Role> = log.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant
            ]
        );
        assert_eq!(log.messages()[1].content, "hello there");
        assert_eq!(log.messages()[2].content, "stubbed reply");
    }

    #[tokio::test]
    async fn image_intent_diverts_to_image_generation() {
        let upstream = spawn_stub_upstream().await;
        let response = app(test_state(&upstream))
            .oneshot(json_post("/api/chat", json!({"message": "draw me a cat"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["imageUrl"], "https://img.example/out.png");
        assert!(json.get("response").is_none());
    }

    #[tokio::test]
    async fn generate_image_returns_first_url() {
        let upstream = spawn_stub_upstream().await;
        let response = app(test_state(&upstream))
            .oneshot(json_post(
                "/api/generate-image",
                json!({"prompt": "a lighthouse at dusk"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["imageUrl"], "https://img.example/out.png");
    }

    #[tokio::test]
    async fn staged_upload_is_deleted_after_failed_processing() {
        let state = test_state("http://127.0.0.1:9");
        let upload_dir = state.config.upload_dir.clone();
        let _ = std::fs::remove_dir_all(&upload_dir);

        let body = "--boundary\r\n\
                    Content-Disposition: form-data; name=\"voice\"; filename=\"note.wav\"\r\n\
                    Content-Type: audio/wav\r\n\r\n\
                    RIFFdata\r\n\
                    --boundary--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload-voice")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=boundary",
            )
            .body(Body::from(body))
            .unwrap();

        // Upstream is unreachable, so transcription fails after staging.
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let leftovers: Vec<_> = std::fs::read_dir(&upload_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).collect())
            .unwrap_or_default();
        assert!(leftovers.is_empty(), "staged file survived the handler");
    }
}
