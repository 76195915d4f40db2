use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpServerConfig;
use crate::error::{CoursemateError, Result};
use crate::ingest::UploadedFile;
use crate::parse::ChoiceLetter;
use crate::session::{Mode, RequestRejection, Session, StudyAssistant};

/// Slack on top of the upload limit for multipart framing
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Who may call the API
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Required bearer key; `None` means authless
    pub api_key: Option<String>,
    /// Allowed browser origins; empty allows all
    pub allowed_origins: Vec<String>,
}

impl AccessPolicy {
    /// Read the API key from the configured environment variable unless authless
    pub fn from_config(config: &HttpServerConfig) -> Result<Self> {
        let api_key = if config.authless {
            None
        } else {
            Some(std::env::var(&config.api_key_env).map_err(|_| {
                CoursemateError::Config(format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable, or enable authless mode.",
                    config.api_key_env
                ))
            })?)
        };

        Ok(Self {
            api_key,
            allowed_origins: config.allowed_origins.clone(),
        })
    }
}

/// JSON API over a single study session
pub struct HttpServer {
    assistant: Arc<StudyAssistant>,
    session: Arc<Mutex<Session>>,
    access: AccessPolicy,
}

impl HttpServer {
    pub fn new(assistant: Arc<StudyAssistant>, access: AccessPolicy) -> Self {
        Self {
            assistant,
            session: Arc::new(Mutex::new(Session::new())),
            access,
        }
    }

    /// Shared session served by this instance
    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    /// Bind `127.0.0.1:<port>` and serve until the process exits
    pub async fn run(&self, port: u16) -> Result<()> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            CoursemateError::Config(format!(
                "Failed to bind to {}: {}. Set http_server.port in config.toml to use another port.",
                addr, e
            ))
        })?;

        log::info!("Starting Coursemate HTTP server on http://{}", addr);
        if self.access.api_key.is_none() {
            log::warn!("Authless mode: API requests are not authenticated");
        }

        axum::serve(listener, self.router())
            .await
            .map_err(|e| CoursemateError::Io(std::io::Error::other(format!("HTTP server error: {}", e))))?;

        Ok(())
    }

    /// Build the axum router
    pub fn router(&self) -> Router {
        let cors = if self.access.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .access
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let upload_limit = usize::try_from(self.assistant.settings().max_upload_bytes)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD_BYTES);

        let state = AppState {
            assistant: Arc::clone(&self.assistant),
            session: Arc::clone(&self.session),
            access: Arc::new(self.access.clone()),
        };

        Router::new()
            .route("/health", get(handle_health))
            .route("/api/status", get(handle_status))
            .route(
                "/api/material",
                post(handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
            )
            .route("/api/chat", post(handle_chat))
            .route("/api/quiz/next", post(handle_quiz_next))
            .route("/api/quiz/answer", post(handle_quiz_answer))
            .route("/api/session/reset", post(handle_reset))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(state)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    assistant: Arc<StudyAssistant>,
    session: Arc<Mutex<Session>>,
    access: Arc<AccessPolicy>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    mode: Mode,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    choice: String,
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Auth and origin checks; skipped entirely in authless mode
fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), Response> {
    let Some(expected_key) = state.access.api_key.as_deref() else {
        return Ok(());
    };
    validate_auth(headers, expected_key)?;
    validate_origin(headers, &state.access.allowed_origins)
}

fn validate_auth(headers: &HeaderMap, expected_key: &str) -> std::result::Result<(), Response> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header",
                "Use 'Authorization: Bearer <api-key>' header",
            )
        })?;

    let Some(provided_key) = auth_header.strip_prefix("Bearer ") else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format",
            "Use 'Authorization: Bearer <api-key>' header",
        ));
    };

    if provided_key != expected_key {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid API key",
            "The provided API key was rejected",
        ));
    }

    Ok(())
}

/// Reject browser requests from origins outside the configured list
fn validate_origin(
    headers: &HeaderMap,
    allowed_origins: &[String],
) -> std::result::Result<(), Response> {
    if allowed_origins.is_empty() {
        return Ok(());
    }

    // Non-browser clients send no Origin
    let Some(origin) = headers.get("origin").and_then(|h| h.to_str().ok()) else {
        return Ok(());
    };

    if allowed_origins.iter().any(|allowed| origin == allowed) {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "Origin not allowed",
            format!("Origin '{}' is not in the allowed origins list", origin),
        ))
    }
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "coursemate",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

async fn handle_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let session = state.session.lock().await;
    Json(serde_json::json!({
        "material": session.status(),
        "conversation_length": session.conversation().len(),
        "quiz": session.quiz(),
    }))
    .into_response()
}

async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let max_bytes = state.assistant.settings().max_upload_bytes;
    let mut files = Vec::new();
    let mut total: u64 = 0;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(e.status(), "Invalid upload", e.body_text()),
        };

        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return error_response(e.status(), "Invalid upload", e.body_text()),
        };

        total += bytes.len() as u64;
        if total > max_bytes {
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Upload too large",
                format!("Total file size exceeds {}MB limit", max_bytes / (1024 * 1024)),
            );
        }
        files.push(UploadedFile::new(name, bytes.to_vec()));
    }

    if files.is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "No files uploaded",
            "Attach PDF or image files as multipart file fields",
        );
    }

    let mut session = state.session.lock().await;
    match state.assistant.ingest_uploads(&mut session, files).await {
        Ok(report) => Json(report).into_response(),
        Err(CoursemateError::InvalidInput(message)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid upload", message)
        }
        Err(e) => {
            log::error!("Upload processing failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Upload processing failed", e.to_string())
        }
    }
}

async fn handle_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let mut session = state.session.lock().await;
    match state.assistant.handle(&mut session, request.mode, &request.message).await {
        Ok(reply) => Json(reply).into_response(),
        Err(rejection) => error_response(rejection_status(rejection), "Request rejected", rejection.to_string()),
    }
}

fn rejection_status(rejection: RequestRejection) -> StatusCode {
    match rejection {
        RequestRejection::EmptyInput => StatusCode::BAD_REQUEST,
        RequestRejection::DuplicateInput | RequestRejection::Cooldown => StatusCode::TOO_MANY_REQUESTS,
        RequestRejection::NoMaterial => StatusCode::CONFLICT,
    }
}

async fn handle_quiz_next(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let mut session = state.session.lock().await;
    Json(state.assistant.next_quiz(&mut session).await).into_response()
}

async fn handle_quiz_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnswerRequest>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let Some(choice) = ChoiceLetter::parse_answer(&request.choice) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid choice",
            "Choice must be one of A, B, C or D",
        );
    };

    let mut session = state.session.lock().await;
    match session.answer_quiz(choice) {
        Some(answer) => Json(answer).into_response(),
        None => error_response(StatusCode::CONFLICT, "No active quiz", "Request a question first"),
    }
}

async fn handle_reset(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    state.session.lock().await.reset_conversation();
    Json(serde_json::json!({"status": "reset"})).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_validate_auth() {
        assert!(validate_auth(&headers(&[("authorization", "Bearer secret")]), "secret").is_ok());

        let missing = validate_auth(&HeaderMap::new(), "secret").unwrap_err();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong_scheme = validate_auth(&headers(&[("authorization", "Basic secret")]), "secret").unwrap_err();
        assert_eq!(wrong_scheme.status(), StatusCode::UNAUTHORIZED);

        let wrong_key = validate_auth(&headers(&[("authorization", "Bearer nope")]), "secret").unwrap_err();
        assert_eq!(wrong_key.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_validate_origin() {
        let allowed = vec!["http://localhost:3000".to_string()];
        assert!(validate_origin(&HeaderMap::new(), &allowed).is_ok());
        assert!(validate_origin(&headers(&[("origin", "http://localhost:3000")]), &allowed).is_ok());
        assert!(validate_origin(&headers(&[("origin", "https://evil.example")]), &[]).is_ok());

        let rejected = validate_origin(&headers(&[("origin", "https://evil.example")]), &allowed).unwrap_err();
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_access_policy_authless() {
        let config = HttpServerConfig {
            authless: true,
            ..HttpServerConfig::default()
        };
        assert!(AccessPolicy::from_config(&config).unwrap().api_key.is_none());
    }

    #[test]
    fn test_access_policy_requires_key_env() {
        let config = HttpServerConfig {
            authless: false,
            api_key_env: "COURSEMATE_TEST_UNSET_HTTP_KEY".to_string(),
            ..HttpServerConfig::default()
        };
        assert!(matches!(
            AccessPolicy::from_config(&config),
            Err(CoursemateError::Config(_))
        ));
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(rejection_status(RequestRejection::Cooldown), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejection_status(RequestRejection::NoMaterial), StatusCode::CONFLICT);
    }
}
