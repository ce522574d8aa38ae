use crate::resolver::TranscriptResolver;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

const SERVICE_NAME: &str = "YouTube Transcript API";
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<TranscriptResolver>,
}

#[derive(Debug, Default)]
pub struct TranscriptQuery {
    video_id: Option<String>,
    lang: Option<String>,
}

impl TranscriptQuery {
    /// First occurrence wins when a key is repeated; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "video_id" => &mut query.video_id,
                "lang" => &mut query.lang,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

/// A validated `/transcript` request.
#[derive(Debug, PartialEq)]
pub struct TranscriptRequest {
    pub video_id: String,
    pub preferred_language: String,
}

impl TryFrom<TranscriptQuery> for TranscriptRequest {
    type Error = ApiError;

    fn try_from(query: TranscriptQuery) -> Result<Self, Self::Error> {
        let video_id = query
            .video_id
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingVideoId)?;
        Ok(Self {
            video_id,
            preferred_language: query.lang.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("video_id is required")]
    MissingVideoId,

    /// Reported with status 200 and an `error` body.
    #[error("{0}")]
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingVideoId => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::OK,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/transcript", get(transcript))
        .layer(cors)
        .with_state(state)
}

async fn transcript(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = TranscriptQuery::from_pairs(pairs);
    log::info!(
        "Transcript request: video_id={:?}, lang={:?}",
        query.video_id,
        query.lang
    );
    let request = TranscriptRequest::try_from(query).inspect_err(|_| {
        log::warn!("Rejected transcript request without video_id");
    })?;

    let segments = state
        .resolver
        .resolve(&request.video_id, &request.preferred_language)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(segments).into_response())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn home(State(state): State<AppState>) -> Json<serde_json::Value> {
    let proxy = state.resolver.proxy();
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "source": state.resolver.source_name(),
        "proxy": {
            "enabled": proxy.is_some(),
            "url": proxy.map(|p| p.redacted()),
        },
        "endpoints": {
            "/health": "Health check",
            "/transcript": "Get video transcript (params: video_id, lang)",
        },
        "example": "/transcript?video_id=dQw4w9WgXcQ&lang=ru",
    }))
}
