use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Multipart;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::generate::RecommendError;
use crate::generate::RecommendFlow;
use crate::routine::ParseFailure;
use crate::voice::VoiceFlow;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

/// Request body for /v1/recommend_routine
#[derive(Deserialize)]
struct RecommendRequest {
    situation: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    version: &'static str,
    recommend: Arc<RecommendFlow>,
    voice: Option<Arc<VoiceFlow>>,
}

impl AppState {
    pub fn new(recommend: Arc<RecommendFlow>, voice: Option<Arc<VoiceFlow>>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            recommend,
            voice,
        }
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for POST /v1/recommend_routine
#[tracing::instrument(skip(state, request))]
async fn recommend_routine(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> Response {
    tracing::info!(situation = %request.situation, "Handling routine recommendation");

    match state.recommend.recommend(&request.situation).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            tracing::error!("Recommendation failed: {err}");
            (
                recommend_status(&err),
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for POST /v1/voice_analysis
///
/// Accepts a multipart WAV upload, runs speech-to-text plus emotion
/// enrichment, and feeds the resulting situation text through the
/// recommendation flow.
#[tracing::instrument(skip(state, multipart))]
async fn voice_analysis(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let Some(voice) = &state.voice else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "voice analysis is not configured".to_string(),
            }),
        )
            .into_response();
    };

    let audio = match read_audio_field(&mut multipart).await {
        Ok(audio) => audio,
        Err(error) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response();
        }
    };

    let situation = match voice.analyze(&audio).await {
        Ok(situation) => situation,
        Err(err) => {
            tracing::error!("Voice analysis failed: {err}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.recommend.recommend(&situation).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            tracing::error!("Recommendation failed: {err}");
            (
                recommend_status(&err),
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn read_audio_field(multipart: &mut Multipart) -> Result<Vec<u8>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("invalid multipart body: {e}"))?
    {
        if field.name() != Some("audio") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !matches!(content_type.as_str(), "audio/wave" | "audio/wav" | "audio/x-wav") {
            return Err("Only .wav file format is supported!".to_string());
        }

        return field
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| format!("failed to read audio field: {e}"));
    }

    Err("missing multipart field 'audio'".to_string())
}

fn recommend_status(err: &RecommendError) -> StatusCode {
    match err {
        RecommendError::Parse(ParseFailure::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        RecommendError::Parse(_) | RecommendError::Generate(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Create the API router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/recommend_routine", post(recommend_routine))
        .route("/v1/voice_analysis", post(voice_analysis))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Binds to the given address and serves until the shutdown signal fires.
pub async fn serve(
    listen: String,
    port: u16,
    state: AppState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GenerateError;

    #[test]
    fn test_recommend_status_mapping() {
        let validation = RecommendError::Parse(ParseFailure::Validation("dup".to_string()));
        assert_eq!(recommend_status(&validation), StatusCode::UNPROCESSABLE_ENTITY);

        let unavailable =
            RecommendError::Parse(ParseFailure::ServiceUnavailable("down".to_string()));
        assert_eq!(recommend_status(&unavailable), StatusCode::BAD_GATEWAY);

        let malformed = RecommendError::Parse(ParseFailure::MalformedOutput("eh".to_string()));
        assert_eq!(recommend_status(&malformed), StatusCode::BAD_GATEWAY);

        let generate = RecommendError::Generate(GenerateError::Unavailable("down".to_string()));
        assert_eq!(recommend_status(&generate), StatusCode::BAD_GATEWAY);
    }
}
