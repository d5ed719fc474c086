//! HTTP/WebSocket Handlers

use std::path::{Path, PathBuf};

use axum::{
    Json,
    extract::{
        Multipart, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use futures::{Sink, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use recon_core::Agent;

use crate::frame::{Frame, static_url};
use crate::sink::WsEventSink;
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub keys_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_path: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// First frame of every session
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub file_path: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.agent.config().generation.model.clone(),
        keys_configured: state.config.keys_configured(),
    })
}

/// Store an image under the static root
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_MULTIPART", e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // Only the final path component is kept
        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "MISSING_FILENAME", "file has no name"))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_MULTIPART", e.to_string()))?;

        let destination = state.config.static_dir.join(&filename);
        tokio::fs::write(&destination, &bytes).await.map_err(|e| {
            tracing::error!(path = %destination.display(), "upload write failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_FAILED", "could not store file")
        })?;

        tracing::info!(path = %destination.display(), bytes = bytes.len(), "image uploaded");
        return Ok(Json(UploadResponse {
            file_path: destination.to_string_lossy().into_owned(),
            url: static_url(&destination),
        }));
    }

    Err(api_error(StatusCode::BAD_REQUEST, "MISSING_FILE", "multipart field 'file' is required"))
}

/// WebSocket session endpoint
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    let sink = WsEventSink::new(sender);
    serve_sessions(receiver, &sink, &state.agent).await;
}

/// Run one session per start frame until the peer leaves or sends an
/// unreadable frame.
async fn serve_sessions<R, E, S>(mut receiver: R, sink: &WsEventSink<S>, agent: &Agent)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
    S: Sink<Message> + Unpin + Send,
    S::Error: std::fmt::Display,
{
    loop {
        let request = match receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<StartRequest>(text.as_str()) {
                Ok(request) => request,
                Err(e) => {
                    tracing::info!("unreadable start frame, closing: {}", e);
                    break;
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                tracing::info!("client disconnected while waiting for input");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!("WebSocket error: {}", e);
                break;
            }
        };

        let Some(image_path) = existing_file(request.file_path.as_deref()).await else {
            if !sink
                .send(&Frame::Error {
                    content: "File not found.".into(),
                })
                .await
            {
                break;
            }
            continue;
        };

        let outcome = agent.run(&image_path, sink).await;
        tracing::debug!(?outcome, "websocket session finished");

        let ready = sink
            .send(&Frame::System {
                content: "\nAgent ready for new task.".into(),
            })
            .await;
        let ended = sink
            .send(&Frame::SessionEnd {
                content: "Session Concluded. Ready for next target.".into(),
            })
            .await;
        if !(ready && ended) {
            break;
        }
    }
}

/// `path` if it names an existing regular file
async fn existing_file(path: Option<&str>) -> Option<PathBuf> {
    let path = PathBuf::from(path.filter(|p| !p.is_empty())?);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => None,
    }
}
