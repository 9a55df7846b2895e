use crate::app::AppState;
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tracing::{debug, warn};

pub fn router(path: &str) -> Router<AppState> {
    Router::new().route(path, post(webhook_handler))
}

/// Receives one call event and answers with the next command.
///
/// Failed exchanges never produce a command body; the error is reported with
/// a non-200 status instead.
pub async fn webhook_handler(State(state): State<AppState>, body: Bytes) -> Response {
    debug!(body_len = body.len(), "call event received");
    match state.server.handle(&body).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            let status = e.status_code();
            warn!(status = status.as_u16(), "rejecting call event: {}", e);
            (status, e.to_string()).into_response()
        }
    }
}
