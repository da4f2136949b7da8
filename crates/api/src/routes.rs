//! Admin tap routes

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use tapwire_core::{AdminStream, TapRequest};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::transport::ChannelStream;

const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Build the admin router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/tap", post(attach_tap))
        .route("/tap/config_ids", get(config_ids))
        .with_state(state)
}

/// `POST /tap` - attach a tap session and stream trace records
///
/// The response stays open, receiving one plain-text chunk per
/// captured trace record, until the client disconnects. Disconnect
/// detaches the session and clears the configuration from every
/// matching component.
async fn attach_tap(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("/tap requires a JSON body".to_string()));
    }
    let request: TapRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed tap request: {e}")))?;

    debug!(config_id = %request.config_id, "admin tap attach request");

    let (stream, rx) = ChannelStream::new();
    state
        .sessions
        .attach(request, Arc::new(stream) as Arc<dyn AdminStream>)?;

    let chunks = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Ok((
        [(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)],
        Body::from_stream(chunks),
    )
        .into_response())
}

/// `GET /tap/config_ids` - list registered config ids
///
/// Newline separated, unordered, empty when nothing is registered.
async fn config_ids(State(state): State<AppState>) -> Response {
    let mut out = String::new();
    for config_id in state.registry.config_ids() {
        out.push_str(&config_id);
        out.push('\n');
    }

    ([(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)], out).into_response()
}
