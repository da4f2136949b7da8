//! Integration tests for the admin tap endpoints
//!
//! Drives the router end to end: attach over `POST /tap`, trace
//! delivery onto the streamed response, disconnect-triggered detach,
//! and `/tap/config_ids` listing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use tapwire_api::{build_router, AppState};
use tapwire_core::{
    ConfigIdRegistry, TapComponent, TapConfig, TapSink, TraceFormat, TraceRecord,
};

/// Component that records pushes and keeps the sink for submitting
struct RecordingComponent {
    config_id: String,
    applied: Mutex<Vec<TapConfig>>,
    sink: Mutex<Option<Arc<dyn TapSink>>>,
    cleared: AtomicUsize,
}

impl RecordingComponent {
    fn new(config_id: &str) -> Arc<Self> {
        Arc::new(Self {
            config_id: config_id.to_string(),
            applied: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            cleared: AtomicUsize::new(0),
        })
    }

    fn applied_count(&self) -> usize {
        self.applied.lock().len()
    }

    fn cleared(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }

    fn sink(&self) -> Arc<dyn TapSink> {
        Arc::clone(self.sink.lock().as_ref().expect("no sink applied"))
    }
}

impl TapComponent for RecordingComponent {
    fn config_id(&self) -> &str {
        &self.config_id
    }

    fn apply_config(&self, config: &TapConfig, sink: Arc<dyn TapSink>) {
        self.applied.lock().push(config.clone());
        *self.sink.lock() = Some(sink);
    }

    fn clear_config(&self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build an app with one component registered under `config_id`
fn test_app(config_id: &str) -> (Router, AppState, Arc<RecordingComponent>) {
    let state = AppState::new(Arc::new(ConfigIdRegistry::new()));
    let component = RecordingComponent::new(config_id);
    state
        .sessions
        .register_component(&(Arc::clone(&component) as Arc<dyn TapComponent>), config_id);

    (build_router(state.clone()), state, component)
}

fn tap_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/tap")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_tap_request() -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/tap")
        .body(Body::empty())
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read the first chunk from a streamed response body
async fn first_chunk(response: Response) -> Vec<u8> {
    let mut stream = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out waiting for a trace chunk")
        .expect("stream ended without a chunk")
        .expect("body error");
    chunk.to_vec()
}

/// Poll until `cond` holds, panicking after ~1s
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}

// =============================================================================
// Attach error paths
// =============================================================================

#[tokio::test]
async fn test_attach_requires_body() {
    let (app, _state, _component) = test_app("web");

    let response = app.oneshot(empty_tap_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "/tap requires a JSON body");
}

#[tokio::test]
async fn test_attach_rejects_malformed_body() {
    let (app, _state, _component) = test_app("web");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/tap")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.starts_with("malformed tap request"));
}

#[tokio::test]
async fn test_attach_rejects_unknown_config_id() {
    let (app, _state, component) = test_app("web");

    let body = json!({"config_id": "backend", "tap_config": {"match": {}}});
    let response = app.oneshot(tap_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let text = body_text(response).await;
    assert!(text.contains("unknown config_id 'backend'"), "{text}");
    assert_eq!(component.applied_count(), 0);
}

#[tokio::test]
async fn test_attach_rejects_missing_tap_config() {
    let (app, _state, component) = test_app("web");

    let response = app.oneshot(tap_request(json!({"config_id": "web"}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("tap_config"));
    assert_eq!(component.applied_count(), 0);
}

#[tokio::test]
async fn test_second_attach_is_rejected() {
    let (app, _state, component) = test_app("web");

    let body = json!({"config_id": "web", "tap_config": {"match": {}}});
    let first = app.clone().oneshot(tap_request(body.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(tap_request(body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(second).await.contains("already exists"));

    // The original session is untouched.
    assert_eq!(component.applied_count(), 1);
    assert_eq!(component.cleared(), 0);

    drop(first);
}

// =============================================================================
// Attach and stream
// =============================================================================

#[tokio::test]
async fn test_attach_streams_submitted_traces() {
    let (app, _state, component) = test_app("web");

    let body = json!({"config_id": "web", "tap_config": {"match": {"any": true}}});
    let response = app.oneshot(tap_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(component.applied_count(), 1);

    let record = TraceRecord::new(json!({"event": "request", "status": 200}));
    component.sink().submit(record, TraceFormat::Json).unwrap();

    let chunk = first_chunk(response).await;
    let parsed: Value = serde_json::from_slice(&chunk).unwrap();
    assert_eq!(parsed, json!({"event": "request", "status": 200}));
}

#[tokio::test]
async fn test_client_disconnect_detaches_and_clears() {
    let (app, state, component) = test_app("web");

    let body = json!({"config_id": "web", "tap_config": {"match": {}}});
    let response = app.oneshot(tap_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Dropping the response drops the streamed body: the client is
    // gone.
    drop(response);

    wait_until(|| component.cleared() == 1).await;
    assert!(!state.sessions.is_attached());

    // A submit racing the disconnect is a silent no-op.
    component
        .sink()
        .submit(TraceRecord::new(json!({"late": true})), TraceFormat::Json)
        .unwrap();
    wait_until(|| state.sessions.stats().dropped == 1).await;
}

#[tokio::test]
async fn test_reattach_after_disconnect() {
    let (app, _state, component) = test_app("web");
    let body = json!({"config_id": "web", "tap_config": {"match": {}}});

    let first = app.clone().oneshot(tap_request(body.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    drop(first);
    wait_until(|| component.cleared() == 1).await;

    let second = app.oneshot(tap_request(body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(component.applied_count(), 2);
}

// =============================================================================
// Config id listing
// =============================================================================

#[tokio::test]
async fn test_config_ids_empty() {
    let state = AppState::new(Arc::new(ConfigIdRegistry::new()));
    let app = build_router(state);

    let response = app.oneshot(get_request("/tap/config_ids")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_config_ids_lists_registered_ids() {
    let state = AppState::new(Arc::new(ConfigIdRegistry::new()));
    let web = RecordingComponent::new("web");
    let backend = RecordingComponent::new("backend");
    state
        .sessions
        .register_component(&(Arc::clone(&web) as Arc<dyn TapComponent>), "web");
    state
        .sessions
        .register_component(&(Arc::clone(&backend) as Arc<dyn TapComponent>), "backend");

    let app = build_router(state);
    let response = app.oneshot(get_request("/tap/config_ids")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    let mut ids: Vec<&str> = text.lines().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["backend", "web"]);
}
