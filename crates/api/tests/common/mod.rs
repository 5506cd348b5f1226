#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use cipherq_events::LocalBus;
use cipherq_relay::RecordStoreClient;
use cipherq_worker::{ProcessTransform, Supervisor};
use http_body_util::BodyExt;
use tower::ServiceExt;

use cipherq_api::config::ServerConfig;
use cipherq_api::router::build_app_router;
use cipherq_api::state::AppState;
use cipherq_api::ws::ObserverRegistry;

/// Nothing listens on the discard port, so any store call fails fast.
const UNREACHABLE_STORE: &str = "http://127.0.0.1:9/database";

/// Build a test `ServerConfig` from the defaults, bound to an ephemeral port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::from_lookup(|_| None).expect("default config");
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.worker.record_store_url = UNREACHABLE_STORE.to_string();
    config
}

/// Handles to the shared pieces behind a test router.
pub struct TestContext {
    pub bus: Arc<LocalBus>,
    pub observers: Arc<ObserverRegistry>,
    pub supervisor: Supervisor,
    pub config: ServerConfig,
}

/// Build the full application router with the production middleware stack.
///
/// The supervisor is constructed but not running; tests that need jobs to
/// execute start it themselves.
pub fn build_test_app() -> (Router, TestContext) {
    let config = test_config();
    let bus = Arc::new(LocalBus::new(config.bus_capacity));
    let observers = Arc::new(ObserverRegistry::new());

    let store = RecordStoreClient::new(UNREACHABLE_STORE, Duration::from_secs(1))
        .expect("store client");
    let supervisor = Supervisor::new(
        &config.worker,
        bus.clone(),
        Arc::new(store),
        Arc::new(ProcessTransform::from_config(&config.worker)),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        bus: bus.clone(),
        observers: observers.clone(),
        supervisor: supervisor.clone(),
    };
    let app = build_app_router(state, &config);

    let ctx = TestContext {
        bus,
        observers,
        supervisor,
        config,
    };
    (app, ctx)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

/// A valid CBC Job Message without an IV.
pub fn job_payload(job_id: &str) -> String {
    serde_json::json!({
        "jobId": job_id,
        "sourceUrl": "http://127.0.0.1:9/files/report.pdf",
        "fileName": "report.pdf",
        "keyLengthBits": 128,
        "key": "0123456789abcdef",
        "mode": "CBC",
        "operation": "encrypt",
        "iv": ""
    })
    .to_string()
}
