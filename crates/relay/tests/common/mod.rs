use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use cipherq_relay::{RecordStoreClient, RetryPolicy};

/// A file received on `/uploadProcessedFile`.
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Recorded traffic and scripted failures of the fake store.
#[derive(Debug, Default)]
pub struct StoreState {
    /// Respond 503 to this many fetches before serving the file.
    pub fetch_failures: usize,
    pub fetch_calls: usize,
    /// Respond 503 to this many uploads before accepting.
    pub upload_failures: usize,
    pub upload_calls: usize,
    pub uploads: Vec<Upload>,
    /// Status code returned by `/updateIv`, 200 when unset.
    pub iv_status: Option<u16>,
    pub iv_updates: Vec<(String, serde_json::Value)>,
}

pub struct FakeStore {
    /// Base URL of the record store API.
    pub base_url: String,
    /// Root under which `/files/{name}` serves `contents of {name}`.
    pub files_url: String,
    pub state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    pub fn file_url(&self, name: &str) -> String {
        format!("{}/{name}", self.files_url)
    }

    pub fn client(&self) -> RecordStoreClient {
        RecordStoreClient::new(&self.base_url, Duration::from_secs(5))
            .expect("client")
            .with_retry(RetryPolicy {
                retries: 3,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                multiplier: 2.0,
            })
    }
}

type Shared = Arc<Mutex<StoreState>>;

async fn serve_file(State(state): State<Shared>, Path(name): Path<String>) -> (StatusCode, Vec<u8>) {
    let mut s = state.lock().expect("lock");
    s.fetch_calls += 1;
    if s.fetch_failures > 0 {
        s.fetch_failures -= 1;
        return (StatusCode::SERVICE_UNAVAILABLE, b"busy".to_vec());
    }
    if name == "missing" {
        return (StatusCode::NOT_FOUND, b"no such file".to_vec());
    }
    (StatusCode::OK, format!("contents of {name}").into_bytes())
}

async fn upload(State(state): State<Shared>, mut multipart: Multipart) -> StatusCode {
    {
        let mut s = state.lock().expect("lock");
        s.upload_calls += 1;
        if s.upload_failures > 0 {
            s.upload_failures -= 1;
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }

    let mut id = String::new();
    let mut file_name = String::new();
    let mut data = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("field") {
        match field.name() {
            Some("id") => id = field.text().await.expect("id"),
            Some("file") => {
                file_name = field.file_name().unwrap_or_default().to_string();
                data = field.bytes().await.expect("file").to_vec();
            }
            _ => {}
        }
    }

    state.lock().expect("lock").uploads.push(Upload { id, file_name, data });
    StatusCode::OK
}

async fn update_iv(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let mut s = state.lock().expect("lock");
    s.iv_updates.push((id, body));
    s.iv_status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK)
}

/// Start a fake record store on an ephemeral port.
pub async fn spawn_store(state: StoreState) -> FakeStore {
    let state = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/files/{name}", get(serve_file))
        .route("/database/uploadProcessedFile", post(upload))
        .route("/database/updateIv/{id}", patch(update_iv))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    FakeStore {
        base_url: format!("http://{addr}/database"),
        files_url: format!("http://{addr}/files"),
        state,
    }
}
