//! In-process mock of the admin backend for integration tests
//!
//! The mock keeps resources in memory, records every mutating request and
//! can be told to fail specific calls the way the real backend does (JSON
//! body with a `detail` string).

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use enmedd_admin::api::AdminClient;
use enmedd_admin::config::Config;
use enmedd_admin::Session;

/// A request the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

#[derive(Default)]
pub struct MockState {
    pub document_sets: Vec<Value>,
    pub slack_configs: Vec<Value>,
    pub llm_options: Vec<Value>,
    pub llm_providers: Vec<Value>,
    pub recorded: Vec<Recorded>,
    pub get_counts: std::collections::HashMap<String, usize>,
    /// When set, deletes answer 400 with this detail
    pub delete_error: Option<String>,
    /// When set, the LLM test endpoint answers 400 with this detail
    pub llm_test_error: Option<String>,
    pub next_id: i64,
}

pub type Shared = Arc<Mutex<MockState>>;

type Reply = (StatusCode, Json<Value>);

fn ok(value: Value) -> Reply {
    (StatusCode::OK, Json(value))
}

fn bad_request(detail: &str) -> Reply {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail })))
}

fn record(state: &Shared, method: &'static str, path: String, body: Value) {
    state.lock().unwrap().recorded.push(Recorded { method, path, body });
}

fn count_get(state: &Shared, path: &str) {
    *state
        .lock()
        .unwrap()
        .get_counts
        .entry(path.to_string())
        .or_default() += 1;
}

// ─── Document sets ───────────────────────────────────────────────────────────

const DOCUMENT_SET: &str = "/api/manage/admin/document-set";

async fn list_document_sets(State(state): State<Shared>) -> Reply {
    count_get(&state, DOCUMENT_SET);
    ok(json!(state.lock().unwrap().document_sets))
}

async fn create_document_set(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    record(&state, "POST", DOCUMENT_SET.to_string(), body.clone());
    let mut s = state.lock().unwrap();
    s.next_id += 1;
    let id = s.next_id;
    let cc_pairs: Vec<Value> = body["cc_pair_ids"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|id| json!({ "id": id, "name": format!("connector {id}") }))
        .collect();
    s.document_sets.push(json!({
        "id": id,
        "name": body["name"],
        "description": body["description"],
        "cc_pair_descriptors": cc_pairs,
        "is_up_to_date": false,
        "is_public": true
    }));
    ok(json!(id))
}

async fn update_document_set(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    record(&state, "PATCH", DOCUMENT_SET.to_string(), body.clone());
    ok(Value::Null)
}

async fn delete_document_set(State(state): State<Shared>, Path(id): Path<i64>) -> Reply {
    delete_from(&state, format!("{DOCUMENT_SET}/{id}"), id, |s| &mut s.document_sets)
}

// ─── Slack bot configs ───────────────────────────────────────────────────────

const SLACK_CONFIG: &str = "/api/manage/admin/slack-bot/config";

async fn list_slack_configs(State(state): State<Shared>) -> Reply {
    count_get(&state, SLACK_CONFIG);
    ok(json!(state.lock().unwrap().slack_configs))
}

async fn delete_slack_config(State(state): State<Shared>, Path(id): Path<i64>) -> Reply {
    delete_from(&state, format!("{SLACK_CONFIG}/{id}"), id, |s| &mut s.slack_configs)
}

fn delete_from(
    state: &Shared,
    path: String,
    id: i64,
    rows: impl FnOnce(&mut MockState) -> &mut Vec<Value>,
) -> Reply {
    record(state, "DELETE", path, Value::Null);
    let mut s = state.lock().unwrap();
    if let Some(detail) = s.delete_error.clone() {
        return bad_request(&detail);
    }
    rows(&mut *s).retain(|row| row["id"] != json!(id));
    ok(Value::Null)
}

// ─── LLM providers ───────────────────────────────────────────────────────────

const LLM_PROVIDER: &str = "/api/admin/llm/provider";

async fn llm_options(State(state): State<Shared>) -> Reply {
    ok(json!(state.lock().unwrap().llm_options))
}

async fn list_llm_providers(State(state): State<Shared>) -> Reply {
    count_get(&state, LLM_PROVIDER);
    ok(json!(state.lock().unwrap().llm_providers))
}

async fn upsert_llm_provider(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    record(&state, "PUT", LLM_PROVIDER.to_string(), body.clone());
    let mut s = state.lock().unwrap();
    s.next_id += 1;
    let mut stored = body;
    stored["id"] = json!(s.next_id);
    s.llm_providers.push(stored.clone());
    ok(stored)
}

async fn test_llm(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    record(&state, "POST", "/api/admin/llm/test".to_string(), body);
    match state.lock().unwrap().llm_test_error.clone() {
        Some(detail) => bad_request(&detail),
        None => ok(Value::Null),
    }
}

// ─── Server ──────────────────────────────────────────────────────────────────

pub struct MockBackend {
    pub base_url: String,
    pub state: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub async fn start(state: MockState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/api/health", get(|| async { Json(json!({"success": true})) }))
            .route(
                DOCUMENT_SET,
                get(list_document_sets)
                    .post(create_document_set)
                    .patch(update_document_set),
            )
            .route(&format!("{DOCUMENT_SET}/:id"), delete(delete_document_set))
            .route(SLACK_CONFIG, get(list_slack_configs))
            .route(&format!("{SLACK_CONFIG}/:id"), delete(delete_slack_config))
            .route("/api/admin/llm/built-in/options", get(llm_options))
            .route(LLM_PROVIDER, get(list_llm_providers).put(upsert_llm_provider))
            .route("/api/admin/llm/test", post(test_llm))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn client(&self) -> AdminClient {
        AdminClient::new(
            self.base_url.clone(),
            None,
            Duration::from_secs(5),
            "enmedd-admin-tests",
        )
        .unwrap()
    }

    pub fn session(&self) -> Session {
        let mut config = Config::default();
        config.api.base_url = self.base_url.clone();
        config.ui.notification_ttl_secs = 60;
        Session::new(config).unwrap()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn get_count(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .get_counts
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
