//! Test harness for the Carebot web front-end.
//!
//! Real backends are replaced by an in-process stub that serves both the
//! auth and chat surfaces on one ephemeral port. The stub keeps request
//! counters so tests can assert how many backend calls an operation made.
//!
//! Fixed accounts:
//!
//! - `alice01` / `alice-password-123` - plain approved user
//! - `root01` / `root-password-1234` - administrator
//! - `sam01` / `sam-password-12345` - suspended account
//!
//! Values `taken01`, `taken@example.com` and `E9999` are reported as
//! already in use by the uniqueness check.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

use carebot_web::AppState;
use carebot_web::backend::BackendClient;
use carebot_web::config::{BackendConfig, Environment, WebConfig};

/// Request counters shared with the stub's handlers.
#[derive(Debug, Default)]
pub struct Counters {
    pub unique_checks: AtomicUsize,
    pub created_users: AtomicUsize,
    pub model_list_calls: AtomicUsize,
    pub row_actions: AtomicUsize,
}

impl Counters {
    #[must_use]
    pub fn unique_checks(&self) -> usize {
        self.unique_checks.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn created_users(&self) -> usize {
        self.created_users.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn model_list_calls(&self) -> usize {
        self.model_list_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn row_actions(&self) -> usize {
        self.row_actions.load(Ordering::SeqCst)
    }
}

/// An in-process stand-in for the auth and chat backends.
pub struct StubBackend {
    addr: SocketAddr,
    pub counters: Arc<Counters>,
}

impl StubBackend {
    /// Bind the stub on an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        let counters = Arc::new(Counters::default());
        let router = stub_router(Arc::clone(&counters));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind stub backend");
        let addr = listener.local_addr().expect("stub backend has no address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { addr, counters }
    }

    /// Backend configuration pointing both backends at the stub.
    #[must_use]
    pub fn backend_config(&self) -> BackendConfig {
        let base = url::Url::parse(&format!("http://{}", self.addr))
            .expect("stub address is not a valid URL");
        BackendConfig {
            auth_url: base.clone(),
            chat_url: base,
            api_version: "v0".to_owned(),
        }
    }

    /// A client wired to the stub.
    #[must_use]
    pub fn client(&self) -> BackendClient {
        BackendClient::new(&self.backend_config()).expect("failed to build backend client")
    }

    /// Full web configuration wired to the stub, hard delete enabled.
    #[must_use]
    pub fn web_config(&self) -> WebConfig {
        WebConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
            environment: Environment::Development,
            backend: self.backend_config(),
            allow_hard_delete: true,
            prototype_db_path: None,
        }
    }
}

/// The front-end application running against a stub backend.
pub struct TestApp {
    pub base_url: String,
    pub backend: StubBackend,
}

/// Spawn the full application on an ephemeral port.
pub async fn spawn_app() -> TestApp {
    let backend = StubBackend::spawn().await;
    let state = AppState::new(backend.web_config()).expect("failed to build app state");
    let router = carebot_web::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind app");
    let addr = listener.local_addr().expect("app has no address");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    TestApp {
        base_url: format!("http://{addr}"),
        backend,
    }
}

fn stub_router(counters: Arc<Counters>) -> Router {
    Router::new()
        .route("/v0/login/verify", post(login_verify))
        .route("/v0/login/verify_unique_key", post(verify_unique_key))
        .route("/v0/login/add_user", post(add_user))
        .route("/v0/login/self_update", post(self_update))
        .route("/v0/login/self_block", post(ok_envelope))
        .route("/v0/login/reset_request", post(ok_envelope))
        .route("/v0/admin/users", get(list_users))
        .route("/v0/admin/users/signup", post(row_action))
        .route("/v0/admin/users/block", post(row_action))
        .route("/v0/admin/users/delete", post(row_action))
        .route("/v0/admin/users/password", post(row_action))
        .route("/v0/base/ping", get(ping))
        .route("/v0/base/model_list", get(model_list))
        .route("/v0/base/default_model", get(default_model))
        .route("/v0/chat/web", post(chat_web))
        .with_state(counters)
}

fn profile(
    user_id: &str,
    user_name: &str,
    employee_no: &str,
    email: &str,
    developer: bool,
    admin: bool,
) -> Value {
    json!({
        "user_id": user_id,
        "user_name": user_name,
        "employee_no": employee_no,
        "email": email,
        "developer": developer,
        "admin": admin,
    })
}

async fn login_verify(Json(body): Json<Value>) -> Json<Value> {
    let user_id = body.get("user_id").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    let response = match (user_id, password) {
        ("alice01", "alice-password-123") => json!({
            "ok": true, "msg": "",
            "user": profile("alice01", "Alice", "E1001", "alice@example.com", false, false),
        }),
        ("root01", "root-password-1234") => json!({
            "ok": true, "msg": "",
            "user": profile("root01", "Root", "E0001", "root@example.com", false, true),
        }),
        ("sam01", "sam-password-12345") => json!({
            "ok": false, "msg": "account suspended", "reason": "suspended",
        }),
        _ => json!({
            "ok": false, "msg": "invalid credentials", "reason": "invalid_credentials",
        }),
    };
    Json(response)
}

async fn verify_unique_key(
    State(counters): State<Arc<Counters>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    counters.unique_checks.fetch_add(1, Ordering::SeqCst);

    let value = body.get("value").and_then(Value::as_str).unwrap_or_default();
    let exists = matches!(value, "taken01" | "taken@example.com" | "E9999");
    let msg = if exists { "already in use" } else { "" };
    Json(json!({ "ok": true, "msg": msg, "exists": exists }))
}

async fn add_user(State(counters): State<Arc<Counters>>, Json(_body): Json<Value>) -> Json<Value> {
    counters.created_users.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "ok": true, "msg": "created", "idx": 42 }))
}

async fn self_update(Json(body): Json<Value>) -> Json<Value> {
    let update = body.get("update").cloned().unwrap_or_default();
    let user_name = update
        .get("user_name")
        .and_then(Value::as_str)
        .unwrap_or("Alice");
    let email = update
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or("alice@example.com");

    Json(json!({
        "ok": true, "msg": "",
        "user": profile("alice01", user_name, "E1001", email, false, false),
    }))
}

async fn ok_envelope(Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({ "ok": true, "msg": "" }))
}

async fn list_users() -> Json<Value> {
    Json(json!({
        "ok": true, "msg": "",
        "users": [
            {
                "idx": 1, "user_id": "pending01", "user_name": "Pending",
                "employee_no": "E2001", "email": "pending@example.com",
                "developer": false, "admin": false, "approved": false,
                "registered_at": "2025-01-01T00:00:00Z", "suspended_at": null,
            },
            {
                "idx": 2, "user_id": "root01", "user_name": "Root",
                "employee_no": "E0001", "email": "root@example.com",
                "developer": false, "admin": true, "approved": true,
                "registered_at": "2024-06-01T00:00:00Z", "suspended_at": null,
            },
            {
                "idx": 3, "user_id": "frozen01", "user_name": "Frozen",
                "employee_no": "E2003", "email": "frozen@example.com",
                "developer": false, "admin": false, "approved": true,
                "registered_at": "2025-01-01T00:00:00Z",
                "suspended_at": "2025-06-01T00:00:00Z",
            },
            {
                "idx": 4, "user_id": "alice01", "user_name": "Alice",
                "employee_no": "E1001", "email": "alice@example.com",
                "developer": false, "admin": false, "approved": true,
                "registered_at": "2025-01-01T00:00:00Z", "suspended_at": null,
            },
        ],
    }))
}

async fn row_action(State(counters): State<Arc<Counters>>, Json(_body): Json<Value>) -> Json<Value> {
    counters.row_actions.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "ok": true, "msg": "", "outcome": "done" }))
}

async fn ping() -> Json<Value> {
    Json(json!({ "ok": true, "msg": "pong" }))
}

async fn model_list(State(counters): State<Arc<Counters>>) -> Json<Value> {
    counters.model_list_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "ok": true, "msg": "", "models": ["carebot-mini", "carebot-pro"] }))
}

async fn default_model() -> Json<Value> {
    Json(json!({ "ok": true, "msg": "", "model": "carebot-mini" }))
}

async fn chat_web(Json(body): Json<Value>) -> impl IntoResponse {
    let text = body
        .get("txt_dict")
        .and_then(|d| d.get("user"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let body = if text == "interrupt" {
        // a malformed event mid-stream, as if the backend died
        "data: {\"text\":\"Par\"}\n\ndata: {broken\n\n".to_owned()
    } else {
        "data: {\"text\":\"Hello \"}\n\ndata: {\"text\":\"there\"}\n\ndata: [DONE]\n\n".to_owned()
    };

    ([(header::CONTENT_TYPE, "text/event-stream")], body)
}
