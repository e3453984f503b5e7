//! Stub documentation backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

/// Every request URI (path + query) the stub has seen, in arrival order.
pub type Hits = Arc<Mutex<Vec<String>>>;

pub struct Backend {
    pub addr: SocketAddr,
    pub hits: Hits,
}

impl Backend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hits_under(&self, prefix: &str) -> Vec<String> {
        self.hits()
            .into_iter()
            .filter(|h| h.starts_with(prefix))
            .collect()
    }
}

/// Start the stub on an ephemeral port; it runs until the test's runtime ends.
pub async fn spawn_backend() -> Backend {
    let hits: Hits = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .route("/api/index", get(index))
        .route("/api/doc/{path}", get(document))
        .route("/api/search", get(search))
        .route("/api/echo", post(|body: String| async move { body }))
        .layer(middleware::from_fn_with_state(hits.clone(), record));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Backend { addr, hits }
}

/// HTTP client that ignores any proxy configured in the environment.
pub fn direct_http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// `ApiClient` talking straight to `base_url`.
pub fn api_client(base_url: impl Into<String>) -> docview::client::ApiClient {
    docview::client::ApiClient::with_http(base_url, direct_http())
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn record(State(hits): State<Hits>, req: Request, next: Next) -> Response {
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    hits.lock().unwrap().push(uri);
    next.run(req).await
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "Title": "Team Notes",
        "Groups": [
            {"Name": "guides", "Documents": [
                {"Title": "Intro", "RelPath": "guides/intro.md", "DirName": "guides",
                 "SourceName": "docs", "AbsPath": "/srv/docs/guides/intro.md",
                 "Overview": "Start here"},
                {"Title": "Setup", "RelPath": "guides/setup.md", "DirName": "guides",
                 "SourceName": "docs", "AbsPath": "/srv/docs/guides/setup.md",
                 "Overview": ""}
            ]},
            {"Name": "adr", "Documents": [
                {"Title": "ADR 1", "RelPath": "adr/0001.md", "DirName": "adr",
                 "SourceName": "decisions", "AbsPath": "/srv/adr/0001.md",
                 "Overview": "Use Rust"}
            ]}
        ],
        "TotalDocuments": 3
    }))
}

async fn document(Path(path): Path<String>) -> Result<Json<serde_json::Value>, StatusCode> {
    match path.as_str() {
        "guides/intro.md" => Ok(Json(json!({
            "Title": "Intro",
            "RelPath": path,
            "SourceName": "docs",
            "Content": "# Intro\n\nWelcome."
        }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    let q = params.get("q").cloned().unwrap_or_default();
    match q.as_str() {
        "boom" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "garbage" => (StatusCode::OK, "this is not json").into_response(),
        _ => Json(json!([
            {"Title": format!("Result for {q}"), "RelPath": "r.md", "SourceName": "docs",
             "Overview": q}
        ]))
        .into_response(),
    }
}
