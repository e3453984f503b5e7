//! Development server: `/api` reverse proxy in front of built assets.
//!
//! Requests under [`DevServerConfig::proxy_prefix`] are forwarded verbatim
//! (method, path, query, headers, body) to the backend; everything else is
//! served from [`DevServerConfig::out_dir`].
//!
//! Run with `docview serve` (requires the `dev-server` feature).

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use miette::Diagnostic;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::DevServerConfig;

/// Largest request body forwarded to the backend.
const MAX_PROXY_BODY: usize = 16 * 1024 * 1024;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Error, Diagnostic)]
pub enum DevServerError {
    #[error("invalid proxy prefix \"{prefix}\"")]
    #[diagnostic(
        code(docview::devserver::prefix),
        help("The proxy prefix must start with '/' and name a path, e.g. \"/api\".")
    )]
    InvalidPrefix { prefix: String },

    #[error("failed to bind {addr}")]
    #[diagnostic(
        code(docview::devserver::bind),
        help("Is another process already listening on this address? Change dev_server.bind.")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {message}")]
    #[diagnostic(code(docview::devserver::http_client))]
    HttpClient { message: String },

    #[error("dev server I/O error")]
    #[diagnostic(code(docview::devserver::io))]
    Io(#[from] std::io::Error),
}

pub type DevServerResult<T> = std::result::Result<T, DevServerError>;

#[derive(Clone)]
struct ProxyState {
    config: Arc<DevServerConfig>,
    backend_url: String,
    client: reqwest::Client,
}

/// Build the dev server's router.
pub fn router(config: &DevServerConfig) -> DevServerResult<Router> {
    let prefix = config.proxy_prefix.trim_end_matches('/');
    if !prefix.starts_with('/') {
        return Err(DevServerError::InvalidPrefix {
            prefix: config.proxy_prefix.clone(),
        });
    }

    // The backend is local; environment proxies must not intercept it.
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .map_err(|e| DevServerError::HttpClient {
            message: e.to_string(),
        })?;

    let state = ProxyState {
        config: Arc::new(config.clone()),
        backend_url: config.backend_url(),
        client,
    };

    Ok(Router::new()
        .fallback_service(ServeDir::new(&config.out_dir))
        .layer(middleware::from_fn_with_state(state, proxy_or_static))
        .layer(CorsLayer::permissive()))
}

/// Bind `config.bind` and serve until Ctrl-C / SIGTERM.
pub async fn serve(config: DevServerConfig) -> DevServerResult<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| DevServerError::Bind {
            addr: config.bind.clone(),
            source: e,
        })?;
    serve_with_shutdown(listener, &config, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    config: &DevServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> DevServerResult<()> {
    let app = router(config)?;
    let addr = listener.local_addr()?;
    tracing::info!(
        %addr,
        prefix = %config.proxy_prefix,
        backend = %config.backend_url(),
        out_dir = %config.out_dir.display(),
        "dev server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("dev server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("dev server shutting down");
}

// ── Proxy ─────────────────────────────────────────────────────────────────

async fn proxy_or_static(State(state): State<ProxyState>, req: Request, next: Next) -> Response {
    if !state.config.is_proxied(req.uri().path()) {
        return next.run(req).await;
    }
    match forward(&state, req).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn forward(state: &ProxyState, req: Request) -> Result<Response, (StatusCode, String)> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path());
    let url = format!("{}{}", state.backend_url, path_and_query);

    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_PROXY_BODY)
        .await
        .map_err(|e| (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    tracing::debug!(method = %parts.method, %url, "proxy");
    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(%url, error = %e, "backend unreachable");
            (StatusCode::BAD_GATEWAY, format!("proxy error: {e}"))
        })?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("proxy error: {e}")))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_prefix_is_rejected() {
        let config = DevServerConfig {
            proxy_prefix: "api".into(),
            ..Default::default()
        };
        assert!(matches!(
            router(&config),
            Err(DevServerError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn default_config_builds_a_router() {
        assert!(router(&DevServerConfig::default()).is_ok());
    }

    #[test]
    fn hop_by_hop_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }
}
