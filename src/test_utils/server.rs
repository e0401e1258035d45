//! Local HTTP server for exercising the network stages.
//!
//! An axum [`Router`] whose fallback handler looks the request path up in a
//! shared route map. Unknown paths get a 404.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Clone, Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
    /// Delay before the response is sent
    pub delay: Option<Duration>,
}

impl TestResponse {
    /// `200 OK` with `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body)
    }

    /// Response with an arbitrary status.
    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }

    /// Wait `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl IntoResponse for TestResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

#[derive(Clone, Default)]
struct ServerState {
    routes: Arc<Mutex<HashMap<String, TestResponse>>>,
    requests: Arc<AtomicUsize>,
}

impl ServerState {
    fn lookup(&self, path: &str) -> Option<TestResponse> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).get(path).cloned()
    }
}

async fn serve_route(State(state): State<ServerState>, uri: Uri) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let Some(response) = state.lookup(uri.path()) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }
    response.into_response()
}

/// Local HTTP server bound to an ephemeral port.
///
/// The server task is aborted when the server is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use walcman_updater::test_utils::{TestResponse, TestServer, release_body};
///
/// # async fn example() -> anyhow::Result<()> {
/// let server = TestServer::start(vec![]).await?;
/// server.route("/bin", TestResponse::ok(vec![0u8; 60_000]));
/// server.route("/latest", TestResponse::ok(release_body("v1.1.0", Some(&server.url("/bin")))));
/// # Ok(())
/// # }
/// ```
pub struct TestServer {
    addr: SocketAddr,
    state: ServerState,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Bind to `127.0.0.1:0` and start serving `routes`.
    pub async fn start(routes: Vec<(&str, TestResponse)>) -> Result<Self> {
        let listener =
            TcpListener::bind("127.0.0.1:0").await.context("Failed to bind test server")?;
        let addr = listener.local_addr()?;

        let state = ServerState::default();
        for (path, response) in routes {
            state
                .routes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path.to_string(), response);
        }

        let app = Router::new().fallback(serve_route).with_state(state.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::debug!("Test server stopped: {e}");
            }
        });

        Ok(Self {
            addr,
            state,
            task,
        })
    }

    /// Add or replace the response for `path`.
    pub fn route(&self, path: &str, response: TestResponse) {
        self.state
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), response);
    }

    /// Absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Number of requests received so far, routed or not.
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
