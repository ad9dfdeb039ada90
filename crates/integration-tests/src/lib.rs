//! Integration tests for Forneria POS.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p forneria-integration-tests
//! ```
//!
//! No external services are needed: [`FakeSalesBackend`] serves the sales
//! endpoint on an ephemeral local port and records what it receives.

use std::collections::VecDeque;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// Path the fake backend accepts sales on.
pub const SALE_PATH: &str = "/ventas/nuevo/";

/// A canned reply from the fake backend.
#[derive(Debug, Clone)]
pub enum Reply {
    /// JSON body with the given status.
    Json(StatusCode, Value),
    /// Arbitrary text, for backends that answer with an error page.
    Text(StatusCode, &'static str),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Json(status, body) => (status, axum::Json(body)).into_response(),
            Self::Text(status, body) => {
                (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
            }
        }
    }
}

/// One request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct Received {
    pub csrf_token: Option<String>,
    pub content_type: Option<String>,
    /// Parsed body, or `Value::Null` if it was not JSON.
    pub body: Value,
}

#[derive(Clone)]
struct BackendState {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    received: Arc<Mutex<Vec<Received>>>,
}

/// Local stand-in for the sales endpoint.
///
/// Replies are served in order; the last one repeats once the queue is down
/// to it.
pub struct FakeSalesBackend {
    url: Url,
    received: Arc<Mutex<Vec<Received>>>,
    server: JoinHandle<()>,
}

impl FakeSalesBackend {
    /// Start a backend answering every sale with `reply`.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start(reply: Reply) -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_with(vec![reply]).await
    }

    /// Start a backend answering with `replies` in order.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start_with(replies: Vec<Reply>) -> Result<Self, Box<dyn std::error::Error>> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState {
            replies: Arc::new(Mutex::new(replies.into())),
            received: Arc::clone(&received),
        };
        let app = Router::new()
            .route(SALE_PATH, post(record_sale))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            url: Url::parse(&format!("http://{addr}{SALE_PATH}"))?,
            received,
            server,
        })
    }

    #[must_use]
    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// Everything received so far.
    pub async fn received(&self) -> Vec<Received> {
        self.received.lock().await.clone()
    }
}

impl Drop for FakeSalesBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn record_sale(State(state): State<BackendState>, headers: HeaderMap, body: String) -> Reply {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.received.lock().await.push(Received {
        csrf_token: header_value("x-csrftoken"),
        content_type: header_value(header::CONTENT_TYPE.as_str()),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let mut replies = state.replies.lock().await;
    if replies.len() > 1 {
        replies.pop_front().unwrap_or_else(no_reply)
    } else {
        replies.front().cloned().unwrap_or_else(no_reply)
    }
}

fn no_reply() -> Reply {
    Reply::Text(StatusCode::INTERNAL_SERVER_ERROR, "no reply configured")
}
