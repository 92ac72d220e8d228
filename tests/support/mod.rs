//! Purpose: Loopback CSW catalogue stub shared by integration tests.
//! Role: Records every POST it receives and answers with a fixed status and body.
//! Invariants: Binds 127.0.0.1 on an ephemeral port; one stub per test.
#![allow(dead_code)]

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Clone, Debug)]
pub struct Received {
    pub body: String,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct StubState {
    received: Arc<Mutex<Vec<Received>>>,
    status: StatusCode,
    reply: Arc<str>,
}

pub struct Catalogue {
    pub url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl Catalogue {
    pub fn ok(reply: &str) -> TestResult<Self> {
        Self::start(200, reply)
    }

    pub fn start(status: u16, reply: &str) -> TestResult<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            received: received.clone(),
            status: StatusCode::from_u16(status)?,
            reply: Arc::from(reply),
        };

        thread::spawn(move || {
            let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            else {
                return;
            };
            runtime.block_on(async move {
                let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                    return;
                };
                let app = Router::new().route("/csw", post(record)).with_state(state);
                let _ = axum::serve(listener, app).await;
            });
        });

        Ok(Self {
            url: format!("http://{addr}/csw"),
            received,
        })
    }

    pub fn received(&self) -> Vec<Received> {
        lock(&self.received).clone()
    }
}

/// Returns a loopback URL nothing is listening on.
pub fn closed_endpoint() -> TestResult<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/csw"))
}

async fn record(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let entry = Received {
        body,
        content_type: header("content-type"),
        accept: header("accept"),
        authorization: header("authorization"),
    };
    lock(&state.received).push(entry);
    (state.status, state.reply.to_string())
}

fn lock(received: &Mutex<Vec<Received>>) -> MutexGuard<'_, Vec<Received>> {
    received.lock().unwrap_or_else(|poison| poison.into_inner())
}
