use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{Mutex, RwLock},
};
use uuid::Uuid;

pub use axum::http::StatusCode;

pub const SPACE_PATH: &str = "/rest/api/space";
pub const SESSION_COOKIE: &str = "JSESSIONID";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "_links")]
    pub links: SpaceLinks,
    #[serde(rename = "_expandable")]
    pub expandable: SpaceExpandable,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpaceLinks {
    pub webui: String,
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpaceExpandable {
    pub metadata: String,
    pub icon: String,
    pub description: String,
    pub homepage: String,
}

impl Space {
    pub fn sample(id: i64, key: &str, name: &str) -> Self {
        Self {
            id,
            key: key.to_string(),
            name: name.to_string(),
            kind: "global".to_string(),
            links: SpaceLinks {
                webui: format!("/display/{key}"),
                self_link: format!("http://localhost{SPACE_PATH}/{key}"),
            },
            expandable: SpaceExpandable {
                metadata: String::new(),
                icon: String::new(),
                description: String::new(),
                homepage: format!("/rest/api/content/{id}"),
            },
        }
    }
}

#[derive(Serialize)]
struct SpaceList<'a> {
    results: &'a [Space],
}

/// A one-shot override for the next request to the space collection.
#[derive(Clone, Debug)]
pub enum Reply {
    /// Respond with this status and an empty body.
    Status(StatusCode),
    /// Respond with this status and a raw body, unvalidated.
    Body(StatusCode, String),
}

/// Headers of interest captured from an inbound request.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub accept: Option<String>,
}

struct Inner {
    session_id: String,
    spaces: RwLock<Vec<Space>>,
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay_ms: AtomicU64,
    offer_session: AtomicBool,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Shared, scriptable state behind the mock router.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                session_id: Uuid::new_v4().simple().to_string(),
                spaces: RwLock::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                delay_ms: AtomicU64::new(0),
                offer_session: AtomicBool::new(true),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub async fn set_spaces(&self, spaces: Vec<Space>) {
        *self.inner.spaces.write().await = spaces;
    }

    /// Queue a reply; queued replies are served in order before falling back
    /// to the stored spaces.
    pub async fn push_reply(&self, reply: Reply) {
        self.inner.script.lock().await.push_back(reply);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.inner
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// When off, `/` answers without a session cookie.
    pub fn set_offer_session(&self, offer: bool) {
        self.inner.offer_session.store(offer, Ordering::SeqCst);
    }

    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().await.clone()
    }

    pub async fn space_hits(&self) -> usize {
        self.inner
            .requests
            .lock()
            .await
            .iter()
            .filter(|r| r.path == SPACE_PATH)
            .count()
    }

    async fn record(&self, path: &str, headers: &HeaderMap) {
        let value = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let recorded = RecordedRequest {
            path: path.to_string(),
            authorization: value(header::AUTHORIZATION),
            cookie: value(header::COOKIE),
            accept: value(header::ACCEPT),
        };
        self.inner.requests.lock().await.push(recorded);
    }
}

/// Decrements the in-flight counter when the handler returns.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(state: &'a Inner) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak.fetch_max(now, Ordering::SeqCst);
        Self(&state.in_flight)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn app() -> Router {
    router(MockState::new())
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(SPACE_PATH, get(list_spaces))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

async fn root(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.record("/", &headers).await;
    if !state.inner.offer_session.load(Ordering::SeqCst) {
        return "confluence mock".into_response();
    }
    let cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly",
        state.session_id()
    );
    ([(header::SET_COOKIE, cookie)], "confluence mock").into_response()
}

async fn list_spaces(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.record(SPACE_PATH, &headers).await;
    let _guard = InFlight::enter(&state.inner);

    let delay = state.inner.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let scripted = state.inner.script.lock().await.pop_front();
    match scripted {
        Some(Reply::Status(status)) => status.into_response(),
        Some(Reply::Body(status, body)) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        None => {
            let spaces = state.inner.spaces.read().await;
            Json(SpaceList { results: &spaces[..] }).into_response()
        }
    }
}
