//! In-process stand-in for the chat service used by the unit tests.

use std::{collections::HashSet, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use shared::{
    domain::{Credentials, Link, UserId},
    protocol::{
        AllThreads, LoginQuery, Message, NewMessage, NewThread, RegisterRequest, Thread, User,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::transport::ResourceClient;

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: i64,
    pub name: String,
    pub password: String,
    pub secret: String,
}

impl FakeUser {
    pub fn href(&self) -> String {
        format!("/users/{}", self.id)
    }

    pub fn link(&self) -> Link {
        Link::new(self.href())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(UserId(self.id), self.secret.clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub users: Vec<FakeUser>,
    pub threads: Vec<Thread>,
    pub messages: Vec<Message>,
    pub posted: Vec<NewMessage>,
    pub message_queries: Vec<Option<String>>,
    pub user_lookups: Vec<String>,
    pub failing_users: HashSet<String>,
    pub failing_polls: usize,
    pub garbled_polls: usize,
    pub reject_posts: bool,
}

type Shared = Arc<Mutex<FakeState>>;

#[derive(Clone)]
pub struct FakeService {
    pub url: String,
    pub state: Shared,
}

impl FakeService {
    pub async fn spawn() -> Self {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let app = Router::new()
            .route("/users", get(login).post(register))
            .route("/users/:id", get(get_user))
            .route("/threads", get(list_threads).post(create_thread))
            .route("/threads/:id", get(get_thread))
            .route("/threads/:id/messages", get(list_messages).post(post_message))
            .with_state(Arc::clone(&state));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn client(&self) -> ResourceClient {
        ResourceClient::new(&self.url, Duration::from_secs(5)).expect("client")
    }

    pub async fn add_user(&self, id: i64, name: &str, password: &str, secret: &str) -> FakeUser {
        let user = FakeUser {
            id,
            name: name.to_string(),
            password: password.to_string(),
            secret: secret.to_string(),
        };
        self.state.lock().await.users.push(user.clone());
        user
    }

    pub async fn add_thread(&self, id: i64, participants: &[&FakeUser]) -> Link {
        let thread = Thread {
            href: format!("/threads/{id}"),
            participants: participants.iter().map(|user| user.link()).collect(),
        };
        let link = thread.link();
        self.state.lock().await.threads.push(thread);
        link
    }

    pub async fn add_message(
        &self,
        thread: &Link,
        from: &FakeUser,
        content: &str,
        time: &str,
    ) -> Message {
        let mut guard = self.state.lock().await;
        let message = Message {
            href: format!("{}/{}", thread.messages(), guard.messages.len() + 1),
            thread: thread.clone(),
            from: from.link(),
            content: content.to_string(),
            time: ts(time),
        };
        guard.messages.push(message.clone());
        message
    }
}

pub fn ts(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).expect("rfc3339 timestamp")
}

fn authenticate(state: &FakeState, headers: &HeaderMap) -> Option<FakeUser> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    let id: i64 = id.parse().ok()?;
    state
        .users
        .iter()
        .find(|user| user.id == id && user.secret == secret)
        .cloned()
}

fn public_user(user: &FakeUser) -> User {
    User {
        href: user.href(),
        name: user.name.clone(),
        secret: None,
    }
}

async fn login(State(state): State<Shared>, Query(query): Query<LoginQuery>) -> Response {
    let guard = state.lock().await;
    match guard
        .users
        .iter()
        .find(|user| user.name == query.name && user.password == query.password)
    {
        Some(user) => Json(User {
            secret: Some(user.secret.clone()),
            ..public_user(user)
        })
        .into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn register(State(state): State<Shared>, Json(request): Json<RegisterRequest>) -> Response {
    let mut guard = state.lock().await;
    if guard.users.iter().any(|user| user.name == request.name) {
        return StatusCode::CONFLICT.into_response();
    }
    let id = guard.users.iter().map(|user| user.id).max().unwrap_or(0) + 1;
    let user = FakeUser {
        id,
        name: request.name,
        password: request.password,
        secret: format!("secret-{id}"),
    };
    guard.users.push(user.clone());
    (
        StatusCode::CREATED,
        Json(User {
            secret: Some(user.secret.clone()),
            ..public_user(&user)
        }),
    )
        .into_response()
}

async fn get_user(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut guard = state.lock().await;
    if authenticate(&guard, &headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let href = format!("/users/{id}");
    guard.user_lookups.push(href.clone());
    if guard.failing_users.contains(&href) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match guard.users.iter().find(|user| user.id == id) {
        Some(user) => Json(public_user(user)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_threads(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let guard = state.lock().await;
    let Some(caller) = authenticate(&guard, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let threads = guard
        .threads
        .iter()
        .filter(|thread| thread.participants.contains(&caller.link()))
        .map(Thread::link)
        .collect();
    Json(AllThreads { threads }).into_response()
}

async fn create_thread(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<NewThread>,
) -> Response {
    let mut guard = state.lock().await;
    let Some(caller) = authenticate(&guard, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let mut participants = request.participants;
    if !participants.contains(&caller.link()) {
        participants.push(caller.link());
    }
    let thread = Thread {
        href: format!("/threads/{}", guard.threads.len() + 1),
        participants,
    };
    guard.threads.push(thread.clone());
    (StatusCode::CREATED, Json(thread)).into_response()
}

async fn get_thread(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let guard = state.lock().await;
    if authenticate(&guard, &headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let href = format!("/threads/{id}");
    match guard.threads.iter().find(|thread| thread.href == href) {
        Some(thread) => Json(thread.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct TimeFilter {
    time: Option<String>,
}

async fn list_messages(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(filter): Query<TimeFilter>,
) -> Response {
    let mut guard = state.lock().await;
    if authenticate(&guard, &headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    guard.message_queries.push(filter.time.clone());
    if guard.failing_polls > 0 {
        guard.failing_polls -= 1;
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if guard.garbled_polls > 0 {
        guard.garbled_polls -= 1;
        return "not json".into_response();
    }
    let since = match filter.time.as_deref().map(DateTime::parse_from_rfc3339) {
        None => None,
        Some(Ok(time)) => Some(time),
        Some(Err(_)) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let thread = Link::new(format!("/threads/{id}"));
    if !guard.threads.iter().any(|known| known.link() == thread) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let messages: Vec<Message> = guard
        .messages
        .iter()
        .filter(|message| message.thread == thread)
        .filter(|message| since.map_or(true, |since| message.time >= since))
        .cloned()
        .collect();
    Json(messages).into_response()
}

async fn post_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<NewMessage>,
) -> Response {
    let mut guard = state.lock().await;
    if authenticate(&guard, &headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    guard.posted.push(payload.clone());
    if guard.reject_posts {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let thread = Link::new(format!("/threads/{id}"));
    let message = Message {
        href: format!("{}/{}", thread.messages(), guard.messages.len() + 1),
        thread,
        from: payload.from,
        content: payload.content,
        time: payload.time,
    };
    guard.messages.push(message.clone());
    (StatusCode::CREATED, Json(message)).into_response()
}
