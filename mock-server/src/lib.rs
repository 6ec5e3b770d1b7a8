//! In-memory stand-in for a Zep server.
//!
//! Serves `/healthz` plus the session, memory, search and user routes under
//! both `/api/v1` and `/api/v2`. Behavior that tests need to vary (reported
//! version, health, required API key, injected failures) lives in
//! [`MockConfig`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const VERSION_HEADER: &str = "x-zep-version";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub token_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub uuid: Uuid,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub uuid: Uuid,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub struct CreateSession {
    pub session_id: String,
    pub user_id: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub struct UpdateSession {
    pub metadata: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct AddMemory {
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
pub struct SearchBody {
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub user_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize, Default)]
pub struct PageParams {
    pub page_number: Option<usize>,
    pub page_size: Option<usize>,
    pub order_by: Option<String>,
    pub asc: Option<bool>,
}

#[derive(Deserialize, Default)]
pub struct MemoryParams {
    pub lastn: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct MessageParams {
    pub limit: Option<usize>,
    pub cursor: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct SearchParams {
    pub limit: Option<usize>,
}

/// Knobs for tests.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Sent as `X-Zep-Version`; `None` omits the header.
    pub version: Option<String>,
    /// When false, `/healthz` answers 503.
    pub healthy: bool,
    /// When set, API routes require `Api-Key <key>` or `Bearer <key>`.
    pub api_key: Option<String>,
    /// Number of initial API requests answered with 503.
    pub fail_first: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            version: Some("0.27.0".to_string()),
            healthy: true,
            api_key: None,
            fail_first: 0,
        }
    }
}

#[derive(Default)]
pub struct Store {
    pub sessions: Vec<Session>,
    pub messages: Vec<(String, Message)>,
    pub users: Vec<User>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RwLock<Store>>,
    pub config: Arc<MockConfig>,
    failures_left: Arc<AtomicUsize>,
}

/// JSON `{"message": ...}` error with a status code.
pub struct ApiFailure(StatusCode, String);

impl ApiFailure {
    fn not_found(what: &str, id: &str) -> Self {
        Self(StatusCode::NOT_FOUND, format!("{what} {id} not found"))
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, message.into())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "message": self.1 }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiFailure>;

fn ok(message: &str) -> Json<Value> {
    Json(serde_json::json!({ "message": message }))
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        failures_left: Arc::new(AtomicUsize::new(config.fail_first)),
        config: Arc::new(config),
    };

    let api = Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions-ordered", get(list_sessions))
        .route("/sessions/{id}", get(get_session).patch(update_session))
        .route(
            "/sessions/{id}/memory",
            get(get_memory).post(add_memory).delete(delete_memory),
        )
        .route("/sessions/{id}/messages", get(list_messages))
        .route("/sessions/{id}/search", post(search_memory))
        .route("/users", post(create_user))
        .route("/users-ordered", get(list_users))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{id}/sessions", get(user_sessions))
        .route_layer(middleware::from_fn_with_state(state.clone(), gate));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api.clone())
        .nest("/api/v2", api)
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, version = ?config.version, "mock Zep server listening");
    }
    axum::serve(listener, app_with(config)).await
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Some(version) = &state.config.version {
        if let Ok(value) = HeaderValue::from_str(version) {
            headers.insert(VERSION_HEADER, value);
        }
    }
    let status = if state.config.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, headers, ".")
}

/// Injected failures first, then the API key check.
async fn gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let injected = state
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok();
    if injected {
        debug!(path = %request.uri().path(), "injecting 503");
        return ApiFailure(StatusCode::SERVICE_UNAVAILABLE, "try again".to_string())
            .into_response();
    }

    if let Some(key) = &state.config.api_key {
        let presented = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let accepted = presented == format!("Api-Key {key}") || presented == format!("Bearer {key}");
        if !accepted {
            return ApiFailure(StatusCode::UNAUTHORIZED, "unauthorized".to_string())
                .into_response();
        }
    }

    next.run(request).await
}

fn paginate<T: Clone>(items: &[T], page_number: Option<usize>, page_size: Option<usize>) -> Vec<T> {
    let page_size = page_size.unwrap_or(100).max(1);
    let page_number = page_number.unwrap_or(1).max(1);
    items
        .iter()
        .skip((page_number - 1).saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect()
}

fn token_count(content: &str) -> u32 {
    content.split_whitespace().count() as u32
}

// --- sessions ---

async fn create_session(
    State(state): State<AppState>,
    Json(input): Json<CreateSession>,
) -> ApiResult<Session> {
    if input.session_id.trim().is_empty() {
        return Err(ApiFailure::bad_request("session_id is required"));
    }
    let mut db = state.db.write().await;
    if db.sessions.iter().any(|s| s.session_id == input.session_id) {
        return Err(ApiFailure::bad_request(format!(
            "session {} already exists",
            input.session_id
        )));
    }
    if let Some(user_id) = &input.user_id {
        if !db.users.iter().any(|u| &u.user_id == user_id) {
            return Err(ApiFailure::not_found("user", user_id));
        }
    }
    let session = Session {
        uuid: Uuid::new_v4(),
        session_id: input.session_id,
        user_id: input.user_id,
        metadata: input.metadata,
    };
    db.sessions.push(session.clone());
    Ok(Json(session))
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Session> {
    let db = state.db.read().await;
    db.sessions
        .iter()
        .find(|s| s.session_id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("session", &id))
}

async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateSession>,
) -> ApiResult<Session> {
    let mut db = state.db.write().await;
    let session = db
        .sessions
        .iter_mut()
        .find(|s| s.session_id == id)
        .ok_or_else(|| ApiFailure::not_found("session", &id))?;
    session
        .metadata
        .get_or_insert_with(Map::new)
        .extend(input.metadata);
    Ok(Json(session.clone()))
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Value> {
    let db = state.db.read().await;
    let mut sessions = db.sessions.clone();
    if params.order_by.as_deref() == Some("session_id") {
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    }
    if params.asc == Some(false) {
        sessions.reverse();
    }
    let page = paginate(&sessions, params.page_number, params.page_size);
    Ok(Json(serde_json::json!({
        "sessions": page,
        "total_count": sessions.len(),
        "response_count": page.len(),
    })))
}

// --- memory ---

async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<MemoryParams>,
) -> ApiResult<Value> {
    let db = state.db.read().await;
    let session = db
        .sessions
        .iter()
        .find(|s| s.session_id == id)
        .ok_or_else(|| ApiFailure::not_found("session", &id))?;
    let messages: Vec<&Message> = db
        .messages
        .iter()
        .filter(|(session_id, _)| session_id == &id)
        .map(|(_, message)| message)
        .collect();
    let skip = params
        .lastn
        .map(|n| messages.len().saturating_sub(n))
        .unwrap_or(0);
    Ok(Json(serde_json::json!({
        "messages": &messages[skip..],
        "metadata": session.metadata,
    })))
}

async fn add_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AddMemory>,
) -> ApiResult<Value> {
    let mut db = state.db.write().await;
    if !db.sessions.iter().any(|s| s.session_id == id) {
        return Err(ApiFailure::not_found("session", &id));
    }
    for mut message in input.messages {
        message.uuid.get_or_insert_with(Uuid::new_v4);
        message.token_count = token_count(&message.content);
        db.messages.push((id.clone(), message));
    }
    Ok(ok("OK"))
}

async fn delete_memory(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let mut db = state.db.write().await;
    if !db.sessions.iter().any(|s| s.session_id == id) {
        return Err(ApiFailure::not_found("session", &id));
    }
    db.messages.retain(|(session_id, _)| session_id != &id);
    Ok(ok("OK"))
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<MessageParams>,
) -> ApiResult<Value> {
    let db = state.db.read().await;
    if !db.sessions.iter().any(|s| s.session_id == id) {
        return Err(ApiFailure::not_found("session", &id));
    }
    let all: Vec<Message> = db
        .messages
        .iter()
        .filter(|(session_id, _)| session_id == &id)
        .map(|(_, message)| message.clone())
        .collect();
    let page: Vec<Message> = all
        .iter()
        .skip(params.cursor.unwrap_or(0))
        .take(params.limit.unwrap_or(100))
        .cloned()
        .collect();
    Ok(Json(serde_json::json!({
        "messages": page,
        "total_count": all.len(),
        "row_count": page.len(),
    })))
}

/// Scores a message by the share of query words it contains.
async fn search_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SearchParams>,
    Json(input): Json<SearchBody>,
) -> ApiResult<Value> {
    let db = state.db.read().await;
    if !db.sessions.iter().any(|s| s.session_id == id) {
        return Err(ApiFailure::not_found("session", &id));
    }
    let text = input.text.unwrap_or_default().to_lowercase();
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Err(ApiFailure::bad_request("text is required"));
    }

    let mut hits: Vec<(f64, &Message)> = db
        .messages
        .iter()
        .filter(|(session_id, _)| session_id == &id)
        .filter_map(|(_, message)| {
            let content = message.content.to_lowercase();
            let matched = words.iter().filter(|word| content.contains(*word)).count();
            (matched > 0).then(|| (matched as f64 / words.len() as f64, message))
        })
        .collect();
    hits.sort_by(|a, b| b.0.total_cmp(&a.0));
    hits.truncate(params.limit.unwrap_or(10));

    let results: Vec<Value> = hits
        .into_iter()
        .map(|(dist, message)| serde_json::json!({ "message": message, "dist": dist }))
        .collect();
    Ok(Json(Value::Array(results)))
}

// --- users ---

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> ApiResult<User> {
    if input.user_id.trim().is_empty() {
        return Err(ApiFailure::bad_request("user_id is required"));
    }
    let mut db = state.db.write().await;
    if db.users.iter().any(|u| u.user_id == input.user_id) {
        return Err(ApiFailure::bad_request(format!(
            "user {} already exists",
            input.user_id
        )));
    }
    let user = User {
        uuid: Uuid::new_v4(),
        user_id: input.user_id,
        email: input.email,
        first_name: input.first_name,
        last_name: input.last_name,
        metadata: input.metadata,
    };
    db.users.push(user.clone());
    Ok(Json(user))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    let db = state.db.read().await;
    db.users
        .iter()
        .find(|u| u.user_id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::not_found("user", &id))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateUser>,
) -> ApiResult<User> {
    let mut db = state.db.write().await;
    let user = db
        .users
        .iter_mut()
        .find(|u| u.user_id == id)
        .ok_or_else(|| ApiFailure::not_found("user", &id))?;
    if let Some(email) = input.email {
        user.email = Some(email);
    }
    if let Some(first_name) = input.first_name {
        user.first_name = Some(first_name);
    }
    if let Some(last_name) = input.last_name {
        user.last_name = Some(last_name);
    }
    if let Some(metadata) = input.metadata {
        user.metadata.get_or_insert_with(Map::new).extend(metadata);
    }
    Ok(Json(user.clone()))
}

async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let mut db = state.db.write().await;
    let before = db.users.len();
    db.users.retain(|u| u.user_id != id);
    if db.users.len() == before {
        return Err(ApiFailure::not_found("user", &id));
    }
    Ok(ok("deleted"))
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Value> {
    let db = state.db.read().await;
    let page = paginate(&db.users, params.page_number, params.page_size);
    Ok(Json(serde_json::json!({
        "users": page,
        "total_count": db.users.len(),
        "row_count": page.len(),
    })))
}

async fn user_sessions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Session>> {
    let db = state.db.read().await;
    if !db.users.iter().any(|u| u.user_id == id) {
        return Err(ApiFailure::not_found("user", &id));
    }
    Ok(Json(
        db.sessions
            .iter()
            .filter(|s| s.user_id.as_deref() == Some(id.as_str()))
            .cloned()
            .collect(),
    ))
}
