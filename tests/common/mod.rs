//! Shared test harness: an in-process stand-in for the hosted gateway.
//!
//! The mock speaks just enough of the gateway's HTTP conventions for the
//! client to be exercised end to end: credential auth, filtered table reads
//! and writes with `Prefer` negotiation, and the newline-delimited change
//! feed. Tables are plain JSON rows in memory; tests can seed them directly
//! and flip individual tables into a failing state.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crewdesk::models::Plan;
use crewdesk::{AppContext, AuthListener, Config, Notification};

static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        crewdesk::init_tracing(&Config::default_for_testing());
    }
});

struct UserRecord {
    id: Uuid,
    password: String,
    metadata: Value,
}

struct Store {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashSet<String>>,
    users: Mutex<HashMap<String, UserRecord>>,
    refresh_tokens: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<Value>,
}

impl Store {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            tables: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            users: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn issue_session(&self, id: Uuid, email: &str, metadata: &Value) -> Value {
        let refresh_token = Uuid::new_v4().to_string();
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh_token.clone(), email.to_string());
        json!({
            "access_token": Uuid::new_v4().to_string(),
            "refresh_token": refresh_token,
            "expires_in": 3600,
            "user": {
                "id": id,
                "email": email,
                "user_metadata": metadata,
            },
        })
    }
}

#[derive(Clone)]
pub struct MockGateway {
    pub addr: SocketAddr,
    store: Arc<Store>,
}

impl MockGateway {
    pub async fn spawn() -> Self {
        let store = Arc::new(Store::new());
        let router = Router::new()
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route("/rest/v1/{table}", any(rest))
            .route("/realtime/v1/changes", get(changes))
            .with_state(Arc::clone(&store));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock gateway");
        let addr = listener.local_addr().expect("failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("mock gateway crashed");
        });

        Self { addr, store }
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default_for_testing();
        config.gateway.url = format!("http://{}", self.addr);
        config
    }

    /// All current rows of a table, as stored.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.store
            .tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Seeds a row directly and broadcasts the insert on the change feed.
    pub fn insert_raw(&self, table: &str, mut row: Value) {
        if row.get("id").is_none() {
            row["id"] = json!(Uuid::new_v4());
        }
        if row.get("created_at").is_none() {
            row["created_at"] = json!(timestamp());
        }
        self.store
            .tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        let _ = self
            .store
            .changes
            .send(json!({ "table": table, "type": "insert", "record": row }));
    }

    /// Makes every request against `table` fail with a server error.
    pub fn fail_table(&self, table: &str) {
        self.store.failing.lock().unwrap().insert(table.to_string());
    }

    pub fn clear_failure(&self, table: &str) {
        self.store.failing.lock().unwrap().remove(table);
    }

    /// Registers a login without going through the signup endpoint.
    pub fn seed_user(&self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.users.lock().unwrap().insert(
            email.to_string(),
            UserRecord {
                id,
                password: password.to_string(),
                metadata: Value::Null,
            },
        );
        self.insert_raw("users", json!({ "id": id, "email": email }));
        id
    }
}

async fn signup(State(store): State<Arc<Store>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let metadata = body.get("data").cloned().unwrap_or(Value::Null);

    {
        let mut users = store.users.lock().unwrap();
        if users.contains_key(&email) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "msg": "User already registered" })),
            )
                .into_response();
        }
        users.insert(
            email.clone(),
            UserRecord {
                id: Uuid::new_v4(),
                password,
                metadata: metadata.clone(),
            },
        );
    }

    let id = store.users.lock().unwrap()[&email].id;
    store
        .tables
        .lock()
        .unwrap()
        .entry("users".to_string())
        .or_default()
        .push(json!({ "id": id, "email": email, "created_at": timestamp() }));

    Json(store.issue_session(id, &email, &metadata)).into_response()
}

async fn token(
    State(store): State<Arc<Store>>,
    RawQuery(query): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    let grant = query
        .as_deref()
        .unwrap_or("")
        .split('&')
        .find_map(|pair| pair.strip_prefix("grant_type="))
        .unwrap_or("");

    match grant {
        "password" => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            let session = {
                let users = store.users.lock().unwrap();
                users
                    .get(email)
                    .filter(|u| u.password == password)
                    .map(|u| (u.id, u.metadata.clone()))
            };
            match session {
                Some((id, metadata)) => Json(store.issue_session(id, email, &metadata)).into_response(),
                None => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error_description": "Invalid login credentials" })),
                )
                    .into_response(),
            }
        }
        "refresh_token" => {
            let presented = body["refresh_token"].as_str().unwrap_or_default();
            let email = store
                .refresh_tokens
                .lock()
                .unwrap()
                .get(presented)
                .cloned();
            let session = email.and_then(|email| {
                let users = store.users.lock().unwrap();
                users
                    .get(&email)
                    .map(|u| (u.id, email.clone(), u.metadata.clone()))
            });
            match session {
                Some((id, email, metadata)) => {
                    Json(store.issue_session(id, &email, &metadata)).into_response()
                }
                None => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error_description": "Invalid refresh token" })),
                )
                    .into_response(),
            }
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

enum Filter {
    Eq(String),
    In(Vec<String>),
}

struct QueryParts {
    projection: Option<Vec<String>>,
    order: Option<(String, bool)>,
    on_conflict: Vec<String>,
    filters: Vec<(String, Filter)>,
}

impl QueryParts {
    fn parse(query: &str) -> Self {
        let mut parts = Self {
            projection: None,
            order: None,
            on_conflict: Vec::new(),
            filters: Vec::new(),
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "select" => {
                    if value != "*" && !value.is_empty() {
                        parts.projection =
                            Some(value.split(',').map(str::to_string).collect());
                    }
                }
                "order" => {
                    if let Some((column, direction)) = value.rsplit_once('.') {
                        parts.order = Some((column.to_string(), direction == "asc"));
                    }
                }
                "on_conflict" => {
                    parts.on_conflict = value.split(',').map(str::to_string).collect();
                }
                column => {
                    if let Some(v) = value.strip_prefix("eq.") {
                        parts
                            .filters
                            .push((column.to_string(), Filter::Eq(v.to_string())));
                    } else if let Some(v) = value
                        .strip_prefix("in.(")
                        .and_then(|v| v.strip_suffix(')'))
                    {
                        parts.filters.push((
                            column.to_string(),
                            Filter::In(v.split(',').map(str::to_string).collect()),
                        ));
                    }
                }
            }
        }
        parts
    }

    fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(column, filter)| {
            let actual = value_text(row.get(column.as_str()));
            match filter {
                Filter::Eq(expected) => &actual == expected,
                Filter::In(values) => values.contains(&actual),
            }
        })
    }
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

async fn rest(
    State(store): State<Arc<Store>>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    if store.failing.lock().unwrap().contains(&table) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "table unavailable" })),
        )
            .into_response();
    }

    let parts = QueryParts::parse(query.as_deref().unwrap_or(""));
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    match method {
        Method::GET => get_rows(&store, &table, &parts, &prefer),
        Method::POST => insert_rows(&store, &table, &parts, &prefer, body),
        Method::PATCH => patch_rows(&store, &table, &parts, body),
        Method::DELETE => delete_rows(&store, &table, &parts),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn get_rows(store: &Store, table: &str, parts: &QueryParts, prefer: &str) -> Response {
    let rows = store
        .tables
        .lock()
        .unwrap()
        .get(table)
        .cloned()
        .unwrap_or_default();

    let mut rows: Vec<Value> = rows.into_iter().filter(|r| parts.matches(r)).collect();
    if let Some((column, ascending)) = &parts.order {
        rows.sort_by(|a, b| {
            let a = value_text(a.get(column.as_str()));
            let b = value_text(b.get(column.as_str()));
            if *ascending {
                a.cmp(&b)
            } else {
                b.cmp(&a)
            }
        });
    }

    let total = rows.len();
    if let Some(columns) = &parts.projection {
        rows = rows
            .into_iter()
            .map(|row| {
                let mut projected = serde_json::Map::new();
                for column in columns {
                    if let Some(value) = row.get(column.as_str()) {
                        projected.insert(column.clone(), value.clone());
                    }
                }
                Value::Object(projected)
            })
            .collect();
    }

    let mut response = Json(rows).into_response();
    if prefer.contains("count=exact") {
        response.headers_mut().insert(
            "Content-Range",
            format!("0-0/{total}").parse().expect("valid header"),
        );
    }
    response
}

fn insert_rows(
    store: &Store,
    table: &str,
    parts: &QueryParts,
    prefer: &str,
    body: Option<Json<Value>>,
) -> Response {
    let Some(Json(body)) = body else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let incoming = match body {
        Value::Array(rows) => rows,
        other => vec![other],
    };
    let merge = prefer.contains("resolution=merge-duplicates") && !parts.on_conflict.is_empty();

    let mut stored = Vec::new();
    let mut events = Vec::new();
    {
        let mut tables = store.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        for mut row in incoming {
            if row.get("id").is_none() {
                row["id"] = json!(Uuid::new_v4());
            }
            if row.get("created_at").is_none() {
                row["created_at"] = json!(timestamp());
            }

            let existing = if merge {
                rows.iter().position(|r| {
                    parts
                        .on_conflict
                        .iter()
                        .all(|c| value_text(r.get(c.as_str())) == value_text(row.get(c.as_str())))
                })
            } else {
                None
            };

            let (kind, result) = match existing {
                Some(index) => {
                    let id = rows[index]["id"].clone();
                    let created_at = rows[index]["created_at"].clone();
                    rows[index] = row;
                    rows[index]["id"] = id;
                    rows[index]["created_at"] = created_at;
                    ("update", rows[index].clone())
                }
                None => {
                    rows.push(row.clone());
                    ("insert", row)
                }
            };
            stored.push(result.clone());
            events.push(json!({ "table": table, "type": kind, "record": result }));
        }
    }

    for event in events {
        let _ = store.changes.send(event);
    }
    (StatusCode::CREATED, Json(Value::Array(stored))).into_response()
}

fn patch_rows(
    store: &Store,
    table: &str,
    parts: &QueryParts,
    body: Option<Json<Value>>,
) -> Response {
    let Some(Json(patch)) = body else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some(patch) = patch.as_object() else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut changed = Vec::new();
    {
        let mut tables = store.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        for row in rows.iter_mut().filter(|r| parts.matches(r)) {
            if let Some(object) = row.as_object_mut() {
                for (key, value) in patch {
                    object.insert(key.clone(), value.clone());
                }
            }
            changed.push(row.clone());
        }
    }

    for row in changed {
        let _ = store
            .changes
            .send(json!({ "table": table, "type": "update", "record": row }));
    }
    StatusCode::NO_CONTENT.into_response()
}

fn delete_rows(store: &Store, table: &str, parts: &QueryParts) -> Response {
    let mut removed = Vec::new();
    {
        let mut tables = store.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        rows.retain(|row| {
            if parts.matches(row) {
                removed.push(row.clone());
                false
            } else {
                true
            }
        });
    }

    for row in removed {
        let _ = store
            .changes
            .send(json!({ "table": table, "type": "delete", "record": row }));
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn changes(State(store): State<Arc<Store>>, RawQuery(query): RawQuery) -> Response {
    let table = query
        .as_deref()
        .unwrap_or("")
        .split('&')
        .find_map(|pair| pair.strip_prefix("table="))
        .unwrap_or("")
        .to_string();

    let stream = BroadcastStream::new(store.changes.subscribe()).filter_map(move |event| {
        match event {
            Ok(event) if event["table"].as_str() == Some(table.as_str()) => {
                let mut line = event.to_string().into_bytes();
                line.push(b'\n');
                Some(Ok::<Vec<u8>, Infallible>(line))
            }
            _ => None,
        }
    });
    Body::from_stream(stream).into_response()
}

pub fn timestamp() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

pub fn unique_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4())
}

/// Seed row for the employees table with sensible defaults.
pub fn employee_row(company_id: Uuid, name: &str, salary: i64) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "company_id": company_id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        "position": "Engineer",
        "department": "Engineering",
        "salary": salary,
        "join_date": "2024-01-15",
        "created_at": timestamp(),
    })
}

pub struct TestApp {
    pub mock: MockGateway,
    pub ctx: Arc<AppContext>,
    _listener: AuthListener,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Lazy::force(&TRACING);
        let mock = MockGateway::spawn().await;
        let ctx = AppContext::new(&mock.config());
        let listener = ctx.bootstrap().await;
        Self {
            mock,
            ctx,
            _listener: listener,
        }
    }

    /// Registers a fresh account with its own company and an active plan,
    /// returning the company id.
    pub async fn onboard(&self, company_name: &str) -> Uuid {
        self.ctx
            .sign_up(&unique_email(), "s3cret-password", company_name)
            .await
            .expect("sign up failed");
        self.ctx
            .select_plan(Plan::Professional)
            .await
            .expect("plan selection failed");
        self.ctx
            .snapshot()
            .await
            .tenant
            .primary_company()
            .expect("no company resolved")
            .id
    }
}

/// Waits for the next notification, failing the test on a stuck channel.
pub async fn next_notification(
    rx: &mut broadcast::Receiver<Notification>,
) -> Notification {
    tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("notification channel closed")
}
