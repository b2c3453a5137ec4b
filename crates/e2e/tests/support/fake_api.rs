//! In-process stand-in for the user resource
//!
//! Serves `/users` and `/users/:id` with bearer auth, field-ordered 422
//! bodies and a pre-existing `abc@abc.com` user.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storecheck_e2e::api::{NewUser, User, UserPatch, UsersClient};
use storecheck_e2e::config::ApiToken;

pub const TOKEN: &str = "fake-token-123";

/// How closely the fake follows the real resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fidelity {
    #[default]
    Faithful,
    /// Accepts any e-mail syntax
    LaxEmail,
    /// Deletes answer 200 with the removed user
    DeleteEchoes,
}

struct Users {
    next_id: u64,
    users: BTreeMap<u64, User>,
    fidelity: Fidelity,
}

type Shared = Arc<Mutex<Users>>;

pub struct FakeApi {
    addr: SocketAddr,
    users: Shared,
    _server: tokio::task::JoinHandle<()>,
}

impl FakeApi {
    pub async fn start() -> Self {
        Self::start_with(Fidelity::Faithful).await
    }

    pub async fn start_with(fidelity: Fidelity) -> Self {
        let mut users = BTreeMap::new();
        users.insert(
            1,
            User {
                id: 1,
                name: "Existing User".into(),
                email: "abc@abc.com".into(),
                gender: "female".into(),
                status: "active".into(),
            },
        );
        let users: Shared = Arc::new(Mutex::new(Users {
            next_id: 7_000_000,
            users,
            fidelity,
        }));

        let app = Router::new()
            .route("/users", get(list_users).post(create_user))
            .route("/users/:id", get(read_user).put(update_user).delete(delete_user))
            .with_state(Arc::clone(&users));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            users,
            _server: server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn client(&self) -> UsersClient {
        UsersClient::new(self.base_url(), ApiToken::new(TOKEN).unwrap(), Duration::from_secs(5)).unwrap()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().users.len()
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.users.lock().unwrap().users.values().any(|u| u.email == email)
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        None => Err(message(StatusCode::UNAUTHORIZED, "Authentication failed")),
        Some(value) if value == format!("Bearer {TOKEN}") => Ok(()),
        Some(_) => Err(message(StatusCode::UNAUTHORIZED, "Invalid token")),
    }
}

fn not_found() -> Response {
    message(StatusCode::NOT_FOUND, "Resource not found")
}

fn email_ok(email: &str, fidelity: Fidelity) -> bool {
    if fidelity == Fidelity::LaxEmail {
        return true;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.split('.').count() > 1 && domain.split('.').all(|p| !p.is_empty())
        }
        _ => false,
    }
}

fn violations(users: &Users, user: &NewUser, own_id: Option<u64>) -> Vec<Value> {
    let mut errors = Vec::new();
    if user.name.trim().is_empty() {
        errors.push(json!({"field": "name", "message": "can't be blank"}));
    }
    if !matches!(user.gender.as_str(), "male" | "female") {
        errors.push(json!({"field": "gender", "message": "can't be blank, can be male of female"}));
    }
    if user.status.trim().is_empty() {
        errors.push(json!({"field": "status", "message": "can't be blank"}));
    }
    let email = user.email.trim();
    let taken = users
        .users
        .values()
        .any(|u| u.email == email && Some(u.id) != own_id);
    if email.is_empty() {
        errors.push(json!({"field": "email", "message": "can't be blank"}));
    } else if !email_ok(email, users.fidelity) {
        errors.push(json!({"field": "email", "message": "is invalid"}));
    } else if taken {
        errors.push(json!({"field": "email", "message": "has already been taken"}));
    }
    errors
}

async fn list_users(State(users): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let users = users.lock().unwrap();
    let all: Vec<&User> = users.users.values().collect();
    Json(json!(all)).into_response()
}

async fn create_user(State(users): State<Shared>, headers: HeaderMap, Json(payload): Json<NewUser>) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut users = users.lock().unwrap();
    let errors = violations(&users, &payload, None);
    if !errors.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(Value::Array(errors))).into_response();
    }
    users.next_id += 1;
    let user = User {
        id: users.next_id,
        name: payload.name,
        email: payload.email,
        gender: payload.gender,
        status: payload.status,
    };
    users.users.insert(user.id, user.clone());
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn read_user(State(users): State<Shared>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    match users.lock().unwrap().users.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_user(
    State(users): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(patch): Json<UserPatch>,
) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut users = users.lock().unwrap();
    let Some(current) = users.users.get(&id).cloned() else {
        return not_found();
    };
    let updated = NewUser {
        name: patch.name.unwrap_or(current.name),
        email: patch.email.unwrap_or(current.email),
        gender: patch.gender.unwrap_or(current.gender),
        status: patch.status.unwrap_or(current.status),
    };
    let errors = violations(&users, &updated, Some(id));
    if !errors.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(Value::Array(errors))).into_response();
    }
    let user = User {
        id,
        name: updated.name,
        email: updated.email,
        gender: updated.gender,
        status: updated.status,
    };
    users.users.insert(id, user.clone());
    Json(user).into_response()
}

async fn delete_user(State(users): State<Shared>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut users = users.lock().unwrap();
    match users.users.remove(&id) {
        Some(user) if users.fidelity == Fidelity::DeleteEchoes => Json(user).into_response(),
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}
