//! Client for the user resource
//!
//! Every call returns the raw `{status, body}` pair so negative scenarios can
//! assert on exact bodies; [`ApiResponse::into_user`] and friends map the
//! well-known failure statuses onto [`E2eError`].

use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{ApiToken, SuiteConfig};
use crate::error::{E2eError, E2eResult, UnauthorizedReason};
use crate::validation::FieldError;

pub const NOT_FOUND_MESSAGE: &str = "Resource not found";

/// A user as stored by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub gender: String,
    pub status: String,
}

/// Creation payload. Fields are plain strings so invalid values can be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub gender: String,
    pub status: String,
}

/// Partial update; absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Which credential a request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// The configured bearer token
    Configured,
    /// A well-formed but rejected bearer value
    Bearer(String),
    /// No `Authorization` header at all
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `Value::Null` for empty bodies
    pub body: Value,
}

impl ApiResponse {
    /// The echoed user for 200/201, the mapped error otherwise.
    pub fn into_user(self) -> E2eResult<User> {
        match self.status {
            200 | 201 => Ok(serde_json::from_value(self.body)?),
            _ => Err(self.into_error()),
        }
    }

    pub fn into_users(self) -> E2eResult<Vec<User>> {
        match self.status {
            200 => Ok(serde_json::from_value(self.body)?),
            _ => Err(self.into_error()),
        }
    }

    /// `message` of a `{message: ...}` body.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Field list of a 422 body.
    pub fn field_errors(&self) -> E2eResult<Vec<FieldError>> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn into_error(self) -> E2eError {
        match self.status {
            401 => E2eError::Unauthorized(UnauthorizedReason::from_message(
                self.message().unwrap_or_default(),
            )),
            404 => E2eError::NotFound(self.message().unwrap_or(NOT_FOUND_MESSAGE).to_string()),
            422 => match self.field_errors() {
                Ok(errors) => E2eError::ValidationFailure(errors),
                Err(e) => e,
            },
            status => E2eError::UnexpectedStatus {
                status,
                body: self.body.to_string(),
            },
        }
    }

    pub fn expect_status(&self, expected: u16) -> E2eResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(E2eError::assertion(format!(
                "expected status {expected}, got {} with body {}",
                self.status, self.body
            )))
        }
    }
}

/// CRUD over `users` relative to a base URL.
#[derive(Debug, Clone)]
pub struct UsersClient {
    http: Client,
    base_url: String,
    token: ApiToken,
}

impl UsersClient {
    pub fn new(base_url: impl Into<String>, token: ApiToken, timeout: std::time::Duration) -> E2eResult<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url, token })
    }

    pub fn from_config(config: &SuiteConfig) -> E2eResult<Self> {
        Self::new(&config.api_base_url, config.api_token.clone(), config.timeouts.http())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create(&self, payload: &NewUser) -> E2eResult<ApiResponse> {
        self.create_with(payload, Auth::Configured).await
    }

    pub async fn create_with(&self, payload: &NewUser, auth: Auth) -> E2eResult<ApiResponse> {
        let request = self.request(Method::POST, "users", auth).json(payload);
        self.send(Method::POST, "users", request).await
    }

    pub async fn read(&self, id: u64) -> E2eResult<ApiResponse> {
        let path = format!("users/{id}");
        let request = self.request(Method::GET, &path, Auth::Configured);
        self.send(Method::GET, &path, request).await
    }

    pub async fn update(&self, id: u64, patch: &UserPatch) -> E2eResult<ApiResponse> {
        let path = format!("users/{id}");
        let request = self.request(Method::PUT, &path, Auth::Configured).json(patch);
        self.send(Method::PUT, &path, request).await
    }

    pub async fn delete(&self, id: u64) -> E2eResult<ApiResponse> {
        let path = format!("users/{id}");
        let request = self.request(Method::DELETE, &path, Auth::Configured);
        self.send(Method::DELETE, &path, request).await
    }

    pub async fn list(&self) -> E2eResult<ApiResponse> {
        self.list_with(Auth::Configured).await
    }

    pub async fn list_with(&self, auth: Auth) -> E2eResult<ApiResponse> {
        let request = self.request(Method::GET, "users", auth);
        self.send(Method::GET, "users", request).await
    }

    fn request(&self, method: Method, path: &str, auth: Auth) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match auth {
            Auth::Configured => builder.bearer_auth(self.token.expose()),
            Auth::Bearer(value) => builder.bearer_auth(value),
            Auth::Missing => builder,
        }
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> E2eResult<ApiResponse> {
        debug!(%method, path, "sending request");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        info!(%method, path, status, "user resource responded");
        Ok(ApiResponse { status, body })
    }
}
