//! Transport-neutral request and response envelopes.
//!
//! # Responsibility
//! - Carry an already-authenticated request into the router.
//! - Map every failure to a status code and a stable JSON body.
//!
//! # Invariants
//! - Error bodies are `{"error": <message>, "kind": <kind>}`, except 401
//!   which answers `{"detail": <message>}`.
//! - Infrastructure failures never expose internal details.

use clinic_core::{ErrorKind, RepoError, ServiceError, UserId};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

/// Request methods the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Parses a method name case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound request.
///
/// `user` is the identity established by the host's token authentication;
/// `None` means the request is anonymous.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub user: Option<UserId>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            user: None,
            body: None,
        }
    }

    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// One outbound response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        Ok(Self::new(200, to_json(value)?))
    }

    pub fn created<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        Ok(Self::new(201, to_json(value)?))
    }

    pub fn no_content() -> Self {
        Self::new(204, Value::Null)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Router-level failure.
#[derive(Debug)]
pub enum ApiError {
    /// No authenticated user, or the user no longer exists.
    Unauthenticated,
    /// No route matches the path.
    RouteNotFound,
    MethodNotAllowed(Method),
    /// Body missing or not the expected shape.
    MalformedBody(String),
    Service(ServiceError),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::RouteNotFound => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::MalformedBody(_) => 400,
            Self::Service(err) => status_for_kind(err.kind()),
        }
    }

    pub fn into_response(self) -> ApiResponse {
        let status = self.status();
        let body = match &self {
            Self::Unauthenticated => {
                json!({ "detail": "Authentication credentials were not provided." })
            }
            Self::RouteNotFound => json!({ "error": "Not found.", "kind": "not_found" }),
            Self::MethodNotAllowed(method) => json!({
                "error": format!("Method \"{method}\" not allowed."),
                "kind": "method_not_allowed",
            }),
            Self::MalformedBody(message) => json!({
                "error": message,
                "kind": ErrorKind::Validation.as_str(),
            }),
            Self::Service(err) => json!({
                "error": err.public_message(),
                "kind": err.kind().as_str(),
            }),
        };
        ApiResponse::new(status, body)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::RouteNotFound => write!(f, "route not found"),
            Self::MethodNotAllowed(method) => write!(f, "method {method} not allowed"),
            Self::MalformedBody(message) => write!(f, "malformed body: {message}"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Service(value.into())
    }
}

pub fn status_for_kind(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation => 400,
        ErrorKind::Authorization => 403,
        ErrorKind::NotFound => 404,
        ErrorKind::Infrastructure => 500,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|err| {
        ApiError::Service(ServiceError::Infrastructure(RepoError::InvalidData(
            err.to_string(),
        )))
    })
}
