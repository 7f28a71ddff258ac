//! Request and error types for remote services.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::resilience::CallError;

/// HTTP method of a remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// One call to a remote service, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Whether the request may be sent more than once.
    pub idempotent: bool,
}

impl RemoteRequest {
    /// A GET request. Always idempotent.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            idempotent: true,
        }
    }

    /// A POST request with a JSON body. Not retried unless marked idempotent.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            idempotent: false,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Mark the request as safe to repeat.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    /// Short label for logs, e.g. `GET /weather`.
    pub fn label(&self) -> String {
        format!("{} /{}", self.method, self.path.trim_start_matches('/'))
    }
}

/// Errors raised while talking to a remote service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("{service} API error ({status}): {message}")]
    Status {
        service: String,
        status: u16,
        message: String,
    },

    /// Connection, timeout, or body transfer failure.
    #[error("failed to reach {service}: {message}")]
    Transport { service: String, message: String },

    /// The body of a successful response was not JSON.
    #[error("invalid response from {service}: {message}")]
    InvalidResponse { service: String, message: String },

    /// The environment variable holding the API key is not set.
    #[error("missing credential for {service}: environment variable {env} is not set")]
    MissingCredential { service: String, env: String },

    #[error("invalid URL for {service}: {message}")]
    InvalidUrl { service: String, message: String },

    #[error("unknown service '{0}'")]
    UnknownService(String),
}

impl ServiceError {
    /// Whether repeating the request could succeed.
    ///
    /// Request timeouts (408), rate limiting (429) and server errors (5xx)
    /// are transient; every other client error means the request itself is
    /// wrong and will fail again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            ServiceError::Transport { .. } | ServiceError::InvalidResponse { .. } => true,
            ServiceError::MissingCredential { .. }
            | ServiceError::InvalidUrl { .. }
            | ServiceError::UnknownService(_) => false,
        }
    }

    /// Wrap for the retry executor according to [`Self::is_retryable`].
    pub fn classify(self) -> CallError<Self> {
        if self.is_retryable() {
            CallError::Retryable(self)
        } else {
            CallError::Fatal(self)
        }
    }

    /// HTTP status, when the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
