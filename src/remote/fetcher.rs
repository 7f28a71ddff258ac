//! Fetch capability and its HTTP implementation.
//!
//! # Responsibilities
//! - Build the request URL from the service base URL and request path
//! - Present the API key (bearer header or query parameter)
//! - Map non-success statuses to [`ServiceError::Status`] with the
//!   service's own error message when it sends one
//! - Parse success bodies as JSON

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::config::schema::{AuthConfig, ServiceConfig};
use crate::remote::types::{HttpMethod, RemoteRequest, ServiceError};

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ServiceError>> + Send + 'a>>;

/// Something that can perform one request against a remote service.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, request: &'a RemoteRequest) -> FetchFuture<'a>;
}

/// Resolved credentials for a service.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    Query { param: String, key: String },
    /// Credentials are configured but the environment variable is unset.
    Missing { env: String },
}

impl Auth {
    /// Resolve the configured scheme against the process environment.
    pub fn from_env(config: &AuthConfig) -> Self {
        let lookup = |env: &str| std::env::var(env).ok().filter(|v| !v.trim().is_empty());

        match config {
            AuthConfig::None => Auth::None,
            AuthConfig::Bearer { api_key_env } => match lookup(api_key_env.as_str()) {
                Some(key) => Auth::Bearer(key),
                None => Auth::Missing {
                    env: api_key_env.clone(),
                },
            },
            AuthConfig::Query { param, api_key_env } => match lookup(api_key_env.as_str()) {
                Some(key) => Auth::Query {
                    param: param.clone(),
                    key,
                },
                None => Auth::Missing {
                    env: api_key_env.clone(),
                },
            },
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Auth::Query { param, .. } => write!(f, "Query({}=<redacted>)", param),
            Auth::Missing { env } => write!(f, "Missing({})", env),
        }
    }
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    service: String,
    base_url: Url,
    auth: Auth,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(
        service: impl Into<String>,
        base_url: impl Into<String>,
        auth: Auth,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Result<Self, ServiceError> {
        let service = service.into();
        let raw = base_url.into();

        let base_url = Url::parse(&raw).map_err(|e| ServiceError::InvalidUrl {
            service: service.clone(),
            message: format!("'{}': {}", raw, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl {
                service,
                message: format!("'{}' cannot carry a path", raw),
            });
        }

        Ok(Self {
            service,
            base_url,
            auth,
            timeout,
            client,
        })
    }

    /// Build a fetcher from service configuration.
    ///
    /// A missing API key is not an error here; requests fail with
    /// [`ServiceError::MissingCredential`] instead, so unrelated services
    /// stay usable.
    pub fn from_config(
        service: &str,
        config: &ServiceConfig,
        client: reqwest::Client,
    ) -> Result<Self, ServiceError> {
        let auth = Auth::from_env(&config.auth);
        if let Auth::Missing { env } = &auth {
            tracing::warn!(service, env = %env, "API key not set; requests will fail");
        }

        Self::new(
            service,
            config.base_url.clone(),
            auth,
            Duration::from_secs(config.timeout_secs),
            client,
        )
    }

    fn endpoint_url(&self, request: &RemoteRequest) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();

        let segments: Vec<&str> = request.path.split('/').filter(|s| !s.is_empty()).collect();
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| ServiceError::InvalidUrl {
                    service: self.service.clone(),
                    message: format!("'{}' cannot carry a path", self.base_url),
                })?
                .pop_if_empty()
                .extend(segments);
        }

        let auth_pair = match &self.auth {
            Auth::Query { param, key } => Some((param, key)),
            _ => None,
        };

        if !request.query.is_empty() || auth_pair.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
            if let Some((param, key)) = auth_pair {
                pairs.append_pair(param, key);
            }
        }

        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_builder() {
            ServiceError::InvalidUrl {
                service: self.service.clone(),
                message: e.to_string(),
            }
        } else {
            ServiceError::Transport {
                service: self.service.clone(),
                message: e.to_string(),
            }
        }
    }

    async fn send(&self, request: &RemoteRequest) -> Result<Value, ServiceError> {
        if let Auth::Missing { env } = &self.auth {
            return Err(ServiceError::MissingCredential {
                service: self.service.clone(),
                env: env.clone(),
            });
        }

        let url = self.endpoint_url(request)?;

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        }
        .timeout(self.timeout);

        if let Auth::Bearer(key) = &self.auth {
            builder = builder.bearer_auth(key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            service = %self.service,
            method = %request.method,
            path = %request.path,
            "Sending request"
        );

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(ServiceError::Status {
                service: self.service.clone(),
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ServiceError::InvalidResponse {
            service: self.service.clone(),
            message: e.to_string(),
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, request: &'a RemoteRequest) -> FetchFuture<'a> {
        Box::pin(self.send(request))
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["/error/message", "/message", "/detail", "/error"]
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
        .map(str::to_string)
}
