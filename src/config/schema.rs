//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resilience::RetryOptions;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Retry options applied to every service without its own override.
    pub retries: RetryOptions,

    /// Remote services by name.
    pub services: BTreeMap<String, ServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        services.insert(
            "weather".to_string(),
            ServiceConfig {
                base_url: "https://api.openweathermap.org/data/2.5".to_string(),
                auth: AuthConfig::Query {
                    param: "appid".to_string(),
                    api_key_env: "AGRISMART_WEATHER_API_KEY".to_string(),
                },
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "inference".to_string(),
            ServiceConfig {
                base_url: "https://nfc-api-l2z3.onrender.com".to_string(),
                // Hosted on a free tier that sleeps; cold starts are slow.
                timeout_secs: 60,
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "llm".to_string(),
            ServiceConfig {
                base_url: "https://api.groq.com/openai/v1".to_string(),
                auth: AuthConfig::Bearer {
                    api_key_env: "AGRISMART_LLM_API_KEY".to_string(),
                },
                ..ServiceConfig::default()
            },
        );

        Self {
            retries: RetryOptions::default(),
            services,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Retry options for a service: its own override, else the global ones.
    pub fn retries_for(&self, service: &str) -> &RetryOptions {
        self.services
            .get(service)
            .and_then(|s| s.retries.as_ref())
            .unwrap_or(&self.retries)
    }
}

/// A remote HTTP service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; request paths are appended to it.
    pub base_url: String,

    /// How the API key is presented.
    pub auth: AuthConfig,

    /// Whole-request timeout enforced by the HTTP client, in seconds.
    pub timeout_secs: u64,

    /// Service-specific retry options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<RetryOptions>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth: AuthConfig::None,
            timeout_secs: 30,
            retries: None,
        }
    }
}

/// API key presentation. The key itself is read from `api_key_env`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No credentials.
    #[default]
    None,
    /// `Authorization: Bearer <key>`.
    Bearer { api_key_env: String },
    /// `?<param>=<key>` appended to every request.
    Query { param: String, api_key_env: String },
}

impl AuthConfig {
    pub fn api_key_env(&self) -> Option<&str> {
        match self {
            AuthConfig::None => None,
            AuthConfig::Bearer { api_key_env } | AuthConfig::Query { api_key_env, .. } => {
                Some(api_key_env.as_str())
            }
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
