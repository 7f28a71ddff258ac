//! Services built from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::remote::fetcher::HttpFetcher;
use crate::remote::service::RemoteService;
use crate::remote::types::ServiceError;
use crate::resilience::RetryExecutor;

/// All configured remote services, sharing one HTTP connection pool.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, RemoteService>,
}

impl ServiceRegistry {
    /// Build every configured service with a fresh HTTP client.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("agrismart/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::Transport {
                service: "http-client".to_string(),
                message: e.to_string(),
            })?;

        Self::with_client(config, client)
    }

    /// Build every configured service on top of `client`.
    pub fn with_client(config: &AppConfig, client: reqwest::Client) -> Result<Self, ServiceError> {
        let mut registry = Self::default();

        for (name, service) in &config.services {
            let fetcher = HttpFetcher::from_config(name, service, client.clone())?;
            let executor = RetryExecutor::new(config.retries_for(name).clone());
            registry.insert(RemoteService::new(name.clone(), Arc::new(fetcher), executor));
        }

        tracing::debug!(services = registry.services.len(), "Service registry built");
        Ok(registry)
    }

    pub fn insert(&mut self, service: RemoteService) {
        self.services.insert(service.name().to_string(), service);
    }

    pub fn get(&self, name: &str) -> Result<&RemoteService, ServiceError> {
        self.services
            .get(name)
            .ok_or_else(|| ServiceError::UnknownService(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::RetryOptions;

    #[test]
    fn test_registry_from_default_config() {
        let registry = ServiceRegistry::from_config(&AppConfig::default()).unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["inference", "llm", "weather"]);
        assert_eq!(registry.get("llm").unwrap().name(), "llm");
    }

    #[test]
    fn test_unknown_service() {
        let registry = ServiceRegistry::from_config(&AppConfig::default()).unwrap();
        let err = registry.get("soil").unwrap_err();
        assert_eq!(err.to_string(), "unknown service 'soil'");
    }

    #[test]
    fn test_per_service_retry_override() {
        let mut config = AppConfig::default();
        if let Some(weather) = config.services.get_mut("weather") {
            weather.retries = Some(RetryOptions {
                max_attempts: 5,
                ..RetryOptions::default()
            });
        }

        let registry = ServiceRegistry::from_config(&config).unwrap();
        assert_eq!(registry.get("weather").unwrap().executor().options().max_attempts, 5);
        assert_eq!(registry.get("llm").unwrap().executor().options().max_attempts, 3);
    }
}
