//! A remote service guarded by the retry executor.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use crate::remote::fetcher::Fetcher;
use crate::remote::types::{RemoteRequest, ServiceError};
use crate::resilience::{ExecuteError, RetryExecutor, Validation};

/// Named remote service: a fetch capability plus the executor guarding it.
#[derive(Clone)]
pub struct RemoteService {
    name: String,
    fetcher: Arc<dyn Fetcher>,
    executor: RetryExecutor,
}

impl RemoteService {
    pub fn new(name: impl Into<String>, fetcher: Arc<dyn Fetcher>, executor: RetryExecutor) -> Self {
        Self {
            name: name.into(),
            fetcher,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Replace the executor, e.g. to override retry options for one call site.
    pub fn with_executor(mut self, executor: RetryExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Perform `request`, accepting any JSON response.
    pub async fn call(&self, request: &RemoteRequest) -> Result<Value, ExecuteError<ServiceError>> {
        self.call_validated(request, |_: &Value| Ok(())).await
    }

    /// Perform `request`, retrying until the response passes `validate`.
    ///
    /// Requests not marked idempotent get a single attempt.
    pub async fn call_validated<V>(
        &self,
        request: &RemoteRequest,
        validate: V,
    ) -> Result<Value, ExecuteError<ServiceError>>
    where
        V: Fn(&Value) -> Validation,
    {
        let single;
        let executor = if request.idempotent {
            &self.executor
        } else {
            single = self.executor.single_attempt();
            &single
        };

        let operation = self.operation(request);
        let span = tracing::debug_span!("remote_call", service = %self.name, request = %request.label());
        let fetcher = &self.fetcher;

        executor
            .execute_validated(
                &operation,
                move || async move { fetcher.fetch(request).await.map_err(ServiceError::classify) },
                validate,
            )
            .instrument(span)
            .await
    }

    /// Operation label for the executor. The path is left out to keep
    /// metric label cardinality bounded.
    fn operation(&self, request: &RemoteRequest) -> String {
        format!("{} {}", self.name, request.method)
    }
}

impl fmt::Debug for RemoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteService")
            .field("name", &self.name)
            .field("executor", &self.executor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fetcher::FetchFuture;
    use crate::remote::validators::require_fields;
    use crate::resilience::RetryOptions;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Value, ServiceError>>>,
        calls: AtomicU32,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Value, ServiceError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch<'a>(&'a self, _request: &'a RemoteRequest) -> FetchFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(ServiceError::Transport {
                    service: "scripted".into(),
                    message: "script exhausted".into(),
                })
            });
            Box::pin(async move { next })
        }
    }

    fn status(code: u16) -> ServiceError {
        ServiceError::Status {
            service: "weather".into(),
            status: code,
            message: "x".into(),
        }
    }

    fn service(fetcher: Arc<ScriptedFetcher>) -> RemoteService {
        RemoteService::new(
            "weather",
            fetcher,
            RetryExecutor::new(RetryOptions {
                max_attempts: 3,
                base_delay_ms: 10,
                attempt_timeout_ms: None,
            }),
        )
    }

    #[test]
    fn test_operation_label_excludes_path() {
        let service = service(ScriptedFetcher::new(vec![]));
        let weather = RemoteRequest::get("weather").query("lat", "-1.29");
        let forecast = RemoteRequest::get("forecast/daily");

        assert_eq!(service.operation(&weather), "weather GET");
        assert_eq!(service.operation(&weather), service.operation(&forecast));
        assert_eq!(
            service.operation(&RemoteRequest::post("crop_rec", json!({}))),
            "weather POST"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_server_errors() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(status(503)),
            Err(status(500)),
            Ok(json!({"main": {"temp": 21.5}})),
        ]);
        let value = service(fetcher.clone())
            .call(&RemoteRequest::get("weather"))
            .await
            .unwrap();

        assert_eq!(value["main"]["temp"], 21.5);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![Err(status(401)), Ok(json!({}))]);
        let err = service(fetcher.clone())
            .call(&RemoteRequest::get("weather"))
            .await
            .unwrap_err();

        assert!(err.is_non_retryable());
        assert_eq!(err.last_error().and_then(ServiceError::status), Some(401));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_idempotent_request_runs_once() {
        let fetcher = ScriptedFetcher::new(vec![Err(status(503)), Ok(json!({}))]);
        let err = service(fetcher.clone())
            .call(&RemoteRequest::post("crop_rec", json!({"n": 90})))
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_post_is_retried() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(status(502)),
            Ok(json!({"predictions": ["maize"]})),
        ]);
        let value = service(fetcher.clone())
            .call(&RemoteRequest::post("crop_rec", json!({"n": 90})).idempotent())
            .await
            .unwrap();

        assert_eq!(value["predictions"][0], "maize");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_failure_is_retried() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(json!({"prediction": null})),
            Ok(json!({"prediction": 3.4})),
        ]);
        let value = service(fetcher.clone())
            .call_validated(&RemoteRequest::get("predict"), require_fields(&["prediction"]))
            .await
            .unwrap();

        assert_eq!(value["prediction"], 3.4);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
