//! Shared test support: a scripted HTTP transport for driving the API
//! client through canned upstream conversations.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

pub use std::sync::Arc;

pub use leapgrid_core::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
pub use leapgrid_core::retry::RetryConfig;
pub use leapgrid_core::tradier::TradierClient;

struct Route {
    pattern: String,
    queue: VecDeque<Result<HttpResponse, HttpError>>,
    last: Option<Result<HttpResponse, HttpError>>,
}

/// Transport that answers requests from pre-registered scripts.
///
/// Routes match by substring on the full request URL; the first matching
/// route wins. Scripted responses are consumed in order and the final one
/// repeats once the queue drains, so retry loops can be exercised without
/// scripting every attempt. Unscripted requests fail loudly.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(
        self,
        pattern: impl Into<String>,
        responses: Vec<Result<HttpResponse, HttpError>>,
    ) -> Self {
        self.routes.lock().expect("routes lock").push(Route {
            pattern: pattern.into(),
            queue: responses.into(),
            last: None,
        });
        self
    }

    /// Register a single JSON 200 response that repeats for every call.
    pub fn route_json(self, pattern: impl Into<String>, body: serde_json::Value) -> Self {
        self.route(pattern, vec![Ok(HttpResponse::ok_json(body.to_string()))])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    fn answer(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.calls.lock().expect("calls lock").push(url.to_owned());

        let mut routes = self.routes.lock().expect("routes lock");
        for route in routes.iter_mut() {
            if !url.contains(&route.pattern) {
                continue;
            }
            if let Some(response) = route.queue.pop_front() {
                route.last = Some(response.clone());
                return response;
            }
            if let Some(last) = &route.last {
                return last.clone();
            }
            return Err(HttpError::non_retryable(format!(
                "route '{}' has no scripted responses",
                route.pattern
            )));
        }

        Err(HttpError::non_retryable(format!("unscripted request: {url}")))
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let result = self.answer(&request.url);
        Box::pin(async move { result })
    }
}

/// Client wired to a scripted transport, with millisecond backoff so retry
/// paths run instantly.
pub fn scripted_client(script: &Arc<ScriptedHttpClient>) -> TradierClient {
    TradierClient::new(Arc::clone(script) as Arc<dyn HttpClient>, "test-token")
        .with_retry(RetryConfig::fixed(Duration::from_millis(1), 2))
}
