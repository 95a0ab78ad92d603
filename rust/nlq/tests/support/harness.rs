use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use nlq::{config::AppConfig, server::Server};
use serde::Serialize;
use serde_json::Value;
use std::sync::Once;
use tower::ServiceExt;

pub const API_KEY: &str = "test-api-key";

static TRACING_INIT: Once = Once::new();

/// In-process NLQ router with an API key configured.
pub struct NlqTestHarness {
    router: Router,
    api_key: String,
}

pub fn harness() -> NlqTestHarness {
    harness_with(|_| {})
}

/// Harness whose configuration is adjusted by `configure` before the router is built.
pub fn harness_with(configure: impl FnOnce(&mut AppConfig)) -> NlqTestHarness {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });

    let mut config = AppConfig::embedded();
    config.api_key = Some(API_KEY.to_string());
    configure(&mut config);

    NlqTestHarness {
        router: Server::new(config).router(),
        api_key: API_KEY.to_string(),
    }
}

impl NlqTestHarness {
    pub async fn post<T>(&self, path: &str, payload: &T) -> http::Response<Body>
    where
        T: Serialize,
    {
        self.request("POST", path, Some(payload), true).await
    }

    #[allow(dead_code)]
    pub async fn post_without_api_key<T>(&self, path: &str, payload: &T) -> http::Response<Body>
    where
        T: Serialize,
    {
        self.request("POST", path, Some(payload), false).await
    }

    pub async fn get(&self, path: &str) -> http::Response<Body> {
        self.request::<()>("GET", path, None, true).await
    }

    #[allow(dead_code)]
    pub async fn get_without_api_key(&self, path: &str) -> http::Response<Body> {
        self.request::<()>("GET", path, None, false).await
    }

    async fn request<T>(
        &self,
        method: &str,
        path: &str,
        payload: Option<&T>,
        include_api_key: bool,
    ) -> http::Response<Body>
    where
        T: Serialize,
    {
        let mut builder = Request::builder().method(method).uri(path);

        if include_api_key {
            builder = builder.header("x-api-key", &self.api_key);
        }

        let body = match payload {
            Some(payload) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(payload).expect("request payload should serialize"))
            }
            None => Body::empty(),
        };

        let request = builder
            .body(body)
            .expect("failed to build harness request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}
