use activity_cube::{config::AppConfig, query::QueryRequest, rules, server::Server};
use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::{future::Future, sync::Once};
use tower::ServiceExt;

static TRACING_INIT: Once = Once::new();

/// Runs a test closure against a router built from the default configuration.
pub async fn with_activity_harness<F, Fut>(test: F)
where
    F: FnOnce(ActivityTestHarness) -> Fut,
    Fut: Future<Output = ()>,
{
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });

    let config = AppConfig {
        listen_addr: "127.0.0.1:0".parse().expect("static listen address"),
        rule_scenarios: rules::default_scenarios(),
        rules_file: None,
    };
    let server = Server::new(config)
        .await
        .expect("server should build without a rules file");

    test(ActivityTestHarness {
        router: server.router(),
    })
    .await;
}

#[derive(Clone)]
pub struct ActivityTestHarness {
    router: Router,
}

impl ActivityTestHarness {
    pub async fn translate(&self, request: &QueryRequest) -> http::Response<Body> {
        self.post("/api/activity/translate", request).await
    }

    pub async fn get(&self, path: &str) -> http::Response<Body> {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("failed to build harness request");
        self.send(request).await
    }

    pub async fn post<T>(&self, path: &str, payload: &T) -> http::Response<Body>
    where
        T: Serialize,
    {
        let body = serde_json::to_vec(payload).expect("request payload should serialize");
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("failed to build harness request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> http::Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let (status, bytes) = read_bytes(response).await;
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}

pub async fn read_text(response: http::Response<Body>) -> (StatusCode, String) {
    let (status, bytes) = read_bytes(response).await;
    let text = String::from_utf8(bytes).expect("response body should be UTF-8");
    (status, text)
}

async fn read_bytes(response: http::Response<Body>) -> (StatusCode, Vec<u8>) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    (status, bytes.to_vec())
}
