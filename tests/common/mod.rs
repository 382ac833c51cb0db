#![allow(dead_code)]

use axum::ServiceExt;
use axum::extract::Request;
use axum_test::TestServer;
use serde_json::{Value, json};
use shortlink::application::services::ServiceSettings;
use shortlink::domain::click_event::{ClickEvent, ClickRecorder};
use shortlink::infrastructure::cache::ResolutionCache;
use shortlink::infrastructure::persistence::InMemoryLinkRepository;
use shortlink::routes::app_router;
use shortlink::state::AppState;
use shortlink::utils::clock::ManualClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const BASE_URL: &str = "http://s.test";

/// A full router over the in-memory store with a hand-driven clock.
pub struct TestApp {
    pub server: TestServer,
    pub repository: Arc<InMemoryLinkRepository>,
    pub cache: Arc<ResolutionCache>,
    pub clock: Arc<ManualClock>,
    pub clicks: mpsc::Receiver<ClickEvent>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(ServiceSettings {
        base_url: BASE_URL.to_string(),
        ..ServiceSettings::default()
    })
}

pub fn spawn_app_with(settings: ServiceSettings) -> TestApp {
    let repository = Arc::new(InMemoryLinkRepository::new());
    let clock = Arc::new(ManualClock::default());
    let cache = Arc::new(ResolutionCache::new(Duration::from_secs(300), clock.clone()));
    let (recorder, clicks) = ClickRecorder::channel(100);

    let state = AppState::new(
        repository.clone(),
        cache.clone(),
        clock.clone(),
        recorder,
        &settings,
    );

    let app = ServiceExt::<Request>::into_make_service(app_router(state));
    let server = TestServer::new(app).unwrap();

    TestApp {
        server,
        repository,
        cache,
        clock,
        clicks,
    }
}

impl TestApp {
    /// Creates a link through the API and returns the response body.
    pub async fn create(&self, body: Value) -> Value {
        let response = self.server.post("/api/urls").json(&body).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }

    pub async fn create_url(&self, url: &str) -> Value {
        self.create(json!({ "original_url": url })).await
    }
}

pub fn code_of(body: &Value) -> String {
    body["short_code"].as_str().unwrap().to_string()
}

pub fn id_of(body: &Value) -> i64 {
    body["id"].as_i64().unwrap()
}
