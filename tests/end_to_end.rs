//! Full request flows through the router, the services and the in-memory store.

mod common;

use axum::http::StatusCode;
use chrono::TimeDelta;
use serde_json::{Value, json};
use shortlink::utils::clock::Clock;
use shortlink::utils::code_generator::ALPHABET;
use std::collections::HashSet;

#[tokio::test]
async fn test_generated_code_redirects_to_destination() {
    let app = common::spawn_app();

    let created = app.create_url("https://example.com/page").await;
    let code = common::code_of(&created);

    assert_eq!(code.len(), 8);
    assert!(code.bytes().all(|b| ALPHABET.contains(&b)));

    let response = app.server.get(&format!("/{code}")).await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "https://example.com/page");
}

#[tokio::test]
async fn test_tracking_params_appended_on_redirect() {
    let app = common::spawn_app();

    let created = app
        .create(json!({
            "original_url": "https://example.com",
            "utm_parameters": { "utm_source": "x" }
        }))
        .await;

    let response = app
        .server
        .get(&format!("/{}", common::code_of(&created)))
        .await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "https://example.com/?utm_source=x");
}

#[tokio::test]
async fn test_past_expiration_rejected_at_creation() {
    let app = common::spawn_app();
    let past = app.clock.now() - TimeDelta::seconds(1);

    let response = app
        .server
        .post("/api/urls")
        .json(&json!({ "original_url": "https://example.com", "expiration_date": past }))
        .await;

    response.assert_status_bad_request();
    assert!(app.repository.is_empty());
}

#[tokio::test]
async fn test_link_expires_when_clock_passes_expiration() {
    let app = common::spawn_app();
    let expires = app.clock.now() + TimeDelta::seconds(30);
    let created = app
        .create(json!({ "original_url": "https://example.com", "expiration_date": expires }))
        .await;
    let code = common::code_of(&created);

    app.clock.advance(TimeDelta::seconds(29));
    app.server
        .get(&format!("/{code}"))
        .await
        .assert_status(StatusCode::FOUND);

    app.clock.advance(TimeDelta::seconds(2));
    app.server
        .get(&format!("/{code}"))
        .await
        .assert_status(StatusCode::GONE);
}

#[tokio::test]
async fn test_same_slug_twice_conflicts() {
    let app = common::spawn_app();
    let body = json!({ "original_url": "https://example.com", "custom_slug": "launch" });

    app.server
        .post("/api/urls")
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);

    let second = app.server.post("/api/urls").json(&body).await;
    second.assert_status(StatusCode::CONFLICT);

    let location = app.server.get("/launch").await;
    assert_eq!(location.header("location"), "https://example.com/");
}

#[tokio::test]
async fn test_sequential_allocations_are_unique() {
    let app = common::spawn_app();
    let mut codes = HashSet::new();

    for i in 0..200 {
        let created = app.create_url(&format!("https://example.com/{i}")).await;
        assert!(codes.insert(common::code_of(&created)));
    }

    assert_eq!(app.repository.len(), 200);
}

#[tokio::test]
async fn test_idle_cache_entry_is_reloaded_after_sweep() {
    let app = common::spawn_app();
    let code = common::code_of(&app.create_url("https://example.com").await);

    app.server.get(&format!("/{code}")).await;
    assert_eq!(app.cache.len(), 1);

    app.clock.advance(TimeDelta::seconds(301));
    assert_eq!(app.cache.sweep(), 1);
    assert!(app.cache.is_empty());

    let response = app.server.get(&format!("/{code}")).await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(app.cache.len(), 1);
}

#[tokio::test]
async fn test_create_read_delete_lifecycle() {
    let app = common::spawn_app();
    let created = app.create_url("https://example.com/life").await;
    let id = common::id_of(&created);
    let code = common::code_of(&created);

    let fetched = app.server.get(&format!("/api/urls/{id}")).await.json::<Value>();
    assert_eq!(fetched["short_code"], code.as_str());

    app.server
        .delete(&format!("/api/urls/{id}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get(&format!("/{code}"))
        .await
        .assert_status_not_found();
    app.server
        .delete(&format!("/api/urls/{id}"))
        .await
        .assert_status_not_found();
}
