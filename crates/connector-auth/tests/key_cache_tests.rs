//! Integration tests for the signing key cache over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Utc};
use connector_auth::auth::{HttpKeySource, KeyCache};
use connector_auth::errors::AuthError;
use connector_auth_test_utils::{
    ManualClock, KEY_PATH, OTHER_RSA_PUBLIC_KEY, TEST_RSA_PUBLIC_KEY,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn cache(clock: Arc<ManualClock>, ttl: Duration) -> KeyCache {
    KeyCache::with_ttl(
        Arc::new(HttpKeySource::new(Duration::from_secs(5))),
        clock,
        ttl,
    )
}

async fn key_server(body: &str, expected_fetches: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_fetches)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_one_fetch_within_ttl() {
    let server = key_server(TEST_RSA_PUBLIC_KEY, 1).await;
    let url = format!("{}{}", server.uri(), KEY_PATH);
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = cache(clock.clone(), Duration::from_secs(3600));

    let first = cache.get(Some(&url)).await.unwrap();
    clock.advance(chrono::Duration::minutes(30));
    let second = cache.get(Some(&url)).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.material(), TEST_RSA_PUBLIC_KEY);
    assert_eq!(first.source_url(), url);
    // Mock expectations are verified on drop
}

#[tokio::test]
async fn test_exactly_one_more_fetch_after_ttl() {
    let server = key_server(TEST_RSA_PUBLIC_KEY, 2).await;
    let url = format!("{}{}", server.uri(), KEY_PATH);
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = cache(clock.clone(), Duration::from_secs(3600));

    cache.get(Some(&url)).await.unwrap();
    clock.advance(chrono::Duration::seconds(3601));
    let refreshed = cache.get(Some(&url)).await.unwrap();
    cache.get(Some(&url)).await.unwrap();

    assert_eq!(refreshed.fetched_at(), start_time() + chrono::Duration::seconds(3601));
    assert_eq!(
        refreshed.expires_at(),
        refreshed.fetched_at() + chrono::Duration::seconds(3600)
    );
}

#[tokio::test]
async fn test_rotated_key_is_picked_up_after_expiry() {
    let server = MockServer::start().await;
    let url = format!("{}{}", server.uri(), KEY_PATH);
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = cache(clock.clone(), Duration::from_secs(60));

    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(TEST_RSA_PUBLIC_KEY))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(OTHER_RSA_PUBLIC_KEY))
        .mount(&server)
        .await;

    assert_eq!(
        cache.get(Some(&url)).await.unwrap().material(),
        TEST_RSA_PUBLIC_KEY
    );
    clock.advance(chrono::Duration::seconds(60));
    assert_eq!(
        cache.get(Some(&url)).await.unwrap().material(),
        OTHER_RSA_PUBLIC_KEY
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(TEST_RSA_PUBLIC_KEY)
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let url = format!("{}{}", server.uri(), KEY_PATH);
    let cache = cache(
        Arc::new(ManualClock::new(start_time())),
        Duration::from_secs(3600),
    );

    let results = join_all((0..10).map(|_| cache.get(Some(&url)))).await;

    assert!(results.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_failed_fetch_is_retried_on_next_get() {
    let server = MockServer::start().await;
    let url = format!("{}{}", server.uri(), KEY_PATH);
    let cache = cache(
        Arc::new(ManualClock::new(start_time())),
        Duration::from_secs(3600),
    );

    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(TEST_RSA_PUBLIC_KEY))
        .mount(&server)
        .await;

    assert!(matches!(
        cache.get(Some(&url)).await,
        Err(AuthError::KeyFetch(_))
    ));
    assert!(cache.get(Some(&url)).await.is_ok());
}

#[tokio::test]
async fn test_missing_url_makes_no_request() {
    let server = key_server(TEST_RSA_PUBLIC_KEY, 0).await;
    let cache = cache(
        Arc::new(ManualClock::new(start_time())),
        Duration::from_secs(3600),
    );

    assert!(matches!(
        cache.get(None).await,
        Err(AuthError::Configuration(_))
    ));
    drop(server);
}
