//! Degradation behavior when the upstream API misbehaves

use std::sync::Arc;

use pretty_assertions::assert_eq;
use ridewatch::{RiderMetrics, actors::poller::PollerHandle, provider::HttpTelemetryProvider};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{mock_auth, mock_profile, mock_status, profile_json, status_json, test_config};

#[tokio::test]
async fn test_setup_aborts_when_provider_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = Arc::new(HttpTelemetryProvider::new(server.uri()));
    let result = PollerHandle::spawn(test_config(&server.uri(), &["42"], false), provider).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_setup_aborts_on_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = Arc::new(HttpTelemetryProvider::new(server.uri()));
    let result = PollerHandle::spawn(test_config(&server.uri(), &["42"], false), provider).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_rider_does_not_block_others() {
    let server = MockServer::start().await;
    mock_auth(&server, "self-1").await;

    // Rider "a" is missing upstream; rider "b" rides normally.
    Mock::given(method("GET"))
        .and(path("/riders/a/profile"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mock_profile(&server, "b", profile_json("b", true, 0)).await;
    mock_status(&server, "b", status_json(50.0, 100.0)).await;

    let provider = Arc::new(HttpTelemetryProvider::new(server.uri()));
    let handle = PollerHandle::spawn(test_config(&server.uri(), &["a", "b"], false), provider)
        .await
        .unwrap();

    handle.poll_now().await.unwrap();

    let b = handle.rider("b").await.unwrap();
    assert!(b.online);
    assert_eq!(b.metrics.distance, 100.0);

    // "a" keeps its prior state untouched.
    let a = handle.rider("a").await.unwrap();
    assert!(!a.online);
    assert_eq!(a.metrics, RiderMetrics::default());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_expired_session_reconnects_next_cycle() {
    let server = MockServer::start().await;
    mock_auth(&server, "self-1").await;

    // First profile fetch rejects the session, afterwards it works.
    Mock::given(method("GET"))
        .and(path("/riders/42/profile"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mock_profile(&server, "42", profile_json("42", false, 0)).await;

    let provider = Arc::new(HttpTelemetryProvider::new(server.uri()));
    let handle = PollerHandle::spawn(test_config(&server.uri(), &["42"], false), provider)
        .await
        .unwrap();

    // Cycle 1: session dropped, rider untouched.
    handle.poll_now().await.unwrap();
    let rider = handle.rider("42").await.unwrap();
    assert_eq!(rider.profile.level, 0);

    // Cycle 2: re-authenticated and polled.
    handle.poll_now().await.unwrap();
    let rider = handle.rider("42").await.unwrap();
    assert_eq!(rider.profile.level, 13);

    // The token endpoint was hit once at setup and once for the reconnect.
    let token_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/auth/token")
        .count();
    assert_eq!(token_requests, 2);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_payload_retains_state() {
    let server = MockServer::start().await;
    mock_auth(&server, "self-1").await;

    Mock::given(method("GET"))
        .and(path("/riders/42/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("42", true, 0)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mock_status(&server, "42", status_json(50.0, 100.0)).await;

    // Every later profile fetch returns garbage.
    Mock::given(method("GET"))
        .and(path("/riders/42/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
        .mount(&server)
        .await;

    let provider = Arc::new(HttpTelemetryProvider::new(server.uri()));
    let handle = PollerHandle::spawn(test_config(&server.uri(), &["42"], false), provider)
        .await
        .unwrap();

    handle.poll_now().await.unwrap();
    let rider = handle.rider("42").await.unwrap();
    assert!(rider.online);
    assert_eq!(rider.metrics.distance, 100.0);

    // Garbage cycle: last-known state stays visible.
    handle.poll_now().await.unwrap();
    let rider = handle.rider("42").await.unwrap();
    assert!(rider.online);
    assert_eq!(rider.metrics.distance, 100.0);

    handle.shutdown().await.unwrap();
}
