//! Helper functions for integration tests

use ridewatch::config::{Config, Credentials};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn test_config(api_root: &str, riders: &[&str], include_self: bool) -> Config {
    Config {
        credentials: Credentials {
            id: "user@example.com".to_string(),
            secret: "hunter2".to_string(),
        },
        riders: riders.iter().map(ToString::to_string).collect(),
        include_self,
        interval: 15,
        display: Some("Test".to_string()),
        api_root: Some(api_root.to_string()),
    }
}

/// Mount the token and self-profile endpoints every session needs.
pub async fn mock_auth(server: &MockServer, self_id: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "tok" })),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/riders/me/profile"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": self_id })),
        )
        .mount(server)
        .await;
}

pub fn profile_json(id: &str, riding: bool, ride_on_count: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "firstName": "Jo",
        "worldId": 1,
        "achievementScore": 1342,
        "runAchievementScore": 207,
        "totalExperience": 424242,
        "rideOnCount": ride_on_count,
        "riding": riding
    })
}

/// Live-state body with altitude and distance given in already-decoded base
/// units, encoded back into the platform representation.
pub fn status_json(altitude_m: f64, distance_m: f64) -> serde_json::Value {
    serde_json::json!({
        "heartRate": 142.0,
        "cadence": 88.0,
        "power": 250.0,
        "speed": 35_500_000.0,
        "altitude": altitude_m * 2.0 + 9000.0,
        "distance": distance_m
    })
}

pub async fn mock_profile(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/riders/{id}/profile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mock_status(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/riders/{id}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a response that only answers the next matching request, letting a
/// later catch-all take over afterwards.
pub async fn mock_status_once(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/riders/{id}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}
