// Integration tests for `FliprClient` using wiremock.
#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flipr_api::{Credentials, Error, FliprClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FliprClient) {
    let server = MockServer::start().await;
    let creds = Credentials::new("pool@example.com", SecretString::from("hunter2"));
    let client = FliprClient::from_reqwest(&server.uri(), reqwest::Client::new(), creds).unwrap();
    (server, client)
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/OAuth2/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=pool%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer",
            "expires_in": 86399
        })))
        .mount(server)
        .await;
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_search_all_ids_partitions_modules() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/modules"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "Serial": "AB12CD", "ModuleType_Id": 1 },
            { "Serial": "HUB001", "ModuleType_Id": 2 },
            { "Serial": "XX0000", "ModuleType_Id": 7 }
        ])))
        .mount(&server)
        .await;

    let ids = client.search_all_ids().await.unwrap();

    assert_eq!(ids.flipr, vec!["AB12CD".to_owned()]);
    assert_eq!(ids.hub, vec!["HUB001".to_owned()]);
}

#[tokio::test]
async fn test_get_pool_measure_latest() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/modules/AB12CD/survey/last"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "MeasureId": 405_698,
            "DateTime": "2021-02-01T07:40:23.663Z",
            "Temperature": 10.0,
            "PH": { "Label": "PH", "Message": "Parfait", "Deviation": -0.47, "Value": 7.01, "DeviationSector": "Medium" },
            "OxydoReductionPotentiel": { "Label": "Potentiel Redox.", "Value": 474.0 },
            "Desinfectant": { "Label": "Chlore", "Message": "Trop faible", "Value": 0.31, "DeviationSector": "TooLow" },
            "Battery": { "Label": "Batterie", "Deviation": 0.75 }
        })))
        .mount(&server)
        .await;

    let measure = client.get_pool_measure_latest("AB12CD").await.unwrap();

    assert_eq!(measure.temperature, Some(10.0));
    assert_eq!(measure.ph, Some(7.01));
    assert_eq!(measure.red_ox, Some(474.0));
    assert_eq!(measure.chlorine, Some(0.31));
    assert_eq!(measure.ph_status.as_deref(), Some("Medium"));
    assert_eq!(measure.date_time.to_rfc3339(), "2021-02-01T07:40:23.663+00:00");
}

#[tokio::test]
async fn test_hub_state_round_trip() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/hub/HUB001/state"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "stateEquipment": 0, "behavior": "auto" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hub/HUB001/Manual/True"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "stateEquipment": 1, "behavior": "manual" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/hub/HUB001/mode/planning"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "stateEquipment": 1, "behavior": "planning" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let before = client.get_hub_state("HUB001").await.unwrap();
    assert!(!before.state);
    assert_eq!(before.mode, "auto");

    let switched = client.set_hub_state("HUB001", true).await.unwrap();
    assert!(switched.state);
    assert_eq!(switched.mode, "manual");

    let planned = client.set_hub_mode("HUB001", "planning").await.unwrap();
    assert_eq!(planned.mode, "planning");
}

#[tokio::test]
async fn test_token_is_cached_between_requests() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/OAuth2/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/modules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    client.search_all_ids().await.unwrap();
    client.search_all_ids().await.unwrap();
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_bad_credentials_are_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/OAuth2/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .mount(&server)
        .await;

    let err = client.search_all_ids().await.unwrap_err();
    assert!(
        matches!(err, Error::Authentication { ref message } if message.contains("invalid_grant")),
        "unexpected error: {err:?}"
    );
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_persistent_401_is_token_expired() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/hub/HUB001/state"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = client.get_hub_state("HUB001").await.unwrap_err();
    assert!(matches!(err, Error::TokenExpired), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/modules/AB12CD/survey/last"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client.get_pool_measure_latest("AB12CD").await.unwrap_err();
    match err {
        Error::Api { status, ref message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_keeps_raw_payload() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/hub/HUB001/state"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"unexpected\": true}"))
        .mount(&server)
        .await;

    let err = client.get_hub_state("HUB001").await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert!(body.contains("unexpected")),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}
