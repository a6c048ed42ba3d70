#![allow(clippy::unwrap_used)]
// Integration tests for `FlairClient` using wiremock.

use serde_json::{Map, Value, json};
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flair_api::{ClientCredentials, Error, FlairClient, RelationshipData, ResourceKind};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FlairClient) {
    let server = MockServer::start().await;
    let credentials = ClientCredentials::new("client-abc", "s3cret".to_string().into());
    let client = FlairClient::with_client(reqwest::Client::new(), &server.uri(), credentials).unwrap();
    (server, client)
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

async fn mount_list(server: &MockServer, route: &str, data: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
        .mount(server)
        .await;
}

fn structure_json(id: &str) -> Value {
    json!({
        "id": id,
        "type": "structures",
        "attributes": {
            "name": "Home",
            "mode": "auto",
            "set-point-temperature-c": 21.5,
            "structure-heat-cool-mode": "heat",
            "home": true
        },
        "relationships": {}
    })
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_token_request_uses_client_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-abc"))
        .and(body_string_contains("client_secret=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.authenticate().await.unwrap();
}

#[tokio::test]
async fn test_token_rejected_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "Client authentication failed"
        })))
        .mount(&server)
        .await;

    let result = client.get_structures().await;

    match result {
        Err(ref e @ Error::Authentication { ref message }) => {
            assert!(e.is_auth_error());
            assert_eq!(message, "Client authentication failed");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/structures"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(2)
        .mount(&server)
        .await;

    client.get_structures().await.unwrap();
    client.get_structures().await.unwrap();
}

#[tokio::test]
async fn test_api_401_is_auth_error() {
    let (server, client) = setup().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/structures"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.get_structures().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

// ── Read tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_structures() {
    let (server, client) = setup().await;
    mount_token(&server).await;
    mount_list(&server, "/api/structures", json!([structure_json("s1")])).await;

    let structures = client.get_structures().await.unwrap();

    assert_eq!(structures.len(), 1);
    assert_eq!(structures[0].id, "s1");
    assert_eq!(structures[0].kind, "structures");
    assert_eq!(structures[0].name(), Some("Home"));
    assert_eq!(structures[0].attributes["mode"], "auto");
}

#[tokio::test]
async fn test_get_flair_data_collects_devices_and_readings() {
    let (server, client) = setup().await;
    mount_token(&server).await;
    mount_list(&server, "/api/structures", json!([structure_json("s1")])).await;
    mount_list(
        &server,
        "/api/structures/s1/pucks",
        json!([{ "id": "p1", "type": "pucks", "attributes": { "name": "Den puck", "inactive": false } }]),
    )
    .await;
    mount_list(
        &server,
        "/api/structures/s1/vents",
        json!([{ "id": "v1", "type": "vents", "attributes": { "name": "Den vent", "percent-open": 50 } }]),
    )
    .await;
    mount_list(
        &server,
        "/api/structures/s1/rooms",
        json!([{ "id": "r1", "type": "rooms", "attributes": { "name": "Den" } }]),
    )
    .await;
    mount_list(&server, "/api/structures/s1/bridges", json!([])).await;
    mount_list(
        &server,
        "/api/structures/s1/hvac-units",
        json!([{
            "id": "h1",
            "type": "hvac-units",
            "attributes": { "name": "Split" },
            "relationships": {
                "room": { "data": { "type": "rooms", "id": "r1" } },
                "puck": { "data": null }
            }
        }]),
    )
    .await;
    mount_list(&server, "/api/structures/s1/schedules", json!([])).await;

    Mock::given(method("GET"))
        .and(path("/api/pucks/p1/current-reading"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "cr1", "type": "sensor-readings", "attributes": { "light": 40, "room-pressure": 101.3254 } }
        })))
        .mount(&server)
        .await;

    // Vent reading fails -- the vent must still be present, just without a reading.
    Mock::given(method("GET"))
        .and(path("/api/vents/v1/current-reading"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let data = client.get_flair_data().await.unwrap();

    assert_eq!(data.structures.len(), 1);
    let s = &data.structures[0];
    assert_eq!(s.structure.id, "s1");
    assert_eq!(s.pucks.len(), 1);
    assert_eq!(s.vents.len(), 1);
    assert_eq!(s.rooms.len(), 1);
    assert!(s.bridges.is_empty());
    assert_eq!(s.current_readings["p1"]["light"], 40);
    assert!(!s.current_readings.contains_key("v1"));
    assert!(matches!(
        s.hvac_units[0].relationships["room"].data,
        Some(RelationshipData::One(ref r)) if r.id == "r1"
    ));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/structures"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "errors": [{ "status": "503", "title": "Service Unavailable" }]
        })))
        .mount(&server)
        .await;

    let err = client.get_structures().await.unwrap_err();
    assert!(err.is_transient(), "expected transient, got {err:?}");
    assert!(!err.is_auth_error());
    assert!(
        matches!(err, Error::Api { status: 503, ref message } if message == "Service Unavailable")
    );
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/structures"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.get_structures().await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Validation tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_validate_without_structures() {
    let (server, client) = setup().await;
    mount_token(&server).await;
    mount_list(
        &server,
        "/api/users",
        json!([{ "id": "u1", "type": "users", "attributes": { "name": "Ada" } }]),
    )
    .await;
    mount_list(&server, "/api/structures", json!([])).await;

    let result = client.validate().await;
    assert!(matches!(result, Err(Error::NoStructures)), "got {result:?}");
}

#[tokio::test]
async fn test_validate_without_users() {
    let (server, client) = setup().await;
    mount_token(&server).await;
    mount_list(&server, "/api/users", json!([])).await;
    mount_list(&server, "/api/structures", json!([structure_json("s1")])).await;

    let result = client.validate().await;
    assert!(matches!(result, Err(Error::NoUsers)), "got {result:?}");
}

// ── Write tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_sends_jsonapi_patch() {
    let (server, client) = setup().await;
    mount_token(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/vents/v1"))
        .and(body_json(json!({
            "data": {
                "type": "vents",
                "id": "v1",
                "attributes": { "percent-open": 100 },
                "relationships": {}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let mut attributes = Map::new();
    attributes.insert("percent-open".into(), json!(100));
    client
        .update(ResourceKind::Vents, "v1", &attributes, &Map::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_rejected() {
    let (server, client) = setup().await;
    mount_token(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/rooms/r1"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{ "status": "422", "detail": "set-point-c out of range" }]
        })))
        .mount(&server)
        .await;

    let mut attributes = Map::new();
    attributes.insert("set-point-c".into(), json!(99.0));
    let err = client
        .update(ResourceKind::Rooms, "r1", &attributes, &Map::new())
        .await
        .unwrap_err();

    assert!(!err.is_transient());
    insta::assert_snapshot!(err.to_string(), @"Flair API error (HTTP 422): set-point-c out of range");
}
