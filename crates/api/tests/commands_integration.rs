//! Integration tests for the outbound command endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    get_request_with_auth, json_request_with_auth, parse_response_body, test_config, token_for,
    TestApp, DEVICE_ID,
};
use domain::services::{DispatchError, MockCommandDispatcher};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

const COMMANDS_URI: &str = "/api/v1/tracking/commands";

fn actions_uri(device_id: &str) -> String {
    format!("/api/v1/tracking/devices/{}/actions", device_id)
}

#[tokio::test]
async fn test_send_command_success() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    app.device(DEVICE_ID, owner).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            COMMANDS_URI,
            json!({ "deviceId": DEVICE_ID, "command": { "type": "RebootDevice" } }),
            &token_for(owner, "fisherman"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"]["success"], true);

    let sent = app.dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].device_id.as_str(), DEVICE_ID);
    assert_eq!(sent[0].command, json!({ "type": "RebootDevice" }));
    assert!(!sent[0].cache_when_offline);
}

#[tokio::test]
async fn test_send_command_requires_token() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri(COMMANDS_URI)
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_command_validation_never_dispatches() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    app.device(DEVICE_ID, owner).await;
    let token = token_for(owner, "fisherman");

    let cases = [
        json!({ "command": { "type": "RebootDevice" } }),
        json!({ "deviceId": DEVICE_ID }),
        json!({ "deviceId": "12345", "command": { "type": "RebootDevice" } }),
        json!({ "deviceId": DEVICE_ID, "command": "RebootDevice" }),
        json!({ "deviceId": DEVICE_ID, "command": { "interval": 30 } }),
        json!({
            "deviceId": DEVICE_ID,
            "command": { "type": "Elock", "elockCommand": { "cmdType": "SEAL", "lockId": "L1" } }
        }),
    ];

    for body in cases {
        let response = app
            .router
            .clone()
            .oneshot(json_request_with_auth(Method::POST, COMMANDS_URI, body.clone(), &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }

    assert!(app.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_send_command_unknown_device() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            COMMANDS_URI,
            json!({ "deviceId": DEVICE_ID, "command": { "type": "RebootDevice" } }),
            &token_for(Uuid::new_v4(), "admin"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_command_ownership() {
    let app = TestApp::new();
    app.device(DEVICE_ID, Uuid::new_v4()).await;
    let body = json!({ "deviceId": DEVICE_ID, "command": { "type": "SingleReportLocation" } });

    let stranger = app
        .router
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            COMMANDS_URI,
            body.clone(),
            &token_for(Uuid::new_v4(), "fisherman"),
        ))
        .await
        .unwrap();
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

    let organization = app
        .router
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            COMMANDS_URI,
            body,
            &token_for(Uuid::new_v4(), "organization"),
        ))
        .await
        .unwrap();
    assert_eq!(organization.status(), StatusCode::OK);
    assert_eq!(app.dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn test_vendor_failures_are_categorized() {
    let cases = [
        (DispatchError::Authentication, StatusCode::BAD_GATEWAY, "vendor_authentication"),
        (DispatchError::DeviceForbidden, StatusCode::BAD_GATEWAY, "vendor_device_forbidden"),
        (
            DispatchError::Vendor { status: 503, body: "down".into() },
            StatusCode::BAD_GATEWAY,
            "vendor_error",
        ),
        (DispatchError::Timeout, StatusCode::GATEWAY_TIMEOUT, "vendor_timeout"),
    ];

    for (error, status, code) in cases {
        let app = TestApp::with_dispatcher(MockCommandDispatcher::failing(error));
        let owner = Uuid::new_v4();
        app.device(DEVICE_ID, owner).await;

        let response = app
            .router
            .clone()
            .oneshot(json_request_with_auth(
                Method::POST,
                COMMANDS_URI,
                json!({ "deviceId": DEVICE_ID, "command": { "type": "RebootDevice" } }),
                &token_for(owner, "fisherman"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), status);
        let body = parse_response_body(response).await;
        assert_eq!(body["error"], code);
    }
}

#[tokio::test]
async fn test_seal_action_builds_lock_command() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    app.device(DEVICE_ID, owner).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            &actions_uri(DEVICE_ID),
            json!({ "action": "seal", "lockId": "LOCK-1", "key": "123456", "cacheWhenOffline": true }),
            &token_for(owner, "fisherman"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let sent = app.dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].cache_when_offline);

    let command = &sent[0].command;
    assert_eq!(command["type"], "Elock");
    let elock = &command["elockCommand"];
    assert_eq!(elock["cmdType"], "SEAL");
    assert_eq!(elock["lockId"], "LOCK-1");
    assert_eq!(elock["gate"], 8);
    assert_eq!(elock["lineCode"], 1234);
    assert_eq!(elock["validTime"], 0);
    assert_eq!(elock["businessDataSeqNo"].as_str().unwrap().len(), 4);
}

#[tokio::test]
async fn test_interval_action_out_of_range() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    app.device(DEVICE_ID, owner).await;
    let token = token_for(owner, "fisherman");

    for body in [
        json!({ "action": "set_location_interval", "interval": 5 }),
        json!({ "action": "set_heartbeat_interval", "interval": 0 }),
        json!({ "action": "seal", "lockId": "L1", "key": "123456", "gate": 0 }),
        json!({ "action": "self_destruct" }),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(json_request_with_auth(
                Method::POST,
                &actions_uri(DEVICE_ID),
                body.clone(),
                &token,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }

    assert!(app.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_parameter_action_wire_format() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    app.device(DEVICE_ID, owner).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            &actions_uri(DEVICE_ID),
            json!({ "action": "set_heartbeat_interval", "interval": 300 }),
            &token_for(owner, "fisherman"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = app.dispatcher.sent();
    assert_eq!(
        sent[0].command,
        json!({
            "type": "ParameterSettings",
            "paramSettingList": [{ "commandId": "00000001", "heartbeatInterval": 300 }]
        })
    );
}

#[tokio::test]
async fn test_action_rejects_mistyped_cache_flag() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    app.device(DEVICE_ID, owner).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            &actions_uri(DEVICE_ID),
            json!({ "action": "request_location", "cacheWhenOffline": "true" }),
            &token_for(owner, "fisherman"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(app.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_tracking_routes_rate_limited_per_user() {
    let mut config = test_config();
    config.security.rate_limit_per_minute = 1;
    let app = TestApp::with(config, MockCommandDispatcher::new());
    let owner = Uuid::new_v4();
    app.device(DEVICE_ID, owner).await;
    let token = token_for(owner, "fisherman");
    let uri = format!("/api/v1/tracking/devices/{}/status", DEVICE_ID);

    let first = app
        .router
        .clone()
        .oneshot(get_request_with_auth(&uri, &token))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .router
        .clone()
        .oneshot(get_request_with_auth(&uri, &token))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().get("retry-after").is_some());
    let body = parse_response_body(second).await;
    assert_eq!(body["error"], "rate_limited");

    let other = app
        .router
        .clone()
        .oneshot(get_request_with_auth(&uri, &token_for(Uuid::new_v4(), "admin")))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}
