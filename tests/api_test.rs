//! HTTP surface tests driven through the router without a socket

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use slotvault::{
    api::{create_app, AppState},
    games::{Combination, ScriptedSource},
    SlotVault, SlotVaultConfig, SlotVaultFactory,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApi {
    _dir: TempDir,
    app: SlotVault,
    router: Router,
}

fn test_api(script: &[[u8; 3]]) -> TestApi {
    let dir = TempDir::new().unwrap();
    let config = SlotVaultConfig::testing(dir.path());
    let source = Arc::new(ScriptedSource::new(script.iter().copied().map(Combination::new)));
    let app = SlotVaultFactory::create_with_source(&config, source).unwrap();
    let router = create_app(Arc::new(AppState::new(&app, None)), &config.server);
    TestApi {
        _dir: dir,
        app,
        router,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, request_id, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn register_and_login(router: &Router, login: &str, balance: i64) -> String {
    let (status, _, _) = send(
        router,
        post_json(
            "/api/register",
            None,
            json!({"login": login, "password": "secret", "first_name": "Ann", "last_name": "Lee", "balance": balance}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(
        router,
        post_json("/api/login", None, json!({"login": login, "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_request_id() {
    let api = test_api(&[]);

    let (status, request_id, body) = send(&api.router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Running");
    assert!(request_id.is_some());

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let (_, request_id, _) = send(&api.router, request).await;
    assert_eq!(request_id.as_deref(), Some("trace-me"));
}

#[tokio::test]
async fn test_register_returns_profile_without_hash() {
    let api = test_api(&[]);

    let (status, _, body) = send(
        &api.router,
        post_json("/api/register", None, json!({"login": "ann", "password": "secret", "balance": 250})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["login"], "ann");
    assert_eq!(body["balance"], 250);
    assert!(body.get("password_hash").is_none());

    let (status, _, body) = send(
        &api.router,
        post_json("/api/register", None, json!({"login": "ann", "password": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let api = test_api(&[]);
    register_and_login(&api.router, "bea", 0).await;

    let (status, _, body) = send(
        &api.router,
        post_json("/api/login", None, json!({"login": "bea", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "invalid login or password");
}

#[tokio::test]
async fn test_profile_requires_token() {
    let api = test_api(&[]);
    let token = register_and_login(&api.router, "cal", 75).await;

    let (status, _, body) = send(&api.router, get("/api/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["request_id"].is_string());

    let (status, _, _) = send(&api.router, get("/api/profile", Some("Bearer not-a-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = format!("Bearer {}", token);
    let (status, _, body) = send(&api.router, get("/api/profile", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login"], "cal");
    assert_eq!(body["balance"], 75);

    let (status, _, body) = send(&api.router, get("/api/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login"], "cal");
}

#[tokio::test]
async fn test_deposit_and_withdraw() {
    let api = test_api(&[]);
    let token = register_and_login(&api.router, "dan", 40).await;

    let (status, _, body) = send(
        &api.router,
        post_json("/api/wallet/deposit", Some(&token), json!({"amount": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 100);

    let (status, _, body) = send(
        &api.router,
        post_json("/api/wallet/withdraw", Some(&token), json!({"amount": 130})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("insufficient funds"));

    let (status, _, body) = send(
        &api.router,
        post_json("/api/wallet/withdraw", Some(&token), json!({"amount": -5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let user = api.app.wallet.get_user_by_login("dan").await.unwrap();
    assert_eq!(user.balance, 100);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let api = test_api(&[]);
    let token = register_and_login(&api.router, "eve", 10).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/slot/spin")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{bet_amount: ten"))
        .unwrap();
    let (status, request_id, body) = send(&api.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "failed to parse request payload");
    assert_eq!(body["request_id"].as_str(), request_id.as_deref());
}

#[tokio::test]
async fn test_spin_and_history() {
    let api = test_api(&[[5, 6, 7], [3, 3, 3]]);
    let token = register_and_login(&api.router, "fay", 1000).await;

    let (status, _, body) = send(
        &api.router,
        post_json("/api/slot/spin", Some(&token), json!({"bet_amount": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["balance"], 900);
    assert_eq!(body["result"], "Lose");
    assert_eq!(body["combination"], "5,6,7");

    let (status, _, body) = send(
        &api.router,
        post_json("/api/slot/spin", Some(&token), json!({"bet_amount": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["balance"], 1400);
    assert_eq!(body["result"], "SuperWin");

    let bearer = format!("Bearer {}", token);
    let (status, _, body) = send(&api.router, get("/api/slot/history", Some(&bearer))).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["spin_result"], "SuperWin");
    assert_eq!(results[0]["win_amount"], 500);
    assert_eq!(results[1]["spin_result"], "Lose");
    assert_eq!(results[1]["win_amount"], -100);

    let (_, _, body) = send(&api.router, get("/api/slot/history?limit=1&offset=1", Some(&bearer))).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["spin_result"], "Lose");

    let (status, _, body) = send(
        &api.router,
        get("/api/slot/history?limit=abc&offset=-4", Some(&bearer)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_spin_leaves_balance() {
    let api = test_api(&[[1, 1, 1]]);
    let token = register_and_login(&api.router, "gus", 40).await;

    for bet in [json!({"bet_amount": 50}), json!({"bet_amount": 0})] {
        let (status, _, _) = send(&api.router, post_json("/api/slot/spin", Some(&token), bet)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let user = api.app.wallet.get_user_by_login("gus").await.unwrap();
    assert_eq!(user.balance, 40);
}

#[tokio::test]
async fn test_metrics_count_spins() {
    let api = test_api(&[[2, 2, 9]]);
    let token = register_and_login(&api.router, "hal", 100).await;
    send(
        &api.router,
        post_json("/api/slot/spin", Some(&token), json!({"bet_amount": 10})),
    )
    .await;

    let response = api.router.clone().oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("slotvault_spins_total{outcome=\"Win\"} 1"));
    assert!(text.contains("slotvault_http_requests_total"));
}
