/// Router-level tests for the HTTP API
///
/// Each test builds a fresh in-memory application and drives it with
/// `oneshot` requests, so no listener or external service is needed.
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use quiz_server::{config::ServerConfig, context::AppContext, server::build_router};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let ctx = AppContext::new(ServerConfig::for_testing()).await.unwrap();
    build_router(ctx)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_profile_logout_flow() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "bob", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["username"], "bob");
    assert_eq!(body["user"]["role"], "student");
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "bob");
    assert_eq!(body["user"]["settings"]["theme"], "orange");
    assert_eq!(body["user"]["battle_stats"]["rating"], 1500);

    let (status, body) = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_logout_twice_succeeds() {
    let app = app().await;
    let token = login(&app, "student", "student123").await;

    for _ in 0..2 {
        let (status, body) = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    let (status, _) = send(&app, Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_is_generic() {
    let app = app().await;

    let (status, wrong_password) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "student", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["error"], "Invalid username or password");

    let (status, unknown_user) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user["error"], wrong_password["error"]);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = app().await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "secret1", "email": "alice@x.cz" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "another1", "email": "other@x.cz" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "ab", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "carol", "password": "secret1", "email": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_tables_match_question_lists() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/quiz/tables", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let tables = body["data"].as_array().unwrap();
    assert_eq!(tables.len(), 2);

    for table in tables {
        let name = table["name"].as_str().unwrap();
        let (status, questions) =
            send(&app, Method::GET, &format!("/quiz/questions/{}", name), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            questions["data"].as_array().unwrap().len() as u64,
            table["question_count"].as_u64().unwrap()
        );
    }
}

#[tokio::test]
async fn test_unknown_table_is_404() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/quiz/questions/does_not_exist",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_submit_answer() {
    let app = app().await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/quiz/submit-answer",
        None,
        Some(json!({ "question_id": 4, "answer": "B" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "student", "student123").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/quiz/submit-answer",
        Some(&token),
        Some(json!({ "question_id": 4, "answer": "b", "time_spent": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question_id"], 4);
    assert_eq!(body["data"]["answer"], "B");
    assert_eq!(body["data"]["is_correct"], true);
    assert_eq!(body["data"]["time_spent"], 9);

    let (status, _) = send(
        &app,
        Method::POST,
        "/quiz/submit-answer",
        Some(&token),
        Some(json!({ "question_id": 4, "answer": "Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_merge_and_avatar() {
    let app = app().await;
    let token = login(&app, "student", "student123").await;

    let (status, body) = send(&app, Method::GET, "/auth/settings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["theme"], "blue");
    assert_eq!(body["settings"]["auto_next"], true);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/auth/settings",
        Some(&token),
        Some(json!({ "settings": { "theme": "dark" }, "avatar": "🦊" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Settings updated successfully");
    assert_eq!(body["settings"]["theme"], "dark");
    assert_eq!(body["settings"]["auto_next"], true);
    assert_eq!(body["user"]["avatar"], "🦊");

    let (_, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(body["user"]["settings"]["theme"], "dark");
    assert_eq!(body["user"]["settings"]["notifications"], true);
    assert_eq!(body["user"]["avatar"], "🦊");
}

#[tokio::test]
async fn test_settings_errors() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/auth/settings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let token = login(&app, "student", "student123").await;
    let (status, body) = send(
        &app,
        Method::PUT,
        "/auth/settings",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No settings data provided");

    let (status, _) = send(&app, Method::DELETE, "/auth/settings", Some(&token), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_leaderboard() {
    let app = app().await;

    let (status, _) = send(&app, Method::GET, "/quiz/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "student", "student123").await;
    let (status, body) = send(&app, Method::GET, "/quiz/leaderboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["period"], "all");
    assert_eq!(body["data"]["leaderboard"][0]["username"], "admin");
    assert_eq!(body["data"]["leaderboard"][0]["rank"], 1);
    assert_eq!(body["data"]["current_user_rank"], 2);
    assert_eq!(body["data"]["total_players"], 2);

    let (status, body) = send(
        &app,
        Method::GET,
        "/quiz/leaderboard?period=week",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["period"], "week");
}

#[tokio::test]
async fn test_admin_requires_admin_role() {
    let app = app().await;

    let (status, _) = send(&app, Method::GET, "/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let student = login(&app, "student", "student123").await;
    let (status, body) = send(&app, Method::GET, "/admin/users", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let admin = login(&app, "admin", "admin123").await;
    let (status, body) = send(&app, Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
}

#[tokio::test]
async fn test_admin_statistics_and_system() {
    let app = app().await;
    let admin = login(&app, "admin", "admin123").await;

    let (status, body) = send(&app, Method::GET, "/admin/statistics", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"]["total"], 2);
    assert_eq!(body["data"]["quiz"]["tables"], 2);
    assert_eq!(body["data"]["quiz"]["total_questions"], 6);
    assert!(body["timestamp"].is_string());

    let (status, body) = send(&app, Method::GET, "/admin/system", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["system"]["status"], "healthy");
    assert_eq!(body["system"]["storage_backend"], "memory");
}

#[tokio::test]
async fn test_admin_deactivates_user() {
    let app = app().await;
    let admin = login(&app, "admin", "admin123").await;
    let student = login(&app, "student", "student123").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/admin/users/2",
        Some(&admin),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = send(&app, Method::GET, "/auth/profile", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "student", "password": "student123" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is disabled");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/admin/users/1",
        Some(&admin),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/auth/login", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn test_unknown_path_is_404_envelope() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_options_returns_empty_200_with_cors() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/auth/login")
        .header(header::ORIGIN, "http://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let allowed = response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(allowed.contains("authorization"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_cors_header_on_regular_response() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
    assert!(body["version"].is_string());

    let (status, _) = send(&app, Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_register_rate_limit() {
    let mut config = ServerConfig::for_testing();
    config.rate_limit.enabled = true;
    config.rate_limit.register_per_minute = 1;
    let app = build_router(AppContext::new(config).await.unwrap());

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "first", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "second", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_json_backend_persists_across_restarts() {
    use quiz_server::config::StorageBackendConfig;

    let dir = tempfile::tempdir().unwrap();
    let config = || {
        let mut config = ServerConfig::for_testing();
        config.storage.backend = StorageBackendConfig::Json {
            data_directory: dir.path().to_path_buf(),
            github: None,
        };
        config
    };

    let first = build_router(AppContext::new(config()).await.unwrap());
    let (status, _) = send(
        &first,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "dave", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login(&first, "dave", "secret1").await;

    let second = build_router(AppContext::new(config()).await.unwrap());
    let (status, body) = send(&second, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "dave");
}
