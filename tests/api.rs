use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use yplanning_api::{config::Config, db::Store, routes, AppState};

fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "access-secret".into(),
        jwt_refresh_secret: "refresh-secret".into(),
        jwt_expiry_seconds: 900,
        jwt_refresh_expiry_days: 7,
        bcrypt_cost: 4,
        host: "127.0.0.1".into(),
        port: 0,
    }
}

fn app() -> Router {
    routes::router(AppState {
        store: Store::in_memory(),
        config: Arc::new(test_config()),
    })
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, email: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "email": email, "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

/// Register a user and return `(access_token, user_id)`.
async fn signed_in(app: &Router, username: &str, email: &str) -> (String, i64) {
    let tokens = register(app, username, email).await;
    let token = tokens["access_token"].as_str().unwrap().to_string();
    let (status, user) = call(
        app,
        Method::GET,
        &format!("/api/users/lookup?username={username}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (token, user["id"].as_i64().unwrap())
}

#[tokio::test]
async fn health_reports_memory_store() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["db"], "memory");
}

#[tokio::test]
async fn register_login_and_query_a_window() {
    let app = app();
    register(&app, "alice", "a@x.com").await;

    let (status, tokens) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "bearer");
    let token = tokens["access_token"].as_str().unwrap();

    let (_, user) = call(
        &app,
        Method::GET,
        "/api/users/lookup?email=a@x.com",
        Some(token),
        None,
    )
    .await;
    let user_id = user["id"].as_i64().unwrap();
    assert!(user.get("password_hash").is_none());

    let (status, date) = call(
        &app,
        Method::POST,
        "/api/date",
        Some(token),
        Some(json!({
            "title": "standup",
            "begin_time": "2024-09-02T09:00:00Z",
            "end_time": "2024-09-02T09:30:00Z",
            "user_id": user_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{date}");

    let (status, hits) = call(
        &app,
        Method::GET,
        &format!(
            "/api/date/range?begin=2024-09-02T09:00:00Z&end=2024-09-02T09:30:00Z&user_id={user_id}"
        ),
        Some(token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], date["id"]);

    // One minute short of the end: the date is no longer contained.
    let (_, hits) = call(
        &app,
        Method::GET,
        &format!(
            "/api/date/range?begin=2024-09-02T09:00:00Z&end=2024-09-02T09:29:00Z&user_id={user_id}"
        ),
        Some(token),
        None,
    )
    .await;
    assert!(hits.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn login_by_username_and_wrong_password() {
    let app = app();
    register(&app, "alice", "a@x.com").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn duplicate_email_or_username_conflicts() {
    let app = app();
    register(&app, "alice", "a@x.com").await;

    for (username, email) in [("bob", "a@x.com"), ("alice", "b@x.com")] {
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": username, "email": email, "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{username} {email}: {body}");
    }
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/date", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::GET, "/api/date", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_issues_new_tokens() {
    let app = app();
    let tokens = register(&app, "alice", "a@x.com").await;

    let (status, fresh) = call(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": tokens["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = fresh["access_token"].as_str().unwrap();
    let (status, _) = call(&app, Method::GET, "/api/users", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);

    // An access token is signed with the other secret.
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": tokens["access_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_positive_path_ids_are_rejected() {
    let app = app();
    let (token, _) = signed_in(&app, "alice", "a@x.com").await;
    let (status, _) = call(&app, Method::GET, "/api/date/0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, Method::GET, "/api/date/42", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_color_clears_references() {
    let app = app();
    let (token, user_id) = signed_in(&app, "alice", "a@x.com").await;

    let (status, color) = call(
        &app,
        Method::POST,
        "/api/color",
        Some(&token),
        Some(json!({ "hex_code": "FF0000", "name": "red" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(color["hex_code"], "#ff0000");
    let color_id = color["id"].as_i64().unwrap();

    let (status, found) = call(
        &app,
        Method::GET,
        "/api/color/hexcode?hex_code=%23FF0000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], color_id);

    let (_, date) = call(
        &app,
        Method::POST,
        "/api/date",
        Some(&token),
        Some(json!({
            "title": "lunch",
            "begin_time": "2024-09-02T12:00:00Z",
            "end_time": "2024-09-02T13:00:00Z",
            "user_id": user_id,
            "color_id": color_id,
        })),
    )
    .await;
    assert_eq!(date["color_id"], color_id);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/color/{color_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, date) = call(
        &app,
        Method::GET,
        &format!("/api/date/{}", date["id"]),
        Some(&token),
        None,
    )
    .await;
    assert!(date["color_id"].is_null());
}

#[tokio::test]
async fn deleting_a_user_removes_their_data() {
    let app = app();
    let (token, _) = signed_in(&app, "alice", "a@x.com").await;
    let (_, bob_id) = signed_in(&app, "bob", "b@x.com").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/date",
        Some(&token),
        Some(json!({
            "title": "dentist",
            "begin_time": "2024-09-03T08:00:00Z",
            "end_time": "2024-09-03T09:00:00Z",
            "user_id": bob_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/availability",
        Some(&token),
        Some(json!({
            "begin_time": "2024-09-03T10:00:00Z",
            "end_time": "2024-09-03T18:00:00Z",
            "user_id": bob_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/users/{bob_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/users/{bob_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, dates) = call(
        &app,
        Method::GET,
        &format!("/api/date/user/{bob_id}"),
        Some(&token),
        None,
    )
    .await;
    assert!(dates.as_array().unwrap().is_empty());

    let (_, slots) = call(
        &app,
        Method::GET,
        &format!("/api/availability/owner/{bob_id}"),
        Some(&token),
        None,
    )
    .await;
    assert!(slots.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn inverted_availability_is_a_bad_request() {
    let app = app();
    let (token, user_id) = signed_in(&app, "alice", "a@x.com").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/availability",
        Some(&token),
        Some(json!({
            "begin_time": "2024-09-03T18:00:00Z",
            "end_time": "2024-09-03T10:00:00Z",
            "user_id": user_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn group_membership_lifecycle() {
    let app = app();
    let (token, alice_id) = signed_in(&app, "alice", "a@x.com").await;
    let (_, bob_id) = signed_in(&app, "bob", "b@x.com").await;

    let (status, group) = call(
        &app,
        Method::POST,
        "/api/groups",
        Some(&token),
        Some(json!({ "name": "team", "creator_id": alice_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/groups/{group_id}/members"),
        Some(&token),
        Some(json!({ "user_id": bob_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/groups/{group_id}/members"),
        Some(&token),
        Some(json!({ "user_id": bob_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, members) = call(
        &app,
        Method::GET,
        &format!("/api/groups/{group_id}/members"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(members.as_array().unwrap().len(), 1);

    let (_, created) = call(
        &app,
        Method::GET,
        &format!("/api/groups/creator/{alice_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(created.as_array().unwrap().len(), 1);

    let (status, joined) = call(
        &app,
        Method::GET,
        &format!("/api/users/{bob_id}/groups"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let joined = joined.as_array().unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0]["group_id"], group_id);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/groups/{group_id}/members/{bob_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, joined) = call(
        &app,
        Method::GET,
        &format!("/api/users/{bob_id}/groups"),
        Some(&token),
        None,
    )
    .await;
    assert!(joined.as_array().unwrap().is_empty());

    let (status, _) = call(&app, Method::GET, "/api/users/999/groups", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Send `body` verbatim and return status, content type and JSON body.
async fn call_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: &'static str,
) -> (StatusCode, String, Value) {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let res = app
        .clone()
        .oneshot(req.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn malformed_input_is_reported_as_a_json_error() {
    let app = app();
    let (token, _) = signed_in(&app, "alice", "a@x.com").await;

    let cases = [
        (Method::POST, "/api/auth/register", None, "{not json"),
        (Method::GET, "/api/date/range?begin=nope&end=nope&user_id=1", Some(token.as_str()), ""),
        (Method::GET, "/api/date/abc", Some(token.as_str()), ""),
        (Method::PUT, "/api/groups/1/members/xyz", Some(token.as_str()), "{}"),
    ];
    for (method, uri, token, body) in cases {
        let (status, content_type, body) = call_raw(&app, method, uri, token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(content_type.starts_with("application/json"), "{uri}: {content_type}");
        assert!(body["error"].is_string(), "{uri}: {body}");
    }
}
