mod support;

use axum::http::{header, Method, StatusCode};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use support::{app_with, request, send, InMemoryDb};
use tower::ServiceExt;

/// Posts `body` and returns the status with the `session=...` pair from `Set-Cookie`.
async fn post_for_cookie(router: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, Option<String>) {
    let response = router
        .clone()
        .oneshot(request(Method::POST, uri, None, Some(body)))
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    (response.status(), cookie)
}

fn signup(email: &str, password: &str) -> serde_json::Value {
    json!({ "email": email, "password": password, "display_name": "Grace Hopper" })
}

#[tokio::test]
async fn signup_login_and_logout() {
    let db = Arc::new(InMemoryDb::default());
    let (router, _) = app_with(db.clone());

    let (status, cookie) =
        post_for_cookie(&router, "/auth/signup", signup(" Grace@Example.com ", "cobol1959")).await;
    assert_eq!(status, StatusCode::CREATED);
    let cookie = cookie.unwrap();
    assert!(cookie.starts_with("session="));
    assert_eq!(db.with(|inner| inner.users[0].0.email.clone()), "grace@example.com");

    let (status, _) = send(&router, request(Method::GET, "/bookmarks", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);

    let login = json!({ "email": "grace@example.com", "password": "fortran1957" });
    let (status, _) = post_for_cookie(&router, "/auth/login", login).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let login = json!({ "email": "GRACE@example.com", "password": "cobol1959" });
    let (status, second) = post_for_cookie(&router, "/auth/login", login).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second.unwrap(), cookie);

    let (status, _) = send(&router, request(Method::POST, "/auth/logout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, request(Method::GET, "/bookmarks", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let (router, _) = app_with(Arc::new(InMemoryDb::default()));
    let (status, _) = post_for_cookie(&router, "/auth/signup", signup("ada@example.com", "engine1843")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, cookie) =
        post_for_cookie(&router, "/auth/signup", signup("ada@example.com", "engine1843")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(cookie.is_none());
}

#[tokio::test]
async fn invalid_signup_reports_each_field() {
    let db = Arc::new(InMemoryDb::default());
    let (router, _) = app_with(db.clone());
    let body = json!({ "email": "nope", "password": "short", "display_name": "  " });
    let (status, body) = send(&router, request(Method::POST, "/auth/signup", None, Some(body))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    for field in ["email", "password", "display_name"] {
        assert!(body["errors"][field].is_string(), "missing error for {field}");
    }
    assert!(db.with(|inner| inner.users.is_empty()));
}

#[tokio::test]
async fn contact_form_is_validated_then_stored() {
    let db = Arc::new(InMemoryDb::default());
    let (router, _) = app_with(db.clone());

    let short = json!({ "name": "Ada", "email": "ada@example.com", "subject": "Hi", "body": "Too short" });
    let (status, body) = send(&router, request(Method::POST, "/contact", None, Some(short))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["body"].is_string());

    let ok = json!({
        "name": "Ada",
        "email": "ada@example.com",
        "subject": "Lathe clip",
        "body": "The chuck clip stops halfway through.",
    });
    let (status, _) = send(&router, request(Method::POST, "/contact", None, Some(ok))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(db.with(|inner| inner.contacts.len()), 1);
}
