//! End-to-end tests against the running front-end: probes, the login
//! state machine over real requests, the chat SSE endpoint, and the admin
//! guards.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use carebot_integration_tests::{TestApp, spawn_app};
use reqwest::{Client, StatusCode};
use serde_json::json;

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("failed to create HTTP client")
}

async fn sign_in(app: &TestApp, http: &Client, user_id: &str, password: &str) {
    let response = http
        .post(format!("{}/login", app.base_url))
        .form(&[("user_id", user_id), ("password", password)])
        .send()
        .await
        .expect("login request failed");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn probes_answer() {
    let app = spawn_app().await;
    let http = client();

    let health = http
        .get(format!("{}/health", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "OK");

    let ready = http
        .get(format!("{}/ready", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn landing_page_renders() {
    let app = spawn_app().await;
    let body = client()
        .get(&app.base_url)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Carebot"));
}

#[tokio::test]
async fn anonymous_chat_request_lands_on_the_login_form() {
    let app = spawn_app().await;
    let body = client()
        .get(format!("{}/chat", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Sign in"));
}

#[tokio::test]
async fn login_reaches_the_chat_page() {
    let app = spawn_app().await;
    let http = client();

    sign_in(&app, &http, "alice01", "alice-password-123").await;

    let body = http
        .get(format!("{}/chat", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("carebot-mini"));
    assert!(body.contains("Alice"));
}

#[tokio::test]
async fn failed_login_stays_on_the_form_with_a_notice() {
    let app = spawn_app().await;
    let http = client();

    let body = http
        .post(format!("{}/login", app.base_url))
        .form(&[("user_id", "alice01"), ("password", "wrong-password-000")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Sign in"));
    assert!(body.contains("Invalid user id or password"));
}

#[tokio::test]
async fn suspended_login_lands_on_the_suspended_page() {
    let app = spawn_app().await;
    let http = client();

    let body = http
        .post(format!("{}/login", app.base_url))
        .form(&[("user_id", "sam01"), ("password", "sam-password-12345")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Account suspended"));
}

#[tokio::test]
async fn signup_walks_the_state_machine() {
    let app = spawn_app().await;
    let http = client();
    let base = &app.base_url;

    // move to the signup view
    http.post(format!("{base}/login/view"))
        .form(&[("next", "signup")])
        .send()
        .await
        .unwrap();

    // confirm all three uniqueness locks
    for (field, value) in [
        ("user_id", "fresh01"),
        ("employee_no", "E7777"),
        ("email", "fresh@example.com"),
    ] {
        http.post(format!("{base}/signup/check"))
            .form(&[("field", field), ("value", value)])
            .send()
            .await
            .unwrap();
    }

    let form = [
        ("user_id", "fresh01"),
        ("employee_no", "E7777"),
        ("email", "fresh@example.com"),
        ("user_name", "Fresh"),
        ("password", "correct-horse-battery"),
        ("password_confirm", "correct-horse-battery"),
    ];

    // first submission bounces to the consent page
    let body = http
        .post(format!("{base}/signup"))
        .form(&form)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Consent"));
    assert_eq!(app.backend.counters.created_users(), 0);

    // acknowledge consent, then submit again
    http.post(format!("{base}/consent"))
        .form(&[("agree", "1")])
        .send()
        .await
        .unwrap();

    let body = http
        .post(format!("{base}/signup"))
        .form(&form)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(app.backend.counters.created_users(), 1);
    // back at the login form, with the approval notice
    assert!(body.contains("Sign in"));
    assert!(body.contains("approve"));
}

#[tokio::test]
async fn editing_a_checked_field_invalidates_its_lock() {
    let app = spawn_app().await;
    let http = client();
    let base = &app.base_url;

    http.post(format!("{base}/login/view"))
        .form(&[("next", "signup")])
        .send()
        .await
        .unwrap();

    // confirm the locks and acknowledge consent
    for (field, value) in [
        ("user_id", "fresh01"),
        ("employee_no", "E7777"),
        ("email", "fresh@example.com"),
    ] {
        http.post(format!("{base}/signup/check"))
            .form(&[("field", field), ("value", value)])
            .send()
            .await
            .unwrap();
    }
    let form = [
        ("user_id", "fresh01"),
        ("employee_no", "E7777"),
        ("email", "fresh@example.com"),
        ("user_name", "Fresh"),
        ("password", "correct-horse-battery"),
        ("password_confirm", "correct-horse-battery"),
    ];
    http.post(format!("{base}/signup"))
        .form(&form)
        .send()
        .await
        .unwrap();
    http.post(format!("{base}/consent"))
        .form(&[("agree", "1")])
        .send()
        .await
        .unwrap();

    // submit a different user id than the one that was confirmed
    let body = http
        .post(format!("{base}/signup"))
        .form(&[
            ("user_id", "taken01"),
            ("employee_no", "E7777"),
            ("email", "fresh@example.com"),
            ("user_name", "Fresh"),
            ("password", "correct-horse-battery"),
            ("password_confirm", "correct-horse-battery"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    // nothing was created and the user id lock is gone
    assert_eq!(app.backend.counters.created_users(), 0);
    assert!(body.contains("user id has not passed the uniqueness check"));
    assert!(!body.contains("confirmed: fresh01"));
    assert!(body.contains("confirmed: E7777"));
}

#[tokio::test]
async fn chat_stream_commits_on_clean_completion() {
    let app = spawn_app().await;
    let http = client();
    sign_in(&app, &http, "alice01", "alice-password-123").await;

    let response = http
        .post(format!("{}/api/chat/stream", app.base_url))
        .json(&json!({ "message": "What is the dosage?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.text().await.unwrap();
    assert!(body.contains("fragment"));
    assert!(body.contains("Hello "));
    assert!(body.contains("\"done\""));

    // the committed transcript shows up on the next page view
    let page = http
        .get(format!("{}/chat", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Hello there"));
}

#[tokio::test]
async fn interrupted_stream_commits_nothing() {
    let app = spawn_app().await;
    let http = client();
    sign_in(&app, &http, "alice01", "alice-password-123").await;

    let body = http
        .post(format!("{}/api/chat/stream", app.base_url))
        .json(&json!({ "message": "interrupt" }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("\"error\""));
    assert!(!body.contains("\"done\""));

    // no assistant message was committed
    let page = http
        .get(format!("{}/chat", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!page.contains("Par</div>"));
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let app = spawn_app().await;
    let http = client();
    sign_in(&app, &http, "alice01", "alice-password-123").await;

    let response = http
        .post(format!("{}/api/chat/stream", app.base_url))
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_page_requires_the_admin_flag() {
    let app = spawn_app().await;
    let http = client();
    sign_in(&app, &http, "alice01", "alice-password-123").await;

    // page request: redirected to the no-access page
    let body = http
        .get(format!("{}/admin", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("No access"));

    // API request: a plain 403
    let response = http
        .post(format!("{}/api/admin/action", app.base_url))
        .json(&json!({ "action": "approve", "selected": [1] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_grid_lists_the_snapshot() {
    let app = spawn_app().await;
    let http = client();
    sign_in(&app, &http, "root01", "root-password-1234").await;

    let body = http
        .get(format!("{}/admin", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("pending01"));
    assert!(body.contains("frozen01"));

    // the pending filter narrows the grid
    let filtered = http
        .get(format!("{}/admin?filter=pending", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(filtered.contains("pending01"));
    assert!(!filtered.contains("frozen01"));
}

#[tokio::test]
async fn admin_action_endpoint_reports_row_outcomes() {
    let app = spawn_app().await;
    let http = client();
    sign_in(&app, &http, "root01", "root-password-1234").await;

    let response = http
        .post(format!("{}/api/admin/action", app.base_url))
        .json(&json!({ "action": "approve", "selected": [1, 2] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report: serde_json::Value = response.json().await.unwrap();
    assert_eq!(report["done_count"], 1);
    let outcomes: Vec<&str> = report["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["outcome"].as_str().unwrap())
        .collect();
    assert!(outcomes.contains(&"done"));
    assert!(outcomes.contains(&"not allowed"));
}

#[tokio::test]
async fn logout_clears_the_session() {
    let app = spawn_app().await;
    let http = client();
    sign_in(&app, &http, "alice01", "alice-password-123").await;

    http.post(format!("{}/logout", app.base_url))
        .send()
        .await
        .unwrap();

    let body = http
        .get(format!("{}/chat", app.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Sign in"));
}
