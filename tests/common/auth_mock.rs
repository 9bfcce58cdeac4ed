#![allow(dead_code)]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "admin123";
pub const VALID_REFRESH: &str = "refresh-valid";
pub const FRESH_ACCESS: &str = "access-fresh";
pub const LOGIN_ACCESS: &str = "access-login";

/// How long the refresh endpoint takes to answer, so concurrent callers
/// pile up behind the first refresh.
pub const REFRESH_DELAY: Duration = Duration::from_millis(300);

/// Base URL for API calls against `server`.
pub fn api_base(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

fn user_json() -> serde_json::Value {
    json!({
        "id": 1,
        "email": EMAIL,
        "name": "Admin User",
        "role": "admin",
        "avatar": "https://ui-avatars.com/api/?name=Admin+User"
    })
}

fn stats_json() -> serde_json::Value {
    json!({
        "totalLogins": 87,
        "accountAge": 210,
        "lastLogin": "2024-05-01T10:00:00.000Z",
        "activeSessionsCount": 2
    })
}

fn dashboard_json() -> serde_json::Value {
    json!({
        "message": "Welcome to your dashboard!",
        "user": {"id": 1, "email": EMAIL, "name": "Admin User", "role": "admin"},
        "data": {"notifications": 3, "messages": 7, "tasks": 2, "projects": 1},
        "recentActivity": [
            {"id": 1, "action": "Logged in", "timestamp": "2024-05-01T10:00:00.000Z"}
        ]
    })
}

fn message(text: &str) -> serde_json::Value {
    json!({ "message": text })
}

/// Start a mock login server mirroring the login/refresh/logout contract.
///
/// Protected routes accept `Bearer access-fresh` and `Bearer access-login`
/// and answer 403 for anything else, 401 with no token at all. Refresh
/// accepts only `refresh-valid`.
pub async fn start_auth_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({ "email": EMAIL, "password": PASSWORD })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": LOGIN_ACCESS,
            "refreshToken": VALID_REFRESH,
            "user": user_json(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(message("Invalid email or password")),
        )
        .with_priority(10)
        .mount(&server)
        .await;

    mount_refresh(&server, json!({ "accessToken": FRESH_ACCESS })).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message("Logged out successfully")))
        .mount(&server)
        .await;

    for (route, body) in [
        ("/api/auth/me", user_json()),
        ("/api/user/stats", stats_json()),
        ("/api/dashboard", dashboard_json()),
    ] {
        mount_protected(&server, route, body).await;
    }

    server
}

/// Same as [`start_auth_server`] but the refresh endpoint also rotates the
/// refresh token.
pub async fn start_rotating_auth_server(rotated: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_refresh(
        &server,
        json!({ "accessToken": FRESH_ACCESS, "refreshToken": rotated }),
    )
    .await;
    mount_protected(&server, "/api/user/stats", stats_json()).await;
    server
}

async fn mount_refresh(server: &MockServer, success: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_partial_json(json!({ "refreshToken": VALID_REFRESH })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success)
                .set_delay(REFRESH_DELAY),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(message("Invalid or expired refresh token"))
                .set_delay(REFRESH_DELAY),
        )
        .with_priority(10)
        .mount(server)
        .await;
}

async fn mount_protected(server: &MockServer, route: &str, body: serde_json::Value) {
    for token in [FRESH_ACCESS, LOGIN_ACCESS] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(route))
        .and(header_exists("authorization"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(message("Invalid or expired access token")),
        )
        .with_priority(9)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(401).set_body_json(message("Access token required")))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Number of requests the server received on `route`.
pub async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}
