use actix_web::{test, web, App};
use authgate_server::auth::handlers::{csrf_token, login, logout, register};
use authgate_server::auth::AUTH_COOKIE;
use authgate_server::config::{AuthConfig, CorsConfig, RateLimitSettings, ServerConfig};
use authgate_server::{AppState, InMemoryDirectory, Settings};
use serde_json::json;
use std::sync::Arc;

fn test_settings() -> Settings {
    Settings {
        environment: "test".into(),
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            workers: 1,
        },
        auth: AuthConfig {
            secret: "test_secret".into(),
            token_validity_days: 7,
        },
        rate_limit: RateLimitSettings {
            max_identities_per_category: 500,
        },
        cors: CorsConfig {
            enabled: false,
            allow_any_origin: false,
            max_age: 3600,
        },
    }
}

fn test_state() -> AppState {
    AppState::new(test_settings(), Arc::new(InMemoryDirectory::new()))
}

#[actix_web::test]
async fn test_register_and_login() {
    let state = test_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/api/login", web::post().to(login))
            .route("/api/register", web::post().to(register)),
    )
    .await;

    let register_response = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "email": "test@example.com",
            "password": "password123",
            "display_name": "Test User"
        }))
        .send_request(&app)
        .await;

    assert_eq!(register_response.status(), 201);
    let session_cookie = register_response
        .response()
        .cookies()
        .find(|c| c.name() == AUTH_COOKIE)
        .expect("registration should set the session cookie");
    assert_eq!(session_cookie.http_only(), Some(true));
    let register_body: serde_json::Value = test::read_body_json(register_response).await;
    assert!(register_body.get("token").is_some());

    let login_response = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({
            "email": "test@example.com",
            "password": "password123"
        }))
        .send_request(&app)
        .await;

    assert_eq!(login_response.status(), 200);
    let login_body: serde_json::Value = test::read_body_json(login_response).await;
    let token = login_body["token"].as_str().expect("token in login body");

    // The issued token verifies and carries the login identity.
    let claims = state.tokens.verify(token).unwrap();
    assert_eq!(claims.email, "test@example.com");
}

#[actix_web::test]
async fn test_invalid_login_is_generic_401() {
    let state = test_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/api/login", web::post().to(login))
            .route("/api/register", web::post().to(register)),
    )
    .await;

    test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "email": "test@example.com",
            "password": "password123"
        }))
        .send_request(&app)
        .await;

    // Wrong password and unknown account must be indistinguishable.
    for payload in [
        json!({ "email": "test@example.com", "password": "wrong-password" }),
        json!({ "email": "ghost@example.com", "password": "password123" }),
    ] {
        let response = test::TestRequest::post()
            .uri("/api/login")
            .set_json(payload)
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 401);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body, json!({ "error": "Invalid credentials" }));
    }
}

#[actix_web::test]
async fn test_csrf_issuance_requires_session() {
    let state = test_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/api/register", web::post().to(register))
            .route("/api/csrf", web::get().to(csrf_token)),
    )
    .await;

    // No session: authentication failure, not a CSRF-specific error.
    let response = test::TestRequest::get()
        .uri("/api/csrf")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);

    let register_response = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "email": "test@example.com",
            "password": "password123"
        }))
        .send_request(&app)
        .await;
    let cookie = register_response
        .response()
        .cookies()
        .find(|c| c.name() == AUTH_COOKIE)
        .unwrap()
        .into_owned();
    let session_token = cookie.value().to_string();

    let first = test::TestRequest::get()
        .uri("/api/csrf")
        .cookie(cookie.clone())
        .send_request(&app)
        .await;
    assert_eq!(first.status(), 200);
    let first_body: serde_json::Value = test::read_body_json(first).await;
    let csrf = first_body["csrfToken"].as_str().expect("csrfToken in body");

    // Derivation is deterministic per session, and the issued value passes
    // server-side validation.
    let second = test::TestRequest::get()
        .uri("/api/csrf")
        .cookie(cookie)
        .send_request(&app)
        .await;
    let second_body: serde_json::Value = test::read_body_json(second).await;
    assert_eq!(second_body["csrfToken"].as_str(), Some(csrf));
    assert!(state.csrf.validate(&session_token, csrf));
    assert!(!state.csrf.validate(&session_token, "forged-value"));
}

#[actix_web::test]
async fn test_logout_clears_cookie() {
    let state = test_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .route("/api/logout", web::post().to(logout)),
    )
    .await;

    let response = test::TestRequest::post()
        .uri("/api/logout")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let cookie = response
        .response()
        .cookies()
        .find(|c| c.name() == AUTH_COOKIE)
        .expect("logout should send a clearing cookie");
    assert_eq!(cookie.value(), "");
    assert_eq!(
        cookie.max_age(),
        Some(actix_web::cookie::time::Duration::ZERO)
    );
}
