use crate::auth::token::{clearing_cookie, session_cookie, TokenService};
use crate::error::{AppError, AuthError};
use crate::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

/// The request arrived over TLS if the forwarded-protocol header (behind a
/// proxy) or the connection scheme says so; governs the cookie's Secure flag.
fn request_is_secure(req: &HttpRequest) -> bool {
    req.connection_info().scheme() == "https"
}

pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", body.email);

    let user = state
        .users
        .verify_credentials(&body.email, &body.password)
        .await?
        .ok_or(AppError::AuthError(AuthError::InvalidCredentials))?;

    let token = state.tokens.issue(user.id, &user.email)?;
    let cookie = session_cookie(token.clone(), request_is_secure(&req), state.tokens.validity());

    info!("Login successful for email: {}", user.email);
    Ok(HttpResponse::Ok().cookie(cookie).json(AuthResponse { token }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

pub async fn register(
    req: HttpRequest,
    body: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for email: {}", body.email);

    let user = match state
        .users
        .create(&body.email, &body.password, body.display_name.as_deref())
        .await
    {
        Ok(user) => user,
        Err(e) => {
            error!("Registration failed for email: {}: {}", body.email, e);
            return Err(e);
        }
    };

    // Issue a session immediately so registration doubles as login.
    let token = state.tokens.issue(user.id, &user.email)?;
    let cookie = session_cookie(token.clone(), request_is_secure(&req), state.tokens.validity());

    info!("Registration successful for email: {}", user.email);
    Ok(HttpResponse::Created()
        .cookie(cookie)
        .json(AuthResponse { token }))
}

/// Logout clears the client-held cookie. Tokens are stateless, so there is
/// nothing to revoke server-side; the token dies at its expiry.
pub async fn logout(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok()
        .cookie(clearing_cookie(request_is_secure(&req)))
        .json(serde_json::json!({
            "message": "Successfully logged out"
        })))
}

/// CSRF issuance. Requires an already-valid session: with no session token
/// the failure is plain authentication-required, not a CSRF-specific error.
pub async fn csrf_token(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let session = TokenService::extract_from_request(&req).ok_or(AuthError::AuthRequired)?;
    state.tokens.verify(&session)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "csrfToken": state.csrf.derive(&session),
    })))
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
}

/// Downstream of the gate: trusts the identity headers injected after a
/// successful auth check, no re-verification.
pub async fn profile(req: HttpRequest) -> Result<HttpResponse, AppError> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };

    let id = header("x-user-id").ok_or(AuthError::AuthRequired)?;
    let email = header("x-user-email").ok_or(AuthError::AuthRequired)?;

    Ok(HttpResponse::Ok().json(ProfileResponse { id, email }))
}
