use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

// Every per-request error is recovered here into a fixed-shape
// `{"error": string}` body; nothing propagates uncaught to the runtime.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.client_message(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::AuthRequired => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::Expired => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::CsrfMismatch => StatusCode::FORBIDDEN,
                AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    /// Client-facing message. Token failures are deliberately collapsed into
    /// one generic message so a caller cannot tell a bad signature from an
    /// expired token.
    pub fn client_message(&self) -> &str {
        match self {
            AppError::AuthError(e) => e.client_message(),
            AppError::ValidationError(_) => "Invalid request",
            _ => "Internal server error",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// No token was presented on a protected path.
    #[error("Authentication required")]
    AuthRequired,

    /// Malformed token or bad signature.
    #[error("Invalid token")]
    InvalidToken,

    /// Structurally valid token past its expiry.
    #[error("Token expired")]
    Expired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("CSRF token mismatch")]
    CsrfMismatch,

    #[error("Rate limit exceeded")]
    RateLimited,
}

impl AuthError {
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::AuthRequired | AuthError::InvalidToken | AuthError::Expired => {
                "Authentication required"
            }
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::CsrfMismatch => "Invalid CSRF token",
            AuthError::RateLimited => "Too many requests, try again later",
        }
    }
}
