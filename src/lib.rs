pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod users;

use actix_web::HttpResponse;
use std::sync::Arc;

pub use config::Settings;
pub use error::{AppError, AuthError};
pub type Result<T> = std::result::Result<T, AppError>;

pub use auth::{Category, Claims, CsrfService, RateLimiter, TokenService};
pub use gate::RequestGate;
pub use users::{InMemoryDirectory, UserDirectory, UserRecord};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub tokens: TokenService,
    pub csrf: CsrfService,
    pub limiter: Arc<RateLimiter>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(config: Settings, users: Arc<dyn UserDirectory>) -> Self {
        let tokens = TokenService::new(
            &config.auth.secret,
            chrono::Duration::days(config.auth.token_validity_days),
        );
        let csrf = CsrfService::new(&config.auth.secret);
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_identities_per_category,
        ));

        Self {
            config: Arc::new(config),
            tokens,
            csrf,
            limiter,
            users,
        }
    }

    /// Gate instance sharing this state's limiter and token service.
    pub fn gate(&self) -> RequestGate {
        RequestGate::new(self.tokens.clone(), self.limiter.clone())
    }
}
