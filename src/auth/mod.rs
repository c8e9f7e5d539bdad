//! Authentication core for the gateway.
//!
//! Token issuance/verification, CSRF derivation and per-category rate
//! limiting. Everything here is synchronous and free of I/O so it can run
//! on every request without a database round-trip.

mod csrf;
mod rate_limit;
mod token;

pub mod handlers;

pub use csrf::CsrfService;
pub use rate_limit::{Category, Clock, RateLimiter, SystemClock};
pub use token::{clearing_cookie, session_cookie, Claims, TokenService, AUTH_COOKIE};
