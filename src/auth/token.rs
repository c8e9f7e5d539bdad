use crate::error::{AppError, AuthError};
use actix_web::cookie::{
    time::{Duration as CookieDuration, OffsetDateTime},
    Cookie, SameSite,
};
use actix_web::HttpRequest;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Name of the HTTP-only cookie carrying the session token.
pub const AUTH_COOKIE: &str = "auth-token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64, // Issued at (unix seconds)
    pub exp: i64, // Expiration time (unix seconds)
}

/// Issues and verifies self-contained session tokens.
///
/// Tokens are `base64url(claims json) . base64url(hmac-sha256 tag)`. The
/// construction uses only HMAC/SHA-256, so the same verification code runs
/// in the full server runtime and in constrained edge contexts with no
/// native crypto bindings. Verification is synchronous and side-effect-free.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    validity: Duration,
}

impl TokenService {
    pub fn new(secret: &str, validity: Duration) -> Self {
        Self {
            secret: secret.to_string(),
            validity,
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a signed token for the given subject. Expiry is computed here
    /// from the configured validity but enforced only at verification time.
    pub fn issue(&self, subject_id: Uuid, email: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };

        let payload = B64.encode(
            serde_json::to_vec(&claims)
                .map_err(|e| AppError::InternalError(format!("Token encoding failed: {}", e)))?,
        );
        let tag = self.sign(payload.as_bytes())?;

        Ok(format!("{}.{}", payload, B64.encode(tag)))
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Fails with `InvalidToken` on any structural or signature problem and
    /// `Expired` on a well-signed token past its expiry. The signature check
    /// runs before the payload is even parsed, and the comparison is
    /// constant-time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let (payload, tag) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let tag = B64.decode(tag).map_err(|_| AuthError::InvalidToken)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AuthError::InvalidToken)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).map_err(|_| AuthError::InvalidToken)?;

        let claims_bytes = B64.decode(payload).map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp < Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    /// Pull the session token out of the request cookie. Extraction only,
    /// no verification.
    pub fn extract_from_request(req: &HttpRequest) -> Option<String> {
        req.cookie(AUTH_COOKIE).map(|c| c.value().to_string())
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::InternalError(format!("Signing failed: {}", e)))?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Session cookie for an issued token: HTTP-only, SameSite=Lax, `Secure`
/// when the request arrived over TLS.
pub fn session_cookie(token: String, secure: bool, validity: Duration) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::seconds(validity.num_seconds()))
        .finish()
}

/// Clearing cookie for logout: immediate Max-Age=0 plus a past Expires so
/// older user agents drop the client-held copy too.
pub fn clearing_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .finish()
}
