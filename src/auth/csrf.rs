use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derives anti-forgery tokens from session tokens.
///
/// A CSRF token is a pure function of (secret, session token): there is no
/// stored mapping, so the scheme works unchanged across stateless,
/// horizontally-scaled instances. A re-login replaces the session token and
/// implicitly invalidates every previously derived CSRF token. The secret is
/// injected at construction and never read from ambient environment here.
#[derive(Clone)]
pub struct CsrfService {
    secret: String,
}

impl CsrfService {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    /// Deterministic keyed derivation: base64url(HMAC-SHA-256(secret, token)).
    /// Stable for a given (secret, session token) pair; one flipped bit in
    /// the session token yields an unrelated output.
    pub fn derive(&self, session_token: &str) -> String {
        B64.encode(self.mac(session_token).finalize().into_bytes())
    }

    /// Re-derive the expected value and compare against the supplied one.
    /// The comparison is constant-time; a supplied value that does not even
    /// decode is a mismatch, not an error.
    pub fn validate(&self, session_token: &str, supplied: &str) -> bool {
        let supplied = match B64.decode(supplied) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        self.mac(session_token).verify_slice(&supplied).is_ok()
    }

    fn mac(&self, session_token: &str) -> HmacSha256 {
        // HMAC accepts keys of any length; new_from_slice cannot fail.
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(session_token.as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let csrf = CsrfService::new("test_secret");
        let a = csrf.derive("session-token");
        let b = csrf.derive("session-token");
        assert_eq!(a, b);
    }

    #[test]
    fn test_one_bit_change_alters_output() {
        let csrf = CsrfService::new("test_secret");
        assert_ne!(csrf.derive("session-token"), csrf.derive("session-tokeo"));
    }

    #[test]
    fn test_different_secrets_diverge() {
        let a = CsrfService::new("secret_a").derive("session-token");
        let b = CsrfService::new("secret_b").derive("session-token");
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_accepts_derived_value() {
        let csrf = CsrfService::new("test_secret");
        let token = "session-token";
        assert!(csrf.validate(token, &csrf.derive(token)));
    }

    #[test]
    fn test_validate_rejects_anything_else() {
        let csrf = CsrfService::new("test_secret");
        assert!(!csrf.validate("session-token", "bm90LXRoZS10b2tlbg"));
        assert!(!csrf.validate("session-token", ""));
        // Not even valid base64: a mismatch, never a panic or error.
        assert!(!csrf.validate("session-token", "!!!not base64!!!"));
    }

    #[test]
    fn test_validate_rejects_token_for_other_session() {
        let csrf = CsrfService::new("test_secret");
        let derived = csrf.derive("session-a");
        assert!(!csrf.validate("session-b", &derived));
    }
}
