use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC signing secret for session tokens and CSRF derivation.
    /// Must be set; an empty secret is a fatal startup condition.
    pub secret: String,
    pub token_validity_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitSettings {
    /// Cap on distinct tracked identities per category. When the cap is
    /// reached the least-recently-active entry is evicted.
    pub max_identities_per_category: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitSettings,
    pub cors: CorsConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default values
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("auth.secret", "")?
            .set_default("auth.token_validity_days", 7)?
            .set_default("rate_limit.max_identities_per_category", 500)?
            .set_default("cors.enabled", true)?
            .set_default("cors.allow_any_origin", false)?
            .set_default("cors.max_age", 3600)?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in settings from environment variables (with prefix "APP_")
            // E.g., `APP_AUTH__SECRET=...` sets `Settings.auth.secret`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// The process must refuse to serve traffic without a signing secret;
    /// every issued token would otherwise be forgeable.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.secret must be set (APP_AUTH__SECRET)".into(),
            ));
        }
        if self.auth.token_validity_days <= 0 {
            return Err(ConfigError::Message(
                "auth.token_validity_days must be positive".into(),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn new_for_test() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("environment", "test")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("auth.secret", "test_secret")?
            .set_default("auth.token_validity_days", 7)?
            .set_default("rate_limit.max_identities_per_category", 500)?
            .set_default("cors.enabled", false)?
            .set_default("cors.allow_any_origin", false)?
            .set_default("cors.max_age", 3600)?
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn cleanup_env() {
        env::remove_var("APP_SERVER__PORT");
        env::remove_var("APP_AUTH__SECRET");
        env::remove_var("APP_AUTH__TOKEN_VALIDITY_DAYS");
        env::remove_var("APP_RATE_LIMIT__MAX_IDENTITIES_PER_CATEGORY");
    }

    #[test]
    fn test_settings_defaults() {
        cleanup_env();
        let settings = Settings::new_for_test().expect("Failed to load settings");
        assert_eq!(settings.environment, "test");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.auth.token_validity_days, 7);
        assert_eq!(settings.rate_limit.max_identities_per_category, 500);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        cleanup_env();
        let result = Config::builder()
            .set_default("environment", "test")
            .unwrap()
            .set_default("server.host", "127.0.0.1")
            .unwrap()
            .set_default("server.port", 8080)
            .unwrap()
            .set_default("server.workers", 2)
            .unwrap()
            .set_default("auth.secret", "")
            .unwrap()
            .set_default("auth.token_validity_days", 7)
            .unwrap()
            .set_default("rate_limit.max_identities_per_category", 500)
            .unwrap()
            .set_default("cors.enabled", false)
            .unwrap()
            .set_default("cors.allow_any_origin", false)
            .unwrap()
            .set_default("cors.max_age", 3600)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap()
            .validate();

        assert!(result.is_err(), "Expected error for empty signing secret");
    }

    #[test]
    fn test_environment_override() {
        cleanup_env();
        env::set_var("APP_AUTH__SECRET", "override_secret");
        env::set_var("APP_AUTH__TOKEN_VALIDITY_DAYS", "14");

        let config = Config::builder()
            .set_default("environment", "test")
            .unwrap()
            .set_default("server.host", "127.0.0.1")
            .unwrap()
            .set_default("server.port", 8080)
            .unwrap()
            .set_default("server.workers", 2)
            .unwrap()
            .set_default("auth.secret", "test_secret")
            .unwrap()
            .set_default("auth.token_validity_days", 7)
            .unwrap()
            .set_default("rate_limit.max_identities_per_category", 500)
            .unwrap()
            .set_default("cors.enabled", false)
            .unwrap()
            .set_default("cors.allow_any_origin", false)
            .unwrap()
            .set_default("cors.max_age", 3600)
            .unwrap()
            // Add environment variables last to override defaults
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .expect("Failed to build config")
            .try_deserialize::<Settings>()
            .expect("Failed to deserialize settings");

        assert_eq!(config.auth.secret, "override_secret");
        assert_eq!(config.auth.token_validity_days, 14);

        cleanup_env();
    }
}
