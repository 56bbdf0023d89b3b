use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_api_port")]
    pub port_api: Option<u16>,
    #[serde(default = "default_admin_port")]
    pub port_admin: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub file: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC key used to sign and verify session tokens.
    ///
    /// Prefer loading this via the `JWT_SECRET` environment variable.  This
    /// config field is the fallback for deployments that cannot inject env
    /// vars at runtime.
    ///
    /// **Minimum length:** 32 characters.
    /// The server reads this once at startup; rotating the secret requires a
    /// restart because a new key immediately invalidates every live session.
    pub jwt_secret: Option<String>,

    /// Issuer tag embedded in every claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_access_expiry")]
    pub access_expiry_minutes: u64,

    #[serde(default = "default_refresh_expiry")]
    pub refresh_expiry_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address for the public read API, e.g. `"127.0.0.1:8088"`
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port_api.unwrap_or(8088))
    }

    /// Full bind address for the admin API, e.g. `"127.0.0.1:8081"`
    pub fn admin_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port_admin.unwrap_or(8081))
    }
}

impl AuthConfig {
    /// Access-token lifetime in seconds — convenience for claim expiries and
    /// cookie `Expires` stamps.
    pub fn access_expiry_secs(&self) -> u64 {
        self.access_expiry_minutes * 60
    }

    /// Refresh-token lifetime in seconds.
    pub fn refresh_expiry_secs(&self) -> u64 {
        self.refresh_expiry_hours * 3600
    }

    /// Resolve the signing secret with `JWT_SECRET` env-var taking priority
    /// over the config file field.
    ///
    /// Returns `None` when neither source is set (the server startup code
    /// treats this as a hard error).
    pub fn resolved_jwt_secret(&self) -> Option<String> {
        std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.jwt_secret.clone())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_api_port() -> Option<u16> {
    Some(8088)
}

pub fn default_admin_port() -> Option<u16> {
    Some(8081)
}

pub fn default_max_connections() -> u32 {
    5
}

pub fn default_issuer() -> String {
    "blog".to_string()
}

pub fn default_access_expiry() -> u64 {
    5
}

pub fn default_refresh_expiry() -> u64 {
    24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_helpers_combine_bind_and_port() {
        let cfg = ServerConfig {
            bind: "0.0.0.0".to_string(),
            port_api: Some(9000),
            port_admin: None,
        };
        assert_eq!(cfg.api_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.admin_addr(), "0.0.0.0:8081");
    }

    #[test]
    fn expiry_helpers_convert_units() {
        let cfg = AuthConfig {
            jwt_secret: None,
            issuer: "blog".to_string(),
            access_expiry_minutes: 5,
            refresh_expiry_hours: 24,
        };
        assert_eq!(cfg.access_expiry_secs(), 300);
        assert_eq!(cfg.refresh_expiry_secs(), 86_400);
    }

    #[test]
    fn config_field_secret_is_used_when_env_is_absent() {
        let cfg = AuthConfig {
            jwt_secret: Some("a-secret-from-the-config-file-00".to_string()),
            issuer: "blog".to_string(),
            access_expiry_minutes: 5,
            refresh_expiry_hours: 24,
        };
        // Only meaningful when JWT_SECRET is not set in the test environment;
        // the env var takes priority by design.
        if std::env::var("JWT_SECRET").is_err() {
            assert_eq!(
                cfg.resolved_jwt_secret().as_deref(),
                Some("a-secret-from-the-config-file-00")
            );
        }
    }

    #[test]
    fn empty_config_secret_resolves_to_none() {
        let cfg = AuthConfig {
            jwt_secret: Some(String::new()),
            issuer: "blog".to_string(),
            access_expiry_minutes: 5,
            refresh_expiry_hours: 24,
        };
        if std::env::var("JWT_SECRET").is_err() {
            assert!(cfg.resolved_jwt_secret().is_none());
        }
    }
}
