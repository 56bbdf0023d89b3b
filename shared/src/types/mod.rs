pub mod claims;
pub mod hal;
pub mod server_config;

pub use self::claims::AuthClaims;
pub use self::hal::{Link, Resource};
pub use self::server_config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, ServerConfig};
