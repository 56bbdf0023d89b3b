use std::fs;
use tracing::{debug, error, info};

use crate::types::server_config::{AppConfig, ConfigError};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.bind.is_empty() {
        return Err(ConfigError::InvalidConfig("bind cannot be empty".into()));
    }

    if config.database.file.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "database file cannot be empty".into(),
        ));
    }

    if config.auth.access_expiry_minutes == 0 {
        return Err(ConfigError::InvalidConfig(
            "access_expiry_minutes must be greater than 0".into(),
        ));
    }

    if config.auth.refresh_expiry_hours == 0 {
        return Err(ConfigError::InvalidConfig(
            "refresh_expiry_hours must be greater than 0".into(),
        ));
    }

    // The signing secret must be resolvable (env var or config field) and long
    // enough. Validated here so a bad config is rejected at startup rather
    // than failing at the first login.
    match config.auth.resolved_jwt_secret() {
        None => {
            return Err(ConfigError::InvalidConfig(
                "jwt_secret must be set via the JWT_SECRET env var or auth.jwt_secret config field"
                    .into(),
            ));
        }
        Some(secret) if secret.len() < 32 => {
            return Err(ConfigError::InvalidConfig(
                "jwt_secret must be at least 32 characters long".into(),
            ));
        }
        _ => {}
    }

    Ok(())
}
