use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const MIN_JWT_SECRET_LEN: usize = 16;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let jwt_secret = require("ARTISAN_JWT_SECRET")?;
    if jwt_secret.len() < MIN_JWT_SECRET_LEN {
        return Err(invalid(
            "ARTISAN_JWT_SECRET",
            format!("must be at least {MIN_JWT_SECRET_LEN} characters"),
        ));
    }

    let env = parse_environment(&or_default("ARTISAN_ENV", "development"))?;
    let bind_addr = parse_addr("ARTISAN_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("ARTISAN_LOG_LEVEL", "info");

    let jwt_ttl_minutes = parse_u32("ARTISAN_JWT_TTL_MINUTES", "1440")?;
    if jwt_ttl_minutes == 0 {
        return Err(invalid(
            "ARTISAN_JWT_TTL_MINUTES",
            "must be greater than zero".to_string(),
        ));
    }

    let db_max_connections = parse_u32("ARTISAN_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ARTISAN_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ARTISAN_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let upload_dir = PathBuf::from(or_default("ARTISAN_UPLOAD_DIR", "./uploads"));
    let upload_max_bytes = parse_usize("ARTISAN_UPLOAD_MAX_BYTES", "5242880")?;
    let catalog_path = PathBuf::from(or_default("ARTISAN_CATALOG_PATH", "./config/catalog.yaml"));

    let inference_url = optional("ARTISAN_INFERENCE_URL");
    let inference_api_key = optional("ARTISAN_INFERENCE_API_KEY");
    let inference_model = or_default("ARTISAN_INFERENCE_MODEL", "gpt-4o-mini");
    let inference_timeout_secs = parse_u64("ARTISAN_INFERENCE_TIMEOUT_SECS", "30")?;
    let push_url = or_default("ARTISAN_PUSH_URL", "https://exp.host/--/api/v2/push/send");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        jwt_secret,
        jwt_ttl_minutes: i64::from(jwt_ttl_minutes),
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        upload_dir,
        upload_max_bytes,
        catalog_path,
        inference_url,
        inference_api_key,
        inference_model,
        inference_timeout_secs,
        push_url,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ARTISAN_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
