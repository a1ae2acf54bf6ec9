use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub catalog_path: PathBuf,
    pub inference_url: Option<String>,
    pub inference_api_key: Option<String>,
    pub inference_model: String,
    pub inference_timeout_secs: u64,
    pub push_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("jwt_secret", &"[redacted]")
            .field("jwt_ttl_minutes", &self.jwt_ttl_minutes)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("upload_dir", &self.upload_dir)
            .field("upload_max_bytes", &self.upload_max_bytes)
            .field("catalog_path", &self.catalog_path)
            .field("inference_url", &self.inference_url)
            .field(
                "inference_api_key",
                &self.inference_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("inference_model", &self.inference_model)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("push_url", &self.push_url)
            .finish()
    }
}
