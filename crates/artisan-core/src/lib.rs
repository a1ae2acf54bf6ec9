pub mod accounts;
pub mod app_config;
pub mod cart;
pub mod catalog;
pub mod composition;
pub mod config;
pub mod password;
pub mod sales;

pub use accounts::{normalize_email, validate_password, Role};
pub use app_config::{AppConfig, Environment};
pub use cart::{check_amount, compute_totals, max_amount, CartLine, CartTotals, MAX_LINE_QUANTITY};
pub use catalog::{load_catalog, slug_from_name, CatalogFile};
pub use composition::{
    compose, Composition, CompositionError, IngredientKind, IngredientRef, REQUIRED_KIND_COUNTS,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use password::{hash_password, verify_password, PasswordError};
pub use sales::SaleStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid ingredient kind: {0}")]
    InvalidIngredientKind(String),

    #[error("invalid sale status: {0}")]
    InvalidSaleStatus(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),
}
