pub mod app_config;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod shipping;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    load_catalog, product_image_upload_path, sku_from_name, slugify, validate_rating, CatalogFile,
    CategorySeed,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use orders::{compute_total, LineItem, OrderStatus};
pub use shipping::ShippingStatus;

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
    CatalogValidation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid order status: {0}")]
    InvalidOrderStatus(String),
    #[error("invalid shipping status: {0}")]
    InvalidShippingStatus(String),
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i16),
}
