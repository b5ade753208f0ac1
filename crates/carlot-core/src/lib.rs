pub mod app_config;
pub mod car;
pub mod config;
pub mod url;

pub use app_config::{AppConfig, Environment};
pub use car::{Car, CarImage, CarSpecs, CarStatus, Money};
pub use config::{load_app_config, load_app_config_from_env};
pub use url::{
    car_path, create_pretty_url, encode_path, handle_with_year_word, localized_paths, PATH_SEGMENT,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
