pub mod database_config;
pub mod etl_config;

pub use database_config::DatabaseConfig;
pub use etl_config::{EtlConfig, GeocodingConfig};
