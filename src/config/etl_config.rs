use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::database_config::{DatabaseConfig, DatabaseSection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub inputs: InputConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Location of the spreadsheet exports and the static enrichment table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub data_dir: PathBuf,
    pub client_file: String,
    pub sales_file: String,
    pub employee_file: String,
    pub geo_file: String,
    pub sales_header_row: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub delay_between_requests_ms: u64,
    pub update_all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub startup_delay_secs: u64,
    pub strict_quality: bool,
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub database: DatabaseConfig,
    pub inputs: InputConfig,
    pub geocoding: GeocodingConfig,
    pub run: RunConfig,
}

impl EtlConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ETL config file: {}", path))?;

        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse ETL config file: {}", path))?;

        config.database.load_credentials()?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: EtlConfigFile = toml::from_str(content)?;

        Ok(Self {
            database: DatabaseConfig::from_section(file.database),
            inputs: file.inputs,
            geocoding: file.geocoding,
            run: file.run,
        })
    }
}

impl InputConfig {
    pub fn client_path(&self) -> PathBuf {
        self.data_dir.join(&self.client_file)
    }

    pub fn sales_path(&self) -> PathBuf {
        self.data_dir.join(&self.sales_file)
    }

    pub fn employee_path(&self) -> PathBuf {
        self.data_dir.join(&self.employee_file)
    }

    pub fn geo_path(&self) -> PathBuf {
        self.data_dir.join(&self.geo_file)
    }
}

impl GeocodingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }
}

impl RunConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            client_file: "random_client.csv".to_string(),
            sales_file: "random_sales.csv".to_string(),
            employee_file: "random_employee.csv".to_string(),
            geo_file: "random_geo.csv".to_string(),
            sales_header_row: 6,
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: "etl-pipeline/0.1 (hallo@test.berlin)".to_string(),
            delay_between_requests_ms: 1000,
            update_all: false,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: 10,
            strict_quality: false,
        }
    }
}
