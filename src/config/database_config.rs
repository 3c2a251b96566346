use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub database: String,
    pub max_connections: Option<u32>,
    // Name of the environment variable holding the password
    pub env_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub database: String,
    pub max_connections: Option<u32>,
    // Loaded from the environment, never from the config file
    pub password: Option<String>,
    pub env_password: Option<String>,
}

impl DatabaseConfig {
    pub fn from_section(section: DatabaseSection) -> Self {
        Self {
            host: section.host,
            port: section.port,
            user: section.user,
            database: section.database,
            max_connections: section.max_connections,
            password: None,
            env_password: section.env_password,
        }
    }

    pub fn load_credentials(&mut self) -> Result<()> {
        let password_var = self.env_password.as_deref().unwrap_or("ETL_DB_PASSWORD");

        self.password = env::var(password_var)
            .with_context(|| format!("Missing environment variable: {}", password_var))?
            .into();

        Ok(())
    }

    pub fn get_password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Database password not loaded"))
    }

    pub fn get_port(&self) -> u16 {
        self.port.unwrap_or(5432)
    }

    pub fn get_max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(1)
    }

    pub fn connection_url(&self) -> Result<String> {
        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.get_password()?,
            self.host,
            self.get_port(),
            self.database
        ))
    }

    /// Connection target without the credential, safe for logs.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.get_port(), self.database)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(anyhow::anyhow!("Database host cannot be empty"));
        }

        if self.user.is_empty() {
            return Err(anyhow::anyhow!("Database user cannot be empty"));
        }

        if self.database.is_empty() {
            return Err(anyhow::anyhow!("Database name cannot be empty"));
        }

        if self.password.is_none() {
            return Err(anyhow::anyhow!("Database password not loaded"));
        }

        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "postgres_sample".to_string(),
            port: Some(5432),
            user: "postgres".to_string(),
            database: "database".to_string(),
            max_connections: Some(1),
            password: None,
            env_password: None,
        }
    }
}
