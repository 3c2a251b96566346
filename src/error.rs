use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("The necessary column {column} was not found in {table}")]
    Schema { table: String, column: String },

    #[error("There are still missing values in {table} after cleaning: {violations}")]
    DataQuality { table: String, violations: String },

    #[error("Geocoding failed for '{address}': {reason}")]
    GeoLookup { address: String, reason: String },

    #[error("Database connection failed: {0}")]
    Connection(#[source] sqlx::Error),
}

impl EtlError {
    pub fn schema(table: &str, column: &str) -> Self {
        EtlError::Schema {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}
