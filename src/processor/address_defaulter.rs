use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use super::schema::require_columns;
use crate::models::data_models::{
    CITY, CUSTOMER_ID, POSTAL_CODE, SENTINEL_CITY, SENTINEL_POSTAL_CODE, SENTINEL_STREET, STREET,
};

pub struct AddressDefaulter;

impl AddressDefaulter {
    /// Replaces the address of every client lacking a street, postal code or city
    /// with the sentinel location. Address columns come back as text.
    pub fn fill_missing_addresses(&self, df: &mut DataFrame) -> Result<usize> {
        require_columns(df, "clients", &[POSTAL_CODE, CITY, STREET, CUSTOMER_ID])?;

        let streets = text_values(df, STREET)?;
        let postal_codes = text_values(df, POSTAL_CODE)?;
        let cities = text_values(df, CITY)?;
        let customer_ids = text_values(df, CUSTOMER_ID)?;

        let mut defaulted = 0;
        let mut new_streets = Vec::with_capacity(streets.len());
        let mut new_postal_codes = Vec::with_capacity(streets.len());
        let mut new_cities = Vec::with_capacity(streets.len());

        for (idx, ((street, postal_code), city)) in
            streets.into_iter().zip(postal_codes).zip(cities).enumerate()
        {
            if is_missing(&street) || is_missing(&postal_code) || is_missing(&city) {
                info!(
                    "Defaulted the address of client {} due to missing values",
                    customer_ids[idx].as_deref().unwrap_or("<unknown>")
                );
                new_streets.push(Some(SENTINEL_STREET.to_string()));
                new_postal_codes.push(Some(SENTINEL_POSTAL_CODE.to_string()));
                new_cities.push(Some(SENTINEL_CITY.to_string()));
                defaulted += 1;
            } else {
                new_streets.push(street);
                new_postal_codes.push(postal_code);
                new_cities.push(city);
            }
        }

        df.with_column(Series::new(STREET.into(), new_streets))?;
        df.with_column(Series::new(POSTAL_CODE.into(), new_postal_codes))?;
        df.with_column(Series::new(CITY.into(), new_cities))?;

        Ok(defaulted)
    }
}

/// Column values as owned text, whatever the inferred dtype was.
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

fn is_missing(value: &Option<String>) -> bool {
    value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(true)
}
