use anyhow::Result;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

use super::address_defaulter::text_values;
use super::client_cleaner::CleanOutput;
use super::quality::QualityReport;
use super::schema::require_columns;
use crate::models::data_models::{
    CUSTOMER_ID, PRIMARY_REPRESENTATIVE, REPRESENTATIVE_ID, SENTINEL_REPRESENTATIVE,
};

/// Width of the employee export the cleaner was written against.
pub const EXPECTED_EMPLOYEE_COLUMNS: usize = 7;

pub struct EmployeeCleaner;

impl EmployeeCleaner {
    pub fn clean(&self, df: DataFrame) -> Result<CleanOutput> {
        if df.width() != EXPECTED_EMPLOYEE_COLUMNS {
            warn!(
                "Your employee sheet has {} columns instead of the {} of the initial file",
                df.width(),
                EXPECTED_EMPLOYEE_COLUMNS
            );
        }

        require_columns(
            &df,
            "employees",
            &[CUSTOMER_ID, REPRESENTATIVE_ID, PRIMARY_REPRESENTATIVE],
        )?;

        let mut df = self.keep_primary_per_customer(&df)?;
        let filled = self.fill_missing_representatives(&mut df)?;
        info!("Assigned representative {} to {} clients", SENTINEL_REPRESENTATIVE, filled);

        let quality = QualityReport::check(&df, "employees", None);
        quality.log_if_unclean();

        Ok(CleanOutput { frame: df, quality })
    }

    /// One mapping per customer. Primary rows sort first (stable, so source order
    /// breaks ties) and the first row of every customer is kept.
    pub fn keep_primary_per_customer(&self, df: &DataFrame) -> Result<DataFrame> {
        let flags = primary_flags(df.column(PRIMARY_REPRESENTATIVE)?)?;
        let customers = text_values(df, CUSTOMER_ID)?;

        let mut order: Vec<usize> = (0..df.height()).collect();
        order.sort_by_key(|&row| !flags[row]);

        let mut seen = HashSet::new();
        let keep: Vec<IdxSize> = order
            .into_iter()
            .filter(|&row| seen.insert(customers[row].clone()))
            .map(|row| row as IdxSize)
            .collect();

        let removed = df.height() - keep.len();
        if removed > 0 {
            info!("Dropped {} duplicate employee-to-client mappings", removed);
        }

        Ok(df.take(&IdxCa::from_vec("idx".into(), keep))?)
    }

    pub fn fill_missing_representatives(&self, df: &mut DataFrame) -> Result<usize> {
        let column = df.column(REPRESENTATIVE_ID)?;
        let missing = column.null_count();
        if missing == 0 {
            return Ok(0);
        }

        let filled = match column.dtype() {
            dtype if dtype.is_integer() => column
                .cast(&DataType::Int64)?
                .i64()?
                .fill_null_with_values(SENTINEL_REPRESENTATIVE)?
                .into_series(),
            dtype if dtype.is_float() => column
                .cast(&DataType::Float64)?
                .f64()?
                .fill_null_with_values(SENTINEL_REPRESENTATIVE as f64)?
                .into_series(),
            // all-null columns come out of the reader without a numeric type
            DataType::Null => Series::new(
                REPRESENTATIVE_ID.into(),
                vec![SENTINEL_REPRESENTATIVE; column.len()],
            ),
            _ => {
                let values: Vec<String> = text_values(df, REPRESENTATIVE_ID)?
                    .into_iter()
                    .map(|v| v.unwrap_or_else(|| SENTINEL_REPRESENTATIVE.to_string()))
                    .collect();
                Series::new(REPRESENTATIVE_ID.into(), values)
            }
        };

        df.with_column(filled.with_name(REPRESENTATIVE_ID.into()))?;
        Ok(missing)
    }
}

/// Reads a boolean-like flag column. Missing or unrecognized values count as not primary.
fn primary_flags(column: &Column) -> Result<Vec<bool>> {
    let flags: Vec<bool> = match column.dtype() {
        DataType::Boolean => column
            .bool()?
            .into_iter()
            .map(|v| v.unwrap_or(false))
            .collect(),
        dtype if dtype.is_primitive_numeric() => column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(|v| v != 0.0).unwrap_or(false))
            .collect(),
        _ => column
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(is_truthy).unwrap_or(false))
            .collect(),
    };
    Ok(flags)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "1.0" | "true" | "x" | "ja" | "j" | "yes" | "y"
    )
}
