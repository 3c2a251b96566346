use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use super::client_cleaner::CleanOutput;
use super::quality::QualityReport;
use super::schema::{rename_columns, require_columns};
use crate::models::data_models::{CATEGORY_PAIRS, CUSTOMER_ID, SALES_RENAMES};

/// Name written into a category name column whose code is `0`.
const NOT_APPLICABLE: &str = "0";

pub struct SalesCleaner;

impl SalesCleaner {
    pub fn clean(&self, mut df: DataFrame) -> Result<CleanOutput> {
        self.drop_missing_customers(&mut df)?;

        let renamed = rename_columns(&mut df, &SALES_RENAMES)?;
        info!("Renamed {} sales columns", renamed);

        self.fill_not_applicable_categories(&mut df)?;

        let quality = QualityReport::check(&df, "sales", None);
        quality.log_if_unclean();

        Ok(CleanOutput { frame: df, quality })
    }

    /// Removes sales rows without a customer and returns how many were removed.
    pub fn drop_missing_customers(&self, df: &mut DataFrame) -> Result<usize> {
        require_columns(df, "sales", &[CUSTOMER_ID])?;

        let customers = df.column(CUSTOMER_ID)?;
        if customers.null_count() == 0 {
            return Ok(0);
        }

        let keep = customers.is_not_null();
        for (row, present) in (&keep).into_iter().enumerate() {
            if present != Some(true) {
                info!("Deleted row {} due to missing customer_id", row);
            }
        }

        let removed = customers.null_count();
        *df = df.filter(&keep)?;
        Ok(removed)
    }

    /// A category code of `0` marks the level as not applicable, so its name becomes `0` too.
    pub fn fill_not_applicable_categories(&self, df: &mut DataFrame) -> Result<()> {
        for (code_column, name_column) in CATEGORY_PAIRS {
            require_columns(df, "sales", &[code_column, name_column])?;

            let codes = df.column(code_column)?.cast(&DataType::Float64)?;
            let names = df.column(name_column)?.cast(&DataType::String)?;

            let filled: Vec<Option<String>> = codes
                .f64()?
                .into_iter()
                .zip(names.str()?.into_iter())
                .map(|(code, name)| match code {
                    Some(code) if code == 0.0 => Some(NOT_APPLICABLE.to_string()),
                    _ => name.map(str::to_string),
                })
                .collect();

            df.with_column(Series::new(name_column.into(), filled))?;
        }
        Ok(())
    }
}
