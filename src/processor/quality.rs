use polars::prelude::*;
use std::fmt;
use tracing::error;

use crate::error::EtlError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnViolation {
    pub column: String,
    pub missing: usize,
}

/// Outcome of a post-cleaning completeness check on one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub table: String,
    pub violations: Vec<ColumnViolation>,
}

impl QualityReport {
    /// Counts missing values in `columns`, or in every column when `columns` is `None`.
    /// Columns the frame does not have are skipped.
    pub fn check(df: &DataFrame, table: &str, columns: Option<&[&str]>) -> Self {
        let checked: Vec<&Column> = match columns {
            Some(names) => names.iter().filter_map(|name| df.column(name).ok()).collect(),
            None => df.get_columns().iter().collect(),
        };

        let violations = checked
            .into_iter()
            .filter(|column| column.null_count() > 0)
            .map(|column| ColumnViolation {
                column: column.name().to_string(),
                missing: column.null_count(),
            })
            .collect();

        QualityReport {
            table: table.to_string(),
            violations,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn total_missing(&self) -> usize {
        self.violations.iter().map(|v| v.missing).sum()
    }

    /// Reference behavior: residual gaps are reported at error level but do not stop the run.
    pub fn log_if_unclean(&self) {
        if !self.is_clean() {
            error!(
                "Error: There are still missing values in {} after cleaning ({})",
                self.table, self
            );
        }
    }

    pub fn into_result(self) -> Result<(), EtlError> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(EtlError::DataQuality {
                violations: self.to_string(),
                table: self.table,
            })
        }
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.column, v.missing))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
