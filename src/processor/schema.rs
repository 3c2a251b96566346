use anyhow::Result;
use polars::prelude::*;

use crate::error::EtlError;

/// Fails with a schema error naming the first required column the frame lacks.
pub fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    for column in columns {
        if df.column(column).is_err() {
            return Err(EtlError::schema(table, column).into());
        }
    }
    Ok(())
}

/// Renames every column whose header has a known alias. Unknown headers are left alone.
pub fn rename_columns(df: &mut DataFrame, renames: &[(&str, &str)]) -> Result<usize> {
    let mut renamed = 0;
    for (source, target) in renames {
        if df.column(source).is_ok() {
            df.rename(source, (*target).into())?;
            renamed += 1;
        }
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_is_schema_error() {
        let df = df!("customer_id" => [1i64, 2], "street" => ["A", "B"]).unwrap();

        assert!(require_columns(&df, "clients", &["customer_id", "street"]).is_ok());

        let err = require_columns(&df, "clients", &["customer_id", "city"]).unwrap_err();
        match err.downcast_ref::<EtlError>() {
            Some(EtlError::Schema { table, column }) => {
                assert_eq!(table, "clients");
                assert_eq!(column, "city");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_rename_skips_absent_headers() {
        let mut df = df!("Ebene 1" => [0i64], "other" => [1i64]).unwrap();
        let renamed = rename_columns(&mut df, &[("Ebene 1", "ebene_1"), ("Lag", "Lager")]).unwrap();

        assert_eq!(renamed, 1);
        assert_eq!(df.get_column_names_str(), vec!["ebene_1", "other"]);
    }
}
