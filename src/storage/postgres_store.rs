use anyhow::{Context, Result};
use polars::prelude::*;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::EtlError;

/// Postgres caps bind parameters per statement at u16::MAX.
const MAX_BIND_PARAMS: usize = 65_535;

/// Column values in the shape they are bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlColumn {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl SqlColumn {
    pub fn from_column(column: &Column) -> Result<Self> {
        let dtype = column.dtype();
        let values = if dtype.is_integer() {
            SqlColumn::Int(column.cast(&DataType::Int64)?.i64()?.into_iter().collect())
        } else if dtype.is_float() {
            SqlColumn::Float(column.cast(&DataType::Float64)?.f64()?.into_iter().collect())
        } else if dtype == &DataType::Boolean {
            SqlColumn::Bool(column.bool()?.into_iter().collect())
        } else {
            SqlColumn::Text(
                column
                    .cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect(),
            )
        };
        Ok(values)
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            SqlColumn::Int(_) => "BIGINT",
            SqlColumn::Float(_) => "DOUBLE PRECISION",
            SqlColumn::Bool(_) => "BOOLEAN",
            SqlColumn::Text(_) => "TEXT",
        }
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table_sql(table: &str, df: &DataFrame) -> Result<String> {
    let definitions = df
        .get_columns()
        .iter()
        .map(|column| {
            SqlColumn::from_column(column)
                .map(|values| format!("{} {}", quote_identifier(column.name()), values.sql_type()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE {} ({})",
        quote_identifier(table),
        definitions.join(", ")
    ))
}

/// Rows per INSERT so that one statement stays under the bind-parameter limit.
pub fn rows_per_insert(width: usize) -> usize {
    (MAX_BIND_PARAMS / width.max(1)).max(1)
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.get_max_connections())
            .connect(&config.connection_url()?)
            .await
            .map_err(EtlError::Connection)?;

        info!("Connected to {}", config.display_target());
        Ok(PostgresStore { pool })
    }

    /// Drops, recreates and fills every table inside one transaction committed at the end.
    /// If any table fails the transaction is rolled back on drop.
    pub async fn replace_tables(&self, tables: &[(&str, &DataFrame)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (name, df) in tables {
            replace_table(&mut tx, name, df)
                .await
                .with_context(|| format!("Failed to replace table {}", name))?;
        }

        tx.commit().await?;
        info!("Committed {} tables", tables.len());
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn replace_table(tx: &mut Transaction<'_, Postgres>, table: &str, df: &DataFrame) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_identifier(table)))
        .execute(&mut **tx)
        .await?;
    sqlx::query(&create_table_sql(table, df)?)
        .execute(&mut **tx)
        .await?;

    if df.height() == 0 || df.width() == 0 {
        info!("Replaced table {} (empty)", table);
        return Ok(());
    }

    let columns = df
        .get_columns()
        .iter()
        .map(SqlColumn::from_column)
        .collect::<Result<Vec<_>>>()?;
    let column_list = df
        .get_column_names_str()
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");

    let chunk = rows_per_insert(columns.len());
    let mut start = 0;
    while start < df.height() {
        let end = (start + chunk).min(df.height());

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            quote_identifier(table),
            column_list
        ));
        builder.push_values(start..end, |mut row_builder, row| {
            for column in &columns {
                match column {
                    SqlColumn::Int(values) => row_builder.push_bind(values[row]),
                    SqlColumn::Float(values) => row_builder.push_bind(values[row]),
                    SqlColumn::Bool(values) => row_builder.push_bind(values[row]),
                    SqlColumn::Text(values) => row_builder.push_bind(values[row].clone()),
                };
            }
        });
        builder.build().execute(&mut **tx).await?;

        start = end;
    }

    info!("Replaced table {} with {} rows", table, df.height());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "customer_id" => [1001i64, 1002],
            "latitude" => [Some(52.5), None],
            "active" => [true, false],
            "name" => [Some("Kiosk"), None],
            "vorg.art_name" => ["a", "b"]
        )
        .unwrap()
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("clients", &sample()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"clients\" (\"customer_id\" BIGINT, \"latitude\" DOUBLE PRECISION, \
             \"active\" BOOLEAN, \"name\" TEXT, \"vorg.art_name\" TEXT)"
        );
    }

    #[test]
    fn test_column_conversion() {
        let df = sample();
        assert_eq!(
            SqlColumn::from_column(df.column("latitude").unwrap()).unwrap(),
            SqlColumn::Float(vec![Some(52.5), None])
        );
        assert_eq!(
            SqlColumn::from_column(df.column("name").unwrap()).unwrap(),
            SqlColumn::Text(vec![Some("Kiosk".to_string()), None])
        );

        let small = Series::new("n".into(), [1i32, 2]).into_column();
        assert_eq!(
            SqlColumn::from_column(&small).unwrap(),
            SqlColumn::Int(vec![Some(1), Some(2)])
        );
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote_identifier("Wgr_Bez."), "\"Wgr_Bez.\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_rows_per_insert() {
        assert_eq!(rows_per_insert(7), 9_362);
        assert_eq!(rows_per_insert(0), MAX_BIND_PARAMS);
        assert_eq!(rows_per_insert(100_000), 1);
    }
}
