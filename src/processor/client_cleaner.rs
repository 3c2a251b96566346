use anyhow::Result;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{info, warn};

use super::address_defaulter::{AddressDefaulter, text_values};
use super::quality::QualityReport;
use super::schema::require_columns;
use crate::models::data_models::*;

const REQUIRED_COLUMNS: [&str; 8] = [
    CREATED_AT,
    STREET,
    CUSTOMER_ID,
    CUSTOMER_SINCE,
    NAME,
    CITY,
    POSTAL_CODE,
    PRICE_GROUP,
];

const COMPLETE_COLUMNS: [&str; 6] = [CREATED_AT, STREET, CUSTOMER_ID, NAME, CITY, POSTAL_CODE];

pub const CLIENT_OUTPUT_COLUMNS: [&str; 9] = [
    CUSTOMER_ID,
    NAME,
    CREATED_AT,
    STREET,
    CITY,
    POSTAL_CODE,
    SUBURB,
    LATITUDE,
    LONGITUDE,
];

/// A cleaned table together with the completeness check run on it.
#[derive(Debug)]
pub struct CleanOutput {
    pub frame: DataFrame,
    pub quality: QualityReport,
}

pub struct ClientCleaner;

impl ClientCleaner {
    pub fn clean(&self, mut df: DataFrame) -> Result<CleanOutput> {
        require_columns(&df, "clients", &REQUIRED_COLUMNS)?;

        let defaulted = AddressDefaulter.fill_missing_addresses(&mut df)?;
        info!("Defaulted {} of {} client addresses", defaulted, df.height());

        let quality = QualityReport::check(&df, "clients", Some(&COMPLETE_COLUMNS));
        quality.log_if_unclean();

        ensure_enrichment_columns(&mut df)?;
        let frame = df.select(CLIENT_OUTPUT_COLUMNS)?;

        Ok(CleanOutput { frame, quality })
    }

    /// Fills missing suburb and coordinates of cleaned clients from the geo table.
    /// Values already present are kept. A geo table without a customer key is skipped.
    pub fn attach_geo(&self, clients: &mut DataFrame, geo: &DataFrame) -> Result<usize> {
        if geo.column(CUSTOMER_ID).is_err() {
            warn!(
                "Geo table has no {} column, clients keep their own geo columns",
                CUSTOMER_ID
            );
            return Ok(0);
        }

        let mut by_client: HashMap<String, (Option<String>, Option<f64>, Option<f64>)> =
            HashMap::new();
        let geo_ids = text_values(geo, CUSTOMER_ID)?;
        let geo_suburbs = optional_text(geo, SUBURB, geo.height())?;
        let geo_lats = optional_floats(geo, LATITUDE, geo.height())?;
        let geo_lons = optional_floats(geo, LONGITUDE, geo.height())?;

        for (idx, id) in geo_ids.into_iter().enumerate() {
            if let Some(id) = id {
                by_client.entry(id).or_insert((
                    geo_suburbs[idx].clone(),
                    geo_lats[idx],
                    geo_lons[idx],
                ));
            }
        }

        let height = clients.height();
        let ids = text_values(clients, CUSTOMER_ID)?;
        let mut suburbs = optional_text(clients, SUBURB, height)?;
        let mut lats = optional_floats(clients, LATITUDE, height)?;
        let mut lons = optional_floats(clients, LONGITUDE, height)?;

        let mut matched = 0;
        for (idx, id) in ids.iter().enumerate() {
            let Some((suburb, lat, lon)) = id.as_ref().and_then(|id| by_client.get(id)) else {
                continue;
            };
            matched += 1;
            if suburbs[idx].is_none() {
                suburbs[idx] = suburb.clone();
            }
            if lats[idx].is_none() {
                lats[idx] = *lat;
            }
            if lons[idx].is_none() {
                lons[idx] = *lon;
            }
        }

        clients.with_column(Series::new(SUBURB.into(), suburbs))?;
        clients.with_column(Series::new(LATITUDE.into(), lats))?;
        clients.with_column(Series::new(LONGITUDE.into(), lons))?;

        info!("Attached geo data to {} of {} clients", matched, height);
        Ok(matched)
    }
}

fn ensure_enrichment_columns(df: &mut DataFrame) -> Result<()> {
    let height = df.height();
    for (name, dtype) in [
        (SUBURB, DataType::String),
        (LATITUDE, DataType::Float64),
        (LONGITUDE, DataType::Float64),
    ] {
        if df.column(name).is_err() {
            df.with_column(Series::full_null(name.into(), height, &dtype))?;
        }
    }
    Ok(())
}

fn optional_text(df: &DataFrame, name: &str, height: usize) -> Result<Vec<Option<String>>> {
    if df.column(name).is_ok() {
        text_values(df, name)
    } else {
        Ok(vec![None; height])
    }
}

fn optional_floats(df: &DataFrame, name: &str, height: usize) -> Result<Vec<Option<f64>>> {
    match df.column(name) {
        Ok(column) => {
            let column = column.cast(&DataType::Float64)?;
            Ok(column.f64()?.into_iter().collect())
        }
        Err(_) => Ok(vec![None; height]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::LogBuffer;

    fn raw_clients() -> DataFrame {
        // deliberately shuffled column order
        df!(
            "price_group" => ["A", "B", "A"],
            "city" => [Some("Berlin"), Some("Hamburg"), Some("Bremen")],
            "customer_id" => [1001i64, 1002, 1003],
            "postal_code" => [Some(10115i64), None, Some(28195)],
            "name" => ["Kiosk Mitte", "Getränke Nord", "Hafenbar"],
            "street" => [Some("Hauptstr. 1"), None, Some("Am Wall 3")],
            "customer_since" => ["2019", "2020", "2021"],
            "created_at" => ["2019-01-02", "2020-03-04", "2021-05-06"],
            "notes" => ["x", "y", "z"]
        )
        .unwrap()
    }

    #[test]
    fn test_output_projection() {
        let out = ClientCleaner.clean(raw_clients()).unwrap();
        assert_eq!(out.frame.get_column_names_str(), CLIENT_OUTPUT_COLUMNS.to_vec());
        assert_eq!(out.frame.height(), 3);
        assert!(out.quality.is_clean());

        // enrichment columns are placeholders until geo data is attached
        assert_eq!(out.frame.column(LATITUDE).unwrap().dtype(), &DataType::Float64);
        assert_eq!(out.frame.column(SUBURB).unwrap().null_count(), 3);
    }

    #[test]
    fn test_defaulted_row_carries_sentinel_address() {
        let out = ClientCleaner.clean(raw_clients()).unwrap();

        let streets = text_values(&out.frame, STREET).unwrap();
        let postal_codes = text_values(&out.frame, POSTAL_CODE).unwrap();
        let cities = text_values(&out.frame, CITY).unwrap();
        assert_eq!(
            (streets[1].as_deref(), postal_codes[1].as_deref(), cities[1].as_deref()),
            (Some(SENTINEL_STREET), Some(SENTINEL_POSTAL_CODE), Some(SENTINEL_CITY))
        );
        assert_eq!(streets[0].as_deref(), Some("Hauptstr. 1"));
    }

    #[test]
    fn test_missing_name_is_reported_not_fatal() {
        let mut df = raw_clients();
        df.with_column(Series::new(NAME.into(), [Some("a"), None, Some("c")]))
            .unwrap();

        let out = ClientCleaner.clean(df).unwrap();
        assert!(!out.quality.is_clean());
        assert_eq!(out.quality.violations[0].column, NAME);
    }

    #[test]
    fn test_requires_all_client_columns() {
        let df = raw_clients().drop(PRICE_GROUP).unwrap();
        assert!(ClientCleaner.clean(df).is_err());
    }

    #[test]
    fn test_attach_geo_fills_only_gaps() {
        let cleaner = ClientCleaner;
        let mut clients = cleaner.clean(raw_clients()).unwrap().frame;
        clients
            .with_column(Series::new(SUBURB.into(), [Some("Mitte"), None, None]))
            .unwrap();

        let geo = df!(
            "customer_id" => ["1001", "1003"],
            "latitude" => [52.52, 53.08],
            "longitude" => [13.40, 8.80],
            "suburb" => ["Tiergarten", "Altstadt"]
        )
        .unwrap();

        let matched = cleaner.attach_geo(&mut clients, &geo).unwrap();
        assert_eq!(matched, 2);

        let suburbs = text_values(&clients, SUBURB).unwrap();
        assert_eq!(suburbs[0].as_deref(), Some("Mitte"));
        assert_eq!(suburbs[1], None);
        assert_eq!(suburbs[2].as_deref(), Some("Altstadt"));

        let lats: Vec<Option<f64>> = clients.column(LATITUDE).unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(lats, vec![Some(52.52), None, Some(53.08)]);
        assert_eq!(clients.get_column_names_str(), CLIENT_OUTPUT_COLUMNS.to_vec());
    }

    #[test]
    fn test_attach_geo_without_customer_key_is_skipped() {
        let cleaner = ClientCleaner;
        let mut clients = cleaner.clean(raw_clients()).unwrap().frame;
        let before = clients.clone();

        let geo = df!(
            "Kunden-Nr." => ["1001"],
            "latitude" => [52.52],
            "longitude" => [13.40]
        )
        .unwrap();

        let matched = cleaner.attach_geo(&mut clients, &geo).unwrap();
        assert_eq!(matched, 0);
        assert!(clients.equals_missing(&before));
    }

    #[test]
    fn test_defaulted_client_is_logged() {
        let logs = LogBuffer::default();
        let out = tracing::subscriber::with_default(logs.subscriber(), || {
            ClientCleaner.clean(raw_clients()).unwrap()
        });

        assert_eq!(out.frame.height(), 3);
        let output = logs.contents();
        assert!(output.contains("Defaulted the address of client 1002"));
        assert!(!output.contains("Defaulted the address of client 1001"));
    }
}
