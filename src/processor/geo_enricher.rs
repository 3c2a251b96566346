use anyhow::Result;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::address_defaulter::text_values;
use super::schema::require_columns;
use crate::error::EtlError;
use crate::fetcher::Geocoder;
use crate::models::data_models::*;
use crate::storage::SpreadsheetReader;

pub const GEO_OUTPUT_COLUMNS: [&str; 7] = [
    CUSTOMER_ID,
    LATITUDE,
    LONGITUDE,
    COUNTRY,
    SUBURB,
    BOROUGH,
    COUNTRY_CODE,
];

/// An address that could not be resolved, or resolved without address detail.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoException {
    pub address: String,
    pub customer_ids: Vec<String>,
    pub reason: String,
}

impl GeoException {
    pub fn to_error(&self) -> EtlError {
        EtlError::GeoLookup {
            address: self.address.clone(),
            reason: self.reason.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct GeoExceptions {
    entries: Vec<GeoException>,
}

impl GeoExceptions {
    fn record(&mut self, address: &str, customer_ids: Vec<String>, reason: String) {
        let exception = GeoException {
            address: address.to_string(),
            customer_ids,
            reason,
        };
        warn!("{}", exception.to_error());
        self.entries.push(exception);
    }

    pub fn contains_address(&self, address: &str) -> bool {
        self.entries.iter().any(|e| e.address == address)
    }

    pub fn entries(&self) -> &[GeoException] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct GeoEnrichment {
    pub frame: DataFrame,
    pub exceptions: GeoExceptions,
}

/// Clients sharing one (street, postal code, city) tuple.
struct AddressGroup {
    address: String,
    rows: Vec<usize>,
}

pub struct GeoEnricher {
    static_path: PathBuf,
    delay: Duration,
}

impl GeoEnricher {
    pub fn new(static_path: PathBuf, delay: Duration) -> Self {
        GeoEnricher { static_path, delay }
    }

    /// Without a geocoder the precomputed table is loaded instead of calling the provider.
    pub async fn enrich(
        &self,
        clients: &DataFrame,
        geocoder: Option<&dyn Geocoder>,
    ) -> Result<GeoEnrichment> {
        require_columns(clients, "clients", &[STREET, POSTAL_CODE, CITY, CUSTOMER_ID])?;

        match geocoder {
            Some(geocoder) => self.enrich_live(clients, geocoder).await,
            None => Ok(GeoEnrichment {
                frame: self.load_static()?,
                exceptions: GeoExceptions::default(),
            }),
        }
    }

    pub fn load_static(&self) -> Result<DataFrame> {
        let df = SpreadsheetReader.read_raw(&self.static_path, 0)?;
        info!(
            "Loaded {} precomputed geo rows from {}",
            df.height(),
            self.static_path.display()
        );
        Ok(df)
    }

    async fn enrich_live(
        &self,
        clients: &DataFrame,
        geocoder: &dyn Geocoder,
    ) -> Result<GeoEnrichment> {
        let customer_ids = text_values(clients, CUSTOMER_ID)?;
        let groups = group_addresses(clients, &customer_ids)?;
        info!(
            "Geocoding {} distinct addresses for {} clients",
            groups.len(),
            clients.height()
        );

        let mut exceptions = GeoExceptions::default();
        let mut resolved: Vec<(usize, GeoLocation)> = Vec::new();

        for group in &groups {
            let group_ids = || {
                group
                    .rows
                    .iter()
                    .filter_map(|&row| customer_ids[row].clone())
                    .collect::<Vec<_>>()
            };

            match geocoder.geocode(&group.address).await {
                Ok(Some(location)) => {
                    if location.address.is_none() {
                        exceptions.record(
                            &group.address,
                            group_ids(),
                            "no address detail in response".to_string(),
                        );
                    }
                    for &row in &group.rows {
                        resolved.push((row, location.clone()));
                    }
                }
                Ok(None) => {
                    exceptions.record(&group.address, group_ids(), "no match".to_string());
                    sleep(self.delay).await;
                }
                Err(e) => {
                    exceptions.record(&group.address, group_ids(), e.to_string());
                    sleep(self.delay).await;
                }
            }
            sleep(self.delay).await;
        }

        resolved.sort_by_key(|(row, _)| *row);
        let frame = build_geo_frame(clients, &resolved)?;

        info!(
            "Resolved {} clients, {} addresses in the exceptions registry",
            frame.height(),
            exceptions.len()
        );

        Ok(GeoEnrichment { frame, exceptions })
    }
}

/// Groups the first row of every distinct client by its address tuple, in source order.
fn group_addresses(clients: &DataFrame, customer_ids: &[Option<String>]) -> Result<Vec<AddressGroup>> {
    let streets = text_values(clients, STREET)?;
    let postal_codes = text_values(clients, POSTAL_CODE)?;
    let cities = text_values(clients, CITY)?;

    let mut groups: Vec<AddressGroup> = Vec::new();
    let mut group_index: HashMap<(Option<String>, Option<String>, Option<String>), usize> =
        HashMap::new();
    let mut seen_clients = HashSet::new();

    for row in 0..clients.height() {
        if !seen_clients.insert(customer_ids[row].clone()) {
            continue;
        }

        let key = (
            streets[row].clone(),
            postal_codes[row].clone(),
            cities[row].clone(),
        );
        let idx = *group_index.entry(key).or_insert_with(|| {
            groups.push(AddressGroup {
                address: format_address(&streets[row], &postal_codes[row], &cities[row]),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].rows.push(row);
    }

    Ok(groups)
}

fn format_address(street: &Option<String>, postal_code: &Option<String>, city: &Option<String>) -> String {
    [street, postal_code, city]
        .iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_geo_frame(clients: &DataFrame, resolved: &[(usize, GeoLocation)]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = resolved.iter().map(|(row, _)| *row as IdxSize).collect();
    let mut frame = clients
        .select([CUSTOMER_ID])?
        .take(&IdxCa::from_vec("idx".into(), idx))?;

    let mut latitudes = Vec::with_capacity(resolved.len());
    let mut longitudes = Vec::with_capacity(resolved.len());
    let mut countries = Vec::with_capacity(resolved.len());
    let mut suburbs = Vec::with_capacity(resolved.len());
    let mut boroughs = Vec::with_capacity(resolved.len());
    let mut country_codes = Vec::with_capacity(resolved.len());

    for (_, location) in resolved {
        let detail = location.address.clone().unwrap_or_default();
        latitudes.push(location.latitude);
        longitudes.push(location.longitude);
        countries.push(detail.country);
        suburbs.push(detail.suburb);
        boroughs.push(detail.borough);
        country_codes.push(detail.country_code);
    }

    frame.with_column(Series::new(LATITUDE.into(), latitudes))?;
    frame.with_column(Series::new(LONGITUDE.into(), longitudes))?;
    frame.with_column(Series::new(COUNTRY.into(), countries))?;
    frame.with_column(Series::new(SUBURB.into(), suburbs))?;
    frame.with_column(Series::new(BOROUGH.into(), boroughs))?;
    frame.with_column(Series::new(COUNTRY_CODE.into(), country_codes))?;

    Ok(frame)
}
