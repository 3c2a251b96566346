use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::debug;
use reqwest::Client;

use crate::config::GeocodingConfig;
use crate::models::data_models::{GeoLocation, NominatimPlace};

/// Resolves a free-form address into coordinates and administrative metadata.
///
/// `Ok(None)` means the provider had no match; `Err` is a transient failure.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>>;
}

/// OpenStreetMap Nominatim search API.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    user_agent: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(NominatimGeocoder {
            client,
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>> {
        debug!("Geocoding '{}'", address);

        let response = self
            .client
            .get(&self.endpoint)
            .header("User-Agent", self.user_agent.as_str())
            .query(&[
                ("q", address),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse geocoding response for '{}'", address))?;

        places.into_iter().next().map(place_to_location).transpose()
    }
}

fn place_to_location(place: NominatimPlace) -> Result<GeoLocation> {
    let latitude = place
        .lat
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid latitude '{}'", place.lat))?;
    let longitude = place
        .lon
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid longitude '{}'", place.lon))?;

    Ok(GeoLocation {
        latitude,
        longitude,
        address: place.address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_to_location() {
        let raw = r#"[{
            "lat": "52.5170365",
            "lon": "13.3888599",
            "address": {"suburb": "Mitte", "borough": "Mitte", "country": "Deutschland", "country_code": "de"}
        }]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(raw).unwrap();
        let location = place_to_location(places.into_iter().next().unwrap()).unwrap();

        assert!((location.latitude - 52.5170365).abs() < 1e-9);
        assert!((location.longitude - 13.3888599).abs() < 1e-9);
        let detail = location.address.unwrap();
        assert_eq!(detail.suburb.as_deref(), Some("Mitte"));
        assert_eq!(detail.country_code.as_deref(), Some("de"));
    }

    #[test]
    fn test_invalid_coordinates() {
        let place = NominatimPlace {
            lat: "north".to_string(),
            lon: "13.4".to_string(),
            address: None,
        };
        assert!(place_to_location(place).is_err());
    }

    #[test]
    fn test_geocoder_from_config() {
        let config = GeocodingConfig::default();
        let geocoder = NominatimGeocoder::new(&config).unwrap();
        assert_eq!(geocoder.endpoint, config.endpoint);
        assert!(geocoder.user_agent.contains("etl-pipeline"));
    }
}
