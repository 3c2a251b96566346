use serde::{Deserialize, Serialize};

pub const CUSTOMER_ID: &str = "customer_id";
pub const NAME: &str = "name";
pub const CREATED_AT: &str = "created_at";
pub const CUSTOMER_SINCE: &str = "customer_since";
pub const STREET: &str = "street";
pub const CITY: &str = "city";
pub const POSTAL_CODE: &str = "postal_code";
pub const PRICE_GROUP: &str = "price_group";
pub const SUBURB: &str = "suburb";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const COUNTRY: &str = "country";
pub const BOROUGH: &str = "borough";
pub const COUNTRY_CODE: &str = "country_code";
pub const REPRESENTATIVE_ID: &str = "representative_id";
pub const PRIMARY_REPRESENTATIVE: &str = "primary_representative";

/// Remote fallback location used for clients without a usable address.
pub const SENTINEL_STREET: &str = "Norðausturvegur";
pub const SENTINEL_POSTAL_CODE: &str = "78585";
pub const SENTINEL_CITY: &str = "Island";

/// Artificial employee assigned to clients without a representative.
pub const SENTINEL_REPRESENTATIVE: i64 = 999;

/// Export headers of the source spreadsheets and the names the pipeline works with.
pub const HEADER_ALIASES: [(&str, &str); 10] = [
    ("Kunden-Nr.", CUSTOMER_ID),
    ("Name 1", NAME),
    ("Erstanlage am", CREATED_AT),
    ("Kunde ab", CUSTOMER_SINCE),
    ("Str..1", STREET),
    ("Ort", CITY),
    ("PLZ", POSTAL_CODE),
    ("Preisgrp.", PRICE_GROUP),
    ("Vtr.Nr.", REPRESENTATIVE_ID),
    ("Erstvertreter", PRIMARY_REPRESENTATIVE),
];

/// Sales export columns renamed verbatim.
pub const SALES_RENAMES: [(&str, &str); 15] = [
    ("Ebene 1", "ebene_1"),
    ("Bezeichnung", "ebene_1_name"),
    ("Ebene 2", "ebene_2"),
    ("Bezeichnung.1", "ebene_2_name"),
    ("Ebene 3", "ebene_3"),
    ("Bezeichnung.2", "ebene_3_name"),
    ("Wgr.  Bez.", "Wgr_Bez."),
    ("Bezeichnung.3", "umsatzart_name"),
    ("Bezeichnung.4", "vorg.art_name"),
    ("Bezeichnung.5", "vers.art_name"),
    ("Ebene 4", "ebene_4"),
    ("Bezeichnung.6", "ebene_4_name"),
    ("Stat.Menge", "Flaschen"),
    ("VK-Menge Ka", "Kisten"),
    ("Lag", "Lager"),
];

/// Category code columns paired with their display name.
pub const CATEGORY_PAIRS: [(&str, &str); 4] = [
    ("ebene_1", "ebene_1_name"),
    ("ebene_2", "ebene_2_name"),
    ("ebene_3", "ebene_3_name"),
    ("ebene_4", "ebene_4_name"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<AddressDetail>,
}

/// Administrative metadata of a geocoding hit. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDetail {
    pub country: Option<String>,
    pub suburb: Option<String>,
    pub borough: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub address: Option<AddressDetail>,
}

pub fn canonical_header(header: &str) -> Option<&'static str> {
    HEADER_ALIASES
        .iter()
        .find(|(source, _)| *source == header)
        .map(|(_, canonical)| *canonical)
}
