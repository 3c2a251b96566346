pub mod address_defaulter;
pub mod client_cleaner;
pub mod employee_cleaner;
pub mod geo_enricher;
pub mod quality;
pub mod schema;
pub mod sales_cleaner;

pub use address_defaulter::AddressDefaulter;
pub use client_cleaner::{CleanOutput, ClientCleaner};
pub use employee_cleaner::EmployeeCleaner;
pub use geo_enricher::{GeoEnricher, GeoEnrichment};
pub use quality::QualityReport;
pub use sales_cleaner::SalesCleaner;
