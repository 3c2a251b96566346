pub mod postgres_store;
pub mod spreadsheet_reader;

pub use postgres_store::PostgresStore;
pub use spreadsheet_reader::SpreadsheetReader;
