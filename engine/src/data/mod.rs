// Data boundary: CSV import, tabular export, dataset persistence.
pub mod csv_import;
pub mod export;
pub mod store;
