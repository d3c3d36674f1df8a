pub mod active_dataset;
pub mod app_settings;
pub mod conversion_manifest;
pub mod session;
pub mod table_ref;
