pub mod delete;
pub mod history;
pub mod insights;
pub mod liveness;
pub mod readiness;
pub mod settings;
pub mod tables;
pub mod upload;
