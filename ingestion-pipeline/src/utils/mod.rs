pub mod archive;
pub mod import;
pub mod routing;
