pub mod error;
pub mod geo_index;
pub mod zip_source;
