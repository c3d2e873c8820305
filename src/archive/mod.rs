pub mod cache;
pub mod error;
pub mod reader;
