pub mod aligner;
pub mod error;
pub mod stacked_table;
pub mod stacker;
