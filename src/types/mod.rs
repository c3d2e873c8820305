pub mod frequency;
pub mod location;
pub mod month;
pub mod observation;
pub mod station;
