//! Helper utilities.

pub mod coerce;
pub mod shape;
