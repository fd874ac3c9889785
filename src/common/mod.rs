//! Common types and capability contracts shared across the engine

pub mod traits;
pub mod types;
