//! Core types and constants for the shower signal pipeline

pub mod types;
pub mod constants;
pub mod geometry;

pub use types::*;
pub use constants::*;
pub use geometry::GeometryModel;
