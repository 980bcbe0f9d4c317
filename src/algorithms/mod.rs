//! Geometric algorithms on the shower axis and tank volumes

pub mod projection;
pub mod intersection;

pub use projection::{horizontal_distance, ShowerAxisProjector};
pub use intersection::{IntersectionTester, MuonCount, MuonCounter, Track};
