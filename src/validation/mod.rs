//! Error reporting and event quality cuts

pub mod error;
pub mod quality;

pub use error::{ErrorScope, ShowerError, ShowerResult};
pub use quality::{QualityCutEvaluator, QualityDecision};
