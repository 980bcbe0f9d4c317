//! Air-Shower Signal Processing
//!
//! Per-event processing of surface-array detector data: tank geometry,
//! shower-axis projection, muon track counting through tank volumes,
//! time-windowed pulse aggregation and event quality cuts.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{ChannelId, GeometryModel, PrimarySpecies, SensorId, ShowerAxis};
pub use crate::algorithms::{IntersectionTester, MuonCount, MuonCounter, ShowerAxisProjector, Track};
pub use crate::processing::{
    AggregatedSignals, EventFrame, FeatureRow, Pulse, PulseCategory, SensorSignal, ShowerBuilder,
    ShowerCatalog, ShowerRecord, SignalAggregator, SignalSelection,
};
pub use crate::validation::{QualityCutEvaluator, QualityDecision, ShowerError, ShowerResult};
pub use crate::utils::{ConfigurationManager, ShowerConfig};
