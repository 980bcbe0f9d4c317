//! Event processing from pulse streams to shower records

pub mod pulses;
pub mod aggregator;
pub mod shower;
pub mod selection;

pub use pulses::{DataBlock, EventFrame, EventHeader, Pulse, PulseCategory};
pub use aggregator::{AggregatedSignals, SensorSignal, SignalAggregator};
pub use shower::{ShowerBuilder, ShowerCatalog, ShowerRecord};
pub use selection::{average_by_run, DistantSignalSums, FeatureRow, SignalSelection};
