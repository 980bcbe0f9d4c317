use thiserror::Error;

use crate::core::{ChannelId, SensorId};
use crate::processing::pulses::DataBlock;

/// Errors raised while turning detector frames into shower records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShowerError {
    /// A required data block is absent from the frame
    #[error("missing data block {block:?} in run {run} event {event}")]
    MissingDataBlock { run: u32, event: u32, block: DataBlock },

    /// Primary particle type outside the retained species
    #[error("unrecognized primary type {type_name} in run {run} event {event}")]
    UnrecognizedPrimaryType { run: u32, event: u32, type_name: String },

    /// PE to charge scale factor undefined for a sensor
    #[error("zero total PE on {sensor}, charge scale undefined")]
    DegenerateGeometry { sensor: SensorId },

    /// A pulse references a channel the geometry does not know
    #[error("channel {channel} not found in geometry")]
    GeometryLookupMiss { channel: ChannelId },

    /// The geometry table itself is inconsistent
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// Configuration could not be loaded or failed validation
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Result type for shower processing operations
pub type ShowerResult<T> = Result<T, ShowerError>;

/// Scope of an error's consequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Only the affected sensor is skipped
    Sensor,
    /// The event is excluded, the run continues
    Event,
    /// The run must stop
    Run,
}

impl ShowerError {
    /// How far the effects of this error reach
    pub fn scope(&self) -> ErrorScope {
        match self {
            ShowerError::DegenerateGeometry { .. } => ErrorScope::Sensor,
            ShowerError::MissingDataBlock { .. } => ErrorScope::Event,
            ShowerError::UnrecognizedPrimaryType { .. } => ErrorScope::Event,
            ShowerError::GeometryLookupMiss { .. } => ErrorScope::Run,
            ShowerError::InvalidGeometry { .. } => ErrorScope::Run,
            ShowerError::Config { .. } => ErrorScope::Run,
        }
    }

    /// Check if processing can continue after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.scope(), ErrorScope::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::pulses::PulseCategory;

    #[test]
    fn test_geometry_miss_is_fatal() {
        let error = ShowerError::GeometryLookupMiss { channel: ChannelId::new(5, 61) };
        assert!(!error.is_recoverable());
        assert_eq!(error.to_string(), "channel OMKey(5,61) not found in geometry");
    }

    #[test]
    fn test_event_local_errors_are_recoverable() {
        let missing = ShowerError::MissingDataBlock {
            run: 1,
            event: 2,
            block: DataBlock::Pulses(PulseCategory::Hadron),
        };
        let species = ShowerError::UnrecognizedPrimaryType {
            run: 1,
            event: 2,
            type_name: "He4Nucleus".to_string(),
        };
        let degenerate = ShowerError::DegenerateGeometry { sensor: SensorId::new(1, 1) };

        assert_eq!(missing.scope(), ErrorScope::Event);
        assert_eq!(species.scope(), ErrorScope::Event);
        assert_eq!(degenerate.scope(), ErrorScope::Sensor);
        assert!(missing.is_recoverable());
        assert!(degenerate.is_recoverable());
    }
}
