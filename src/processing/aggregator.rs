//! Time-windowed aggregation of pulse streams into per-tank signals

use std::collections::BTreeMap;
use tracing::debug;

use crate::algorithms::projection::ShowerAxisProjector;
use crate::core::geometry::GeometryModel;
use crate::core::types::{SensorId, ShowerAxis};
use crate::processing::pulses::{Pulse, PulseCategory};
use crate::utils::config::AggregationConfig;
use crate::validation::error::{ShowerError, ShowerResult};

/// Signal content of one tank in one event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSignal {
    pub sensor: SensorId,
    /// Distance from the shower axis (m)
    pub lateral_distance: f64,
    pub muon_pe: f64,
    pub other_pe: f64,
    /// Always `muon_pe + other_pe`
    pub total_pe: f64,
    /// VEM
    pub hlc_charge: f64,
    /// VEM
    pub slc_charge: f64,
    /// Always `hlc_charge + slc_charge`
    pub total_charge: f64,
    /// Muon tracks through this tank, filled by the muon counter
    pub muon_count: u32,
    /// Delay of the earliest HLC/SLC pulse relative to the shower front (ns)
    pub time_delay: f64,
}

impl SensorSignal {
    /// An all-zero signal at the given axis distance
    pub fn empty(sensor: SensorId, lateral_distance: f64) -> Self {
        Self {
            sensor,
            lateral_distance,
            muon_pe: 0.0,
            other_pe: 0.0,
            total_pe: 0.0,
            hlc_charge: 0.0,
            slc_charge: 0.0,
            total_charge: 0.0,
            muon_count: 0,
            time_delay: 0.0,
        }
    }

    /// Whether the tank saw anything at all
    pub fn has_signal(&self) -> bool {
        self.total_pe + self.total_charge != 0.0
    }

    /// Charge per photoelectron in this tank (VEM/PE)
    pub fn charge_scale(&self) -> ShowerResult<f64> {
        if self.total_pe > 0.0 {
            Ok(self.total_charge / self.total_pe)
        } else {
            Err(ShowerError::DegenerateGeometry { sensor: self.sensor })
        }
    }

    /// Muon PE converted to VEM with the tank's own scale
    pub fn muon_charge(&self) -> ShowerResult<f64> {
        Ok(self.charge_scale()? * self.muon_pe)
    }

    /// Non-muon PE converted to VEM with the tank's own scale
    pub fn other_charge(&self) -> ShowerResult<f64> {
        Ok(self.charge_scale()? * self.other_pe)
    }
}

/// Per-tank signals of one event plus stream bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSignals {
    /// One entry per tank of the geometry, ordered by (station, tank)
    pub signals: BTreeMap<SensorId, SensorSignal>,
    /// Muon pulses that passed the charge and time selection
    pub muon_pulses: u32,
}

impl AggregatedSignals {
    pub fn total_muon_pe(&self) -> f64 {
        self.signals.values().map(|s| s.muon_pe).sum()
    }
}

/// Builds complete per-tank signal maps from categorized pulse streams
pub struct SignalAggregator<'g> {
    geometry: &'g GeometryModel,
    time_window_ns: f64,
}

impl<'g> SignalAggregator<'g> {
    pub fn new(geometry: &'g GeometryModel, config: &AggregationConfig) -> Self {
        Self {
            geometry,
            time_window_ns: config.time_window_ns,
        }
    }

    /// Pulse selection: positive charge, within the window around `reference_time`
    pub fn accepts(&self, pulse: &Pulse, reference_time: f64) -> bool {
        pulse.charge > 0.0 && (reference_time - pulse.time).abs() <= self.time_window_ns
    }

    /// Axis distance of every tank in the geometry
    pub fn lateral_distances(&self, axis: &ShowerAxis) -> BTreeMap<SensorId, f64> {
        let projector = ShowerAxisProjector::new(axis);
        self.geometry
            .sensors()
            .map(|sensor| (sensor.id, projector.lateral_distance(&sensor.position)))
            .collect()
    }

    /// Aggregate all streams of one event relative to `axis`.
    ///
    /// Rejected pulses are dropped silently. An accepted pulse on a channel
    /// the geometry does not know aborts with `GeometryLookupMiss`.
    pub fn aggregate(
        &self,
        axis: &ShowerAxis,
        streams: &BTreeMap<PulseCategory, Vec<Pulse>>,
    ) -> ShowerResult<AggregatedSignals> {
        let distances = self.lateral_distances(axis);
        let mut signals: BTreeMap<SensorId, SensorSignal> = distances
            .iter()
            .map(|(id, distance)| (*id, SensorSignal::empty(*id, *distance)))
            .collect();
        let mut earliest: BTreeMap<SensorId, f64> = BTreeMap::new();
        let mut muon_pulses = 0u32;

        for (category, pulses) in streams {
            for pulse in pulses.iter().filter(|p| self.accepts(p, axis.time)) {
                let id = self.geometry.sensor_for_channel(pulse.channel)?;
                let Some(signal) = signals.get_mut(&id) else {
                    return Err(ShowerError::GeometryLookupMiss { channel: pulse.channel });
                };
                match category {
                    PulseCategory::Muon => {
                        signal.muon_pe += pulse.charge;
                        muon_pulses += 1;
                    }
                    PulseCategory::Electron
                    | PulseCategory::ElectronFromChargedMesons
                    | PulseCategory::Gamma
                    | PulseCategory::GammaFromChargedMesons
                    | PulseCategory::Hadron => signal.other_pe += pulse.charge,
                    PulseCategory::Hlc => signal.hlc_charge += pulse.charge,
                    PulseCategory::Slc => signal.slc_charge += pulse.charge,
                }
                if category.is_charge() {
                    let first = earliest.entry(id).or_insert(pulse.time);
                    *first = first.min(pulse.time);
                }
            }
        }

        let projector = ShowerAxisProjector::new(axis);
        for signal in signals.values_mut() {
            signal.total_pe = signal.muon_pe + signal.other_pe;
            signal.total_charge = signal.hlc_charge + signal.slc_charge;
            if let (Some(time), Some(sensor)) = (earliest.get(&signal.sensor), self.geometry.sensor(signal.sensor)) {
                signal.time_delay = projector.time_delay(&sensor.position, *time);
            }
        }

        debug!(
            sensors = signals.len(),
            hit = signals.values().filter(|s| s.has_signal()).count(),
            muon_pulses,
            "aggregated event pulses"
        );

        Ok(AggregatedSignals { signals, muon_pulses })
    }
}
