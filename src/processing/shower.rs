//! Per-event shower records and the species-split catalog

use nalgebra::Vector3;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::algorithms::intersection::MuonCount;
use crate::core::geometry::GeometryModel;
use crate::core::types::{PrimarySpecies, PrimaryTruth, Reconstruction, SensorId};
use crate::processing::aggregator::{SensorSignal, SignalAggregator};
use crate::processing::pulses::{DataBlock, EventFrame, EventHeader, PulseCategory};
use crate::utils::config::AggregationConfig;
use crate::validation::error::{ErrorScope, ShowerError, ShowerResult};

/// Everything the analysis keeps about one simulated shower
#[derive(Debug, Clone, PartialEq)]
pub struct ShowerRecord {
    header: EventHeader,
    primary: PrimaryTruth,
    reconstruction: Reconstruction,
    muon_pulses: u32,
    total_muons: Option<u32>,
    signals: BTreeMap<SensorId, SensorSignal>,
}

impl ShowerRecord {
    pub fn run(&self) -> u32 {
        self.header.run
    }

    pub fn event(&self) -> u32 {
        self.header.event
    }

    pub fn header(&self) -> EventHeader {
        self.header
    }

    pub fn primary(&self) -> &PrimaryTruth {
        &self.primary
    }

    pub fn species(&self) -> PrimarySpecies {
        self.primary.species
    }

    pub fn reconstruction(&self) -> &Reconstruction {
        &self.reconstruction
    }

    /// Accepted muon pulses across the array
    pub fn muon_pulses(&self) -> u32 {
        self.muon_pulses
    }

    /// Muon tracks hitting any tank, once counted
    pub fn total_muons(&self) -> Option<u32> {
        self.total_muons
    }

    /// Signals of every tank, ordered by (station, tank)
    pub fn signals(&self) -> &BTreeMap<SensorId, SensorSignal> {
        &self.signals
    }

    pub fn signal(&self, id: SensorId) -> Option<&SensorSignal> {
        self.signals.get(&id)
    }

    /// Record with muon track counts attached to each tank
    pub fn with_muon_count(mut self, count: &MuonCount) -> Self {
        for (id, signal) in self.signals.iter_mut() {
            signal.muon_count = count.per_sensor.get(id).copied().unwrap_or(0);
        }
        self.total_muons = Some(count.total);
        self
    }
}

/// Assembles shower records from frames, failing fast on missing blocks
pub struct ShowerBuilder<'g> {
    aggregator: SignalAggregator<'g>,
}

impl<'g> ShowerBuilder<'g> {
    pub fn new(geometry: &'g GeometryModel, config: &AggregationConfig) -> Self {
        Self {
            aggregator: SignalAggregator::new(geometry, config),
        }
    }

    pub fn build(&self, frame: &EventFrame) -> ShowerResult<ShowerRecord> {
        let header = frame.header;
        let missing = |block| ShowerError::MissingDataBlock {
            run: header.run,
            event: header.event,
            block,
        };

        let mc = frame.mc_primary.as_ref().ok_or_else(|| missing(DataBlock::McPrimary))?;
        let species = PrimarySpecies::from_type_name(&mc.type_name);
        if species == PrimarySpecies::Unknown {
            return Err(ShowerError::UnrecognizedPrimaryType {
                run: header.run,
                event: header.event,
                type_name: mc.type_name.clone(),
            });
        }

        let reco = frame
            .reconstruction
            .as_ref()
            .ok_or_else(|| missing(DataBlock::Reconstruction))?;

        if let Some(category) = PulseCategory::ALL
            .iter()
            .find(|c| !frame.has_block(DataBlock::Pulses(**c)))
        {
            return Err(missing(DataBlock::Pulses(*category)));
        }

        let primary = PrimaryTruth {
            species,
            energy: mc.energy_gev * 1e9,
            position: Vector3::new(mc.x, mc.y, mc.z),
            zenith: mc.zenith,
            azimuth: mc.azimuth,
            time: mc.time,
        };
        let reconstruction = Reconstruction {
            core: Vector3::new(reco.x, reco.y, reco.z),
            zenith: reco.zenith,
            azimuth: reco.azimuth,
            time: reco.time,
            energy_proton: reco.e_proton,
            energy_iron: reco.e_iron,
            s125: reco.s125,
            s500: reco.s500,
        };

        let aggregated = self.aggregator.aggregate(&primary.axis(), &frame.pulses)?;

        Ok(ShowerRecord {
            header,
            primary,
            reconstruction,
            muon_pulses: aggregated.muon_pulses,
            total_muons: None,
            signals: aggregated.signals,
        })
    }
}

/// Result collections split by primary species
#[derive(Debug, Clone, Default)]
pub struct ShowerCatalog {
    proton: Vec<ShowerRecord>,
    iron: Vec<ShowerRecord>,
    skipped: usize,
}

impl ShowerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a record under its species; unknown species are never stored
    pub fn insert(&mut self, record: ShowerRecord) -> bool {
        match record.species() {
            PrimarySpecies::Proton => self.proton.push(record),
            PrimarySpecies::Iron => self.iron.push(record),
            PrimarySpecies::Unknown => {
                warn!(run = record.run(), event = record.event(), "discarding shower of unknown species");
                self.skipped += 1;
                return false;
            }
        }
        true
    }

    /// Build and file one frame.
    ///
    /// Event-local failures are logged and counted; run-level failures are
    /// returned to the caller.
    pub fn process(&mut self, builder: &ShowerBuilder<'_>, frame: &EventFrame) -> ShowerResult<bool> {
        match builder.build(frame) {
            Ok(record) => {
                debug!(run = record.run(), event = record.event(), species = %record.species(), "built shower");
                Ok(self.insert(record))
            }
            Err(error) if error.scope() == ErrorScope::Event => {
                warn!(%error, "event will not be saved");
                self.skipped += 1;
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Process a whole batch, stopping at the first run-level error
    pub fn process_all<'f, I>(&mut self, builder: &ShowerBuilder<'_>, frames: I) -> ShowerResult<()>
    where
        I: IntoIterator<Item = &'f EventFrame>,
    {
        for frame in frames {
            self.process(builder, frame)?;
        }
        info!(
            proton = self.proton.len(),
            iron = self.iron.len(),
            skipped = self.skipped,
            "finished shower batch"
        );
        Ok(())
    }

    pub fn showers(&self, species: PrimarySpecies) -> &[ShowerRecord] {
        match species {
            PrimarySpecies::Proton => &self.proton,
            PrimarySpecies::Iron => &self.iron,
            PrimarySpecies::Unknown => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShowerRecord> {
        self.proton.iter().chain(self.iron.iter())
    }

    pub fn len(&self) -> usize {
        self.proton.len() + self.iron.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames that produced no stored record
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Frame fixtures shared by the processing tests
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::core::types::ChannelId;
    use crate::processing::pulses::{McPrimary, Pulse, ReconstructionBlock};

    pub fn frame(type_name: &str, run: u32, event: u32) -> EventFrame {
        let mut frame = EventFrame {
            header: EventHeader { run, event },
            mc_primary: Some(McPrimary {
                type_name: type_name.to_string(),
                energy_gev: 3.0e6,
                x: 0.0,
                y: 0.0,
                z: 1945.0,
                zenith: 0.0,
                azimuth: 0.0,
                time: 5000.0,
            }),
            has_mc_primary_info: true,
            reconstruction: Some(ReconstructionBlock {
                x: 10.0,
                y: 0.0,
                z: 1945.0,
                zenith: 0.1,
                azimuth: 0.0,
                time: 5000.0,
                e_proton: 2.9e15,
                e_iron: 3.4e15,
                s125: 5.0,
                s500: 0.4,
            }),
            sta5_triggered: true,
            pulses: BTreeMap::new(),
        };
        for category in PulseCategory::ALL {
            frame.pulses.insert(category, Vec::new());
        }
        frame
            .pulses
            .insert(PulseCategory::Muon, vec![Pulse::new(ChannelId::new(1, 61), 4.0, 5010.0)]);
        frame
            .pulses
            .insert(PulseCategory::Hlc, vec![Pulse::new(ChannelId::new(1, 62), 8.0, 5005.0)]);
        frame
    }
}
