//! Pulse streams and per-event frames handed over by the data reader

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::ChannelId;

/// A single reconstructed pulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub channel: ChannelId,
    /// PE for component streams, VEM for HLC/SLC streams
    pub charge: f64,
    /// ns
    pub time: f64,
}

impl Pulse {
    pub fn new(channel: ChannelId, charge: f64, time: f64) -> Self {
        Self { channel, charge, time }
    }
}

/// Labelled pulse streams present in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PulseCategory {
    Muon,
    Electron,
    ElectronFromChargedMesons,
    Gamma,
    GammaFromChargedMesons,
    Hadron,
    Hlc,
    Slc,
}

impl PulseCategory {
    pub const ALL: [PulseCategory; 8] = [
        PulseCategory::Muon,
        PulseCategory::Electron,
        PulseCategory::ElectronFromChargedMesons,
        PulseCategory::Gamma,
        PulseCategory::GammaFromChargedMesons,
        PulseCategory::Hadron,
        PulseCategory::Hlc,
        PulseCategory::Slc,
    ];

    /// Name of the frame key holding this stream
    pub fn frame_key(&self) -> &'static str {
        match self {
            PulseCategory::Muon => "IceTopComponentPulses_Muon",
            PulseCategory::Electron => "IceTopComponentPulses_Electron",
            PulseCategory::ElectronFromChargedMesons => "IceTopComponentPulses_ElectronFromChargedMesons",
            PulseCategory::Gamma => "IceTopComponentPulses_Gamma",
            PulseCategory::GammaFromChargedMesons => "IceTopComponentPulses_GammaFromChargedMesons",
            PulseCategory::Hadron => "IceTopComponentPulses_Hadron",
            PulseCategory::Hlc => "OfflineIceTopHLCVEMPulses",
            PulseCategory::Slc => "OfflineIceTopSLCVEMPulses",
        }
    }

    /// Whether the stream carries calibrated charge rather than PE
    pub fn is_charge(&self) -> bool {
        matches!(self, PulseCategory::Hlc | PulseCategory::Slc)
    }
}

/// Auxiliary data blocks a frame may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataBlock {
    McPrimary,
    McPrimaryInfo,
    Reconstruction,
    Pulses(PulseCategory),
}

impl DataBlock {
    /// Blocks an event must carry to enter the analysed sample
    pub fn required() -> Vec<DataBlock> {
        let mut blocks = vec![DataBlock::McPrimary, DataBlock::McPrimaryInfo];
        blocks.extend(PulseCategory::ALL.iter().map(|c| DataBlock::Pulses(*c)));
        blocks
    }
}

/// Event identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventHeader {
    pub run: u32,
    pub event: u32,
}

/// Simulated primary as delivered by the reader
#[derive(Debug, Clone, PartialEq)]
pub struct McPrimary {
    pub type_name: String,
    /// GeV, as stored by the simulation
    pub energy_gev: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub zenith: f64,
    pub azimuth: f64,
    pub time: f64,
}

/// Reconstruction fit results as delivered by the reader
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionBlock {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub zenith: f64,
    pub azimuth: f64,
    pub time: f64,
    pub e_proton: f64,
    pub e_iron: f64,
    pub s125: f64,
    pub s500: f64,
}

/// One physics frame with optional blocks
#[derive(Debug, Clone, Default)]
pub struct EventFrame {
    pub header: EventHeader,
    pub mc_primary: Option<McPrimary>,
    pub has_mc_primary_info: bool,
    pub reconstruction: Option<ReconstructionBlock>,
    /// Five-station trigger filter condition
    pub sta5_triggered: bool,
    pub pulses: BTreeMap<PulseCategory, Vec<Pulse>>,
}

impl EventFrame {
    pub fn has_block(&self, block: DataBlock) -> bool {
        match block {
            DataBlock::McPrimary => self.mc_primary.is_some(),
            DataBlock::McPrimaryInfo => self.has_mc_primary_info,
            DataBlock::Reconstruction => self.reconstruction.is_some(),
            DataBlock::Pulses(category) => self.pulses.contains_key(&category),
        }
    }

    /// Pulses of one category; absent streams read as empty
    pub fn pulses(&self, category: PulseCategory) -> &[Pulse] {
        self.pulses.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}
