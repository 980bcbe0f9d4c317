//! Core data types for the shower signal pipeline

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::constants::{DISTANCE_CHANNELS, TANK_ONE_CHANNELS, TANK_TWO_CHANNELS};

/// Raw readout channel: station (string) number and optical-module number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    pub station: u16,
    pub module: u8,
}

impl ChannelId {
    pub fn new(station: u16, module: u8) -> Self {
        Self { station, module }
    }

    /// Tank this channel reads out, if it is a tank channel at all.
    ///
    /// Each tank is read out by two adjacent modules, so both map to the
    /// same sensor.
    pub fn sensor(&self) -> Option<SensorId> {
        if TANK_ONE_CHANNELS.contains(&self.module) {
            Some(SensorId::new(self.station, 1))
        } else if TANK_TWO_CHANNELS.contains(&self.module) {
            Some(SensorId::new(self.station, 2))
        } else {
            None
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OMKey({},{})", self.station, self.module)
    }
}

/// Tank identifier, ordered by (station, tank index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SensorId {
    pub station: u16,
    pub tank: u8,
}

impl SensorId {
    pub fn new(station: u16, tank: u8) -> Self {
        Self { station, tank }
    }

    /// The two channels that read out this tank, primary channel first
    pub fn channels(&self) -> [ChannelId; 2] {
        let modules = if self.tank == 1 { TANK_ONE_CHANNELS } else { TANK_TWO_CHANNELS };
        [
            ChannelId::new(self.station, modules[0]),
            ChannelId::new(self.station, modules[1]),
        ]
    }

    /// Channel whose position is used for this tank's axis distance
    pub fn distance_channel(&self) -> ChannelId {
        let index = if self.tank == 1 { 0 } else { 1 };
        ChannelId::new(self.station, DISTANCE_CHANNELS[index])
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Station{:02}_Tank{}", self.station, self.tank)
    }
}

/// Position of one tank in detector coordinates (m)
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPosition {
    pub id: SensorId,
    /// Position of the tank's distance channel, used for axis distances
    pub position: Vector3<f64>,
    /// Centre of the tank's sensitive volume, used for track intersection
    pub volume_center: Vector3<f64>,
}

/// Shower axis: core, unit direction pointing back along the trajectory, core time
#[derive(Debug, Clone, PartialEq)]
pub struct ShowerAxis {
    pub core: Vector3<f64>,
    pub direction: Unit<Vector3<f64>>,
    pub time: f64,
}

impl ShowerAxis {
    pub fn new(core: Vector3<f64>, direction: Unit<Vector3<f64>>, time: f64) -> Self {
        Self { core, direction, time }
    }

    /// Build an axis from incoming zenith and azimuth angles (radians)
    pub fn from_angles(core: Vector3<f64>, zenith: f64, azimuth: f64, time: f64) -> Self {
        Self::new(core, axis_direction(zenith, azimuth), time)
    }
}

/// Unit vector pointing back along a trajectory arriving from (zenith, azimuth)
pub fn axis_direction(zenith: f64, azimuth: f64) -> Unit<Vector3<f64>> {
    let (sin_zen, cos_zen) = zenith.sin_cos();
    let (sin_azi, cos_azi) = azimuth.sin_cos();
    Unit::new_normalize(Vector3::new(
        -sin_zen * cos_azi,
        -sin_zen * sin_azi,
        -cos_zen,
    ))
}

/// Primary particle species retained by the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimarySpecies {
    Proton,
    Iron,
    Unknown,
}

impl PrimarySpecies {
    /// Map a simulation particle type name onto a species
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "PPlus" => PrimarySpecies::Proton,
            "Fe56Nucleus" => PrimarySpecies::Iron,
            _ => PrimarySpecies::Unknown,
        }
    }
}

impl fmt::Display for PrimarySpecies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimarySpecies::Proton => write!(f, "proton"),
            PrimarySpecies::Iron => write!(f, "iron"),
            PrimarySpecies::Unknown => write!(f, "unknown"),
        }
    }
}

/// Simulated primary particle truth
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryTruth {
    pub species: PrimarySpecies,
    /// Energy in eV
    pub energy: f64,
    pub position: Vector3<f64>,
    pub zenith: f64,
    pub azimuth: f64,
    pub time: f64,
}

impl PrimaryTruth {
    pub fn axis(&self) -> ShowerAxis {
        ShowerAxis::from_angles(self.position, self.zenith, self.azimuth, self.time)
    }

    /// Horizontal distance of the true core from the detector centre
    pub fn core_distance(&self) -> f64 {
        self.position.xy().norm()
    }
}

/// Output of the shower reconstruction
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub core: Vector3<f64>,
    pub zenith: f64,
    pub azimuth: f64,
    pub time: f64,
    /// Energy estimate under a proton hypothesis (eV)
    pub energy_proton: f64,
    /// Energy estimate under an iron hypothesis (eV)
    pub energy_iron: f64,
    /// Fitted signal at 125 m from the axis (VEM)
    pub s125: f64,
    /// Fitted signal at 500 m from the axis (VEM)
    pub s500: f64,
}

impl Reconstruction {
    pub fn axis(&self) -> ShowerAxis {
        ShowerAxis::from_angles(self.core, self.zenith, self.azimuth, self.time)
    }

    /// Horizontal distance of the reconstructed core from the detector centre
    pub fn core_distance(&self) -> f64 {
        self.core.xy().norm()
    }
}
