//! Detector geometry: channel positions and the derived tank table

use nalgebra::Vector3;
use std::collections::{BTreeMap, HashMap};

use crate::core::constants::TANK_CENTER_DEPTH_OFFSET_M;
use crate::core::types::{ChannelId, SensorId, SensorPosition};
use crate::validation::error::{ShowerError, ShowerResult};

/// Read-only detector geometry, loaded once per run and shared by reference
#[derive(Debug, Clone)]
pub struct GeometryModel {
    channels: HashMap<ChannelId, Vector3<f64>>,
    sensors: BTreeMap<SensorId, SensorPosition>,
}

impl GeometryModel {
    /// Build the geometry from a channel position table.
    ///
    /// Channels that do not belong to a tank are kept for lookups but do not
    /// produce sensors. Every tank must have both of its readout channels.
    pub fn from_channels<I>(channels: I) -> ShowerResult<Self>
    where
        I: IntoIterator<Item = (ChannelId, Vector3<f64>)>,
    {
        let mut table = HashMap::new();
        for (channel, position) in channels {
            if table.insert(channel, position).is_some() {
                return Err(ShowerError::InvalidGeometry {
                    reason: format!("duplicate channel {}", channel),
                });
            }
        }

        let mut sensors = BTreeMap::new();
        for channel in table.keys() {
            let Some(id) = channel.sensor() else {
                continue;
            };
            if sensors.contains_key(&id) {
                continue;
            }
            let [first, second] = id.channels();
            let (Some(p1), Some(p2)) = (table.get(&first), table.get(&second)) else {
                return Err(ShowerError::InvalidGeometry {
                    reason: format!("{} is missing one of its readout channels", id),
                });
            };
            let volume_center = Vector3::new(
                (p1.x + p2.x) / 2.0,
                (p1.y + p2.y) / 2.0,
                p1.z - TANK_CENTER_DEPTH_OFFSET_M,
            );
            let position = if id.distance_channel() == first { *p1 } else { *p2 };
            sensors.insert(id, SensorPosition { id, position, volume_center });
        }

        if sensors.is_empty() {
            return Err(ShowerError::InvalidGeometry {
                reason: "no tank channels in geometry".to_string(),
            });
        }

        Ok(Self { channels: table, sensors })
    }

    /// Position of a readout channel
    pub fn channel_position(&self, channel: ChannelId) -> ShowerResult<&Vector3<f64>> {
        self.channels
            .get(&channel)
            .ok_or(ShowerError::GeometryLookupMiss { channel })
    }

    /// Tank read out by a channel; unknown or non-tank channels are a lookup miss
    pub fn sensor_for_channel(&self, channel: ChannelId) -> ShowerResult<SensorId> {
        channel
            .sensor()
            .filter(|id| self.channels.contains_key(&channel) && self.sensors.contains_key(id))
            .ok_or(ShowerError::GeometryLookupMiss { channel })
    }

    pub fn sensor(&self, id: SensorId) -> Option<&SensorPosition> {
        self.sensors.get(&id)
    }

    /// All tanks in canonical (station, tank) order
    pub fn sensors(&self) -> impl Iterator<Item = &SensorPosition> {
        self.sensors.values()
    }

    pub fn sensor_ids(&self) -> impl Iterator<Item = SensorId> + '_ {
        self.sensors.keys().copied()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }
}

/// Square grid of stations with two tanks each, for tests
#[cfg(test)]
pub(crate) fn grid_geometry(side: u16, spacing: f64) -> GeometryModel {
    let mut channels = Vec::new();
    for row in 0..side {
        for col in 0..side {
            let station = row * side + col + 1;
            let x = col as f64 * spacing;
            let y = row as f64 * spacing;
            for (module, dx) in [(61u8, -5.0), (62, -4.0), (63, 4.0), (64, 5.0)] {
                channels.push((ChannelId::new(station, module), Vector3::new(x + dx, y, 1945.0)));
            }
        }
    }
    GeometryModel::from_channels(channels).expect("grid geometry is valid")
}
