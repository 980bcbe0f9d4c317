//! Track intersection with cylindrical tank volumes
//!
//! A tank is modelled as an upright cylinder. The track is intersected with
//! the infinite cylindrical surface first; the heights of the two wall
//! crossings are then bracketed against the tank's top and bottom.

use nalgebra::Vector3;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::constants::{TANK_HALF_HEIGHT_M, TANK_RADIUS_M};
use crate::core::geometry::GeometryModel;
use crate::core::types::SensorId;

/// Straight particle track; only the orientation of `direction` matters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub start: Vector3<f64>,
    pub direction: Vector3<f64>,
}

impl Track {
    pub fn new(start: Vector3<f64>, direction: Vector3<f64>) -> Self {
        Self { start, direction }
    }

    pub fn reversed(&self) -> Self {
        Self { start: self.start, direction: -self.direction }
    }
}

/// Ray-cylinder intersection tester for one tank geometry
#[derive(Debug, Clone, Copy)]
pub struct IntersectionTester {
    radius: f64,
    half_height: f64,
}

impl Default for IntersectionTester {
    fn default() -> Self {
        Self {
            radius: TANK_RADIUS_M,
            half_height: TANK_HALF_HEIGHT_M,
        }
    }
}

impl IntersectionTester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tester for a cylinder of custom dimensions
    pub fn with_dimensions(radius: f64, half_height: f64) -> Self {
        Self { radius, half_height }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn half_height(&self) -> f64 {
        self.half_height
    }

    /// Whether the infinite line through `track` passes through the cylinder at `center`
    pub fn intersects(&self, track: &Track, center: &Vector3<f64>) -> bool {
        let r = track.start - center;
        let n = &track.direction;
        let horizontal = n.x * n.x + n.y * n.y;

        if horizontal <= 0.0 {
            return (r.x * r.x + r.y * r.y).sqrt() < self.radius;
        }

        let cross = n.x * r.y - n.y * r.x;
        let arg = horizontal * self.radius * self.radius - cross * cross;
        // Tangent lines touch the wall in a single point and do not count
        if arg <= 0.0 {
            return false;
        }

        let root = arg.sqrt();
        let mid = -(r.x * n.x + r.y * n.y);
        let t1 = (mid - root) / horizontal;
        let t2 = (mid + root) / horizontal;

        let z1 = r.z + n.z * t1;
        let z2 = r.z + n.z * t2;

        let above = z1 > self.half_height && z2 > self.half_height;
        let below = z1 < -self.half_height && z2 < -self.half_height;
        !(above || below)
    }
}

/// Result of counting tracks through the tank array for one shower
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MuonCount {
    /// Tracks that hit at least one tank
    pub total: u32,
    /// Tracks attributed to each tank, every tank present
    pub per_sensor: BTreeMap<SensorId, u32>,
}

/// Counts tracks crossing the tank array, each track at most once
pub struct MuonCounter<'g> {
    geometry: &'g GeometryModel,
    tester: IntersectionTester,
}

impl<'g> MuonCounter<'g> {
    pub fn new(geometry: &'g GeometryModel) -> Self {
        Self::with_tester(geometry, IntersectionTester::default())
    }

    pub fn with_tester(geometry: &'g GeometryModel, tester: IntersectionTester) -> Self {
        Self { geometry, tester }
    }

    /// First tank (in canonical order) the track passes through
    pub fn first_hit(&self, track: &Track) -> Option<SensorId> {
        self.geometry
            .sensors()
            .find(|sensor| self.tester.intersects(track, &sensor.volume_center))
            .map(|sensor| sensor.id)
    }

    /// Count tracks given relative to the shower core.
    ///
    /// Each item is a horizontal offset from `core` and a direction; tracks
    /// start at the core height.
    pub fn count<I>(&self, core: &Vector3<f64>, tracks: I) -> MuonCount
    where
        I: IntoIterator<Item = (f64, f64, Vector3<f64>)>,
    {
        let mut result = MuonCount {
            total: 0,
            per_sensor: self.geometry.sensor_ids().map(|id| (id, 0)).collect(),
        };

        let mut examined = 0usize;
        for (dx, dy, direction) in tracks {
            examined += 1;
            let track = Track::new(Vector3::new(core.x + dx, core.y + dy, core.z), direction);
            if let Some(id) = self.first_hit(&track) {
                result.total += 1;
                *result.per_sensor.entry(id).or_insert(0) += 1;
            }
        }

        debug!(examined, hits = result.total, "counted muon tracks through tanks");
        result
    }
}
