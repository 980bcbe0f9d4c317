//! Projection of detector positions onto a shower axis

use nalgebra::Vector3;

use crate::core::constants::SPEED_OF_LIGHT_M_PER_NS;
use crate::core::types::ShowerAxis;

/// Computes axis distances and time delays relative to one shower axis
#[derive(Debug, Clone, Copy)]
pub struct ShowerAxisProjector<'a> {
    axis: &'a ShowerAxis,
}

impl<'a> ShowerAxisProjector<'a> {
    pub fn new(axis: &'a ShowerAxis) -> Self {
        Self { axis }
    }

    pub fn axis(&self) -> &ShowerAxis {
        self.axis
    }

    /// Perpendicular distance from `point` to the infinite axis line.
    ///
    /// The squared difference is clamped at zero: distance to the line can
    /// never exceed distance to the core, but round-off can make it negative.
    pub fn lateral_distance(&self, point: &Vector3<f64>) -> f64 {
        let r = point - self.axis.core;
        let along = r.dot(&self.axis.direction.into_inner());
        (r.norm_squared() - along * along).max(0.0).sqrt()
    }

    /// Arrival time delay of a pulse at `point` relative to the shower front
    pub fn time_delay(&self, point: &Vector3<f64>, pulse_time: f64) -> f64 {
        let n = &self.axis.direction;
        let d = point - self.axis.core;
        let nz = (1.0 - n.x * n.x - n.y * n.y).max(0.0).sqrt();
        self.axis.time + n.x * d.x + n.y * d.y - nz * d.z / SPEED_OF_LIGHT_M_PER_NS - pulse_time
    }
}

/// Horizontal distance of a point from a core position
pub fn horizontal_distance(point: &Vector3<f64>, core: &Vector3<f64>) -> f64 {
    (point.xy() - core.xy()).norm()
}
