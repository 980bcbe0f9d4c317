//! Physical constants and detector parameters

/// Propagation speed used by the time-delay diagnostic (m/ns)
pub const SPEED_OF_LIGHT_M_PER_NS: f64 = 0.3;

/// Half-width of the pulse acceptance window around the reference time (ns)
pub const PULSE_TIME_WINDOW_NS: f64 = 1000.0;

/// Tank inner radius plus a 1 cm tolerance (m)
pub const TANK_RADIUS_M: f64 = 1.82 / 2.0 + 0.01;

/// Half of the tank height plus a 2 cm tolerance (m)
pub const TANK_HALF_HEIGHT_M: f64 = (0.90 + 0.02) / 2.0;

/// The centre of the ice volume sits this far below the readout channel (m)
pub const TANK_CENTER_DEPTH_OFFSET_M: f64 = 0.2;

/// Optical-module numbers read out by tank 1
pub const TANK_ONE_CHANNELS: [u8; 2] = [61, 62];

/// Optical-module numbers read out by tank 2
pub const TANK_TWO_CHANNELS: [u8; 2] = [63, 64];

/// Optical modules whose positions stand for tank 1 and tank 2 in axis distances
pub const DISTANCE_CHANNELS: [u8; 2] = [62, 63];
