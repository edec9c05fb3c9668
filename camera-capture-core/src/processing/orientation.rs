//! Sensor orientation compensation.
//!
//! The same computed value drives the live preview rotation and the device's
//! encode orientation, so what the user sees and what gets saved agree.

use serde::{Deserialize, Serialize};

use crate::models::sensor::SensorLocation;

/// How the front sensor's mounting rotation is compensated.
///
/// The front sensor is mirrored, so its rotation runs opposite to the back
/// sensor's. Both conventions agree for quarter-turn mountings (90 → 270)
/// and differ for 0/180 mountings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontSensorConvention {
    /// `-rotation`, normalized.
    #[default]
    Negate,
    /// `rotation + 180`, normalized.
    HalfTurn,
}

/// Rotation (and mirroring) applied to preview and encoded stills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrientationTransform {
    /// Clockwise rotation in degrees, always in `[0, 360)`.
    pub rotation_degrees: i32,
    pub mirrored: bool,
}

impl OrientationTransform {
    /// Whether width and height swap under this transform.
    pub fn is_quarter_turn(&self) -> bool {
        self.rotation_degrees % 180 != 0
    }
}

/// Pure orientation calculator for one front-sensor convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrientationCalculator {
    convention: FrontSensorConvention,
}

impl OrientationCalculator {
    pub fn new(convention: FrontSensorConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> FrontSensorConvention {
        self.convention
    }

    /// Display/encode rotation for a sensor reporting `sensor_rotation` degrees.
    pub fn rotation(&self, location: SensorLocation, sensor_rotation: i32) -> i32 {
        let raw = match (location, self.convention) {
            (SensorLocation::Back, _) => sensor_rotation,
            (SensorLocation::Front, FrontSensorConvention::Negate) => -sensor_rotation,
            (SensorLocation::Front, FrontSensorConvention::HalfTurn) => sensor_rotation + 180,
        };
        normalize_degrees(raw)
    }

    pub fn transform(&self, location: SensorLocation, sensor_rotation: i32) -> OrientationTransform {
        OrientationTransform {
            rotation_degrees: self.rotation(location, sensor_rotation),
            mirrored: location == SensorLocation::Front,
        }
    }
}

/// Map any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}
