use serde::{Deserialize, Serialize};

use super::error::CameraError;
use super::sensor::{Resolution, SensorLocation};
use crate::processing::orientation::FrontSensorConvention;

/// Configuration for a camera controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfiguration {
    /// Sensor opened by `CameraController::open_default` (default: back).
    pub initial_sensor: SensorLocation,

    /// Resolution passed to the device when it is opened (default: 640x480).
    pub initial_resolution: Resolution,

    /// Live preview resolution (default: 640x480).
    pub preview_resolution: Resolution,

    /// Still capture resolution (default: 640x480).
    pub capture_resolution: Resolution,

    /// Rotation convention for the front sensor, applied on every open path.
    pub front_convention: FrontSensorConvention,
}

impl CameraConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        for (name, size) in [
            ("initial", self.initial_resolution),
            ("preview", self.preview_resolution),
            ("capture", self.capture_resolution),
        ] {
            if size.is_empty() {
                return Err(format!("{} resolution must be non-zero, got {}", name, size));
            }
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CameraError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CameraError::ConfigurationFailed(format!("invalid configuration: {}", e)))?;
        config.validate().map_err(CameraError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            initial_sensor: SensorLocation::Back,
            initial_resolution: Resolution::VGA,
            preview_resolution: Resolution::VGA,
            capture_resolution: Resolution::VGA,
            front_convention: FrontSensorConvention::Negate,
        }
    }
}
