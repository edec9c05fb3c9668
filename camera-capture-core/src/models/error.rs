use thiserror::Error;

use super::sensor::{Resolution, SensorLocation};

/// Errors that can occur during camera session and capture operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("unsupported resolution {resolution} for {location} sensor")]
    UnsupportedResolution {
        location: SensorLocation,
        resolution: Resolution,
    },

    #[error("focus failed: {0}")]
    FocusFailed(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("no active camera session")]
    NoActiveSession,

    #[error("no alternate sensor location ({available} available)")]
    NoAlternateSensor { available: usize },

    #[error("camera session busy")]
    SessionBusy,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("camera worker stopped")]
    WorkerStopped,
}
