use crate::models::error::CameraError;
use crate::models::sensor::{Resolution, SensorLocation};
use crate::processing::capture_sequence::CaptureSequence;
use crate::traits::camera_provider::{CameraProvider, Completion, SensorDevice};

/// Owns one open camera sensor handle.
///
/// Lifecycle: `open` → `configure` → (`set_encode_orientation`, focus,
/// capture)* → `dispose`. Once disposed the session stays closed; every
/// hardware operation then fails with `NoActiveSession`. Dropping an open
/// session disposes it.
pub struct CaptureDeviceSession {
    device: Option<Box<dyn SensorDevice>>,
    location: SensorLocation,
    sensor_rotation: i32,
    preview_resolution: Option<Resolution>,
    capture_resolution: Option<Resolution>,
    encode_orientation: Option<i32>,
}

impl CaptureDeviceSession {
    /// Acquire the sensor at `location` from `provider`.
    pub fn open(
        provider: &mut dyn CameraProvider,
        location: SensorLocation,
        initial_resolution: Resolution,
    ) -> Result<Self, CameraError> {
        if initial_resolution.is_empty() {
            return Err(CameraError::UnsupportedResolution {
                location,
                resolution: initial_resolution,
            });
        }

        let device = provider.open(location, initial_resolution)?;
        if device.sensor_location() != location {
            log::warn!(
                "Requested {} sensor but device reports {}",
                location,
                device.sensor_location()
            );
        }

        let sensor_rotation = device.sensor_rotation();
        log::info!(
            "Opened {} sensor at {} (sensor rotation {} degrees)",
            location,
            initial_resolution,
            sensor_rotation
        );

        Ok(Self {
            device: Some(device),
            location,
            sensor_rotation,
            preview_resolution: None,
            capture_resolution: None,
            encode_orientation: None,
        })
    }

    /// Set preview and capture resolutions. Required before any capture.
    pub fn configure(&mut self, preview: Resolution, capture: Resolution) -> Result<(), CameraError> {
        let location = self.location;
        for resolution in [preview, capture] {
            if resolution.is_empty() {
                return Err(CameraError::UnsupportedResolution { location, resolution });
            }
        }

        let device = self.device_mut()?;
        device.set_preview_resolution(preview)?;
        device.set_capture_resolution(capture)?;

        self.preview_resolution = Some(preview);
        self.capture_resolution = Some(capture);
        log::debug!("Configured {} sensor: preview {}, capture {}", location, preview, capture);
        Ok(())
    }

    /// Apply orientation compensation so encoded stills are upright.
    pub fn set_encode_orientation(&mut self, degrees: i32) -> Result<(), CameraError> {
        self.device_mut()?.set_encode_orientation(degrees)?;
        self.encode_orientation = Some(degrees);
        Ok(())
    }

    /// Start an autofocus pass. `done` is not called if this returns an error.
    pub fn focus(&mut self, done: Completion<()>) -> Result<(), CameraError> {
        self.device_mut()?.focus(done);
        Ok(())
    }

    pub fn prepare_capture_sequence(&mut self, sequence: &CaptureSequence) -> Result<(), CameraError> {
        if self.capture_resolution.is_none() {
            return Err(CameraError::CaptureFailed("session not configured".into()));
        }
        if sequence.is_empty() {
            return Err(CameraError::CaptureFailed("capture sequence has no frames".into()));
        }
        self.device_mut()?.prepare_capture_sequence(sequence)
    }

    /// Start a prepared sequence. `done` is not called if this returns an error.
    pub fn start_capture(
        &mut self,
        sequence: CaptureSequence,
        done: Completion<CaptureSequence>,
    ) -> Result<(), CameraError> {
        self.device_mut()?.start_capture(sequence, done);
        Ok(())
    }

    /// Release the hardware. Idempotent; close errors are logged, never returned.
    pub fn dispose(&mut self) {
        let Some(mut device) = self.device.take() else {
            return;
        };
        match device.close() {
            Ok(()) => log::info!("Disposed {} sensor session", self.location),
            Err(e) => log::warn!("Failed to close {} sensor cleanly: {}", self.location, e),
        }
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_configured(&self) -> bool {
        self.capture_resolution.is_some()
    }

    pub fn location(&self) -> SensorLocation {
        self.location
    }

    pub fn sensor_rotation(&self) -> i32 {
        self.sensor_rotation
    }

    pub fn preview_resolution(&self) -> Option<Resolution> {
        self.preview_resolution
    }

    pub fn capture_resolution(&self) -> Option<Resolution> {
        self.capture_resolution
    }

    pub fn encode_orientation(&self) -> Option<i32> {
        self.encode_orientation
    }

    fn device_mut(&mut self) -> Result<&mut Box<dyn SensorDevice>, CameraError> {
        self.device.as_mut().ok_or(CameraError::NoActiveSession)
    }
}

impl Drop for CaptureDeviceSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
