use crate::models::error::CameraError;
use crate::models::sensor::{Resolution, SensorLocation};
use crate::processing::capture_sequence::CaptureSequence;

/// Callback invoked when an asynchronous hardware operation finishes.
///
/// Backends may call it from any thread, exactly once.
pub type Completion<T> = Box<dyn FnOnce(Result<T, CameraError>) + Send + 'static>;

/// Interface for platform-specific camera hardware.
///
/// Implemented by:
/// - `VirtualCamera` (software sensors, `camera-capture-virtual`)
pub trait CameraProvider: Send {
    /// Sensor locations present on the device, in hardware-reported order.
    fn available_sensor_locations(&self) -> Vec<SensorLocation>;

    /// Whether the sensor at `location` supports autofocus.
    fn is_focus_supported(&self, location: SensorLocation) -> bool;

    /// Acquire the sensor at `location`.
    ///
    /// Fails with `DeviceUnavailable` if the sensor is missing, already in
    /// use, or reports a hardware error.
    fn open(
        &mut self,
        location: SensorLocation,
        initial_resolution: Resolution,
    ) -> Result<Box<dyn SensorDevice>, CameraError>;
}

/// An open handle to one camera sensor.
///
/// Focus and capture are asynchronous: they return immediately and report
/// through their `Completion`. Everything else completes before returning.
pub trait SensorDevice: Send {
    fn sensor_location(&self) -> SensorLocation;

    /// Mounting rotation of the sensor in degrees, fixed for the handle's lifetime.
    fn sensor_rotation(&self) -> i32;

    fn set_preview_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError>;

    fn set_capture_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError>;

    /// Rotation the device bakes into encoded stills.
    fn set_encode_orientation(&mut self, degrees: i32) -> Result<(), CameraError>;

    fn focus(&mut self, done: Completion<()>);

    /// Validate a sequence against the current capture settings.
    fn prepare_capture_sequence(&mut self, sequence: &CaptureSequence) -> Result<(), CameraError>;

    /// Run a prepared sequence, returning it with its frame buffers filled.
    fn start_capture(&mut self, sequence: CaptureSequence, done: Completion<CaptureSequence>);

    /// Release the hardware.
    fn close(&mut self) -> Result<(), CameraError>;
}
