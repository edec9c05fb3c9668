//! Scriptable in-memory camera hardware for unit tests.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::error::CameraError;
use crate::models::sensor::{Resolution, SensorLocation};
use crate::processing::capture_sequence::CaptureSequence;
use crate::traits::camera_provider::{CameraProvider, Completion, SensorDevice};

pub const FRAME_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

#[derive(Debug, Clone, Copy)]
pub struct FakeSensor {
    pub location: SensorLocation,
    pub rotation: i32,
    pub focus_supported: bool,
}

impl FakeSensor {
    pub fn back(rotation: i32) -> Self {
        Self {
            location: SensorLocation::Back,
            rotation,
            focus_supported: true,
        }
    }

    pub fn front(rotation: i32) -> Self {
        Self {
            location: SensorLocation::Front,
            rotation,
            focus_supported: false,
        }
    }
}

/// Shared, inspectable hardware state.
#[derive(Default)]
pub struct FakeHardware {
    pub sensors: Vec<FakeSensor>,
    pub open_handles: usize,
    pub max_open_handles: usize,
    pub open_calls: usize,
    pub close_calls: usize,
    pub focus_calls: usize,
    pub capture_calls: usize,
    pub encode_orientations: Vec<i32>,
    pub rejected_resolution: Option<Resolution>,
    pub fail_close: bool,
    pub fail_next_focus: bool,
    pub fail_next_capture: bool,
    /// Hold completions until released, to keep operations in flight.
    pub hold: bool,
    held_focus: Vec<Completion<()>>,
    held_captures: Vec<(CaptureSequence, Completion<CaptureSequence>)>,
}

pub struct FakeCamera {
    hardware: Arc<Mutex<FakeHardware>>,
}

impl FakeCamera {
    pub fn new(sensors: Vec<FakeSensor>) -> Self {
        Self {
            hardware: Arc::new(Mutex::new(FakeHardware {
                sensors,
                ..Default::default()
            })),
        }
    }

    pub fn hardware(&self) -> &Arc<Mutex<FakeHardware>> {
        &self.hardware
    }
}

impl CameraProvider for FakeCamera {
    fn available_sensor_locations(&self) -> Vec<SensorLocation> {
        self.hardware.lock().sensors.iter().map(|s| s.location).collect()
    }

    fn is_focus_supported(&self, location: SensorLocation) -> bool {
        self.hardware
            .lock()
            .sensors
            .iter()
            .any(|s| s.location == location && s.focus_supported)
    }

    fn open(
        &mut self,
        location: SensorLocation,
        _initial_resolution: Resolution,
    ) -> Result<Box<dyn SensorDevice>, CameraError> {
        let mut hw = self.hardware.lock();
        let sensor = hw
            .sensors
            .iter()
            .find(|s| s.location == location)
            .copied()
            .ok_or_else(|| CameraError::DeviceUnavailable(format!("no {} sensor", location)))?;
        hw.open_calls += 1;
        hw.open_handles += 1;
        hw.max_open_handles = hw.max_open_handles.max(hw.open_handles);
        Ok(Box::new(FakeDevice {
            sensor,
            hardware: Arc::clone(&self.hardware),
            closed: false,
        }))
    }
}

struct FakeDevice {
    sensor: FakeSensor,
    hardware: Arc<Mutex<FakeHardware>>,
    closed: bool,
}

impl SensorDevice for FakeDevice {
    fn sensor_location(&self) -> SensorLocation {
        self.sensor.location
    }

    fn sensor_rotation(&self) -> i32 {
        self.sensor.rotation
    }

    fn set_preview_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        self.check_resolution(resolution)
    }

    fn set_capture_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        self.check_resolution(resolution)
    }

    fn set_encode_orientation(&mut self, degrees: i32) -> Result<(), CameraError> {
        self.hardware.lock().encode_orientations.push(degrees);
        Ok(())
    }

    fn focus(&mut self, done: Completion<()>) {
        let mut hw = self.hardware.lock();
        hw.focus_calls += 1;
        if hw.hold {
            hw.held_focus.push(done);
            return;
        }
        let fail = std::mem::take(&mut hw.fail_next_focus);
        drop(hw);
        done(focus_result(fail));
    }

    fn prepare_capture_sequence(&mut self, _sequence: &CaptureSequence) -> Result<(), CameraError> {
        Ok(())
    }

    fn start_capture(&mut self, sequence: CaptureSequence, done: Completion<CaptureSequence>) {
        let mut hw = self.hardware.lock();
        hw.capture_calls += 1;
        if hw.hold {
            hw.held_captures.push((sequence, done));
            return;
        }
        let fail = std::mem::take(&mut hw.fail_next_capture);
        drop(hw);
        done(capture_result(sequence, fail));
    }

    fn close(&mut self) -> Result<(), CameraError> {
        let mut hw = self.hardware.lock();
        hw.close_calls += 1;
        if !self.closed {
            self.closed = true;
            hw.open_handles -= 1;
        }
        if hw.fail_close {
            return Err(CameraError::DeviceUnavailable("close failed".into()));
        }
        Ok(())
    }
}

impl FakeDevice {
    fn check_resolution(&self, resolution: Resolution) -> Result<(), CameraError> {
        if self.hardware.lock().rejected_resolution == Some(resolution) {
            return Err(CameraError::UnsupportedResolution {
                location: self.sensor.location,
                resolution,
            });
        }
        Ok(())
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        if !self.closed {
            self.hardware.lock().open_handles -= 1;
        }
    }
}

fn focus_result(fail: bool) -> Result<(), CameraError> {
    if fail {
        Err(CameraError::FocusFailed("lens stuck".into()))
    } else {
        Ok(())
    }
}

fn capture_result(mut sequence: CaptureSequence, fail: bool) -> Result<CaptureSequence, CameraError> {
    if fail {
        return Err(CameraError::CaptureFailed("sensor timeout".into()));
    }
    for frame in sequence.frames_mut() {
        frame.stream.write_all(FRAME_BYTES).unwrap();
    }
    Ok(sequence)
}

impl FakeHardware {
    pub fn held_count(&self) -> usize {
        self.held_focus.len() + self.held_captures.len()
    }
}

/// Complete every held operation, honoring the failure flags.
pub fn release_held(hardware: &Mutex<FakeHardware>) {
    let (focus, captures, fail_focus, fail_capture) = {
        let mut hw = hardware.lock();
        hw.hold = false;
        (
            std::mem::take(&mut hw.held_focus),
            std::mem::take(&mut hw.held_captures),
            std::mem::take(&mut hw.fail_next_focus),
            std::mem::take(&mut hw.fail_next_capture),
        )
    };
    for done in focus {
        done(focus_result(fail_focus));
    }
    for (sequence, done) in captures {
        done(capture_result(sequence, fail_capture));
    }
}

/// Block until `count` operations are held by the hardware.
pub fn wait_for_held(hardware: &Mutex<FakeHardware>, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while hardware.lock().held_count() < count {
        assert!(Instant::now() < deadline, "timed out waiting for held operations");
        thread::sleep(Duration::from_millis(1));
    }
}
