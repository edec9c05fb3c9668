//! Software camera provider.
//!
//! Each sensor renders a test card at the configured capture resolution,
//! rotates it by the encode orientation and JPEG-encodes it into the
//! capture sequence's buffers. Focus and capture complete on short-lived
//! worker threads after a configurable latency, like real hardware would.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use camera_capture_core::{
    CameraError, CameraProvider, CaptureSequence, Completion, Resolution, SensorDevice, SensorLocation,
};

use crate::pattern;

/// Static description of one virtual sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorProfile {
    pub location: SensorLocation,
    /// Mounting rotation reported to the session, in degrees.
    pub rotation: i32,
    pub focus_supported: bool,
    pub supported_resolutions: Vec<Resolution>,
}

impl SensorProfile {
    pub fn new(location: SensorLocation, rotation: i32) -> Self {
        Self {
            location,
            rotation,
            focus_supported: location == SensorLocation::Back,
            supported_resolutions: vec![
                Resolution::new(320, 240),
                Resolution::VGA,
                Resolution::new(1280, 960),
            ],
        }
    }

    fn supports(&self, resolution: Resolution) -> bool {
        self.supported_resolutions.contains(&resolution)
    }
}

/// One-shot failures to inject into the next matching operation.
#[derive(Debug, Default)]
struct FaultPlan {
    fail_next_open: bool,
    fail_next_focus: bool,
    fail_next_capture: bool,
}

/// Handle for injecting hardware faults into a `VirtualCamera` after it has
/// been handed to a controller.
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    plan: Arc<Mutex<FaultPlan>>,
}

impl FaultInjector {
    pub fn fail_next_open(&self) {
        self.plan.lock().fail_next_open = true;
    }

    pub fn fail_next_focus(&self) {
        self.plan.lock().fail_next_focus = true;
    }

    pub fn fail_next_capture(&self) {
        self.plan.lock().fail_next_capture = true;
    }

    fn take_open(&self) -> bool {
        std::mem::take(&mut self.plan.lock().fail_next_open)
    }

    fn take_focus(&self) -> bool {
        std::mem::take(&mut self.plan.lock().fail_next_focus)
    }

    fn take_capture(&self) -> bool {
        std::mem::take(&mut self.plan.lock().fail_next_capture)
    }
}

/// A camera made of software sensors.
pub struct VirtualCamera {
    sensors: Vec<SensorProfile>,
    latency: Duration,
    faults: FaultInjector,
    in_use: Arc<Mutex<HashSet<SensorLocation>>>,
    frames: Arc<AtomicU64>,
}

impl VirtualCamera {
    pub fn new(sensors: Vec<SensorProfile>) -> Self {
        Self {
            sensors,
            latency: Duration::from_millis(30),
            faults: FaultInjector::default(),
            in_use: Arc::new(Mutex::new(HashSet::new())),
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A typical phone: back sensor mounted at 90 degrees with autofocus,
    /// fixed-focus front sensor mounted at 270 degrees.
    pub fn phone() -> Self {
        Self::new(vec![
            SensorProfile::new(SensorLocation::Back, 90),
            SensorProfile::new(SensorLocation::Front, 270),
        ])
    }

    /// Delay before focus and capture complete.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fault_injector(&self) -> FaultInjector {
        self.faults.clone()
    }

    /// Number of stills captured so far across all sensors.
    pub fn frame_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.frames)
    }

    fn profile(&self, location: SensorLocation) -> Option<&SensorProfile> {
        self.sensors.iter().find(|s| s.location == location)
    }
}

impl CameraProvider for VirtualCamera {
    fn available_sensor_locations(&self) -> Vec<SensorLocation> {
        self.sensors.iter().map(|s| s.location).collect()
    }

    fn is_focus_supported(&self, location: SensorLocation) -> bool {
        self.profile(location).is_some_and(|s| s.focus_supported)
    }

    fn open(
        &mut self,
        location: SensorLocation,
        initial_resolution: Resolution,
    ) -> Result<Box<dyn SensorDevice>, CameraError> {
        let profile = self
            .profile(location)
            .cloned()
            .ok_or_else(|| CameraError::DeviceUnavailable(format!("no {} sensor present", location)))?;

        if self.faults.take_open() {
            return Err(CameraError::DeviceUnavailable(format!(
                "{} sensor reported a hardware error",
                location
            )));
        }
        if !profile.supports(initial_resolution) {
            return Err(CameraError::UnsupportedResolution {
                location,
                resolution: initial_resolution,
            });
        }
        if !self.in_use.lock().insert(location) {
            return Err(CameraError::DeviceUnavailable(format!("{} sensor already in use", location)));
        }

        log::debug!("Virtual {} sensor opened at {}", location, initial_resolution);
        Ok(Box::new(VirtualSensor {
            profile,
            preview_resolution: initial_resolution,
            capture_resolution: initial_resolution,
            encode_orientation: 0,
            latency: self.latency,
            faults: self.faults.clone(),
            in_use: Arc::clone(&self.in_use),
            frames: Arc::clone(&self.frames),
            open: true,
        }))
    }
}

/// An open virtual sensor.
pub struct VirtualSensor {
    profile: SensorProfile,
    preview_resolution: Resolution,
    capture_resolution: Resolution,
    encode_orientation: i32,
    latency: Duration,
    faults: FaultInjector,
    in_use: Arc<Mutex<HashSet<SensorLocation>>>,
    frames: Arc<AtomicU64>,
    open: bool,
}

impl VirtualSensor {
    fn check_resolution(&self, resolution: Resolution) -> Result<(), CameraError> {
        if self.profile.supports(resolution) {
            Ok(())
        } else {
            Err(CameraError::UnsupportedResolution {
                location: self.profile.location,
                resolution,
            })
        }
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.open) {
            self.in_use.lock().remove(&self.profile.location);
        }
    }
}

impl SensorDevice for VirtualSensor {
    fn sensor_location(&self) -> SensorLocation {
        self.profile.location
    }

    fn sensor_rotation(&self) -> i32 {
        self.profile.rotation
    }

    fn set_preview_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        self.check_resolution(resolution)?;
        if resolution != self.preview_resolution {
            log::debug!(
                "Virtual {} sensor preview {} -> {}",
                self.profile.location,
                self.preview_resolution,
                resolution
            );
        }
        self.preview_resolution = resolution;
        Ok(())
    }

    fn set_capture_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        self.check_resolution(resolution)?;
        self.capture_resolution = resolution;
        Ok(())
    }

    fn set_encode_orientation(&mut self, degrees: i32) -> Result<(), CameraError> {
        if degrees % 90 != 0 {
            return Err(CameraError::ConfigurationFailed(format!(
                "encode orientation must be a multiple of 90, got {}",
                degrees
            )));
        }
        self.encode_orientation = degrees;
        Ok(())
    }

    fn focus(&mut self, done: Completion<()>) {
        let location = self.profile.location;
        let supported = self.profile.focus_supported;
        let fail = self.faults.take_focus();
        let latency = self.latency;

        spawn_completion("virtual-focus", move || {
            thread::sleep(latency);
            let result = if !supported {
                Err(CameraError::FocusFailed(format!("{} sensor has fixed focus", location)))
            } else if fail {
                Err(CameraError::FocusFailed("focus did not converge".into()))
            } else {
                Ok(())
            };
            done(result);
        });
    }

    fn prepare_capture_sequence(&mut self, sequence: &CaptureSequence) -> Result<(), CameraError> {
        if !self.open {
            return Err(CameraError::NoActiveSession);
        }
        if sequence.is_empty() {
            return Err(CameraError::CaptureFailed("capture sequence has no frames".into()));
        }
        Ok(())
    }

    fn start_capture(&mut self, sequence: CaptureSequence, done: Completion<CaptureSequence>) {
        let location = self.profile.location;
        let resolution = self.capture_resolution;
        let orientation = self.encode_orientation;
        let fail = self.faults.take_capture();
        let latency = self.latency;
        let frames = Arc::clone(&self.frames);

        spawn_completion("virtual-capture", move || {
            thread::sleep(latency);
            if fail {
                done(Err(CameraError::CaptureFailed("sensor readout timed out".into())));
                return;
            }
            let mut sequence = sequence;
            for frame in sequence.frames_mut() {
                let number = frames.fetch_add(1, Ordering::SeqCst);
                let image = pattern::render_test_pattern(resolution, location, number);
                let image = pattern::apply_encode_orientation(image, orientation);
                if let Err(e) = pattern::encode_jpeg(&image, &mut frame.stream) {
                    done(Err(e));
                    return;
                }
            }
            done(Ok(sequence));
        });
    }

    fn close(&mut self) -> Result<(), CameraError> {
        self.release();
        log::debug!("Virtual {} sensor closed", self.profile.location);
        Ok(())
    }
}

impl Drop for VirtualSensor {
    fn drop(&mut self) {
        self.release();
    }
}

/// Run `work` on a named thread. If the thread cannot be spawned, run it inline.
fn spawn_completion(name: &str, work: impl FnOnce() + Send + 'static) {
    let work = Arc::new(Mutex::new(Some(work)));
    let on_thread = Arc::clone(&work);
    let spawned = thread::Builder::new().name(name.into()).spawn(move || {
        if let Some(work) = on_thread.lock().take() {
            work();
        }
    });
    if let Err(e) = spawned {
        log::error!("Failed to spawn {} thread, completing inline: {}", name, e);
        if let Some(work) = work.lock().take() {
            work();
        }
    }
}
