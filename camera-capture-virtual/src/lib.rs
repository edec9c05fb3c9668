//! # camera-capture-virtual
//!
//! Software camera backend for camera-capture-kit.
//!
//! Provides:
//! - `VirtualCamera`: `CameraProvider` with configurable back/front sensors
//! - `VirtualSensor`: `SensorDevice` that renders a test card and encodes JPEG stills
//! - `SensorProfile`: location, mounting rotation, focus support and resolutions of one sensor
//! - `FaultInjector`: one-shot open/focus/capture failures for exercising error paths
//! - `pattern`: test card rendering, encode-orientation rotation and JPEG encoding
//!
//! Sensors are exclusive: a location cannot be opened again until the
//! previous handle is closed or dropped. Focus and capture complete on
//! `virtual-focus` / `virtual-capture` threads after the configured latency.
//!
//! ## Usage
//! ```ignore
//! use camera_capture_core::{CameraConfiguration, CameraController};
//! use camera_capture_virtual::VirtualCamera;
//!
//! let controller = CameraController::spawn(Box::new(VirtualCamera::phone()), CameraConfiguration::default())?;
//! controller.open_default()?;
//! let info = controller.switch_sensor()?;
//! let image = controller.capture()?.into_image();
//! ```

pub mod pattern;
pub mod virtual_camera;

pub use virtual_camera::{FaultInjector, SensorProfile, VirtualCamera, VirtualSensor};
