//! # camera-capture-core
//!
//! Platform-agnostic camera capture core library.
//!
//! Owns the camera session lifecycle and the capture state machine: opening
//! and configuring a sensor, orientation compensation, front/back switching,
//! and serializing autofocus and still capture. Platform backends implement
//! the `CameraProvider` / `SensorDevice` traits and plug into the generic
//! `CameraController`.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/       ← CameraProvider, SensorDevice, CameraDelegate, TriggerSurface
//! ├── models/       ← CameraError, CaptureState, CameraConfiguration, CapturedImage, etc.
//! ├── processing/   ← OrientationCalculator, CaptureSequence
//! └── session/      ← CaptureDeviceSession, CaptureCoordinator, SensorSwitchController,
//!                     CameraContext, CameraController (worker)
//! ```
//!
//! ## Usage
//! ```ignore
//! use camera_capture_core::{CameraConfiguration, CameraController};
//! use camera_capture_virtual::VirtualCamera;
//!
//! let controller = CameraController::spawn(Box::new(VirtualCamera::phone()), CameraConfiguration::default())?;
//! controller.open_default()?;
//! let image = controller.focus_and_capture()?.into_image();
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::captured_image::{CaptureMetadata, CapturedImage};
pub use models::config::CameraConfiguration;
pub use models::error::CameraError;
pub use models::sensor::{Resolution, SensorLocation};
pub use models::state::CaptureState;
pub use processing::capture_sequence::{CaptureFrame, CaptureSequence};
pub use processing::orientation::{FrontSensorConvention, OrientationCalculator, OrientationTransform};
pub use session::context::{CameraContext, PreviewBinding, SessionInfo};
pub use session::controller::{CameraController, ControllerStatus, Pending};
pub use session::coordinator::{CaptureCoordinator, CaptureOutcome, FocusOutcome};
pub use session::device_session::CaptureDeviceSession;
pub use session::sensor_switch::SensorSwitchController;
pub use session::triggers::{ShutterKey, TriggerHandle, TriggerTable};
pub use traits::camera_delegate::CameraDelegate;
pub use traits::camera_provider::{CameraProvider, Completion, SensorDevice};
pub use traits::trigger_surface::TriggerSurface;
