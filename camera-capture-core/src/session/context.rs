use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::config::CameraConfiguration;
use crate::models::error::CameraError;
use crate::models::sensor::{Resolution, SensorLocation};
use crate::models::state::CaptureState;
use crate::processing::orientation::{OrientationCalculator, OrientationTransform};
use crate::session::coordinator::{
    CaptureCoordinator, CaptureOutcome, CoordinatorEvent, EventSink, FocusOutcome, Responder,
};
use crate::session::device_session::CaptureDeviceSession;
use crate::session::triggers::{ShutterKey, TriggerHandle, TriggerTable};
use crate::traits::camera_delegate::CameraDelegate;
use crate::traits::camera_provider::CameraProvider;
use crate::traits::trigger_surface::TriggerSurface;

/// Snapshot of the open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub location: SensorLocation,
    pub sensor_rotation: i32,
    pub preview_resolution: Resolution,
    pub capture_resolution: Resolution,
    pub transform: OrientationTransform,
}

/// What the live preview surface should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewBinding {
    pub location: SensorLocation,
    pub resolution: Resolution,
    pub transform: OrientationTransform,
}

/// Everything the camera worker owns: the provider, the one open session,
/// the coordinator, trigger surfaces and the delegate.
///
/// Only one session exists at a time; opening another disposes the current
/// one first.
pub struct CameraContext {
    provider: Box<dyn CameraProvider>,
    config: CameraConfiguration,
    calculator: OrientationCalculator,
    session: Option<CaptureDeviceSession>,
    info: Option<SessionInfo>,
    coordinator: CaptureCoordinator,
    triggers: TriggerTable,
    delegate: Option<Arc<dyn CameraDelegate>>,
    reported_state: CaptureState,
}

impl CameraContext {
    pub fn new(provider: Box<dyn CameraProvider>, config: CameraConfiguration, events: EventSink) -> Self {
        Self {
            provider,
            calculator: OrientationCalculator::new(config.front_convention),
            config,
            session: None,
            info: None,
            coordinator: CaptureCoordinator::new(events),
            triggers: TriggerTable::new(),
            delegate: None,
            reported_state: CaptureState::Idle,
        }
    }

    pub fn config(&self) -> &CameraConfiguration {
        &self.config
    }

    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.info.as_ref()
    }

    pub fn state(&self) -> CaptureState {
        self.coordinator.state()
    }

    pub fn has_pending_work(&self) -> bool {
        self.coordinator.has_pending_work()
    }

    pub fn triggers_enabled(&self) -> bool {
        self.triggers.is_enabled()
    }

    pub fn set_delegate(&mut self, delegate: Option<Arc<dyn CameraDelegate>>) {
        self.delegate = delegate;
    }

    pub fn register_trigger(&mut self, surface: Arc<dyn TriggerSurface>) -> TriggerHandle {
        self.triggers.register(surface)
    }

    pub fn unregister_trigger(&mut self, handle: TriggerHandle) -> bool {
        self.triggers.unregister(handle)
    }

    /// Open the sensor at `location`, replacing any current session.
    pub fn open(&mut self, location: SensorLocation) -> Result<SessionInfo, CameraError> {
        if self.has_pending_work() {
            return Err(CameraError::SessionBusy);
        }
        self.triggers.set_enabled(false);
        self.teardown();
        let info = self.establish(location)?;
        self.triggers.set_enabled(true);
        Ok(info)
    }

    /// Dispose the current session. Refused while a focus or capture is in flight.
    pub fn close(&mut self) -> Result<(), CameraError> {
        if self.has_pending_work() {
            return Err(CameraError::SessionBusy);
        }
        self.triggers.set_enabled(false);
        self.teardown();
        Ok(())
    }

    pub fn auto_focus(&mut self, reply: Responder<FocusOutcome>) {
        let focus_supported = self
            .session
            .as_ref()
            .is_some_and(|s| self.provider.is_focus_supported(s.location()));
        self.coordinator
            .auto_focus(self.session.as_mut(), focus_supported, reply);
    }

    pub fn capture(&mut self, reply: Responder<CaptureOutcome>) {
        self.coordinator.capture(self.session.as_mut(), reply);
    }

    /// Handle a hardware shutter signal. Dropped while triggers are disabled.
    pub fn shutter(&mut self, key: ShutterKey) {
        if !self.triggers.is_enabled() {
            log::debug!("Shutter {:?} dropped: triggers disabled", key);
            return;
        }
        match key {
            ShutterKey::HalfPress => {
                let delegate = self.delegate.clone();
                self.auto_focus(Box::new(move |result| match (result, delegate) {
                    (Ok(_), _) => {}
                    (Err(e), Some(d)) => d.on_error(&e),
                    (Err(e), None) => log::warn!("Shutter focus failed: {}", e),
                }));
            }
            ShutterKey::FullPress => {
                let delegate = self.delegate.clone();
                self.capture(Box::new(move |result| match (result, delegate) {
                    (Ok(CaptureOutcome::Captured(image)), Some(d)) => d.on_image_captured(image),
                    (Ok(CaptureOutcome::Captured(_)), None) => {
                        log::warn!("Shutter capture finished with no delegate; image released")
                    }
                    (Ok(CaptureOutcome::Ignored), _) => {}
                    (Err(e), Some(d)) => d.on_error(&e),
                    (Err(e), None) => log::error!("Shutter capture failed: {}", e),
                }));
            }
        }
    }

    pub fn handle_event(&mut self, event: CoordinatorEvent) {
        self.coordinator.handle_event(event, self.session.as_mut());
    }

    /// Report state changes and keep trigger surfaces disabled while busy.
    pub fn sync_state(&mut self) {
        let state = self.coordinator.state();
        if state == self.reported_state {
            return;
        }
        self.reported_state = state;
        let session_open = self.session.as_ref().is_some_and(|s| s.is_open());
        self.triggers.set_enabled(state.is_idle() && session_open);
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }

    /// Final teardown when the worker stops.
    pub fn shutdown(&mut self) {
        self.triggers.set_enabled(false);
        self.teardown();
    }

    pub(crate) fn current_location(&self) -> Option<SensorLocation> {
        self.session.as_ref().filter(|s| s.is_open()).map(|s| s.location())
    }

    pub(crate) fn available_sensor_locations(&self) -> Vec<SensorLocation> {
        self.provider.available_sensor_locations()
    }

    pub(crate) fn set_triggers_enabled(&mut self, enabled: bool) {
        self.triggers.set_enabled(enabled);
    }

    pub(crate) fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.dispose();
        }
        self.info = None;
    }

    /// Open, configure and orient a session for `location`, then bind the
    /// preview to it. Requires that no session is open.
    pub(crate) fn establish(&mut self, location: SensorLocation) -> Result<SessionInfo, CameraError> {
        debug_assert!(self.session.is_none(), "previous session must be disposed first");

        let mut session =
            CaptureDeviceSession::open(self.provider.as_mut(), location, self.config.initial_resolution)?;
        session.configure(self.config.preview_resolution, self.config.capture_resolution)?;

        let transform = self.calculator.transform(location, session.sensor_rotation());
        session.set_encode_orientation(transform.rotation_degrees)?;

        let info = SessionInfo {
            location,
            sensor_rotation: session.sensor_rotation(),
            preview_resolution: self.config.preview_resolution,
            capture_resolution: self.config.capture_resolution,
            transform,
        };
        self.session = Some(session);
        self.info = Some(info.clone());

        let binding = PreviewBinding {
            location,
            resolution: info.preview_resolution,
            transform,
        };
        if let Some(ref delegate) = self.delegate {
            delegate.on_preview_bound(&binding);
        }
        log::info!(
            "Camera ready on {} sensor, rotation {} degrees",
            location,
            transform.rotation_degrees
        );
        Ok(info)
    }
}

impl Drop for CameraContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
