use std::sync::Arc;

use crate::models::captured_image::{CaptureMetadata, CapturedImage};
use crate::models::error::CameraError;
use crate::models::sensor::{Resolution, SensorLocation};
use crate::models::state::CaptureState;
use crate::processing::capture_sequence::CaptureSequence;
use crate::session::device_session::CaptureDeviceSession;

/// Receives the result of a coordinator request, exactly once.
pub type Responder<T> = Box<dyn FnOnce(Result<T, CameraError>) + Send + 'static>;

/// Hardware completions routed back into the coordinator.
#[derive(Debug)]
pub enum CoordinatorEvent {
    FocusCompleted(Result<(), CameraError>),
    CaptureCompleted(Result<CaptureSequence, CameraError>),
}

/// Where hardware completion callbacks post their events.
///
/// The sink must deliver events back to the context that owns the
/// coordinator; the coordinator never handles an event re-entrantly.
pub type EventSink = Arc<dyn Fn(CoordinatorEvent) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    Focused,
    /// Focus unsupported at this sensor, or another operation in flight.
    /// No hardware call was made.
    Skipped,
}

#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Captured(CapturedImage),
    /// A capture was already in flight; its requester receives the image.
    Ignored,
}

impl CaptureOutcome {
    pub fn into_image(self) -> Option<CapturedImage> {
        match self {
            Self::Captured(image) => Some(image),
            Self::Ignored => None,
        }
    }
}

struct InFlightCapture {
    reply: Responder<CaptureOutcome>,
    location: SensorLocation,
    encode_orientation: i32,
    resolution: Resolution,
}

/// Sequences autofocus and capture against the open session.
///
/// Mutual exclusion is the state itself: every method runs on the single
/// context that owns the coordinator, so checking and setting the state
/// cannot interleave. Duplicate triggers are absorbed:
/// - capture while capturing → `CaptureOutcome::Ignored`
/// - capture while focusing → deferred until focus completes (one slot;
///   further requests are `Ignored`)
/// - focus while focusing or capturing → `FocusOutcome::Skipped`
pub struct CaptureCoordinator {
    state: CaptureState,
    events: EventSink,
    focus_reply: Option<Responder<FocusOutcome>>,
    deferred_capture: Option<Responder<CaptureOutcome>>,
    in_flight: Option<InFlightCapture>,
}

impl CaptureCoordinator {
    pub fn new(events: EventSink) -> Self {
        Self {
            state: CaptureState::Idle,
            events,
            focus_reply: None,
            deferred_capture: None,
            in_flight: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Whether any focus or capture is in flight or waiting to start.
    pub fn has_pending_work(&self) -> bool {
        self.state.is_busy() || self.deferred_capture.is_some()
    }

    pub fn auto_focus(
        &mut self,
        session: Option<&mut CaptureDeviceSession>,
        focus_supported: bool,
        reply: Responder<FocusOutcome>,
    ) {
        if self.state.is_busy() {
            log::debug!("Focus skipped: coordinator is {:?}", self.state);
            reply(Ok(FocusOutcome::Skipped));
            return;
        }
        let Some(session) = session.filter(|s| s.is_open()) else {
            reply(Err(CameraError::NoActiveSession));
            return;
        };
        if !focus_supported {
            log::debug!("Focus not supported on {} sensor", session.location());
            reply(Ok(FocusOutcome::Skipped));
            return;
        }

        let events = Arc::clone(&self.events);
        let started = session.focus(Box::new(move |result| {
            events(CoordinatorEvent::FocusCompleted(result));
        }));

        match started {
            Ok(()) => {
                self.state = CaptureState::Focusing;
                self.focus_reply = Some(reply);
            }
            Err(e) => reply(Err(e)),
        }
    }

    pub fn capture(
        &mut self,
        session: Option<&mut CaptureDeviceSession>,
        reply: Responder<CaptureOutcome>,
    ) {
        match self.state {
            CaptureState::Capturing => {
                log::debug!("Capture ignored: capture already in progress");
                reply(Ok(CaptureOutcome::Ignored));
            }
            CaptureState::Focusing => {
                if self.deferred_capture.is_some() {
                    log::debug!("Capture ignored: capture already waiting for focus");
                    reply(Ok(CaptureOutcome::Ignored));
                } else {
                    log::debug!("Capture deferred until focus completes");
                    self.deferred_capture = Some(reply);
                }
            }
            CaptureState::Idle => self.begin_capture(session, reply),
        }
    }

    /// Route a hardware completion posted through the event sink.
    pub fn handle_event(&mut self, event: CoordinatorEvent, session: Option<&mut CaptureDeviceSession>) {
        match event {
            CoordinatorEvent::FocusCompleted(result) => self.on_focus_completed(result, session),
            CoordinatorEvent::CaptureCompleted(result) => self.on_capture_completed(result),
        }
    }

    fn begin_capture(
        &mut self,
        session: Option<&mut CaptureDeviceSession>,
        reply: Responder<CaptureOutcome>,
    ) {
        let Some(session) = session.filter(|s| s.is_open()) else {
            reply(Err(CameraError::NoActiveSession));
            return;
        };

        let sequence = CaptureSequence::single_frame();
        if let Err(e) = session.prepare_capture_sequence(&sequence) {
            log::error!("Failed to prepare capture sequence: {}", e);
            reply(Err(as_capture_failure(e)));
            return;
        }

        let in_flight = InFlightCapture {
            reply,
            location: session.location(),
            encode_orientation: session.encode_orientation().unwrap_or(0),
            resolution: session.capture_resolution().unwrap_or(Resolution::VGA),
        };

        let events = Arc::clone(&self.events);
        let started = session.start_capture(
            sequence,
            Box::new(move |result| {
                events(CoordinatorEvent::CaptureCompleted(result));
            }),
        );

        match started {
            Ok(()) => {
                self.state = CaptureState::Capturing;
                self.in_flight = Some(in_flight);
            }
            Err(e) => (in_flight.reply)(Err(as_capture_failure(e))),
        }
    }

    fn on_focus_completed(
        &mut self,
        result: Result<(), CameraError>,
        session: Option<&mut CaptureDeviceSession>,
    ) {
        if !self.state.is_focusing() {
            log::warn!("Focus completion received while {:?}; dropping", self.state);
            return;
        }
        self.state = CaptureState::Idle;

        let result = result.map(|()| FocusOutcome::Focused).map_err(|e| match e {
            CameraError::FocusFailed(_) => e,
            other => CameraError::FocusFailed(other.to_string()),
        });
        if let Err(ref e) = result {
            log::warn!("Autofocus failed: {}", e);
        }
        if let Some(reply) = self.focus_reply.take() {
            reply(result);
        }

        if let Some(reply) = self.deferred_capture.take() {
            self.begin_capture(session, reply);
        }
    }

    fn on_capture_completed(&mut self, result: Result<CaptureSequence, CameraError>) {
        let Some(in_flight) = self.in_flight.take() else {
            log::warn!("Capture completion received with no capture in flight; dropping");
            return;
        };
        self.state = CaptureState::Idle;

        let image = result.map_err(as_capture_failure).and_then(|sequence| {
            let stream = sequence
                .into_first_stream()
                .filter(|s| !s.get_ref().is_empty())
                .ok_or_else(|| CameraError::CaptureFailed("capture produced no image data".into()))?;
            let metadata = CaptureMetadata::new(
                stream.get_ref(),
                in_flight.location,
                in_flight.encode_orientation,
                in_flight.resolution,
            );
            Ok(CapturedImage::from_stream(stream, metadata))
        });

        match image {
            Ok(image) => {
                log::info!(
                    "Captured {} byte still from {} sensor",
                    image.len(),
                    in_flight.location
                );
                (in_flight.reply)(Ok(CaptureOutcome::Captured(image)));
            }
            Err(e) => {
                log::error!("Capture failed: {}", e);
                (in_flight.reply)(Err(e));
            }
        }
    }
}

fn as_capture_failure(error: CameraError) -> CameraError {
    match error {
        CameraError::CaptureFailed(_) | CameraError::NoActiveSession => error,
        other => CameraError::CaptureFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::testing::{self, FakeCamera, FakeSensor, FRAME_BYTES};

    type Slot<T> = Arc<Mutex<Vec<Result<T, CameraError>>>>;

    fn responder<T: Send + 'static>(slot: &Slot<T>) -> Responder<T> {
        let slot = Arc::clone(slot);
        Box::new(move |result| slot.lock().push(result))
    }

    struct Harness {
        camera: FakeCamera,
        session: CaptureDeviceSession,
        coordinator: CaptureCoordinator,
        events: Arc<Mutex<Vec<CoordinatorEvent>>>,
    }

    impl Harness {
        fn new() -> Self {
            let mut camera = FakeCamera::new(vec![FakeSensor::back(90), FakeSensor::front(270)]);
            let mut session =
                CaptureDeviceSession::open(&mut camera, SensorLocation::Back, Resolution::VGA).unwrap();
            session.configure(Resolution::VGA, Resolution::VGA).unwrap();
            session.set_encode_orientation(90).unwrap();

            let events = Arc::new(Mutex::new(Vec::new()));
            let sink_events = Arc::clone(&events);
            let sink: EventSink = Arc::new(move |event| sink_events.lock().push(event));

            Self {
                camera,
                session,
                coordinator: CaptureCoordinator::new(sink),
                events,
            }
        }

        fn focus(&mut self, supported: bool, slot: &Slot<FocusOutcome>) {
            self.coordinator
                .auto_focus(Some(&mut self.session), supported, responder(slot));
        }

        fn capture(&mut self, slot: &Slot<CaptureOutcome>) {
            self.coordinator.capture(Some(&mut self.session), responder(slot));
        }

        /// Deliver posted hardware events, as the worker loop would.
        fn pump(&mut self) {
            loop {
                let events: Vec<_> = std::mem::take(&mut *self.events.lock());
                if events.is_empty() {
                    break;
                }
                for event in events {
                    self.coordinator.handle_event(event, Some(&mut self.session));
                }
            }
        }

        fn hold(&self) {
            self.camera.hardware().lock().hold = true;
        }

        fn release(&mut self) {
            testing::release_held(self.camera.hardware());
            self.pump();
        }
    }

    fn slot<T>() -> Slot<T> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn capture_produces_rewound_image() {
        let mut h = Harness::new();
        let results = slot();

        h.capture(&results);
        assert_eq!(h.coordinator.state(), CaptureState::Capturing);
        h.pump();

        assert_eq!(h.coordinator.state(), CaptureState::Idle);
        let outcome = results.lock().pop().unwrap().unwrap();
        let image = outcome.into_image().unwrap();
        assert_eq!(image.position(), 0);
        assert_eq!(image.bytes(), FRAME_BYTES);
        assert_eq!(image.metadata().encode_orientation, 90);
        assert_eq!(image.metadata().sensor_location, SensorLocation::Back);
    }

    #[test]
    fn duplicate_capture_is_ignored() {
        let mut h = Harness::new();
        h.hold();
        let first = slot();
        let second = slot();

        h.capture(&first);
        h.capture(&second);
        h.release();

        assert_eq!(h.camera.hardware().lock().capture_calls, 1);
        assert!(matches!(
            first.lock()[0],
            Ok(CaptureOutcome::Captured(_))
        ));
        assert!(matches!(second.lock()[0], Ok(CaptureOutcome::Ignored)));
    }

    #[test]
    fn failed_capture_clears_in_progress_flag() {
        let mut h = Harness::new();
        h.camera.hardware().lock().fail_next_capture = true;
        let failed = slot();

        h.capture(&failed);
        h.pump();

        assert!(matches!(failed.lock()[0], Err(CameraError::CaptureFailed(_))));
        assert!(h.coordinator.state().is_idle());

        let retried = slot();
        h.capture(&retried);
        h.pump();
        assert!(matches!(retried.lock()[0], Ok(CaptureOutcome::Captured(_))));
    }

    #[test]
    fn capture_without_session_fails() {
        let mut h = Harness::new();
        h.session.dispose();
        let results = slot();

        h.capture(&results);

        assert!(matches!(results.lock()[0], Err(CameraError::NoActiveSession)));
        assert!(h.coordinator.state().is_idle());
    }

    #[test]
    fn focus_unsupported_makes_no_hardware_call() {
        let mut h = Harness::new();
        let results = slot();

        h.focus(false, &results);

        assert!(matches!(results.lock()[0], Ok(FocusOutcome::Skipped)));
        assert_eq!(h.camera.hardware().lock().focus_calls, 0);
        assert!(h.coordinator.state().is_idle());
    }

    #[test]
    fn focus_then_idle() {
        let mut h = Harness::new();
        let results = slot();

        h.focus(true, &results);
        assert_eq!(h.coordinator.state(), CaptureState::Focusing);
        h.pump();

        assert!(matches!(results.lock()[0], Ok(FocusOutcome::Focused)));
        assert!(h.coordinator.state().is_idle());
    }

    #[test]
    fn focus_failure_is_reported_and_recoverable() {
        let mut h = Harness::new();
        h.camera.hardware().lock().fail_next_focus = true;
        let focus = slot();

        h.focus(true, &focus);
        h.pump();
        assert!(matches!(focus.lock()[0], Err(CameraError::FocusFailed(_))));

        let captured = slot();
        h.capture(&captured);
        h.pump();
        assert!(matches!(captured.lock()[0], Ok(CaptureOutcome::Captured(_))));
    }

    #[test]
    fn focus_during_capture_is_skipped() {
        let mut h = Harness::new();
        h.hold();
        let capture = slot();
        let focus = slot();

        h.capture(&capture);
        h.focus(true, &focus);

        assert!(matches!(focus.lock()[0], Ok(FocusOutcome::Skipped)));
        assert_eq!(h.camera.hardware().lock().focus_calls, 0);
        h.release();
    }

    #[test]
    fn capture_during_focus_waits_for_focus() {
        let mut h = Harness::new();
        h.hold();
        let focus = slot();
        let capture = slot();
        let extra = slot();

        h.focus(true, &focus);
        h.capture(&capture);
        h.capture(&extra);

        assert_eq!(h.coordinator.state(), CaptureState::Focusing);
        assert_eq!(h.camera.hardware().lock().capture_calls, 0);
        assert!(h.coordinator.has_pending_work());
        assert!(matches!(extra.lock()[0], Ok(CaptureOutcome::Ignored)));

        // Focus completes; the deferred capture starts and completes immediately.
        h.release();

        assert!(matches!(focus.lock()[0], Ok(FocusOutcome::Focused)));
        assert!(matches!(capture.lock()[0], Ok(CaptureOutcome::Captured(_))));
        assert_eq!(h.camera.hardware().lock().capture_calls, 1);
        assert!(!h.coordinator.has_pending_work());
    }

    #[test]
    fn stale_completion_is_dropped() {
        let mut h = Harness::new();
        h.coordinator.handle_event(
            CoordinatorEvent::CaptureCompleted(Ok(CaptureSequence::single_frame())),
            Some(&mut h.session),
        );
        assert!(h.coordinator.state().is_idle());
    }

    #[test]
    fn empty_frame_is_capture_failure() {
        let mut h = Harness::new();
        h.hold();
        let results = slot();
        h.capture(&results);

        // Complete with an untouched sequence instead of the hardware's frame.
        h.coordinator.handle_event(
            CoordinatorEvent::CaptureCompleted(Ok(CaptureSequence::single_frame())),
            Some(&mut h.session),
        );

        assert!(matches!(results.lock()[0], Err(CameraError::CaptureFailed(_))));
        assert!(h.coordinator.state().is_idle());
    }
}
