use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::CameraConfiguration;
use crate::models::error::CameraError;
use crate::models::sensor::SensorLocation;
use crate::models::state::CaptureState;
use crate::session::context::{CameraContext, SessionInfo};
use crate::session::coordinator::{CaptureOutcome, CoordinatorEvent, EventSink, FocusOutcome, Responder};
use crate::session::sensor_switch::SensorSwitchController;
use crate::session::triggers::{ShutterKey, TriggerHandle};
use crate::traits::camera_delegate::CameraDelegate;
use crate::traits::camera_provider::CameraProvider;
use crate::traits::trigger_surface::TriggerSurface;

type Reply<T> = Sender<Result<T, CameraError>>;

enum Command {
    Open {
        location: Option<SensorLocation>,
        reply: Reply<SessionInfo>,
    },
    Close {
        reply: Reply<()>,
    },
    AutoFocus {
        reply: Reply<FocusOutcome>,
    },
    Capture {
        reply: Reply<CaptureOutcome>,
    },
    SwitchSensor {
        reply: Reply<SessionInfo>,
    },
    Shutter(ShutterKey),
    RegisterTrigger {
        surface: Arc<dyn TriggerSurface>,
        reply: Reply<TriggerHandle>,
    },
    UnregisterTrigger(TriggerHandle),
    SetDelegate(Option<Arc<dyn CameraDelegate>>),
    Hardware(CoordinatorEvent),
    Shutdown,
}

impl Command {
    /// Answer a command that arrived after shutdown began.
    fn reject(self) {
        let err = CameraError::WorkerStopped;
        match self {
            Command::Open { reply, .. } | Command::SwitchSensor { reply } => {
                let _ = reply.send(Err(err));
            }
            Command::Close { reply } => {
                let _ = reply.send(Err(err));
            }
            Command::AutoFocus { reply } => {
                let _ = reply.send(Err(err));
            }
            Command::Capture { reply } => {
                let _ = reply.send(Err(err));
            }
            Command::RegisterTrigger { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Command::Shutter(_)
            | Command::UnregisterTrigger(_)
            | Command::SetDelegate(_)
            | Command::Hardware(_)
            | Command::Shutdown => {}
        }
    }
}

/// Status published by the worker after every command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerStatus {
    pub state: CaptureState,
    pub session: Option<SessionInfo>,
    pub triggers_enabled: bool,
}

/// The result of a command sent to the camera worker.
pub struct Pending<T> {
    receiver: Receiver<Result<T, CameraError>>,
}

impl<T> Pending<T> {
    /// Block until the worker answers.
    pub fn wait(self) -> Result<T, CameraError> {
        self.receiver.recv().unwrap_or(Err(CameraError::WorkerStopped))
    }

    /// Block for at most `timeout`. `None` if the worker has not answered yet.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, CameraError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(CameraError::WorkerStopped)),
        }
    }

    /// Non-blocking poll.
    pub fn try_result(&self) -> Option<Result<T, CameraError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CameraError::WorkerStopped)),
        }
    }
}

struct ControllerInner {
    commands: Sender<Command>,
    status: Arc<Mutex<ControllerStatus>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ControllerInner {
    fn stop(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        // A delegate dropping the last handle on the worker itself must not self-join.
        if handle.thread().id() != thread::current().id() {
            let _ = handle.join();
        }
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to the camera worker.
///
/// The worker thread exclusively owns the `CameraContext`; every operation
/// here is a message on its queue, and hardware completions are posted back
/// onto the same queue. Commands are therefore handled one at a time, in
/// arrival order, by a single writer.
///
/// Clones share the same worker and session, so a UI that is torn down and
/// recreated can reattach without losing an in-flight capture. The worker
/// stops when `shutdown` is called or the last clone is dropped; in-flight
/// focus and capture are drained before the session is disposed.
///
/// ```text
/// [UI / shutter] → Command queue → camera-worker → CaptureCoordinator → CaptureDeviceSession
///                       ↑                                                    │
///                       └──────────── hardware completion ───────────────────┘
/// ```
#[derive(Clone)]
pub struct CameraController {
    inner: Arc<ControllerInner>,
}

impl CameraController {
    /// Spawn the camera worker. No session is opened yet.
    pub fn spawn(
        provider: Box<dyn CameraProvider>,
        config: CameraConfiguration,
    ) -> Result<Self, CameraError> {
        config.validate().map_err(CameraError::ConfigurationFailed)?;

        let (commands, receiver) = mpsc::channel::<Command>();
        let status = Arc::new(Mutex::new(ControllerStatus::default()));

        // Completion callbacks run on backend threads; they only ever enqueue.
        let hardware_tx = commands.clone();
        let events: EventSink = Arc::new(move |event| {
            if hardware_tx.send(Command::Hardware(event)).is_err() {
                log::warn!("Hardware completion arrived after camera worker exited");
            }
        });

        let context = CameraContext::new(provider, config, events);
        let worker_status = Arc::clone(&status);
        let handle = thread::Builder::new()
            .name("camera-worker".into())
            .spawn(move || run_worker(context, receiver, worker_status))
            .map_err(|e| CameraError::DeviceUnavailable(format!("failed to spawn camera worker: {}", e)))?;

        Ok(Self {
            inner: Arc::new(ControllerInner {
                commands,
                status,
                worker: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Latest status published by the worker.
    pub fn status(&self) -> ControllerStatus {
        self.inner.status.lock().clone()
    }

    pub fn state(&self) -> CaptureState {
        self.inner.status.lock().state
    }

    pub fn session_info(&self) -> Option<SessionInfo> {
        self.inner.status.lock().session.clone()
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CameraDelegate>) {
        self.send(Command::SetDelegate(Some(delegate)));
    }

    pub fn clear_delegate(&self) {
        self.send(Command::SetDelegate(None));
    }

    /// Open the sensor at `location`, disposing any current session first.
    pub fn open(&self, location: SensorLocation) -> Result<SessionInfo, CameraError> {
        self.request(|reply| Command::Open {
            location: Some(location),
            reply,
        })
        .wait()
    }

    /// Open the configured initial sensor, unless a session is already open.
    pub fn open_default(&self) -> Result<SessionInfo, CameraError> {
        self.request(|reply| Command::Open { location: None, reply }).wait()
    }

    /// Dispose the current session. Fails with `SessionBusy` during focus or capture.
    pub fn close(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::Close { reply }).wait()
    }

    pub fn auto_focus(&self) -> Result<FocusOutcome, CameraError> {
        self.request_auto_focus().wait()
    }

    pub fn request_auto_focus(&self) -> Pending<FocusOutcome> {
        self.request(|reply| Command::AutoFocus { reply })
    }

    pub fn capture(&self) -> Result<CaptureOutcome, CameraError> {
        self.request_capture().wait()
    }

    /// Queue a capture without waiting for it.
    pub fn request_capture(&self) -> Pending<CaptureOutcome> {
        self.request(|reply| Command::Capture { reply })
    }

    /// Focus, then capture, as a capture button does.
    ///
    /// A focus failure is logged and the capture still runs without focus lock.
    pub fn focus_and_capture(&self) -> Result<CaptureOutcome, CameraError> {
        match self.auto_focus() {
            Ok(_) => {}
            Err(CameraError::FocusFailed(reason)) => {
                log::warn!("Capturing without focus lock: {}", reason);
            }
            Err(e) => return Err(e),
        }
        self.capture()
    }

    pub fn switch_sensor(&self) -> Result<SessionInfo, CameraError> {
        self.request_switch_sensor().wait()
    }

    pub fn request_switch_sensor(&self) -> Pending<SessionInfo> {
        self.request(|reply| Command::SwitchSensor { reply })
    }

    /// Deliver a hardware shutter signal. Results go to the delegate.
    pub fn shutter(&self, key: ShutterKey) {
        self.send(Command::Shutter(key));
    }

    pub fn register_trigger(&self, surface: Arc<dyn TriggerSurface>) -> Result<TriggerHandle, CameraError> {
        self.request(|reply| Command::RegisterTrigger { surface, reply }).wait()
    }

    pub fn unregister_trigger(&self, handle: TriggerHandle) {
        self.send(Command::UnregisterTrigger(handle));
    }

    /// Stop the worker for every clone, draining in-flight operations.
    pub fn shutdown(&self) {
        self.inner.stop();
    }

    fn send(&self, command: Command) {
        if self.inner.commands.send(command).is_err() {
            log::warn!("Camera worker has stopped; command dropped");
        }
    }

    fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Pending<T> {
        let (reply, receiver) = mpsc::channel();
        // If the worker is gone the reply sender is dropped with the command
        // and `Pending` resolves to `WorkerStopped`.
        let _ = self.inner.commands.send(build(reply));
        Pending { receiver }
    }
}

fn responder<T: Send + 'static>(reply: Reply<T>) -> Responder<T> {
    Box::new(move |result| {
        let _ = reply.send(result);
    })
}

fn run_worker(mut context: CameraContext, commands: Receiver<Command>, status: Arc<Mutex<ControllerStatus>>) {
    log::info!("Camera worker started");
    let mut shutting_down = false;

    while let Ok(command) = commands.recv() {
        match command {
            Command::Shutdown => shutting_down = true,
            Command::Hardware(event) => context.handle_event(event),
            other if shutting_down => other.reject(),
            other => handle_command(&mut context, other),
        }

        context.sync_state();
        publish(&context, &status);

        if shutting_down && !context.has_pending_work() {
            break;
        }
    }

    context.shutdown();
    publish(&context, &status);
    log::info!("Camera worker stopped");
}

fn handle_command(context: &mut CameraContext, command: Command) {
    match command {
        Command::Open { location, reply } => {
            let result = match (location, context.session_info().cloned()) {
                (None, Some(info)) => Ok(info),
                (None, None) => {
                    let initial = context.config().initial_sensor;
                    context.open(initial)
                }
                (Some(location), _) => context.open(location),
            };
            let _ = reply.send(result);
        }
        Command::Close { reply } => {
            let _ = reply.send(context.close());
        }
        Command::AutoFocus { reply } => context.auto_focus(responder(reply)),
        Command::Capture { reply } => context.capture(responder(reply)),
        Command::SwitchSensor { reply } => {
            let _ = reply.send(SensorSwitchController::switch(context));
        }
        Command::Shutter(key) => context.shutter(key),
        Command::RegisterTrigger { surface, reply } => {
            let _ = reply.send(Ok(context.register_trigger(surface)));
        }
        Command::UnregisterTrigger(handle) => {
            if !context.unregister_trigger(handle) {
                log::debug!("Trigger {:?} was not registered", handle);
            }
        }
        Command::SetDelegate(delegate) => context.set_delegate(delegate),
        Command::Hardware(event) => context.handle_event(event),
        Command::Shutdown => {}
    }
}

fn publish(context: &CameraContext, status: &Mutex<ControllerStatus>) {
    let mut s = status.lock();
    s.state = context.state();
    s.session = context.session_info().cloned();
    s.triggers_enabled = context.triggers_enabled();
}
