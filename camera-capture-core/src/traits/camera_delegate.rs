use crate::models::captured_image::CapturedImage;
use crate::models::error::CameraError;
use crate::models::state::CaptureState;
use crate::session::context::PreviewBinding;

/// Event delegate for camera controller notifications.
///
/// All methods are called from the camera worker thread. Implementations
/// should marshal to the UI thread if needed, and must not block on
/// `CameraController` requests (the worker would wait on itself).
pub trait CameraDelegate: Send + Sync {
    /// Called when the capture state changes.
    fn on_state_changed(&self, state: CaptureState);

    /// Called whenever a preview source is bound, after open and after a switch.
    fn on_preview_bound(&self, binding: &PreviewBinding);

    /// Receives images captured by a hardware shutter press.
    ///
    /// Images from `CameraController::capture` go to the caller instead.
    fn on_image_captured(&self, image: CapturedImage);

    /// Called when an operation with no waiting caller fails.
    fn on_error(&self, error: &CameraError);
}
