/// A user-facing control that can start camera operations
/// (capture button, sensor switch, navigation).
///
/// Surfaces are disabled while the session is being replaced or a focus or
/// capture is in flight.
pub trait TriggerSurface: Send + Sync {
    fn set_enabled(&self, enabled: bool);
}
