use crate::models::error::CameraError;
use crate::models::sensor::SensorLocation;
use crate::session::context::{CameraContext, SessionInfo};

/// Replaces the open session with one for the other sensor location.
pub struct SensorSwitchController;

impl SensorSwitchController {
    /// The location to switch to from `current`.
    ///
    /// Only the first two reported locations are considered: from the second
    /// we go to the first, from anything else to the second.
    pub fn next_location(
        current: SensorLocation,
        available: &[SensorLocation],
    ) -> Result<SensorLocation, CameraError> {
        match available {
            [first, second, ..] => Ok(if current == *second { *first } else { *second }),
            _ => Err(CameraError::NoAlternateSensor {
                available: available.len(),
            }),
        }
    }

    /// Switch `context` to the other sensor.
    ///
    /// Triggers are disabled and the current session disposed before the
    /// alternate location is resolved. If that fails (fewer than two sensors,
    /// or the new sensor cannot be opened) the context is left with no
    /// session and triggers disabled; reopen a location to recover.
    pub fn switch(context: &mut CameraContext) -> Result<SessionInfo, CameraError> {
        if context.has_pending_work() {
            return Err(CameraError::SessionBusy);
        }
        let current = context
            .current_location()
            .ok_or(CameraError::NoActiveSession)?;

        context.set_triggers_enabled(false);
        context.teardown();

        let available = context.available_sensor_locations();
        let next = Self::next_location(current, &available).inspect_err(|e| {
            log::error!("Sensor switch from {} failed: {}", current, e);
        })?;

        log::info!("Switching sensor {} -> {}", current, next);
        let info = context.establish(next)?;
        context.set_triggers_enabled(true);
        Ok(info)
    }
}
