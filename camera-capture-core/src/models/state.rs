/// Capture coordinator state machine.
///
/// State transitions:
/// ```text
/// idle → focusing → idle
/// idle → capturing → idle
/// ```
/// `capturing` is never entered directly from `focusing`; a capture
/// requested during focus waits for the focus to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Focusing,
    Capturing,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_focusing(&self) -> bool {
        matches!(self, Self::Focusing)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    /// Whether a hardware operation is in flight.
    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }
}
