use std::sync::Arc;

use crate::traits::trigger_surface::TriggerSurface;

/// Registration handle returned by `TriggerTable::register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerHandle(u64);

/// Hardware shutter key signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutterKey {
    /// Maps to autofocus.
    HalfPress,
    /// Maps to capture.
    FullPress,
}

/// Registered trigger surfaces and their shared enabled state.
///
/// Hardware shutter signals are only accepted while the table is enabled,
/// the same window in which UI surfaces are usable.
pub struct TriggerTable {
    next_id: u64,
    surfaces: Vec<(TriggerHandle, Arc<dyn TriggerSurface>)>,
    enabled: bool,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            surfaces: Vec::new(),
            enabled: false,
        }
    }

    /// Register a surface. It immediately receives the current state.
    pub fn register(&mut self, surface: Arc<dyn TriggerSurface>) -> TriggerHandle {
        let handle = TriggerHandle(self.next_id);
        self.next_id += 1;
        surface.set_enabled(self.enabled);
        self.surfaces.push((handle, surface));
        handle
    }

    /// Remove a surface. Returns false if the handle was not registered.
    pub fn unregister(&mut self, handle: TriggerHandle) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|(h, _)| *h != handle);
        self.surfaces.len() != before
    }

    /// Enable or disable every registered surface. No-op if unchanged.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        for (_, surface) in &self.surfaces {
            surface.set_enabled(enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl Default for TriggerTable {
    fn default() -> Self {
        Self::new()
    }
}
