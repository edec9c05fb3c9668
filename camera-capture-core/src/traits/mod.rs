pub mod camera_delegate;
pub mod camera_provider;
pub mod trigger_surface;
