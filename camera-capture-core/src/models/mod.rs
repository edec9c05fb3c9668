pub mod captured_image;
pub mod config;
pub mod error;
pub mod sensor;
pub mod state;
