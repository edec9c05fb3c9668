pub mod context;
pub mod controller;
pub mod coordinator;
pub mod device_session;
pub mod sensor_switch;
pub mod triggers;
