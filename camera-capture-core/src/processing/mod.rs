pub mod capture_sequence;
pub mod orientation;
