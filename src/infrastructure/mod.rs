// Infrastructure module - background utilities for the connection driver
pub mod timer;

pub use timer::Timer;
