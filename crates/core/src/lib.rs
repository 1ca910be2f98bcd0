#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progress;
pub mod shelf;
pub mod time;

pub use error::ProgressError;
pub use time::Clock;
