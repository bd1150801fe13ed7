//! Obstacle-scanning telemetry core for the sweep-sonar robot platform.
//!
//! A range sensor on a single-axis mount is swept through 0°–180°; every
//! reading lands in a bounded sample history, close readings raise a timed
//! alert sequence, and the history is projected into a radar-style polar view.

pub mod drive;
pub mod hardware;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod render;
pub mod scheduler;
pub mod telemetry;

pub use prelude::{ScanConfig, ScanError, ScanResult};
