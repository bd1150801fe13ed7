pub mod polar;
pub mod stats;

pub use polar::{Point2, PolarHelper};
pub use stats::StatsHelper;
