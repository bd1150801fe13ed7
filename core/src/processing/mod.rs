pub mod alert;
pub mod detection;
pub mod history;
pub mod range;
pub mod sample;
pub mod sweep;

pub use alert::{AlertExecutor, AlertPanel, AlertSequencer, AlertState, AlertStatus, AlertWorker};
pub use detection::{AlertAction, AlertChannel, AlertStage, AlertTimings, DetectionPolicy};
pub use history::SampleHistory;
pub use range::{EchoTiming, RangeSensor};
pub use sample::{Angle, CommandedAngle, Distance, ScanPoint};
pub use sweep::{SweepController, SweepSummary};
