//! Orchestration: the sweep thread, its telemetry, and the render refresh.

pub mod render_ticker;
pub mod scan_loop;
pub mod shutdown;

pub use render_ticker::{RenderSurface, RenderTicker};
pub use scan_loop::{ScanLoop, ScanTelemetry, TelemetrySnapshot};
pub use shutdown::ShutdownSignal;
