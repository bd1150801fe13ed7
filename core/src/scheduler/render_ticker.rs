use crate::render::{CanvasSize, DrawCommand, RadarRenderer};
use crate::scheduler::scan_loop::ScanTelemetry;

/// Whatever finally draws the radar frame.
pub trait RenderSurface {
    /// Current drawable size; queried on every tick so resizes take effect on
    /// the next frame.
    fn canvas_size(&self) -> CanvasSize;
    fn present(&mut self, commands: &[DrawCommand]);
}

/// One render refresh: snapshot the telemetry, project it, hand it to the surface.
///
/// The caller owns the cadence (a timer or UI subscription) and calls
/// [`RenderTicker::tick`] on every period. A tick never waits on the sweep.
pub struct RenderTicker<S> {
    renderer: RadarRenderer,
    telemetry: ScanTelemetry,
    surface: S,
    frames: u64,
}

impl<S: RenderSurface> RenderTicker<S> {
    pub fn new(renderer: RadarRenderer, telemetry: ScanTelemetry, surface: S) -> Self {
        Self {
            renderer,
            telemetry,
            surface,
            frames: 0,
        }
    }

    /// Renders one frame and returns how many commands it contained.
    pub fn tick(&mut self) -> usize {
        let points = self.telemetry.history.snapshot();
        let angle = self.telemetry.angle.load();
        let commands = self
            .renderer
            .render(&points, angle, self.surface.canvas_size());
        self.surface.present(&commands);
        self.frames += 1;
        commands.len()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
