use log::{debug, info};
use scancore::render::{CanvasSize, DrawCommand, Paint};
use scancore::scheduler::RenderSurface;

/// Headless render target: counts what each frame would draw and reports
/// changes in the number of detection wedges.
#[derive(Debug)]
pub struct ConsoleSurface {
    size: CanvasSize,
    frames: u64,
    last_commands: usize,
    last_wedges: usize,
    max_wedges: usize,
}

impl ConsoleSurface {
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            frames: 0,
            last_commands: 0,
            last_wedges: 0,
            max_wedges: 0,
        }
    }

    pub fn last_commands(&self) -> usize {
        self.last_commands
    }

    pub fn last_wedges(&self) -> usize {
        self.last_wedges
    }

    pub fn max_wedges(&self) -> usize {
        self.max_wedges
    }
}

impl RenderSurface for ConsoleSurface {
    fn canvas_size(&self) -> CanvasSize {
        self.size
    }

    fn present(&mut self, commands: &[DrawCommand]) {
        let wedges = commands
            .iter()
            .filter(|command| {
                matches!(
                    command,
                    DrawCommand::Polygon {
                        paint: Paint::Detection,
                        ..
                    }
                )
            })
            .count();

        if wedges != self.last_wedges {
            info!("radar frame {}: {} detection wedge(s)", self.frames, wedges);
        }
        debug!("radar frame {}: {} commands", self.frames, commands.len());

        self.frames += 1;
        self.last_commands = commands.len();
        self.last_wedges = wedges;
        self.max_wedges = self.max_wedges.max(wedges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scancore::math::Point2;

    #[test]
    fn counts_detection_wedges_only() {
        let mut surface = ConsoleSurface::new(CanvasSize::new(400.0, 300.0));
        let wedge = DrawCommand::Polygon {
            points: vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)],
            paint: Paint::Detection,
        };
        let clear = DrawCommand::Clear {
            size: surface.canvas_size(),
            paint: Paint::Background,
        };

        surface.present(&[clear.clone(), wedge.clone(), wedge]);
        assert_eq!(surface.last_wedges(), 2);
        surface.present(&[clear]);

        assert_eq!(surface.frames, 2);
        assert_eq!(surface.last_commands(), 1);
        assert_eq!(surface.last_wedges(), 0);
        assert_eq!(surface.max_wedges(), 2);
    }
}
