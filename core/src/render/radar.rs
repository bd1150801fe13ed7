use crate::math::{Point2, PolarHelper};
use crate::processing::sample::{Angle, ScanPoint};
use crate::render::command::{CanvasSize, DrawCommand, Paint};
use crate::render::{RenderConfig, WedgeGeometry};

const OUTLINE_WIDTH: f32 = 3.0;
const GUIDE_WIDTH: f32 = 1.0;
const SWEEP_WIDTH: f32 = 2.0;

/// Angular window highlighted around the commanded angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSector {
    pub start: Angle,
    pub end: Angle,
}

impl SweepSector {
    pub fn around(angle: Angle, half_width: u16) -> Self {
        let center = i32::from(angle.degrees());
        let half = i32::from(half_width);
        Self {
            start: Angle::new(center - half),
            end: Angle::new(center + half),
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, angle: Angle) -> bool {
        self.start <= angle && angle <= self.end
    }
}

/// Center and radius of the half-disc for a given canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarLayout {
    pub center: Point2,
    pub radius: f32,
}

impl RadarLayout {
    pub fn compute(canvas: CanvasSize, margin: f32) -> Self {
        Self {
            center: Point2::new(canvas.width / 2.0, canvas.height - margin),
            radius: (canvas.width.min(canvas.height) / 2.0 - margin).max(0.0),
        }
    }

    pub fn point_at(&self, radius: f32, degrees: f32) -> Point2 {
        PolarHelper::to_cartesian(self.center, radius, degrees)
    }
}

/// Turns a history snapshot into drawing commands. Holds configuration only;
/// the output depends on nothing but the arguments of [`RadarRenderer::render`].
#[derive(Debug, Clone, Default)]
pub struct RadarRenderer {
    config: RenderConfig,
}

impl RadarRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn render(&self, snapshot: &[ScanPoint], current: Angle, canvas: CanvasSize) -> Vec<DrawCommand> {
        let canvas = CanvasSize::new(canvas.width, canvas.height);
        let layout = RadarLayout::compute(canvas, self.config.margin);
        let sector = SweepSector::around(current, self.config.sector_half_width);

        let mut commands = vec![
            DrawCommand::Clear {
                size: canvas,
                paint: Paint::Background,
            },
            DrawCommand::Arc {
                center: layout.center,
                radius: layout.radius,
                start_deg: 0.0,
                end_deg: 180.0,
                paint: Paint::Outline,
                width: OUTLINE_WIDTH,
            },
        ];

        let spacing = usize::from(self.config.guide_spacing.max(1));
        for degrees in (0..=180u16).step_by(spacing) {
            commands.push(DrawCommand::Line {
                from: layout.center,
                to: layout.point_at(layout.radius, f32::from(degrees)),
                paint: Paint::Guide,
                width: GUIDE_WIDTH,
            });
        }

        for edge in [sector.start, sector.end] {
            commands.push(DrawCommand::Line {
                from: layout.center,
                to: layout.point_at(layout.radius, edge.as_f32()),
                paint: Paint::Sweep,
                width: SWEEP_WIDTH,
            });
        }

        commands.extend(
            snapshot
                .iter()
                .filter(|point| sector.contains(point.angle))
                .filter_map(|point| self.wedge(&layout, &sector, point)),
        );
        commands
    }

    fn wedge(&self, layout: &RadarLayout, sector: &SweepSector, point: &ScanPoint) -> Option<DrawCommand> {
        let cm = point.distance.known()?;
        let radius = (cm * self.config.px_per_cm).clamp(0.0, layout.radius);
        let (from, to) = match self.config.wedge_geometry {
            WedgeGeometry::SectorBoundary => (sector.start, sector.end),
            WedgeGeometry::SampleBearing => {
                let around = SweepSector::around(point.angle, self.config.bearing_spread_deg);
                (around.start, around.end)
            }
        };
        Some(DrawCommand::Polygon {
            points: vec![
                layout.center,
                layout.point_at(radius, from.as_f32()),
                layout.point_at(radius, to.as_f32()),
            ],
            paint: Paint::Detection,
        })
    }
}
