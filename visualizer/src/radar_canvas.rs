use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, Path, Stroke},
    Color, Point, Rectangle, Renderer, Size, Theme,
};
use scancore::math::{Point2, PolarHelper};
use scancore::processing::{Angle, ScanPoint};
use scancore::render::{CanvasSize, DrawCommand, Paint, RadarRenderer};

/// Angular resolution used to approximate arcs with line segments.
const ARC_STEP_DEG: f32 = 2.0;

/// Canvas program painting one radar frame from a history snapshot.
#[derive(Clone)]
pub struct RadarView {
    renderer: RadarRenderer,
    points: Vec<ScanPoint>,
    angle: Angle,
}

impl RadarView {
    pub fn new(renderer: &RadarRenderer, points: &[ScanPoint], angle: Angle) -> Self {
        Self {
            renderer: renderer.clone(),
            points: points.to_vec(),
            angle,
        }
    }
}

impl<Message> canvas::Program<Message> for RadarView {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let commands = self.renderer.render(
            &self.points,
            self.angle,
            CanvasSize::new(bounds.width, bounds.height),
        );
        for command in &commands {
            paint_command(&mut frame, command);
        }
        vec![frame.into_geometry()]
    }
}

fn paint_command(frame: &mut Frame, command: &DrawCommand) {
    match command {
        DrawCommand::Clear { size, paint } => {
            frame.fill_rectangle(
                Point::ORIGIN,
                Size::new(size.width, size.height),
                color_of(*paint),
            );
        }
        DrawCommand::Arc {
            center,
            radius,
            start_deg,
            end_deg,
            paint,
            width,
        } => {
            let points = arc_points(*center, *radius, *start_deg, *end_deg);
            let path = Path::new(|builder| {
                for (i, point) in points.iter().enumerate() {
                    if i == 0 {
                        builder.move_to(to_point(*point));
                    } else {
                        builder.line_to(to_point(*point));
                    }
                }
            });
            frame.stroke(&path, stroke(*paint, *width));
        }
        DrawCommand::Line {
            from,
            to,
            paint,
            width,
        } => {
            let path = Path::line(to_point(*from), to_point(*to));
            frame.stroke(&path, stroke(*paint, *width));
        }
        DrawCommand::Polygon { points, paint } => {
            if points.len() < 3 {
                return;
            }
            let path = Path::new(|builder| {
                builder.move_to(to_point(points[0]));
                for point in &points[1..] {
                    builder.line_to(to_point(*point));
                }
                builder.close();
            });
            frame.fill(&path, color_of(*paint));
        }
    }
}

fn stroke(paint: Paint, width: f32) -> Stroke<'static> {
    Stroke::default()
        .with_width(width)
        .with_color(color_of(paint))
}

fn to_point(point: Point2) -> Point {
    Point::new(point.x, point.y)
}

pub fn color_of(paint: Paint) -> Color {
    match paint {
        Paint::Background => Color::from_rgb(0.01, 0.04, 0.02),
        Paint::Outline => Color::from_rgb(0.0, 0.78, 0.3),
        Paint::Guide => Color::from_rgb(0.0, 0.42, 0.16),
        Paint::Sweep => Color::from_rgb(0.3, 1.0, 0.45),
        Paint::Detection => Color::from_rgb(0.95, 0.22, 0.2),
    }
}

/// Samples a counter-clockwise arc into a polyline, both ends included.
pub fn arc_points(center: Point2, radius: f32, start_deg: f32, end_deg: f32) -> Vec<Point2> {
    let sweep = end_deg - start_deg;
    let segments = (sweep.abs() / ARC_STEP_DEG).ceil().max(1.0) as usize;
    (0..=segments)
        .map(|i| {
            let degrees = start_deg + sweep * i as f32 / segments as f32;
            PolarHelper::to_cartesian(center, radius, degrees)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_circle_arc_spans_both_ends_above_center() {
        let center = Point2::new(50.0, 50.0);
        let points = arc_points(center, 10.0, 0.0, 180.0);

        assert_eq!(points.len(), 91);
        let first = points[0];
        let last = points[points.len() - 1];
        assert!((first.x - 60.0).abs() < 1e-3 && (first.y - 50.0).abs() < 1e-3);
        assert!((last.x - 40.0).abs() < 1e-3 && (last.y - 50.0).abs() < 1e-3);
        let top = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        assert!((top - 40.0).abs() < 1e-3);
    }

    #[test]
    fn degenerate_arc_still_has_two_points() {
        let points = arc_points(Point2::default(), 5.0, 30.0, 30.0);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], points[1]);
    }

    #[test]
    fn detections_stand_out_from_background() {
        assert_ne!(color_of(Paint::Detection), color_of(Paint::Background));
        assert_ne!(color_of(Paint::Sweep), color_of(Paint::Guide));
    }
}
