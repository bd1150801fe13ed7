use crate::math::Point2;
use serde::{Deserialize, Serialize};

/// Drawable area handed to the renderer on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    /// Negative or non-finite extents collapse to zero.
    pub fn new(width: f32, height: f32) -> Self {
        let sane = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: sane(width),
            height: sane(height),
        }
    }
}

/// Semantic colour of a primitive; the surface maps it to real colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    Background,
    Outline,
    Guide,
    Sweep,
    Detection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        size: CanvasSize,
        paint: Paint,
    },
    /// Counter-clockwise arc from `start_deg` to `end_deg`.
    Arc {
        center: Point2,
        radius: f32,
        start_deg: f32,
        end_deg: f32,
        paint: Paint,
        width: f32,
    },
    Line {
        from: Point2,
        to: Point2,
        paint: Paint,
        width: f32,
    },
    /// Closed, filled polygon.
    Polygon { points: Vec<Point2>, paint: Paint },
}
