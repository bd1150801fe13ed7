use serde::{Deserialize, Serialize};

/// Screen-space point; y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

pub struct PolarHelper;

impl PolarHelper {
    /// Projects `(radius, degrees)` around `center`: x = cx + r·cos θ, y = cy − r·sin θ.
    pub fn to_cartesian(center: Point2, radius: f32, degrees: f32) -> Point2 {
        let theta = degrees.to_radians();
        Point2 {
            x: center.x + radius * theta.cos(),
            y: center.y - radius * theta.sin(),
        }
    }
}
