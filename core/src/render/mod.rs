//! Polar radar projection of the sample history.

pub mod command;
pub mod radar;

pub use command::{CanvasSize, DrawCommand, Paint};
pub use radar::{RadarLayout, RadarRenderer, SweepSector};

use serde::{Deserialize, Serialize};

/// Where detection wedges put their two outer corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WedgeGeometry {
    /// On the sweep sector boundaries, whatever the sample's own angle.
    #[default]
    SectorBoundary,
    /// Centered on the sample's own angle, `bearing_spread_deg` to either side.
    SampleBearing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub margin: f32,
    pub sector_half_width: u16,
    pub guide_spacing: u16,
    pub px_per_cm: f32,
    pub wedge_geometry: WedgeGeometry,
    pub bearing_spread_deg: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin: 50.0,
            sector_half_width: 10,
            guide_spacing: 30,
            px_per_cm: 1.0,
            wedge_geometry: WedgeGeometry::SectorBoundary,
            bearing_spread_deg: 5,
        }
    }
}
