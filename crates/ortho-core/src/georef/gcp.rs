use serde::{Deserialize, Serialize};

use crate::io::flight_log::FlightLogPoint;

/// Pixel (row, col) ↔ geographic (x = longitude, y = latitude).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundControlPoint {
    pub row: f64,
    pub col: f64,
    pub x: f64,
    pub y: f64,
}

/// Pin the four raster corners to the extremes of the flight track.
///
/// Assumes the flight runs from one geographic corner to the diagonally
/// opposite one, with image rows following the first→last latitude change.
/// Order: top-left, top-right, bottom-left, bottom-right.
pub fn corner_gcps(
    first: &FlightLogPoint,
    last: &FlightLogPoint,
    width: usize,
    height: usize,
) -> [GroundControlPoint; 4] {
    let right = width.saturating_sub(1) as f64;
    let bottom = height.saturating_sub(1) as f64;
    let corner = |row: f64, col: f64, x: f64, y: f64| GroundControlPoint { row, col, x, y };

    [
        corner(0.0, 0.0, first.longitude, first.latitude),
        corner(0.0, right, last.longitude, first.latitude),
        corner(bottom, 0.0, first.longitude, last.latitude),
        corner(bottom, right, last.longitude, last.latitude),
    ]
}
