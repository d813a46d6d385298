use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;
use crate::error::{OrthoError, Result};

use super::gcp::GroundControlPoint;

/// Pixel → geographic mapping:
///   x = a·col + b·row + c
///   y = d·col + e·row + f
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 1.0,
            f: 0.0,
        }
    }

    /// Least-squares fit over the control points, one 3-parameter fit per
    /// output axis. Pixel coordinates are centred before solving. Exact when
    /// the points are consistent with an affine map, as the four-corner
    /// layout always is.
    pub fn from_gcps(gcps: &[GroundControlPoint]) -> Result<Self> {
        if gcps.len() < 3 {
            return Err(OrthoError::DegenerateExtent(format!(
                "need at least 3 control points, got {}",
                gcps.len()
            )));
        }

        let n = gcps.len() as f64;
        let mean_col = gcps.iter().map(|g| g.col).sum::<f64>() / n;
        let mean_row = gcps.iter().map(|g| g.row).sum::<f64>() / n;
        let mean_x = gcps.iter().map(|g| g.x).sum::<f64>() / n;
        let mean_y = gcps.iter().map(|g| g.y).sum::<f64>() / n;

        let (mut s_cc, mut s_rr, mut s_cr) = (0.0, 0.0, 0.0);
        let (mut s_cx, mut s_rx, mut s_cy, mut s_ry) = (0.0, 0.0, 0.0, 0.0);
        for g in gcps {
            let (dc, dr) = (g.col - mean_col, g.row - mean_row);
            let (dx, dy) = (g.x - mean_x, g.y - mean_y);
            s_cc += dc * dc;
            s_rr += dr * dr;
            s_cr += dc * dr;
            s_cx += dc * dx;
            s_rx += dr * dx;
            s_cy += dc * dy;
            s_ry += dr * dy;
        }

        let det = s_cc * s_rr - s_cr * s_cr;
        if det.abs() <= EPSILON * (s_cc * s_rr).max(1.0) {
            return Err(OrthoError::DegenerateExtent(
                "control points are collinear in pixel space".into(),
            ));
        }

        let a = (s_cx * s_rr - s_rx * s_cr) / det;
        let b = (s_rx * s_cc - s_cx * s_cr) / det;
        let d = (s_cy * s_rr - s_ry * s_cr) / det;
        let e = (s_ry * s_cc - s_cy * s_cr) / det;

        Ok(Self {
            a,
            b,
            c: mean_x - a * mean_col - b * mean_row,
            d,
            e,
            f: mean_y - d * mean_col - e * mean_row,
        })
    }

    /// Map pixel (col, row) to geographic (x, y).
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() <= f64::MIN_POSITIVE || !det.is_finite() {
            return None;
        }
        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Some(Self {
            a,
            b,
            c: -(a * self.c + b * self.f),
            d,
            e,
            f: -(d * self.c + e * self.f),
        })
    }

    /// Map geographic (x, y) back to pixel (col, row).
    pub fn invert_point(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.inverse().map(|inv| inv.apply(x, y))
    }

    /// No rotation or shear terms.
    pub fn is_north_up(&self) -> bool {
        self.b.abs() <= EPSILON && self.d.abs() <= EPSILON
    }

    /// Coefficients in GDAL GeoTransform order: [c, a, b, f, d, e].
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y) of a raster's pixel corners.
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(0.0, height as f64),
            self.apply(width as f64, height as f64),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gcp(col: f64, row: f64, x: f64, y: f64) -> GroundControlPoint {
        GroundControlPoint { row, col, x, y }
    }

    #[test]
    fn recovers_rotated_transform() {
        let truth = AffineTransform {
            a: 0.5,
            b: 0.2,
            c: 10.0,
            d: -0.1,
            e: 0.7,
            f: -3.0,
        };
        let gcps: Vec<_> = [(0.0, 0.0), (50.0, 0.0), (0.0, 40.0), (50.0, 40.0)]
            .iter()
            .map(|&(c, r)| {
                let (x, y) = truth.apply(c, r);
                gcp(c, r, x, y)
            })
            .collect();
        let fit = AffineTransform::from_gcps(&gcps).unwrap();
        assert_relative_eq!(fit.a, truth.a, epsilon = 1e-12);
        assert_relative_eq!(fit.b, truth.b, epsilon = 1e-12);
        assert_relative_eq!(fit.c, truth.c, epsilon = 1e-10);
        assert_relative_eq!(fit.d, truth.d, epsilon = 1e-12);
        assert_relative_eq!(fit.e, truth.e, epsilon = 1e-12);
        assert_relative_eq!(fit.f, truth.f, epsilon = 1e-10);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let gcps = [
            gcp(0.0, 0.0, 0.0, 0.0),
            gcp(1.0, 1.0, 1.0, 1.0),
            gcp(2.0, 2.0, 2.0, 2.0),
        ];
        assert!(matches!(
            AffineTransform::from_gcps(&gcps),
            Err(OrthoError::DegenerateExtent(_))
        ));
    }

    #[test]
    fn inverse_round_trips() {
        let t = AffineTransform {
            a: 2.0,
            b: 0.5,
            c: 1.0,
            d: 0.25,
            e: -3.0,
            f: 7.0,
        };
        let (x, y) = t.apply(12.5, -4.0);
        let (col, row) = t.invert_point(x, y).unwrap();
        assert_relative_eq!(col, 12.5, epsilon = 1e-9);
        assert_relative_eq!(row, -4.0, epsilon = 1e-9);
    }

    #[test]
    fn gdal_order() {
        let t = AffineTransform {
            a: 1.0,
            b: 2.0,
            c: 3.0,
            d: 4.0,
            e: 5.0,
            f: 6.0,
        };
        assert_eq!(t.to_gdal(), [3.0, 1.0, 2.0, 6.0, 4.0, 5.0]);
        assert!(!t.is_north_up());
        assert!(AffineTransform::identity().is_north_up());
    }
}
