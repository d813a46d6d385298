//! Fit the composite to the spatial extent of the flight log and persist it
//! as a GeoTIFF.

mod affine;
mod gcp;

pub use affine::AffineTransform;
pub use gcp::{corner_gcps, GroundControlPoint};

use std::path::Path;

use tracing::info;

use crate::error::{OrthoError, Result};
use crate::frame::Composite;
use crate::io::flight_log::FlightLogPoint;
use crate::io::geotiff::write_geotiff;

/// Control points and the transform solved from them.
#[derive(Clone, Debug)]
pub struct Georeference {
    pub gcps: [GroundControlPoint; 4],
    pub transform: AffineTransform,
}

/// Earliest and latest records of a flight log.
///
/// On timestamp ties the first such record is the start and the last such
/// record is the end, matching a stable ascending sort.
pub fn track_extremes(log: &[FlightLogPoint]) -> Option<(&FlightLogPoint, &FlightLogPoint)> {
    let first = log
        .iter()
        .min_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms))?;
    let last = log
        .iter()
        .max_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms))?;
    Some((first, last))
}

/// Build the corner GCPs for a `width`×`height` raster and solve the transform.
pub fn solve_georeference(
    width: usize,
    height: usize,
    log: &[FlightLogPoint],
) -> Result<Georeference> {
    let (first, last) = track_extremes(log)
        .ok_or_else(|| OrthoError::NoFlightLog("flight log is empty".into()))?;

    if width < 2 || height < 2 {
        return Err(OrthoError::DegenerateExtent(format!(
            "composite of {width}x{height} pixels has no area to span"
        )));
    }
    if (last.longitude - first.longitude).abs() <= f64::EPSILON
        || (last.latitude - first.latitude).abs() <= f64::EPSILON
    {
        return Err(OrthoError::DegenerateExtent(format!(
            "flight track ({}, {}) → ({}, {}) spans zero area",
            first.longitude, first.latitude, last.longitude, last.latitude
        )));
    }

    let gcps = corner_gcps(first, last, width, height);
    let transform = AffineTransform::from_gcps(&gcps)?;
    Ok(Georeference { gcps, transform })
}

/// Solve the transform for `composite` and write it to `output` as GeoTIFF.
pub fn georeference(
    composite: &Composite,
    log: &[FlightLogPoint],
    output: &Path,
) -> Result<Georeference> {
    let (w, h) = (composite.width(), composite.height());
    let geo = solve_georeference(w, h, log)?;

    let (min_x, min_y, max_x, max_y) = geo.transform.bounds(w, h);
    info!(
        width = w,
        height = h,
        bands = composite.channels(),
        min_x,
        min_y,
        max_x,
        max_y,
        "Solved affine georeference"
    );

    write_geotiff(composite, &geo.transform, output)?;
    info!(path = %output.display(), "Georeferenced GeoTIFF saved");
    Ok(geo)
}
