use ndarray::s;
use tracing::debug;

use crate::consts::BORDER_THRESHOLD;
use crate::frame::Composite;

use super::components::largest_region;

/// Rectangle in canvas pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Bounding box of the largest 4-connected region brighter than the border
/// threshold, or `None` when the composite is entirely padding.
pub fn content_rect(composite: &Composite) -> Option<CropRect> {
    let mask = composite.luminance().mapv(|v| v > BORDER_THRESHOLD);
    largest_region(&mask).map(|region| CropRect {
        x: region.bbox.2,
        y: region.bbox.0,
        width: region.width(),
        height: region.height(),
    })
}

/// Crop the composite to its main content region. Left unchanged when no
/// foreground exists.
pub fn trim_borders(composite: Composite) -> Composite {
    let Some(rect) = content_rect(&composite) else {
        debug!("No foreground in composite, skipping border trim");
        return composite;
    };
    if rect.x == 0
        && rect.y == 0
        && rect.width == composite.width()
        && rect.height == composite.height()
    {
        return composite;
    }

    debug!(
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "Trimming composite borders"
    );
    let planes = composite
        .planes
        .iter()
        .map(|p| {
            p.slice(s![rect.y..rect.y + rect.height, rect.x..rect.x + rect.width])
                .to_owned()
        })
        .collect();
    Composite::new(planes, composite.depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelDepth;
    use ndarray::Array2;

    #[test]
    fn crops_to_content() {
        let mut plane = Array2::<f32>::zeros((10, 12));
        plane.slice_mut(s![2..7, 3..11]).fill(0.5);
        let trimmed = trim_borders(Composite::new(vec![plane], PixelDepth::U8));
        assert_eq!((trimmed.width(), trimmed.height()), (8, 5));
    }

    #[test]
    fn all_black_is_left_alone() {
        let plane = Array2::<f32>::zeros((4, 6));
        let trimmed = trim_borders(Composite::new(vec![plane], PixelDepth::U16));
        assert_eq!((trimmed.width(), trimmed.height()), (6, 4));
    }
}
