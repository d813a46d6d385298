use std::collections::HashMap;

use ndarray::Array2;

/// A 4-connected foreground region of a binary mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub label: u32,
    /// Pixel count.
    pub area: usize,
    /// Inclusive bounds: (min_row, max_row, min_col, max_col).
    pub bbox: (usize, usize, usize, usize),
}

impl Region {
    pub fn height(&self) -> usize {
        self.bbox.1 - self.bbox.0 + 1
    }

    pub fn width(&self) -> usize {
        self.bbox.3 - self.bbox.2 + 1
    }
}

/// Two-pass union-find labelling of `mask` with 4-connectivity.
///
/// Regions come back largest first; equal areas keep their top-left order.
pub fn label_regions(mask: &Array2<bool>) -> Vec<Region> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return Vec::new();
    }

    let mut labels = Array2::<u32>::zeros((h, w));
    // Index 0 is background.
    let mut parent: Vec<u32> = vec![0];

    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }
            let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
            let left = if col > 0 { labels[[row, col - 1]] } else { 0 };

            labels[[row, col]] = match (up, left) {
                (0, 0) => {
                    let next = parent.len() as u32;
                    parent.push(next);
                    next
                }
                (l, 0) | (0, l) => l,
                (u, l) => {
                    merge(&mut parent, u, l);
                    u.min(l)
                }
            };
        }
    }

    let mut regions = HashMap::<u32, Region>::new();
    for ((row, col), &lbl) in labels.indexed_iter() {
        if lbl == 0 {
            continue;
        }
        let root = root_of(&mut parent, lbl);
        let region = regions.entry(root).or_insert(Region {
            label: root,
            area: 0,
            bbox: (row, row, col, col),
        });
        region.area += 1;
        region.bbox.0 = region.bbox.0.min(row);
        region.bbox.1 = region.bbox.1.max(row);
        region.bbox.2 = region.bbox.2.min(col);
        region.bbox.3 = region.bbox.3.max(col);
    }

    let mut regions: Vec<Region> = regions.into_values().collect();
    regions.sort_unstable_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));
    regions
}

/// Largest foreground region, if any pixel is set.
pub fn largest_region(mask: &Array2<bool>) -> Option<Region> {
    label_regions(mask).into_iter().next()
}

fn root_of(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        parent[x as usize] = parent[parent[x as usize] as usize];
        x = parent[x as usize];
    }
    x
}

fn merge(parent: &mut [u32], a: u32, b: u32) {
    let ra = root_of(parent, a);
    let rb = root_of(parent, b);
    if ra != rb {
        parent[ra.max(rb) as usize] = ra.min(rb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> Array2<bool> {
        let h = rows.len();
        let w = rows[0].len();
        Array2::from_shape_fn((h, w), |(r, c)| rows[r].as_bytes()[c] == b'#')
    }

    #[test]
    fn u_shape_is_one_region() {
        let mask = mask_from(&["#..#", "#..#", "####"]);
        let regions = label_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 8);
        assert_eq!(regions[0].bbox, (0, 2, 0, 3));
    }

    #[test]
    fn diagonal_pixels_are_separate() {
        let mask = mask_from(&["#.", ".#"]);
        assert_eq!(label_regions(&mask).len(), 2);
    }

    #[test]
    fn largest_wins() {
        let mask = mask_from(&["##...", "##..#", "....."]);
        let region = largest_region(&mask).unwrap();
        assert_eq!(region.area, 4);
        assert_eq!((region.height(), region.width()), (2, 2));
    }

    #[test]
    fn empty_mask_has_no_region() {
        assert!(largest_region(&Array2::from_elem((3, 3), false)).is_none());
    }
}
