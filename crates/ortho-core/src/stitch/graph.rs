use std::collections::VecDeque;

use super::homography::Homography;
use super::registration::PairMatch;

/// Result of linking frames through their accepted matches.
#[derive(Clone, Debug)]
pub struct Placement {
    /// Frame → common plane transform, one per frame; `None` for frames not
    /// connected to frame 0.
    pub transforms: Vec<Option<Homography>>,
    /// Matches kept in the spanning tree.
    pub tree: Vec<PairMatch>,
}

impl Placement {
    pub fn unplaced(&self) -> Vec<usize> {
        self.transforms
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.is_none().then_some(i))
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.transforms.iter().all(Option::is_some)
    }
}

/// Keep a maximum-confidence spanning forest of `matches` (Kruskal) and place
/// every frame reachable from frame 0 on frame 0's plane.
pub fn place_frames(frame_count: usize, matches: &[PairMatch]) -> Placement {
    let mut order: Vec<&PairMatch> = matches.iter().collect();
    order.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.reference.cmp(&b.reference))
            .then(a.target.cmp(&b.target))
    });

    let mut parent: Vec<usize> = (0..frame_count).collect();
    let mut tree = Vec::new();
    for m in order {
        if m.reference >= frame_count || m.target >= frame_count {
            continue;
        }
        let (ra, rb) = (find(&mut parent, m.reference), find(&mut parent, m.target));
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
            tree.push(m.clone());
        }
    }

    let mut adjacency: Vec<Vec<(usize, Homography)>> = vec![Vec::new(); frame_count];
    for m in &tree {
        // target pixel p sits at reference pixel p + d
        adjacency[m.reference].push((m.target, Homography::translation(m.dx, m.dy)));
        adjacency[m.target].push((m.reference, Homography::translation(-m.dx, -m.dy)));
    }

    let mut transforms: Vec<Option<Homography>> = vec![None; frame_count];
    if frame_count > 0 {
        transforms[0] = Some(Homography::identity());
        let mut queue = VecDeque::from([0usize]);
        while let Some(node) = queue.pop_front() {
            let Some(base) = transforms[node] else { continue };
            for (next, edge) in &adjacency[node] {
                if transforms[*next].is_none() {
                    transforms[*next] = Some(base.compose(edge));
                    queue.push_back(*next);
                }
            }
        }
    }

    Placement { transforms, tree }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(reference: usize, target: usize, dx: f64, dy: f64, confidence: f64) -> PairMatch {
        PairMatch {
            reference,
            target,
            dx,
            dy,
            confidence,
            ncc: 1.0,
            overlap: 0.5,
        }
    }

    #[test]
    fn chain_accumulates_offsets() {
        let matches = vec![pair(0, 1, 100.0, 0.0, 0.4), pair(1, 2, 50.0, 10.0, 0.4)];
        let placement = place_frames(3, &matches);
        assert!(placement.is_connected());
        let t2 = placement.transforms[2].unwrap();
        assert_eq!(t2.apply(0.0, 0.0), Some((150.0, 10.0)));
    }

    #[test]
    fn strongest_edges_win() {
        let matches = vec![
            pair(0, 1, 100.0, 0.0, 0.9),
            pair(1, 2, 100.0, 0.0, 0.8),
            pair(0, 2, 150.0, 0.0, 0.1),
        ];
        let placement = place_frames(3, &matches);
        assert_eq!(placement.tree.len(), 2);
        let t2 = placement.transforms[2].unwrap();
        assert_eq!(t2.apply(0.0, 0.0), Some((200.0, 0.0)));
    }

    #[test]
    fn reverse_edges_invert_offsets() {
        let matches = vec![pair(1, 0, 30.0, -5.0, 0.5)];
        let placement = place_frames(2, &matches);
        let t1 = placement.transforms[1].unwrap();
        assert_eq!(t1.apply(0.0, 0.0), Some((-30.0, 5.0)));
    }

    #[test]
    fn isolated_frames_are_reported() {
        let placement = place_frames(3, &[pair(0, 1, 1.0, 0.0, 0.5)]);
        assert!(!placement.is_connected());
        assert_eq!(placement.unplaced(), vec![2]);
    }
}
