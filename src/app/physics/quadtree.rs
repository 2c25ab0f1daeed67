use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Square {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl Square {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let (min, max) = points.iter().fold(
            (vec2(f32::INFINITY, f32::INFINITY), vec2(f32::NEG_INFINITY, f32::NEG_INFINITY)),
            |(min, max), point| (min.min(*point), max.max(*point)),
        );

        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn side(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    fn quadrant_of(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn quadrant(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sx = if quadrant & 1 == 0 { -quarter } else { quarter };
        let sy = if quadrant & 2 == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(sx, sy),
            half_extent: quarter,
        }
    }
}

/// A cell of the Barnes-Hut tree. Leaves hold point indices; inner cells
/// only aggregate their children.
pub(super) struct Cell {
    pub(super) square: Square,
    pub(super) center_of_mass: Vec2,
    pub(super) count: usize,
    pub(super) points: Vec<usize>,
    pub(super) children: Vec<Cell>,
}

impl Cell {
    pub(super) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn build(square: Square, points: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let count = points.len();
        let sum = points
            .iter()
            .fold(Vec2::ZERO, |sum, &index| sum + positions[index]);
        let center_of_mass = if count > 0 { sum / count as f32 } else { square.center };

        if depth >= MAX_DEPTH || count <= LEAF_CAPACITY {
            return Self {
                square,
                center_of_mass,
                count,
                points,
                children: Vec::new(),
            };
        }

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for index in points.iter().copied() {
            buckets[square.quadrant_of(positions[index])].push(index);
        }

        // Coincident points never separate; keep them in one leaf.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return Self {
                square,
                center_of_mass,
                count,
                points,
                children: Vec::new(),
            };
        }

        let children = buckets
            .into_iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(quadrant, bucket)| {
                Self::build(square.quadrant(quadrant), bucket, positions, depth + 1)
            })
            .collect();

        Self {
            square,
            center_of_mass,
            count,
            points: Vec::new(),
            children,
        }
    }
}

pub(super) struct QuadTree {
    pub(super) root: Cell,
}

impl QuadTree {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let square = Square::enclosing(positions)?;
        let points = (0..positions.len()).collect();
        Some(Self {
            root: Cell::build(square, points, positions, 0),
        })
    }

    /// Depth-first walk; `visit` returns `true` to skip the children of a cell.
    pub(super) fn visit(&self, mut visit: impl FnMut(&Cell) -> bool) {
        let mut stack = vec![&self.root];
        while let Some(cell) = stack.pop() {
            if visit(cell) {
                continue;
            }
            stack.extend(cell.children.iter());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_add_up_across_leaves() {
        let positions = (0..40)
            .map(|index| vec2((index % 7) as f32 * 13.0, (index / 7) as f32 * 17.0))
            .collect::<Vec<_>>();
        let tree = QuadTree::build(&positions).expect("tree");
        assert_eq!(tree.root.count, 40);

        let mut leaf_points = 0;
        tree.visit(|cell| {
            if cell.is_leaf() {
                leaf_points += cell.points.len();
            }
            false
        });
        assert_eq!(leaf_points, 40);
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![vec2(3.0, 3.0); 20];
        let tree = QuadTree::build(&positions).expect("tree");
        assert!(tree.root.is_leaf());
        assert_eq!(tree.root.center_of_mass, vec2(3.0, 3.0));
    }

    #[test]
    fn non_finite_positions_produce_no_tree() {
        assert!(QuadTree::build(&[vec2(f32::NAN, 0.0)]).is_none());
        assert!(QuadTree::build(&[]).is_none());
    }
}
