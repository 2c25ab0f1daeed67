use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadTree;

/// Minimum squared distance used by the many-body force, so coincident nodes
/// get a bounded push instead of an infinite one.
const DISTANCE_MIN_SQ: f32 = 1.0;

/// Tiny deterministic offset for coincident nodes; `jiggle(a, b) == -jiggle(b, a)`.
fn jiggle(from: usize, to: usize) -> Vec2 {
    let (low, high) = (from.min(to), from.max(to));
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * std::f32::consts::TAU;
    let offset = vec2(angle.cos(), angle.sin()) * 1e-3;
    if from <= to { offset } else { -offset }
}

fn softened(distance_sq: f32) -> f32 {
    if distance_sq < DISTANCE_MIN_SQ {
        (DISTANCE_MIN_SQ * distance_sq).sqrt()
    } else {
        distance_sq
    }
}

/// Springs along links toward `distance`. Each spring is weaker on the side of
/// the better connected endpoint.
pub(super) fn apply_links(
    edges: &[(usize, usize)],
    degrees: &[usize],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    distance: f32,
    alpha: f32,
) {
    for &(source, target) in edges {
        let source_degree = degrees[source].max(1) as f32;
        let target_degree = degrees[target].max(1) as f32;
        let strength = 1.0 / source_degree.min(target_degree);
        let bias = source_degree / (source_degree + target_degree);

        let mut delta = (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() <= f32::EPSILON {
            delta = jiggle(source, target);
        }
        let length = delta.length();
        let pull = delta * ((length - distance) / length * alpha * strength);

        velocities[target] -= pull * bias;
        velocities[source] += pull * (1.0 - bias);
    }
}

/// Pairwise repulsion (`strength` < 0) or attraction, approximated with the
/// Barnes-Hut criterion for cells that are far away relative to their size.
pub(super) fn apply_many_body(
    tree: &QuadTree,
    positions: &[Vec2],
    velocities: &mut [Vec2],
    strength: f32,
    theta: f32,
    alpha: f32,
) {
    let theta_sq = theta * theta;
    for (index, velocity) in velocities.iter_mut().enumerate() {
        let point = positions[index];
        let mut push = Vec2::ZERO;

        tree.visit(|cell| {
            if cell.count == 0 {
                return true;
            }

            if cell.is_leaf() {
                for &other in &cell.points {
                    if other == index {
                        continue;
                    }
                    let mut delta = positions[other] - point;
                    if delta.length_sq() <= f32::EPSILON {
                        delta = jiggle(index, other);
                    }
                    push += delta * (strength * alpha / softened(delta.length_sq()));
                }
                return true;
            }

            let delta = cell.center_of_mass - point;
            let distance_sq = delta.length_sq().max(f32::EPSILON);
            let side = cell.square.side();
            let far_enough = !cell.square.contains(point) && side * side / theta_sq < distance_sq;
            if far_enough {
                push += delta * (strength * cell.count as f32 * alpha / softened(distance_sq));
                return true;
            }

            false
        });

        *velocity += push;
    }
}

pub(super) fn apply_center(
    positions: &[Vec2],
    velocities: &mut [Vec2],
    center: Vec2,
    strength: f32,
    alpha: f32,
) {
    for (position, velocity) in positions.iter().zip(velocities.iter_mut()) {
        *velocity += (center - *position) * (strength * alpha);
    }
}

/// Separates nodes closer than the sum of their radii, using positions
/// predicted one step ahead. The push is split by radius weight.
pub(super) fn apply_collisions(
    positions: &[Vec2],
    velocities: &mut [Vec2],
    radii: &[f32],
    strength: f32,
) {
    let predicted = positions
        .iter()
        .zip(velocities.iter())
        .map(|(position, velocity)| *position + *velocity)
        .collect::<Vec<_>>();
    let Some(tree) = QuadTree::build(&predicted) else {
        return;
    };
    let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);

    for index in 0..predicted.len() {
        let point = predicted[index];
        let radius = radii[index];
        let reach = radius + max_radius;
        let mut neighbors = Vec::new();

        tree.visit(|cell| {
            let gap_x = ((point.x - cell.square.center.x).abs() - cell.square.half_extent).max(0.0);
            let gap_y = ((point.y - cell.square.center.y).abs() - cell.square.half_extent).max(0.0);
            if gap_x * gap_x + gap_y * gap_y > reach * reach {
                return true;
            }
            if cell.is_leaf() {
                neighbors.extend(cell.points.iter().copied().filter(|&other| other > index));
                return true;
            }
            false
        });

        for other in neighbors {
            let combined = radius + radii[other];
            let mut delta = point - predicted[other];
            let mut distance_sq = delta.length_sq();
            if distance_sq >= combined * combined {
                continue;
            }
            if distance_sq <= f32::EPSILON {
                delta = jiggle(index, other);
                distance_sq = delta.length_sq();
            }

            let distance = distance_sq.sqrt();
            let push = delta * ((combined - distance) / distance * strength);
            let radius_sq = radius * radius;
            let other_sq = radii[other] * radii[other];
            let share = other_sq / (radius_sq + other_sq);

            velocities[index] += push * share;
            velocities[other] -= push * (1.0 - share);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretched_link_pulls_endpoints_together() {
        let positions = vec![vec2(0.0, 0.0), vec2(400.0, 0.0)];
        let mut velocities = vec![Vec2::ZERO; 2];
        apply_links(&[(0, 1)], &[1, 1], &positions, &mut velocities, 150.0, 1.0);
        assert!(velocities[0].x > 0.0);
        assert!(velocities[1].x < 0.0);
    }

    #[test]
    fn repulsion_pushes_apart_even_when_coincident() {
        let positions = vec![vec2(10.0, 10.0), vec2(10.0, 10.0)];
        let tree = QuadTree::build(&positions).expect("tree");
        let mut velocities = vec![Vec2::ZERO; 2];
        apply_many_body(&tree, &positions, &mut velocities, -400.0, 0.9, 0.1);
        assert!(velocities[0].length() > 0.0);
        assert!((velocities[0] + velocities[1]).length() < 1e-3);
    }

    #[test]
    fn approximation_stays_close_to_exact_sum() {
        let mut positions = (0..30)
            .map(|index| vec2((index % 6) as f32 * 9.0, (index / 6) as f32 * 9.0))
            .collect::<Vec<_>>();
        positions.push(vec2(2_000.0, 0.0));
        let last = positions.len() - 1;

        let tree = QuadTree::build(&positions).expect("tree");
        let mut approximated = vec![Vec2::ZERO; positions.len()];
        apply_many_body(&tree, &positions, &mut approximated, -400.0, 0.9, 1.0);

        let exact = positions[..last]
            .iter()
            .fold(Vec2::ZERO, |sum, other| {
                let delta = *other - positions[last];
                sum + delta * (-400.0 / delta.length_sq())
            });
        assert!((approximated[last] - exact).length() / exact.length() < 0.05);
    }

    #[test]
    fn centering_points_toward_center() {
        let positions = vec![vec2(100.0, -50.0)];
        let mut velocities = vec![Vec2::ZERO];
        apply_center(&positions, &mut velocities, Vec2::ZERO, 0.1, 1.0);
        assert_eq!(velocities[0], vec2(-10.0, 5.0));
    }

    #[test]
    fn overlapping_nodes_are_separated() {
        let positions = vec![vec2(0.0, 0.0), vec2(20.0, 0.0), vec2(1_000.0, 0.0)];
        let mut velocities = vec![Vec2::ZERO; 3];
        apply_collisions(&positions, &mut velocities, &[70.0, 70.0, 70.0], 0.5);
        assert!(velocities[0].x < 0.0);
        assert!(velocities[1].x > 0.0);
        assert_eq!(velocities[2], Vec2::ZERO);
    }
}
