use eframe::egui::{Vec2, vec2};

use super::SimLink;
use super::quadtree::QuadNode;

const MIN_DISTANCE_SQ: f32 = 1.0;

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    /// Charge strength already scaled by the current energy.
    pub(super) strength: f32,
    pub(super) theta: f32,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) radius: f32,
    pub(super) strength: f32,
}

/// Deterministic unit direction used when two points coincide.
fn jiggle(first: usize, second: usize) -> Vec2 {
    let angle =
        ((first as f32) * 0.618_034 + (second as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

fn separation(positions: &[Vec2], from: usize, to: usize) -> Vec2 {
    let delta = positions[from] - positions[to];
    if delta.length_sq() > 1e-6 {
        delta
    } else if from < to {
        jiggle(from, to) * 1e-3
    } else {
        jiggle(to, from) * -1e-3
    }
}

pub(super) fn accumulate_charge(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let delta = separation(positions, index, other);
            let distance_sq = delta.length_sq().max(MIN_DISTANCE_SQ);
            *velocity += delta * (params.strength / distance_sq);
        }
        return;
    }

    let delta = point - node.centroid;
    let distance_sq = delta.length_sq().max(MIN_DISTANCE_SQ);
    let far_enough = !node.square.contains(point)
        && (node.square.side() * node.square.side()) < (params.theta * params.theta * distance_sq);

    if far_enough {
        *velocity += delta * (params.strength * node.mass / distance_sq);
        return;
    }

    for child in node.children() {
        accumulate_charge(child, index, positions, params, velocity);
    }
}

fn resolve_overlap(
    positions: &[Vec2],
    from: usize,
    to: usize,
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let min_distance = params.radius * 2.0;
    let delta = separation(positions, from, to);
    let distance_sq = delta.length_sq();
    if distance_sq >= min_distance * min_distance {
        return;
    }

    let distance = distance_sq.sqrt();
    let push = delta * (((min_distance - distance) / distance) * params.strength * 0.5);
    velocities[from] += push;
    velocities[to] -= push;
}

/// Pushes apart every pair of discs that overlap, walking pairs of tree cells
/// and skipping cell pairs too far apart to contain a collision.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let reach = params.radius * 2.0;
    if node_a.square.gap_sq(node_b.square) > reach * reach {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    resolve_overlap(positions, from, to, params, velocities);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    resolve_overlap(positions, from, to, params, velocities);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (first, child_a) in children.iter().enumerate() {
            accumulate_collision_pairs(child_a, child_a, true, positions, params, velocities);
            for child_b in &children[first + 1..] {
                accumulate_collision_pairs(child_a, child_b, false, positions, params, velocities);
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.square.half_extent >= node_b.square.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collision_pairs(child, node_b, false, positions, params, velocities);
        }
    } else {
        for child in node_b.children() {
            accumulate_collision_pairs(node_a, child, false, positions, params, velocities);
        }
    }
}

/// Spring pull toward each link's rest length, split between the endpoints
/// by their precomputed bias.
pub(super) fn apply_links(
    links: &[SimLink],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    alpha: f32,
) {
    for link in links {
        let (source, target) = (link.source, link.target);
        if source == target {
            continue;
        }

        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() <= 1e-6 {
            delta = jiggle(source.min(target), source.max(target)) * 1e-3;
        }

        let distance = delta.length();
        let stretch = ((distance - link.distance) / distance) * alpha * link.strength;
        let correction = delta * stretch;

        velocities[target] -= correction * link.bias;
        velocities[source] += correction * (1.0 - link.bias);
    }
}
