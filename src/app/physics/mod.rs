mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use tracing::{debug, trace};

use crate::family::MemberId;
use forces::{
    ChargeParams, CollisionParams, accumulate_charge, accumulate_collision_pairs, apply_links,
};
use quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.9;
const ALPHA_MIN: f32 = 0.001;
/// Decay that takes energy from 1.0 down to `ALPHA_MIN` in about 300 ticks.
const ALPHA_DECAY: f32 = 0.0228;
const REHEAT_ALPHA: f32 = 0.7;
const DRAG_ALPHA_TARGET: f32 = 0.3;
const INITIAL_RADIUS: f32 = 10.0;
const MAX_SPEED: f32 = 80.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct PhysicsConfig {
    pub charge_strength: f32,
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub center_strength: f32,
    pub velocity_decay: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            charge_strength: 560.0,
            collision_radius: 56.0,
            collision_strength: 0.7,
            center_strength: 0.06,
            velocity_decay: 0.28,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum Phase {
    /// Energy has decayed below the visible-motion threshold.
    Idle,
    Settling,
    Dragging,
}

#[derive(Clone, Debug)]
pub(in crate::app) struct SimNode {
    pub id: MemberId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub pinned: Option<Vec2>,
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct LinkSpec {
    pub source: MemberId,
    pub target: MemberId,
    pub distance: f32,
    pub strength: f32,
}

#[derive(Clone, Copy, Debug)]
struct SimLink {
    source: usize,
    target: usize,
    distance: f32,
    strength: f32,
    bias: f32,
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
}

/// Node arena plus the solver that moves it. Nodes are keyed by member id so
/// a rebuild keeps existing positions.
pub(in crate::app) struct Simulation {
    nodes: Vec<SimNode>,
    index_by_id: HashMap<MemberId, usize>,
    links: Vec<SimLink>,
    config: PhysicsConfig,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
    phase: Phase,
    dragging: Option<MemberId>,
    placed_count: usize,
    scratch: Scratch,
}

impl Simulation {
    pub(in crate::app) fn new(center: Vec2, config: PhysicsConfig) -> Self {
        Self {
            nodes: Vec::new(),
            index_by_id: HashMap::new(),
            links: Vec::new(),
            config,
            center,
            alpha: 1.0,
            alpha_target: 0.0,
            phase: Phase::Settling,
            dragging: None,
            placed_count: 0,
            scratch: Scratch::default(),
        }
    }

    pub(in crate::app) fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub(in crate::app) fn position(&self, id: MemberId) -> Option<Vec2> {
        self.index_by_id
            .get(&id)
            .map(|&index| self.nodes[index].position)
    }

    pub(in crate::app) fn phase(&self) -> Phase {
        self.phase
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn link_count(&self) -> usize {
        self.links.len()
    }

    pub(in crate::app) fn set_config(&mut self, config: PhysicsConfig) {
        if self.config != config {
            self.config = config;
            self.reheat();
        }
    }

    pub(in crate::app) fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    /// Replaces the node set. Ids already present keep their node record;
    /// new ids are seeded on a spiral around the center.
    pub(in crate::app) fn set_nodes(&mut self, ids: &[MemberId]) {
        let mut previous = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.id, node))
            .collect::<HashMap<_, _>>();

        let mut nodes = Vec::with_capacity(ids.len());
        for &id in ids {
            let node = match previous.remove(&id) {
                Some(node) => node,
                None => {
                    let position = self.seed_position(self.placed_count);
                    self.placed_count += 1;
                    SimNode {
                        id,
                        position,
                        velocity: Vec2::ZERO,
                        pinned: None,
                    }
                }
            };
            nodes.push(node);
        }

        self.index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect();
        self.nodes = nodes;

        if let Some(dragging) = self.dragging
            && !self.index_by_id.contains_key(&dragging)
        {
            self.dragging = None;
            self.alpha_target = 0.0;
        }

        // Link indices point into the old arena.
        self.links.clear();
    }

    /// Resolves links against the current nodes. Links naming an unknown id
    /// or looping on one node are dropped; returns how many were dropped.
    pub(in crate::app) fn set_links(&mut self, specs: &[LinkSpec]) -> usize {
        let mut degree = vec![0usize; self.nodes.len()];
        let mut resolved = Vec::with_capacity(specs.len());
        let mut dropped = 0usize;

        for spec in specs {
            let (Some(&source), Some(&target)) = (
                self.index_by_id.get(&spec.source),
                self.index_by_id.get(&spec.target),
            ) else {
                debug!(
                    source = spec.source,
                    target = spec.target,
                    "link references unknown member; dropped"
                );
                dropped += 1;
                continue;
            };
            if source == target {
                dropped += 1;
                continue;
            }

            degree[source] += 1;
            degree[target] += 1;
            resolved.push(SimLink {
                source,
                target,
                distance: spec.distance,
                strength: spec.strength,
                bias: 0.0,
            });
        }

        for link in &mut resolved {
            let source_degree = degree[link.source] as f32;
            let target_degree = degree[link.target] as f32;
            link.bias = source_degree / (source_degree + target_degree);
        }

        self.links = resolved;
        dropped
    }

    pub(in crate::app) fn reheat(&mut self) {
        self.alpha = self.alpha.max(REHEAT_ALPHA);
        if self.phase == Phase::Idle {
            self.phase = Phase::Settling;
        }
        trace!(alpha = self.alpha, "simulation reheated");
    }

    pub(in crate::app) fn drag_start(&mut self, id: MemberId) -> bool {
        let Some(&index) = self.index_by_id.get(&id) else {
            return false;
        };

        let node = &mut self.nodes[index];
        node.pinned = Some(node.position);
        self.dragging = Some(id);
        self.alpha_target = DRAG_ALPHA_TARGET;
        self.alpha = self.alpha.max(DRAG_ALPHA_TARGET);
        self.phase = Phase::Dragging;
        true
    }

    pub(in crate::app) fn drag_move(&mut self, id: MemberId, position: Vec2) {
        if self.dragging != Some(id) || !position.x.is_finite() || !position.y.is_finite() {
            return;
        }
        if let Some(&index) = self.index_by_id.get(&id) {
            self.nodes[index].pinned = Some(position);
        }
    }

    pub(in crate::app) fn drag_end(&mut self, id: MemberId) {
        if self.dragging != Some(id) {
            return;
        }
        if let Some(&index) = self.index_by_id.get(&id) {
            self.nodes[index].pinned = None;
        }
        self.dragging = None;
        self.alpha_target = 0.0;
        self.phase = Phase::Settling;
    }

    pub(in crate::app) fn tick(&mut self, mut on_tick: impl FnMut(&[SimNode])) {
        if self.nodes.is_empty() {
            return;
        }

        self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY;
        self.step_forces();
        self.phase = if self.dragging.is_some() {
            Phase::Dragging
        } else if self.alpha < ALPHA_MIN {
            Phase::Idle
        } else {
            Phase::Settling
        };

        on_tick(&self.nodes);
    }

    fn step_forces(&mut self) {
        let node_count = self.nodes.len();
        let alpha = self.alpha;
        let config = self.config;

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
        }

        let positions = &mut scratch.positions;
        let velocities = &mut scratch.velocities;

        if node_count > 1
            && let Some(tree) = QuadNode::build(positions)
        {
            let params = ChargeParams {
                strength: config.charge_strength * alpha,
                theta: BARNES_HUT_THETA,
            };
            for (index, velocity) in velocities.iter_mut().enumerate() {
                accumulate_charge(&tree, index, positions, params, velocity);
            }
        }

        apply_links(&self.links, positions, velocities, alpha);

        if node_count > 1 && config.collision_radius > 0.0 {
            let predicted = positions
                .iter()
                .zip(velocities.iter())
                .map(|(position, velocity)| *position + *velocity)
                .collect::<Vec<_>>();
            if let Some(tree) = QuadNode::build(&predicted) {
                accumulate_collision_pairs(
                    &tree,
                    &tree,
                    true,
                    &predicted,
                    CollisionParams {
                        radius: config.collision_radius,
                        strength: config.collision_strength,
                    },
                    velocities,
                );
            }
        }

        let mut centroid = Vec2::ZERO;
        for position in positions.iter() {
            centroid += *position;
        }
        centroid /= node_count as f32;
        let shift = (self.center - centroid) * config.center_strength;
        for position in positions.iter_mut() {
            *position += shift;
        }

        let retain = (1.0 - config.velocity_decay).clamp(0.0, 1.0);
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if let Some(pinned) = node.pinned {
                node.position = pinned;
                node.velocity = Vec2::ZERO;
                continue;
            }

            let mut velocity = velocities[index] * retain;
            let speed_sq = velocity.length_sq();
            if !speed_sq.is_finite() {
                velocity = Vec2::ZERO;
            } else if speed_sq > MAX_SPEED * MAX_SPEED {
                velocity *= MAX_SPEED / speed_sq.sqrt();
            }

            node.velocity = velocity;
            node.position = positions[index] + velocity;
        }
    }

    fn seed_position(&self, ordinal: usize) -> Vec2 {
        let radius = INITIAL_RADIUS * (0.5 + ordinal as f32).sqrt();
        let angle = ordinal as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        self.center + vec2(angle.cos(), angle.sin()) * radius
    }
}
