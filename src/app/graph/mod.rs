mod build;
mod interaction;
mod view;

use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::{debug, info};

use crate::family::{Member, MemberId, RelationshipKind};

use super::physics::{Phase, PhysicsConfig, Simulation};
use super::viewport::{FitDue, FitOptions, ViewportController};

/// Delay before framing the graph after its structure changed, so the
/// solver has taken a few steps first.
const STRUCTURE_FIT_DELAY_SECS: f64 = 0.12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LinkStyle {
    pub distance: f32,
    pub strength: f32,
    /// Dash and gap lengths in world units; solid when `None`.
    pub dash: Option<[f32; 2]>,
}

impl LinkStyle {
    pub(in crate::app) fn for_kind(kind: RelationshipKind) -> Self {
        match kind {
            RelationshipKind::Parent => Self {
                distance: 150.0,
                strength: 0.9,
                dash: None,
            },
            RelationshipKind::Spouse => Self {
                distance: 200.0,
                strength: 0.5,
                dash: Some([10.0, 6.0]),
            },
            RelationshipKind::Divorced => Self {
                distance: 220.0,
                strength: 0.5,
                dash: Some([4.0, 6.0]),
            },
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct NodeDrag {
    id: MemberId,
    /// Node position minus the pointer's world position at grab time.
    grab_offset: Vec2,
}

pub(in crate::app) struct GraphNode {
    pub member: Member,
}

pub(in crate::app) struct GraphLink {
    pub kind: RelationshipKind,
    pub source: usize,
    pub target: usize,
    pub style: LinkStyle,
}

pub(in crate::app) struct GraphSurface {
    simulation: Option<Simulation>,
    viewport: ViewportController,
    nodes: Vec<GraphNode>,
    index_by_id: HashMap<MemberId, usize>,
    links: Vec<GraphLink>,
    /// Positions as of the last tick, aligned with `nodes`.
    positions: Vec<Vec2>,
    synced_revision: Option<u64>,
    dragging: Option<NodeDrag>,
}

impl GraphSurface {
    pub(in crate::app) fn new(config: PhysicsConfig) -> Self {
        info!("graph surface mounted");
        Self {
            simulation: Some(Simulation::new(Vec2::ZERO, config)),
            viewport: ViewportController::new(),
            nodes: Vec::new(),
            index_by_id: HashMap::new(),
            links: Vec::new(),
            positions: Vec::new(),
            synced_revision: None,
            dragging: None,
        }
    }

    pub(in crate::app) fn is_disposed(&self) -> bool {
        self.simulation.is_none()
    }

    pub(in crate::app) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(in crate::app) fn link_count(&self) -> usize {
        self.simulation.as_ref().map_or(0, Simulation::link_count)
    }

    pub(in crate::app) fn position_of(&self, id: MemberId) -> Option<Vec2> {
        self.index_by_id
            .get(&id)
            .and_then(|&index| self.positions.get(index).copied())
    }

    pub(in crate::app) fn phase(&self) -> Option<Phase> {
        self.simulation.as_ref().map(Simulation::phase)
    }

    pub(in crate::app) fn alpha(&self) -> Option<f32> {
        self.simulation.as_ref().map(Simulation::alpha)
    }

    pub(in crate::app) fn set_physics(&mut self, config: PhysicsConfig) {
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.set_config(config);
        }
    }

    /// Frames every node; a no-op once torn down or while nothing is placed.
    pub(in crate::app) fn fit(&mut self, options: FitOptions, now: f64) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.viewport
            .fit(self.positions.iter().copied(), options, now)
    }

    pub(in crate::app) fn redraw(&mut self) {
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.reheat();
        }
    }

    /// Tracks the size of the drawing area. A change re-centers the layout,
    /// reheats it and frames it again on the next frame.
    pub(in crate::app) fn observe_size(&mut self, size: Vec2) {
        if self.is_disposed() || !self.viewport.observe_size(size) {
            return;
        }

        let center = self.viewport.center();
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.set_center(center);
            simulation.reheat();
        }
        self.viewport.schedule_fit(FitDue::NextFrame, FitOptions::INSTANT);
    }

    pub(in crate::app) fn step(&mut self) {
        let Some(simulation) = self.simulation.as_mut() else {
            return;
        };

        let positions = &mut self.positions;
        simulation.tick(|nodes| {
            positions.clear();
            positions.extend(nodes.iter().map(|node| node.position));
        });
    }

    /// Runs fits that have come due and advances fit animations. Returns
    /// true while the viewport still has work queued.
    pub(in crate::app) fn run_deferred(&mut self, now: f64) -> bool {
        if self.is_disposed() {
            return false;
        }

        if let Some(options) = self.viewport.take_due_fit(now) {
            self.fit(options, now);
        }
        let animating = self.viewport.advance(now);
        animating || self.viewport.has_pending_fit()
    }

    pub(in crate::app) fn seconds_until_deferred(&self, now: f64) -> Option<f64> {
        if self.is_disposed() {
            return None;
        }
        self.viewport.seconds_until_due(now)
    }

    /// Stops the simulation and drops queued viewport work. Safe to call
    /// more than once; every later call on the surface becomes a no-op.
    pub(in crate::app) fn dispose(&mut self) {
        if self.simulation.take().is_none() {
            return;
        }
        self.viewport.clear_pending();
        self.dragging = None;
        info!(nodes = self.nodes.len(), "graph surface torn down");
    }

    fn schedule_structure_fit(&mut self, now: f64) {
        debug!("structure changed; fit scheduled");
        self.viewport
            .schedule_fit(FitDue::At(now + STRUCTURE_FIT_DELAY_SECS), FitOptions::ANIMATED);
    }
}

impl Drop for GraphSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::family::{FamilyTree, Gender, MemberDraft};

    fn family() -> FamilyTree {
        let mut tree = FamilyTree::default();
        for name in ["A", "B", "C", "D"] {
            tree.add_member(MemberDraft::new(name, Gender::Male)).unwrap();
        }
        tree.add_relationship(1, 2, RelationshipKind::Spouse);
        tree.add_relationship(1, 3, RelationshipKind::Parent);
        tree.add_relationship(2, 3, RelationshipKind::Parent);
        tree.add_relationship(3, 4, RelationshipKind::Parent);
        tree
    }

    fn mounted(tree: &FamilyTree) -> GraphSurface {
        let mut surface = GraphSurface::new(PhysicsConfig::default());
        surface.observe_size(vec2(1200.0, 800.0));
        surface.sync(tree, 0.0);
        surface
    }

    #[test]
    fn link_styles_follow_relationship_kind() {
        let parent = LinkStyle::for_kind(RelationshipKind::Parent);
        let spouse = LinkStyle::for_kind(RelationshipKind::Spouse);

        assert!(parent.distance < spouse.distance);
        assert!(parent.strength > spouse.strength);
        assert!(parent.dash.is_none());
        assert!(LinkStyle::for_kind(RelationshipKind::Divorced).dash.is_some());
    }

    #[test]
    fn resize_schedules_an_instant_fit_on_the_next_frame() {
        let tree = family();
        let mut surface = mounted(&tree);
        for _ in 0..10 {
            surface.step();
        }
        surface.run_deferred(0.0);

        surface.observe_size(vec2(600.0, 400.0));
        assert_eq!(surface.phase(), Some(Phase::Settling));
        assert!(surface.run_deferred(0.5));
        assert_eq!(surface.viewport.take_due_fit(0.5), Some(FitOptions::INSTANT));
    }

    #[test]
    fn resize_recenters_the_layout() {
        let tree = family();
        let mut surface = mounted(&tree);
        surface.observe_size(vec2(600.0, 400.0));
        for _ in 0..300 {
            surface.step();
        }

        let count = surface.positions.len() as f32;
        let centroid = surface
            .positions
            .iter()
            .fold(Vec2::ZERO, |sum, position| sum + *position)
            / count;
        assert!((centroid - vec2(300.0, 200.0)).length() < 25.0);
    }

    #[test]
    fn structural_fit_waits_for_the_delay() {
        let tree = family();
        let mut surface = mounted(&tree);
        surface.viewport.take_due_fit(0.0);
        surface.synced_revision = None;
        surface.sync(&tree, 1.0);

        let wait = surface.seconds_until_deferred(1.0).unwrap();
        assert!((wait - STRUCTURE_FIT_DELAY_SECS).abs() < 1e-9);
        assert!(surface.run_deferred(1.05));
        assert_eq!(surface.viewport.transform().scale, 1.0);
    }

    #[test]
    fn fit_frames_the_current_layout() {
        let tree = family();
        let mut surface = mounted(&tree);
        for _ in 0..50 {
            surface.step();
        }

        assert!(surface.fit(FitOptions::INSTANT, 0.0));
        let transform = surface.viewport.transform();
        assert!((0.35..=2.6).contains(&transform.scale));
    }

    #[test]
    fn empty_surface_fit_is_a_no_op() {
        let mut surface = GraphSurface::new(PhysicsConfig::default());
        surface.observe_size(vec2(800.0, 600.0));
        surface.sync(&FamilyTree::default(), 0.0);
        surface.step();

        assert!(!surface.fit(FitOptions::INSTANT, 0.0));
        assert_eq!(surface.node_count(), 0);
    }

    #[test]
    fn dispose_turns_later_calls_into_no_ops() {
        let tree = family();
        let mut surface = mounted(&tree);
        surface.step();
        let before = surface.position_of(1);

        surface.dispose();
        surface.dispose();
        surface.step();
        surface.redraw();
        surface.observe_size(vec2(100.0, 100.0));

        assert!(surface.is_disposed());
        assert!(!surface.fit(FitOptions::ANIMATED, 0.0));
        assert!(!surface.run_deferred(10.0));
        assert_eq!(surface.seconds_until_deferred(0.0), None);
        assert_eq!(surface.position_of(1), before);
        assert_eq!(surface.phase(), None);
    }
}
