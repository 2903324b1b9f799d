use std::collections::HashMap;

use tracing::debug;

use crate::family::{FamilyTree, MemberId};

use super::super::physics::LinkSpec;
use super::{GraphLink, GraphNode, GraphSurface, LinkStyle};

impl GraphSurface {
    /// Reconciles the surface with `tree`. Members keep their simulation node,
    /// and with it their position; relationships naming a missing member are
    /// left out. Does nothing while the tree revision is unchanged.
    pub(in crate::app) fn sync(&mut self, tree: &FamilyTree, now: f64) -> bool {
        if self.is_disposed() || self.synced_revision == Some(tree.revision()) {
            return false;
        }

        let mut prior_nodes = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.member.id, node))
            .collect::<HashMap<_, _>>();

        let mut nodes = Vec::with_capacity(tree.members().len());
        for member in tree.members() {
            match prior_nodes.remove(&member.id) {
                Some(mut node) => {
                    node.member.clone_from(member);
                    nodes.push(node);
                }
                None => nodes.push(GraphNode {
                    member: member.clone(),
                }),
            }
        }

        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.member.id, index))
            .collect::<HashMap<MemberId, usize>>();

        let mut links = Vec::with_capacity(tree.relationships().len());
        let mut specs = Vec::with_capacity(tree.relationships().len());
        for relationship in tree.relationships() {
            let (Some(&source), Some(&target)) = (
                index_by_id.get(&relationship.from),
                index_by_id.get(&relationship.to),
            ) else {
                debug!(id = %relationship.id, "relationship references a missing member");
                continue;
            };

            let style = LinkStyle::for_kind(relationship.kind);
            specs.push(LinkSpec {
                source: relationship.from,
                target: relationship.to,
                distance: style.distance,
                strength: style.strength,
            });
            links.push(GraphLink {
                kind: relationship.kind,
                source,
                target,
                style,
            });
        }

        let ids = nodes
            .iter()
            .map(|node| node.member.id)
            .collect::<Vec<_>>();
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.set_nodes(&ids);
            simulation.set_links(&specs);
            simulation.reheat();

            self.positions.clear();
            self.positions
                .extend(simulation.nodes().iter().map(|node| node.position));
        }

        if self
            .dragging
            .is_some_and(|drag| !index_by_id.contains_key(&drag.id))
        {
            self.dragging = None;
        }

        debug!(
            revision = tree.revision(),
            nodes = nodes.len(),
            links = links.len(),
            "graph surface synced"
        );
        self.nodes = nodes;
        self.index_by_id = index_by_id;
        self.links = links;
        self.synced_revision = Some(tree.revision());
        self.schedule_structure_fit(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::super::super::physics::PhysicsConfig;
    use super::*;
    use crate::family::{Gender, Member, MemberDraft, Relationship, RelationshipKind};

    fn surface() -> GraphSurface {
        let mut surface = GraphSurface::new(PhysicsConfig::default());
        surface.observe_size(vec2(1000.0, 700.0));
        surface
    }

    fn member(id: MemberId, name: &str) -> Member {
        Member {
            id,
            name: name.to_string(),
            gender: Gender::Female,
            status: crate::family::LifeStatus::Alive,
            attributes: Default::default(),
            portrait: None,
        }
    }

    #[test]
    fn unchanged_revision_is_not_rebuilt() {
        let mut tree = FamilyTree::default();
        tree.add_member(MemberDraft::new("Ada", Gender::Female)).unwrap();
        let mut surface = surface();

        assert!(surface.sync(&tree, 0.0));
        assert!(!surface.sync(&tree, 0.5));
    }

    #[test]
    fn resync_keeps_existing_positions() {
        let mut tree = FamilyTree::default();
        let first = tree.add_member(MemberDraft::new("Ada", Gender::Female)).unwrap();
        let second = tree.add_member(MemberDraft::new("Ben", Gender::Male)).unwrap();
        tree.add_relationship(first, second, RelationshipKind::Spouse);

        let mut surface = surface();
        surface.sync(&tree, 0.0);
        for _ in 0..40 {
            surface.step();
        }
        let before = [surface.position_of(first), surface.position_of(second)];

        let third = tree.add_member(MemberDraft::new("Cy", Gender::Male)).unwrap();
        tree.add_relationship(first, third, RelationshipKind::Parent);
        assert!(surface.sync(&tree, 1.0));

        assert_eq!([surface.position_of(first), surface.position_of(second)], before);
        assert!(surface.position_of(third).is_some());
        assert_eq!(surface.link_count(), 2);
    }

    #[test]
    fn dangling_relationships_are_skipped() {
        let tree = FamilyTree::from_parts(
            vec![member(1, "Ada"), member(2, "Bea")],
            vec![
                Relationship::new(1, 2, RelationshipKind::Spouse),
                Relationship::new(1, 9, RelationshipKind::Parent),
                Relationship::new(8, 2, RelationshipKind::Parent),
            ],
        );

        let mut surface = surface();
        surface.sync(&tree, 0.0);
        for _ in 0..20 {
            surface.step();
        }

        assert_eq!(surface.node_count(), 2);
        assert_eq!(surface.link_count(), 1);
        assert!(surface.position_of(9).is_none());
        let position = surface.position_of(1).unwrap();
        assert!(position.x.is_finite() && position.y.is_finite());
    }

    #[test]
    fn edited_member_keeps_its_node() {
        let mut tree = FamilyTree::default();
        let id = tree.add_member(MemberDraft::new("Ada", Gender::Female)).unwrap();
        let mut surface = surface();
        surface.sync(&tree, 0.0);
        surface.step();
        let before = surface.position_of(id);

        tree.update_member(id, MemberDraft::new("Ada Lovelace", Gender::Female))
            .unwrap();
        surface.sync(&tree, 1.0);

        assert_eq!(surface.position_of(id), before);
        assert_eq!(surface.nodes[0].member.name, "Ada Lovelace");
    }
}
