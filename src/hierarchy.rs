use std::collections::HashMap;

use tracing::debug;

use crate::family::{Member, MemberId, Relationship, RelationshipKind};

#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyNode {
    pub member: Member,
    pub depth: usize,
    /// Number of nodes below this one, children included.
    pub descendants: usize,
    pub children: Vec<HierarchyNode>,
    /// Other parents under whom some of this member's children were placed.
    pub children_shown_under: Vec<MemberId>,
}

impl HierarchyNode {
    pub fn walk(&self, visit: &mut impl FnMut(&HierarchyNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Default)]
struct Adjacency {
    children: HashMap<MemberId, Vec<MemberId>>,
    parents: HashMap<MemberId, Vec<MemberId>>,
    parent_order: Vec<MemberId>,
}

impl Adjacency {
    fn from_relationships(relationships: &[Relationship]) -> Self {
        let mut adjacency = Self::default();
        for relationship in relationships {
            if relationship.kind != RelationshipKind::Parent {
                continue;
            }

            let children = adjacency.children.entry(relationship.from).or_default();
            if children.is_empty() {
                adjacency.parent_order.push(relationship.from);
            }
            if !children.contains(&relationship.to) {
                children.push(relationship.to);
            }

            let parents = adjacency.parents.entry(relationship.to).or_default();
            if !parents.contains(&relationship.from) {
                parents.push(relationship.from);
            }
        }
        adjacency
    }

    fn roots(&self) -> Vec<MemberId> {
        self.parent_order
            .iter()
            .copied()
            .filter(|id| !self.parents.contains_key(id))
            .collect()
    }
}

struct ForestBuilder<'a> {
    adjacency: Adjacency,
    members: &'a HashMap<MemberId, &'a Member>,
    /// Placed id to the parent it hangs under; `None` for roots.
    placed: HashMap<MemberId, Option<MemberId>>,
}

impl ForestBuilder<'_> {
    /// `path` holds `id` and its ancestors on the current branch; each child
    /// gets its own copy so sibling branches never see each other.
    fn build(
        &mut self,
        id: MemberId,
        depth: usize,
        mut path: Vec<MemberId>,
    ) -> Option<HierarchyNode> {
        if self.placed.contains_key(&id) {
            return None;
        }
        let member = (*self.members.get(&id)?).clone();

        self.placed.insert(id, path.last().copied());
        path.push(id);

        let child_ids = self.adjacency.children.get(&id).cloned().unwrap_or_default();
        let mut children = Vec::with_capacity(child_ids.len());
        let mut children_shown_under = Vec::new();
        for child_id in child_ids {
            // Every id on the path is placed too; checking the path first
            // separates a cycle from a child claimed by another parent.
            if path.contains(&child_id) {
                debug!(id, child_id, "cycle in parent chain pruned");
                continue;
            }
            if let Some(&under) = self.placed.get(&child_id) {
                if let Some(parent) = under
                    && !children_shown_under.contains(&parent)
                {
                    children_shown_under.push(parent);
                }
                continue;
            }
            if let Some(child) = self.build(child_id, depth + 1, path.clone()) {
                children.push(child);
            }
        }

        let descendants = children.iter().map(|child| child.descendants + 1).sum();
        Some(HierarchyNode {
            member,
            depth,
            descendants,
            children,
            children_shown_under,
        })
    }
}

/// Roots are parents that are nobody's child. Afterwards every parent still
/// unplaced, such as the members of a cycle with no acyclic entry, becomes a
/// root in the order it first appears. Each member is placed at most once
/// across the forest: the first parent reached claims a shared child and the
/// other parents list it in `children_shown_under`. Ids without a member
/// record are left out.
pub fn build_forest(
    relationships: &[Relationship],
    members: &HashMap<MemberId, &Member>,
) -> Vec<HierarchyNode> {
    let adjacency = Adjacency::from_relationships(relationships);
    let roots = adjacency.roots();
    let fallback = adjacency.parent_order.clone();
    let mut builder = ForestBuilder {
        adjacency,
        members,
        placed: HashMap::new(),
    };

    let mut forest = roots
        .into_iter()
        .filter_map(|root| builder.build(root, 0, Vec::new()))
        .collect::<Vec<_>>();

    for id in fallback {
        if let Some(node) = builder.build(id, 0, Vec::new()) {
            debug!(id, "cyclic parent chain rooted at first member");
            forest.push(node);
        }
    }

    forest
}
