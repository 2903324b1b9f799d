use std::collections::HashSet;

use eframe::egui::{self, Ui};

use crate::family::{FamilyTree, MemberId};
use crate::hierarchy::{HierarchyNode, build_forest};

use super::super::{HierarchyCache, ViewModel};

fn node_label(node: &HierarchyNode, tree: &FamilyTree) -> String {
    let mut label = match node.descendants {
        0 => node.member.name.clone(),
        1 => format!("{}  (1 descendant)", node.member.name),
        count => format!("{}  ({count} descendants)", node.member.name),
    };

    let shown_under = node
        .children_shown_under
        .iter()
        .filter_map(|id| tree.member(*id))
        .map(|member| member.name.as_str())
        .collect::<Vec<_>>();
    if !shown_under.is_empty() {
        label.push_str(&format!("  (children shown under {})", shown_under.join(", ")));
    }
    label
}

fn draw_node(
    ui: &mut Ui,
    tree: &FamilyTree,
    node: &HierarchyNode,
    selected: Option<MemberId>,
    clicked: &mut Option<MemberId>,
) {
    let id = node.member.id;
    let is_selected = selected == Some(id);
    let generation = format!("Generation {}", node.depth + 1);

    if node.children.is_empty() {
        if ui
            .selectable_label(is_selected, node_label(node, tree))
            .on_hover_text(generation)
            .clicked()
        {
            *clicked = Some(id);
        }
        return;
    }

    egui::collapsing_header::CollapsingState::load_with_default_open(
        ui.ctx(),
        ui.make_persistent_id(("hierarchy", id)),
        true,
    )
    .show_header(ui, |ui| {
        if ui
            .selectable_label(is_selected, node_label(node, tree))
            .on_hover_text(generation)
            .clicked()
        {
            *clicked = Some(id);
        }
    })
    .body(|ui| {
        for child in &node.children {
            draw_node(ui, tree, child, selected, clicked);
        }
    });
}

impl ViewModel {
    fn refresh_hierarchy(&mut self) {
        let revision = self.tree.revision();
        if self
            .hierarchy_cache
            .as_ref()
            .is_some_and(|cached| cached.revision == revision)
        {
            return;
        }

        let forest = build_forest(self.tree.relationships(), &self.tree.member_lookup());
        let mut placed = HashSet::new();
        for root in &forest {
            root.walk(&mut |node| {
                placed.insert(node.member.id);
            });
        }
        let unlinked = self
            .tree
            .members()
            .iter()
            .map(|member| member.id)
            .filter(|id| !placed.contains(id))
            .collect();

        self.hierarchy_cache = Some(HierarchyCache {
            revision,
            forest,
            unlinked,
        });
    }

    pub(in crate::app) fn draw_hierarchy(&mut self, ui: &mut Ui) {
        self.refresh_hierarchy();
        let Some(cache) = self.hierarchy_cache.as_ref() else {
            return;
        };

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Generations");
                ui.add_space(6.0);

                if cache.forest.is_empty() {
                    ui.label("No parent relationships yet.");
                }
                for root in &cache.forest {
                    draw_node(ui, &self.tree, root, self.selected, &mut clicked);
                }

                if !cache.unlinked.is_empty() {
                    ui.separator();
                    ui.label(egui::RichText::new("Without parent links").strong());
                    for id in &cache.unlinked {
                        let Some(member) = self.tree.member(*id) else {
                            continue;
                        };
                        if ui
                            .selectable_label(self.selected == Some(*id), member.name.as_str())
                            .clicked()
                        {
                            clicked = Some(*id);
                        }
                    }
                }
            });

        if let Some(id) = clicked {
            self.set_selected(Some(id));
        }
    }
}
