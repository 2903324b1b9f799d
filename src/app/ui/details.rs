use eframe::egui::{self, RichText, Ui};

use crate::family::{MemberId, RelationshipKind};

use super::super::ViewModel;

#[derive(Clone, Debug, PartialEq, Eq)]
struct RelatedMember {
    id: MemberId,
    name: String,
    role: Role,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Role {
    Parent,
    Spouse,
    FormerSpouse,
    Child,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Spouse => "spouse",
            Self::FormerSpouse => "former spouse",
            Self::Child => "child",
        }
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Member Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected else {
            ui.label("Select a member from the graph or the hierarchy.");
            return;
        };

        let Some(member) = self.tree.member(selected_id).cloned() else {
            ui.label("Selected member no longer exists.");
            return;
        };

        ui.horizontal(|ui| {
            ui.label(RichText::new(&member.name).strong());
            ui.small(format!("#{}", member.id));
        });
        ui.label(format!("Gender: {}", member.gender.label()));
        ui.label(format!("Status: {}", member.status.label()));
        if let Some(portrait) = &member.portrait {
            ui.label(format!("Portrait: {portrait}"));
        }
        ui.add_space(4.0);
        if ui.button("Edit").on_hover_text("Load this member into the form.").clicked() {
            self.start_editing(member.id);
        }

        ui.separator();
        ui.label(RichText::new("Attributes").strong());
        if member.attributes.is_empty() {
            ui.label("No attributes recorded.");
        } else {
            egui::Grid::new("member_attributes")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    for (key, value) in &member.attributes {
                        ui.label(key.as_str());
                        ui.label(value.as_str());
                        ui.end_row();
                    }
                });
        }

        ui.separator();
        ui.label(RichText::new("Relationships").strong());
        let related = self.related_members(member.id);
        if related.is_empty() {
            ui.label("No relationships yet.");
            return;
        }

        let mut next = None;
        for entry in &related {
            let label = format!("{}  ({})", entry.name, entry.role.label());
            if ui.link(label).clicked() {
                next = Some(entry.id);
            }
        }
        if let Some(id) = next {
            self.set_selected(Some(id));
        }
    }

    /// Relatives of `id` ordered parents first, then partners, then children.
    fn related_members(&self, id: MemberId) -> Vec<RelatedMember> {
        let mut related = self
            .tree
            .relationships_of(id)
            .filter_map(|relationship| {
                let (other, role) = match relationship.kind {
                    RelationshipKind::Parent if relationship.to == id => {
                        (relationship.from, Role::Parent)
                    }
                    RelationshipKind::Parent => (relationship.to, Role::Child),
                    RelationshipKind::Spouse | RelationshipKind::Divorced => {
                        let other = if relationship.from == id {
                            relationship.to
                        } else {
                            relationship.from
                        };
                        let role = if relationship.kind == RelationshipKind::Spouse {
                            Role::Spouse
                        } else {
                            Role::FormerSpouse
                        };
                        (other, role)
                    }
                };
                let member = self.tree.member(other)?;
                Some(RelatedMember {
                    id: other,
                    name: member.name.clone(),
                    role,
                })
            })
            .collect::<Vec<_>>();

        related.sort_by(|a, b| a.role.cmp(&b.role).then_with(|| a.name.cmp(&b.name)));
        related
    }
}
