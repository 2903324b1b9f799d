use std::collections::BTreeMap;

use eframe::egui::{self, RichText, Ui};

use crate::family::{
    FamilyTree, Gender, LifeStatus, Member, MemberDraft, MemberId, RelationshipKind,
};

use super::super::physics::PhysicsConfig;
use super::super::{MemberForm, RelationshipForm, StatusMessage, ViewModel};

impl Default for MemberForm {
    fn default() -> Self {
        Self {
            editing: None,
            name: String::new(),
            gender: Gender::Male,
            deceased: false,
            attributes: Vec::new(),
            portrait: String::new(),
        }
    }
}

impl MemberForm {
    fn from_member(member: &Member) -> Self {
        Self {
            editing: Some(member.id),
            name: member.name.clone(),
            gender: member.gender,
            deceased: member.is_deceased(),
            attributes: member
                .attributes
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            portrait: member.portrait.clone().unwrap_or_default(),
        }
    }

    /// `None` while the name is blank. Attribute rows without a key are
    /// ignored; a later row wins over an earlier one with the same key.
    fn to_draft(&self) -> Option<MemberDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }

        let mut draft = MemberDraft::new(name, self.gender);
        draft.status = if self.deceased {
            LifeStatus::Deceased
        } else {
            LifeStatus::Alive
        };
        draft.attributes = self
            .attributes
            .iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
            .collect::<BTreeMap<_, _>>();
        let portrait = self.portrait.trim();
        draft.portrait = (!portrait.is_empty()).then(|| portrait.to_owned());
        Some(draft)
    }
}

impl Default for RelationshipForm {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            kind: RelationshipKind::Parent,
        }
    }
}

fn member_combo(ui: &mut Ui, id_salt: &str, tree: &FamilyTree, value: &mut Option<MemberId>) {
    let selected_text = value
        .and_then(|id| tree.member(id))
        .map_or_else(|| "Choose...".to_owned(), |member| member.name.clone());

    egui::ComboBox::from_id_salt(id_salt)
        .selected_text(selected_text)
        .width(200.0)
        .show_ui(ui, |ui| {
            for member in tree.members() {
                ui.selectable_value(value, Some(member.id), member.name.as_str());
            }
        });
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Family");
                ui.separator();
                ui.add_space(4.0);

                ui.label("Search members")
                    .on_hover_text("Fuzzy-highlight matching members without moving the layout.");
                ui.text_edit_singleline(&mut self.search)
                    .on_hover_text("Matches names and attribute values.");

                ui.separator();
                egui::CollapsingHeader::new("Member")
                    .default_open(true)
                    .show(ui, |ui| self.draw_member_form(ui));

                ui.add_space(6.0);
                egui::CollapsingHeader::new("Relationship")
                    .default_open(true)
                    .show(ui, |ui| self.draw_relationship_form(ui));

                ui.add_space(6.0);
                egui::CollapsingHeader::new("Physics tuning")
                    .default_open(false)
                    .show(ui, |ui| self.draw_physics_controls(ui));
            });
    }

    fn draw_member_form(&mut self, ui: &mut Ui) {
        let editing = self.member_form.editing;
        let title = match editing {
            Some(id) => format!("Editing member #{id}"),
            None => "New member".to_owned(),
        };
        ui.label(RichText::new(title).strong());

        let form = &mut self.member_form;
        ui.horizontal(|ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut form.name);
        });
        ui.horizontal(|ui| {
            ui.selectable_value(&mut form.gender, Gender::Male, "Male");
            ui.selectable_value(&mut form.gender, Gender::Female, "Female");
            ui.separator();
            ui.checkbox(&mut form.deceased, "Deceased");
        });
        ui.horizontal(|ui| {
            ui.label("Portrait");
            ui.text_edit_singleline(&mut form.portrait)
                .on_hover_text("Optional image reference kept with the member.");
        });

        ui.label("Attributes");
        let mut removed = None;
        for (index, (key, value)) in form.attributes.iter_mut().enumerate() {
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(key)
                        .desired_width(90.0)
                        .hint_text("key"),
                );
                ui.add(
                    egui::TextEdit::singleline(value)
                        .desired_width(140.0)
                        .hint_text("value"),
                );
                if ui.small_button("x").on_hover_text("Remove attribute").clicked() {
                    removed = Some(index);
                }
            });
        }
        if let Some(index) = removed {
            form.attributes.remove(index);
        }
        if ui.small_button("+ attribute").clicked() {
            form.attributes.push((String::new(), String::new()));
        }

        ui.add_space(4.0);
        let mut submit = false;
        let mut cancel = false;
        ui.horizontal(|ui| {
            let label = if editing.is_some() { "Save changes" } else { "Add member" };
            submit = ui.button(label).clicked();
            if editing.is_some() {
                cancel = ui.button("Cancel").clicked();
            }
        });

        if submit {
            self.submit_member_form();
        } else if cancel {
            self.member_form = MemberForm::default();
        }
    }

    fn draw_relationship_form(&mut self, ui: &mut Ui) {
        let form = &mut self.relationship_form;
        egui::Grid::new("relationship_form")
            .num_columns(2)
            .show(ui, |ui| {
                ui.label("From");
                member_combo(ui, "relationship_from", &self.tree, &mut form.from);
                ui.end_row();

                ui.label("To");
                member_combo(ui, "relationship_to", &self.tree, &mut form.to);
                ui.end_row();
            });

        ui.horizontal(|ui| {
            for kind in RelationshipKind::ALL {
                ui.selectable_value(&mut form.kind, kind, kind.label());
            }
        });
        if form.kind == RelationshipKind::Parent {
            ui.small("From is the parent, To is the child.");
        } else if form.kind == RelationshipKind::Divorced {
            ui.small("Replaces the pair's spouse relationship.");
        }

        if ui.button("Add relationship").clicked() {
            self.submit_relationship_form();
        }
    }

    fn draw_physics_controls(&mut self, ui: &mut Ui) {
        let physics = &mut self.physics;
        let mut changed = false;

        changed |= ui
            .add(
                egui::Slider::new(&mut physics.charge_strength, 100.0..=1500.0)
                    .text("Repulsion")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("How strongly members push away from each other.")
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut physics.collision_radius, 20.0..=120.0)
                    .text("Collision radius")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Minimum spacing kept around every member.")
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut physics.collision_strength, 0.0..=1.0)
                    .text("Collision strength")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("How hard overlapping members are separated.")
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut physics.center_strength, 0.0..=0.2)
                    .text("Centering")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Pull that keeps the layout in the middle of the view.")
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut physics.velocity_decay, 0.05..=0.9)
                    .text("Velocity decay")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("How quickly movement slows each tick.")
            .changed();

        if ui.button("Reset to defaults").clicked() {
            *physics = PhysicsConfig::default();
            changed = true;
        }

        if changed && let Some(surface) = self.surface.as_mut() {
            surface.set_physics(self.physics);
        }
    }

    pub(in crate::app) fn start_editing(&mut self, id: MemberId) {
        if let Some(member) = self.tree.member(id) {
            self.member_form = MemberForm::from_member(member);
        }
    }

    fn submit_member_form(&mut self) {
        let Some(draft) = self.member_form.to_draft() else {
            self.set_status(StatusMessage::Error("A member needs a name.".to_owned()));
            return;
        };

        match self.member_form.editing {
            Some(id) => match self.tree.update_member(id, draft) {
                Ok(()) => self.set_status(StatusMessage::Info(format!("Updated member #{id}"))),
                Err(error) => {
                    self.set_status(StatusMessage::Error(error.to_string()));
                    return;
                }
            },
            None => match self.tree.add_member(draft) {
                Ok(id) => {
                    self.set_selected(Some(id));
                    self.set_status(StatusMessage::Info(format!("Added member #{id}")));
                }
                Err(error) => {
                    self.set_status(StatusMessage::Error(error.to_string()));
                    return;
                }
            },
        }
        self.member_form = MemberForm::default();
    }

    fn submit_relationship_form(&mut self) {
        let RelationshipForm { from, to, kind } = self.relationship_form.clone();
        let (Some(from), Some(to)) = (from, to) else {
            self.set_status(StatusMessage::Error("Pick both members first.".to_owned()));
            return;
        };
        if from == to {
            self.set_status(StatusMessage::Error(
                "A member cannot be related to themselves.".to_owned(),
            ));
            return;
        }

        if self.tree.relationship_exists(from, to, kind) {
            self.set_status(StatusMessage::Info(format!(
                "That {} relationship is already recorded",
                kind.label()
            )));
            return;
        }

        let id = self.tree.add_relationship(from, to, kind);
        self.set_status(StatusMessage::Info(format!("Relationship {id} recorded")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::sample_family;

    fn model() -> ViewModel {
        ViewModel::new(sample_family().unwrap(), None)
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut model = model();
        let before = model.tree.members().len();
        model.member_form.name = "   ".to_owned();
        model.submit_member_form();

        assert_eq!(model.tree.members().len(), before);
        assert!(matches!(model.status, Some(StatusMessage::Error(_))));
    }

    #[test]
    fn new_member_gets_the_next_id_and_selection() {
        let mut model = model();
        model.member_form.name = " June Hale ".to_owned();
        model.member_form.gender = Gender::Female;
        model.member_form.attributes = vec![
            ("born".to_owned(), "2012".to_owned()),
            (" ".to_owned(), "ignored".to_owned()),
        ];
        model.submit_member_form();

        let member = model.tree.member(11).unwrap();
        assert_eq!(member.name, "June Hale");
        assert_eq!(member.attributes.len(), 1);
        assert_eq!(model.selected, Some(11));
        assert_eq!(model.member_form, MemberForm::default());
    }

    #[test]
    fn editing_round_trips_through_the_form() {
        let mut model = model();
        model.start_editing(1);
        assert_eq!(model.member_form.editing, Some(1));
        assert!(model.member_form.deceased);

        model.member_form.portrait = "walter.png".to_owned();
        model.submit_member_form();

        let member = model.tree.member(1).unwrap();
        assert_eq!(member.portrait.as_deref(), Some("walter.png"));
        assert!(member.is_deceased());
        assert_eq!(member.attributes.get("occupation").map(String::as_str), Some("Carpenter"));
        assert_eq!(model.tree.members().len(), 10);
    }

    #[test]
    fn self_relationship_is_rejected() {
        let mut model = model();
        let before = model.tree.relationships().len();
        model.relationship_form = RelationshipForm {
            from: Some(2),
            to: Some(2),
            kind: RelationshipKind::Spouse,
        };
        model.submit_relationship_form();

        assert_eq!(model.tree.relationships().len(), before);
    }

    #[test]
    fn divorce_from_the_form_replaces_the_marriage() {
        let mut model = model();
        let before = model.tree.relationships().len();
        model.relationship_form = RelationshipForm {
            from: Some(4),
            to: Some(3),
            kind: RelationshipKind::Divorced,
        };
        model.submit_relationship_form();

        assert_eq!(model.tree.relationships().len(), before);
        assert!(model.tree.relationship_exists(3, 4, RelationshipKind::Divorced));
        assert!(!model.tree.relationship_exists(3, 4, RelationshipKind::Spouse));
    }
}
