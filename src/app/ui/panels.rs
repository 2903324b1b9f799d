use std::collections::HashSet;
use std::path::PathBuf;

use eframe::egui::{self, Align, Color32, Context, Layout, Ui};
use tracing::{debug, warn};

use crate::family::{FamilyTree, MemberId, save_family};
use crate::util::search_members;

use super::super::graph::GraphSurface;
use super::super::physics::PhysicsConfig;
use super::super::viewport::FitOptions;
use super::super::{
    MemberForm, RelationshipForm, SearchMatchCache, StatusMessage, ViewMode, ViewModel,
};

impl ViewModel {
    pub(in crate::app) fn new(tree: FamilyTree, family_path: Option<PathBuf>) -> Self {
        let physics = PhysicsConfig::default();
        Self {
            tree,
            family_path,
            selected: None,
            view_mode: ViewMode::Graph,
            surface: Some(GraphSurface::new(physics)),
            physics,
            search: String::new(),
            search_match_cache: None,
            hierarchy_cache: None,
            member_form: MemberForm::default(),
            relationship_form: RelationshipForm::default(),
            status: None,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui, reload_requested, is_loading));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading family...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
                return;
            }

            match self.view_mode {
                ViewMode::Graph => self.draw_graph(ui),
                ViewMode::Hierarchy => self.draw_hierarchy(ui),
            }
        });
    }

    fn draw_top_bar(&mut self, ui: &mut Ui, reload_requested: &mut bool, is_loading: bool) {
        ui.horizontal(|ui| {
            ui.heading("family-graph");
            ui.separator();
            match &self.family_path {
                Some(path) => ui.label(format!("file: {}", path.display())),
                None => ui.label("sample family"),
            };
            ui.label(format!("members: {}", self.tree.members().len()));
            ui.label(format!("relationships: {}", self.tree.relationships().len()));
            ui.separator();

            let mut view_mode = self.view_mode;
            ui.selectable_value(&mut view_mode, ViewMode::Graph, "Graph")
                .on_hover_text("Force-directed view of every member and relationship.");
            ui.selectable_value(&mut view_mode, ViewMode::Hierarchy, "Hierarchy")
                .on_hover_text("Generations derived from parent relationships.");
            self.set_view_mode(view_mode);
            ui.separator();

            let graph_shown = self.surface.is_some();
            let fit_button = ui
                .add_enabled(graph_shown, egui::Button::new("Fit"))
                .on_hover_text("Frame every member in view.");
            if fit_button.clicked() {
                let now = ui.input(|input| input.time);
                if let Some(surface) = self.surface.as_mut() {
                    surface.fit(FitOptions::ANIMATED, now);
                }
            }

            let redraw_button = ui
                .add_enabled(graph_shown, egui::Button::new("Redraw"))
                .on_hover_text("Let the layout settle again.");
            if redraw_button.clicked()
                && let Some(surface) = self.surface.as_mut()
            {
                surface.redraw();
            }

            let save_button = ui
                .add_enabled(self.family_path.is_some(), egui::Button::new("Save"))
                .on_disabled_hover_text("Start with --family <PATH> to save changes.");
            if save_button.clicked() {
                self.save();
            }

            let reload_button = ui
                .add_enabled(!is_loading, egui::Button::new("Reload"))
                .on_hover_text("Discard unsaved changes and load the family again.");
            if reload_button.clicked() {
                *reload_requested = true;
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| match &self.status {
                Some(StatusMessage::Info(text)) => {
                    ui.label(text.as_str());
                }
                Some(StatusMessage::Error(text)) => {
                    ui.colored_label(Color32::from_rgb(235, 110, 95), text.as_str());
                }
                None => {}
            });
        });
    }

    /// Changes the highlighted member. The graph restyles on the next frame
    /// without a rebuild.
    pub(in crate::app) fn set_selected(&mut self, selected: Option<MemberId>) {
        if self.selected == selected {
            return;
        }
        debug!(?selected, "selection changed");
        self.selected = selected;
    }

    /// Leaving the graph view tears its surface down; coming back mounts a
    /// fresh one.
    pub(in crate::app) fn set_view_mode(&mut self, view_mode: ViewMode) {
        if self.view_mode == view_mode {
            return;
        }
        self.view_mode = view_mode;

        match view_mode {
            ViewMode::Graph => self.surface = Some(GraphSurface::new(self.physics)),
            ViewMode::Hierarchy => {
                if let Some(mut surface) = self.surface.take() {
                    surface.dispose();
                }
            }
        }
    }

    pub(in crate::app) fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    fn refresh_search_matches(&mut self) {
        let query = self.search.trim();
        let revision = self.tree.revision();
        if self
            .search_match_cache
            .as_ref()
            .is_some_and(|cached| cached.revision == revision && cached.query == query)
        {
            return;
        }

        let matches = search_members(self.tree.members(), query);
        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            revision,
            matches,
        });
    }

    fn draw_graph(&mut self, ui: &mut Ui) {
        self.refresh_search_matches();

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let no_matches = HashSet::new();
        let matches = self
            .search_match_cache
            .as_ref()
            .map_or(&no_matches, |cached| &cached.matches);

        let response = surface.show(ui, &self.tree, self.selected, matches);
        if let Some(selection) = response.selection {
            self.set_selected(selection);
        }
    }

    fn save(&mut self) {
        let Some(path) = self.family_path.clone() else {
            return;
        };

        match save_family(&path, &self.tree) {
            Ok(()) => {
                self.set_status(StatusMessage::Info(format!("Saved {}", path.display())));
            }
            Err(error) => {
                warn!("save failed: {error:#}");
                self.set_status(StatusMessage::Error(format!("{error:#}")));
            }
        }
    }
}
