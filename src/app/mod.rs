use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{error, info};

use crate::family::{FamilyTree, Gender, MemberId, RelationshipKind, load_family, sample_family};
use crate::hierarchy::HierarchyNode;

mod graph;
mod physics;
mod render_utils;
mod ui;
mod viewport;

use graph::GraphSurface;
use physics::PhysicsConfig;

type LoadResult = Result<FamilyTree, String>;

pub struct FamilyGraphApp {
    family_path: Option<PathBuf>,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ViewMode {
    Graph,
    Hierarchy,
}

struct ViewModel {
    tree: FamilyTree,
    family_path: Option<PathBuf>,
    selected: Option<MemberId>,
    view_mode: ViewMode,
    /// Mounted only while the graph view is shown.
    surface: Option<GraphSurface>,
    physics: PhysicsConfig,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    hierarchy_cache: Option<HierarchyCache>,
    member_form: MemberForm,
    relationship_form: RelationshipForm,
    status: Option<StatusMessage>,
}

struct SearchMatchCache {
    query: String,
    revision: u64,
    matches: HashSet<MemberId>,
}

struct HierarchyCache {
    revision: u64,
    forest: Vec<HierarchyNode>,
    /// Members that take part in no parent relationship.
    unlinked: Vec<MemberId>,
}

#[derive(Clone, Debug, PartialEq)]
struct MemberForm {
    /// `Some` while an existing member is being edited.
    editing: Option<MemberId>,
    name: String,
    gender: Gender,
    deceased: bool,
    attributes: Vec<(String, String)>,
    portrait: String,
}

#[derive(Clone, Debug, PartialEq)]
struct RelationshipForm {
    from: Option<MemberId>,
    to: Option<MemberId>,
    kind: RelationshipKind,
}

#[derive(Clone, Debug, PartialEq)]
enum StatusMessage {
    Info(String),
    Error(String),
}

impl FamilyGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, family_path: Option<PathBuf>) -> Self {
        let state = Self::start_load(family_path.clone());
        Self {
            family_path,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(family_path: Option<PathBuf>) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = match &family_path {
                Some(path) => load_family(path),
                None => sample_family(),
            };
            let _ = tx.send(result.map_err(|error| format!("{error:#}")));
        });

        rx
    }

    fn start_load(family_path: Option<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(family_path),
        }
    }

    fn loaded(&self, result: LoadResult) -> AppState {
        match result {
            Ok(tree) => {
                info!(members = tree.members().len(), "family ready");
                AppState::Ready(Box::new(ViewModel::new(tree, self.family_path.clone())))
            }
            Err(message) => {
                error!(%message, "family load failed");
                AppState::Error(message)
            }
        }
    }
}

impl eframe::App for FamilyGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(result),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading family...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(message) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the family file");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(self.family_path.clone());
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.family_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            self.state = self.loaded(result);
        }
    }
}
