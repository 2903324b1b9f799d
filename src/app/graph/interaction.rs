use eframe::egui::{self, PointerButton, Rect, Ui, Vec2};

use crate::family::MemberId;
use crate::geometry::NODE_RADIUS;

use super::super::render_utils::screen_to_world;
use super::{GraphSurface, NodeDrag};

/// Index of the node under `point`, preferring the closest one when discs
/// overlap.
pub(super) fn hit_test(positions: &[Vec2], point: Vec2, radius: f32) -> Option<usize> {
    positions
        .iter()
        .enumerate()
        .filter_map(|(index, position)| {
            let distance = (*position - point).length();
            (distance <= radius).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

impl GraphSurface {
    pub(super) fn hovered_index(&self, ui: &Ui, rect: Rect) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        if !rect.contains(pointer) {
            return None;
        }
        let world = screen_to_world(rect, self.viewport.transform(), pointer);
        hit_test(&self.positions, world, NODE_RADIUS)
    }

    pub(super) fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.viewport.zoom_at(pointer - rect.min, factor);
    }

    /// Node drags, background pans and clicks. Returns `Some` when the click
    /// selection changed: the clicked member, or `None` for empty canvas.
    pub(super) fn handle_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        hovered: Option<usize>,
    ) -> Option<Option<MemberId>> {
        let transform = self.viewport.transform();

        if response.drag_started_by(PointerButton::Primary) {
            let origin = ui
                .input(|input| input.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            if let Some(origin) = origin {
                let world = screen_to_world(rect, transform, origin);
                if let Some(index) = hit_test(&self.positions, world, NODE_RADIUS) {
                    self.begin_drag(index, world);
                }
            }
        }

        if response.dragged_by(PointerButton::Primary) {
            match self.dragging {
                Some(drag) => {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        let world = screen_to_world(rect, transform, pointer);
                        if let Some(simulation) = self.simulation.as_mut() {
                            simulation.drag_move(drag.id, world + drag.grab_offset);
                        }
                    }
                }
                None => self.viewport.pan_by(response.drag_delta()),
            }
        }

        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            self.viewport.pan_by(response.drag_delta());
        }

        if response.drag_stopped() {
            self.end_drag();
        }

        if self.dragging.is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if hovered.is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        if response.clicked_by(PointerButton::Primary) {
            return Some(hovered.map(|index| self.nodes[index].member.id));
        }
        None
    }

    fn begin_drag(&mut self, index: usize, pointer_world: Vec2) {
        let id = self.nodes[index].member.id;
        let Some(simulation) = self.simulation.as_mut() else {
            return;
        };
        let Some(position) = simulation.position(id) else {
            return;
        };

        if simulation.drag_start(id) {
            self.dragging = Some(NodeDrag {
                id,
                grab_offset: position - pointer_world,
            });
        }
    }

    fn end_drag(&mut self) {
        let Some(drag) = self.dragging.take() else {
            return;
        };
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.drag_end(drag.id);
        }
    }
}
