use std::collections::HashSet;
use std::time::Duration;

use eframe::egui::{
    self, Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, vec2,
};

use crate::family::{FamilyTree, Gender, Member, MemberId, RelationshipKind};
use crate::geometry::{ARROW_PULLBACK, NODE_RADIUS, arrow_terminal};

use super::super::physics::Phase;
use super::super::render_utils::{
    blend_color, circle_visible, dim_color, draw_background, segment_visible, world_to_screen,
};
use super::super::viewport::Transform;
use super::GraphSurface;

const TOOLTIP_OFFSET: egui::Vec2 = vec2(16.0, 18.0);
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const MATCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);

#[derive(Default)]
pub(in crate::app) struct SurfaceResponse {
    /// Set when a click changed the selection; the inner `None` means the
    /// empty canvas was clicked.
    pub selection: Option<Option<MemberId>>,
}

/// Per-frame emphasis that never triggers a rebuild.
#[derive(Clone, Copy)]
struct Highlights<'a> {
    selected: Option<MemberId>,
    matches: &'a HashSet<MemberId>,
    hovered: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct NodeStyle {
    pub fill: Color32,
    pub ring: Stroke,
    pub label: Color32,
}

/// Node colors for one frame. `selection_mix` runs from 0 (unselected) to 1
/// (selected) and only touches the ring and the label.
pub(super) fn node_style(
    member: &Member,
    selection_mix: f32,
    matched: bool,
    hovered: bool,
) -> NodeStyle {
    let base = match member.gender {
        Gender::Male => Color32::from_rgb(86, 140, 214),
        Gender::Female => Color32::from_rgb(214, 110, 160),
    };
    let mut fill = if member.is_deceased() {
        blend_color(dim_color(base, 0.6), Color32::from_gray(110), 0.45)
    } else {
        base
    };
    if hovered {
        fill = blend_color(fill, Color32::WHITE, 0.18);
    }

    let (ring_color, ring_width) = if matched {
        (MATCH_COLOR, 2.6)
    } else {
        (Color32::from_rgba_unmultiplied(15, 15, 15, 190), 1.4)
    };
    let label = if member.is_deceased() {
        Color32::from_gray(150)
    } else {
        Color32::from_gray(235)
    };

    let mix = selection_mix.clamp(0.0, 1.0);
    NodeStyle {
        fill,
        ring: Stroke::new(
            ring_width + (3.6 - ring_width) * mix,
            blend_color(ring_color, SELECTED_COLOR, mix),
        ),
        label: blend_color(label, SELECTED_COLOR, mix),
    }
}

fn link_color(kind: RelationshipKind) -> Color32 {
    match kind {
        RelationshipKind::Parent => Color32::from_rgb(150, 160, 175),
        RelationshipKind::Spouse => Color32::from_rgb(120, 200, 140),
        RelationshipKind::Divorced => Color32::from_rgb(220, 120, 100),
    }
}

fn paint_arrowhead(painter: &Painter, start: Pos2, tip: Pos2, size: f32, color: Color32) {
    let direction = tip - start;
    let length = direction.length();
    if length <= f32::EPSILON {
        return;
    }

    let direction = direction / length;
    let normal = vec2(-direction.y, direction.x);
    let base = tip - direction * size;
    painter.add(Shape::convex_polygon(
        vec![tip, base + normal * (size * 0.5), base - normal * (size * 0.5)],
        color,
        Stroke::NONE,
    ));
}

impl GraphSurface {
    /// Allocates the remaining space of `ui`, follows `tree`, runs one tick
    /// and paints. A torn-down surface allocates nothing.
    pub(in crate::app) fn show(
        &mut self,
        ui: &mut Ui,
        tree: &FamilyTree,
        selected: Option<MemberId>,
        matches: &HashSet<MemberId>,
    ) -> SurfaceResponse {
        if self.is_disposed() {
            return SurfaceResponse::default();
        }

        let now = ui.input(|input| input.time);
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        self.observe_size(rect.size());
        self.sync(tree, now);
        self.handle_zoom(ui, rect, &response);
        let hovered = self.hovered_index(ui, rect);
        let selection = self.handle_pointer(ui, rect, &response, hovered);

        self.step();
        let viewport_busy = self.run_deferred(now);

        let painter = ui.painter_at(rect);
        let transform = self.viewport.transform();
        draw_background(&painter, rect, transform);

        if self.nodes.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No members yet. Add one from the side panel.",
                FontId::proportional(15.0),
                Color32::from_gray(170),
            );
        }

        self.paint_links(&painter, rect, transform);
        let highlights = Highlights {
            selected,
            matches,
            hovered,
        };
        let selection_animating = self.paint_nodes(ui, &painter, rect, transform, highlights);

        if let Some(index) = hovered
            && self.dragging.is_none()
            && let Some(pointer) = ui.input(|input| input.pointer.hover_pos())
        {
            self.paint_tooltip(&painter, pointer, index);
        }
        self.paint_layout_status(&painter, rect);

        let settling = self.phase().is_some_and(|phase| phase != Phase::Idle);
        if settling || selection_animating || self.viewport.is_animating() {
            ui.ctx().request_repaint();
        } else if viewport_busy && let Some(wait) = self.seconds_until_deferred(now) {
            ui.ctx().request_repaint_after(Duration::from_secs_f64(wait));
        }

        SurfaceResponse { selection }
    }

    fn paint_links(&self, painter: &Painter, rect: Rect, transform: Transform) {
        let width = (1.6 * transform.scale.sqrt()).clamp(1.0, 3.2);
        let arrow_size = (10.0 * transform.scale).clamp(5.0, 18.0);

        for link in &self.links {
            let (Some(&source), Some(&target)) =
                (self.positions.get(link.source), self.positions.get(link.target))
            else {
                continue;
            };

            let terminal = arrow_terminal(source, target, ARROW_PULLBACK);
            let start = world_to_screen(rect, transform, source);
            let end = world_to_screen(rect, transform, terminal);
            if !segment_visible(rect, start, end, arrow_size) {
                continue;
            }

            let color = link_color(link.kind);
            let stroke = Stroke::new(width, color);
            match link.style.dash {
                Some([dash, gap]) => painter.extend(Shape::dashed_line(
                    &[start, end],
                    stroke,
                    dash * transform.scale,
                    gap * transform.scale,
                )),
                None => {
                    painter.line_segment([start, end], stroke);
                }
            }
            paint_arrowhead(painter, start, end, arrow_size, color);
        }
    }

    fn paint_nodes(
        &self,
        ui: &Ui,
        painter: &Painter,
        rect: Rect,
        transform: Transform,
        highlights: Highlights<'_>,
    ) -> bool {
        let radius = NODE_RADIUS * transform.scale;
        let initials_font = FontId::proportional((radius * 0.72).clamp(8.0, 34.0));
        let label_font = FontId::proportional((13.0 * transform.scale.sqrt()).clamp(9.0, 18.0));
        let mut animating = false;

        for (index, node) in self.nodes.iter().enumerate() {
            let Some(&world) = self.positions.get(index) else {
                continue;
            };
            let center = world_to_screen(rect, transform, world);
            if !circle_visible(rect, center, radius + label_font.size * 2.0) {
                continue;
            }

            let member = &node.member;
            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("member-selection", member.id)),
                highlights.selected == Some(member.id),
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                animating = true;
            }

            let style = node_style(
                member,
                selection_mix,
                highlights.matches.contains(&member.id),
                highlights.hovered == Some(index),
            );
            painter.circle_filled(center, radius, style.fill);
            painter.circle_stroke(center, radius, style.ring);
            painter.text(
                center,
                Align2::CENTER_CENTER,
                member.initials(),
                initials_font.clone(),
                Color32::from_gray(248),
            );
            painter.text(
                center + vec2(0.0, radius + 6.0),
                Align2::CENTER_TOP,
                &member.name,
                label_font.clone(),
                style.label,
            );
        }

        animating
    }

    fn paint_layout_status(&self, painter: &Painter, rect: Rect) {
        let motion = match (self.phase(), self.alpha()) {
            (Some(Phase::Dragging), _) => "dragging".to_owned(),
            (Some(Phase::Settling), Some(alpha)) => format!("settling ({alpha:.2})"),
            _ => "at rest".to_owned(),
        };
        painter.text(
            rect.left_bottom() + vec2(10.0, -8.0),
            Align2::LEFT_BOTTOM,
            format!(
                "{} members | {} links | {motion}",
                self.node_count(),
                self.link_count()
            ),
            FontId::monospace(11.0),
            Color32::from_gray(140),
        );
    }

    fn paint_tooltip(&self, painter: &Painter, pointer: Pos2, index: usize) {
        let Some(node) = self.nodes.get(index) else {
            return;
        };
        let member = &node.member;

        let mut lines = vec![
            member.name.clone(),
            format!("{} | {}", member.gender.label(), member.status.label()),
        ];
        lines.extend(
            member
                .attributes
                .iter()
                .map(|(key, value)| format!("{key}: {value}")),
        );

        let text_color = Color32::from_gray(235);
        let galley =
            painter.layout_no_wrap(lines.join("\n"), FontId::proportional(13.0), text_color);
        let origin = pointer + TOOLTIP_OFFSET;
        let frame = Rect::from_min_size(origin, galley.size() + vec2(16.0, 12.0));

        painter.rect_filled(frame, 6.0, Color32::from_rgba_unmultiplied(28, 33, 41, 235));
        painter.galley(origin + vec2(8.0, 6.0), galley, text_color);
    }
}
