use super::{ConnectState, EditorSession};
use crate::settings::AppSettings;
use crate::theme::parse_color_token;
use eframe::egui;
use mindcanvas_core::{NodeId, Point};
use mindcanvas_graph::EndpointLookup;
use std::time::Instant;

const NODE_WIDTH: f32 = 160.0;
const NODE_HEIGHT: f32 = 84.0;
const HEADER_HEIGHT: f32 = 20.0;

struct NodeLayout {
    id: NodeId,
    rect: egui::Rect,
    text_rect: egui::Rect,
    color: egui::Color32,
    text: String,
    selected: bool,
    pending_pick: bool,
}

impl EditorSession {
    /// Per-frame entry point: drain diffs, commit due text edits, then draw
    /// toolbar and canvas.
    pub fn show(&mut self, ui: &mut egui::Ui, settings: &AppSettings) {
        self.pump();
        let now = Instant::now();
        self.flush_due_edits(now);
        if let Some(deadline) = self.next_edit_deadline() {
            ui.ctx()
                .request_repaint_after(deadline.saturating_duration_since(now));
        }
        self.handle_shortcuts(ui.ctx());
        self.show_toolbar(ui, settings);
        ui.separator();
        self.show_canvas(ui);
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        // Suppressed while a text field has focus.
        if ctx.wants_keyboard_input() {
            return;
        }
        let (undo, redo, delete) = ctx.input_mut(|i| {
            (
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z),
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y),
                i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                    || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace),
            )
        });
        if undo {
            self.undo();
        }
        if redo {
            self.redo();
        }
        if delete {
            self.delete_selection();
        }
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui, settings: &AppSettings) {
        ui.horizontal(|ui| {
            if ui.button("➕ Node").clicked() {
                // Center of the current viewport in canvas coordinates.
                self.create_node_at(Point::new(-self.pan.x / self.zoom, -self.pan.y / self.zoom));
            }

            let connecting = self.connect_state() != ConnectState::Inactive;
            if ui.selectable_label(connecting, "🔗 Connect").clicked() {
                self.toggle_connect_mode();
            }

            let has_selection = !self.selection().is_empty();
            if ui
                .add_enabled(has_selection, egui::Button::new("🗑 Delete"))
                .clicked()
            {
                self.delete_selection();
            }

            ui.separator();
            for token in &settings.palette {
                let swatch = egui::Button::new("  ").fill(parse_color_token(token));
                if ui.add_enabled(has_selection, swatch).clicked() {
                    self.recolor_selection(token);
                }
            }

            ui.separator();
            if ui
                .add_enabled(self.can_undo(), egui::Button::new("⟲ Undo"))
                .clicked()
            {
                self.undo();
            }
            if ui
                .add_enabled(self.can_redo(), egui::Button::new("⟳ Redo"))
                .clicked()
            {
                self.redo();
            }

            if connecting {
                ui.separator();
                ui.weak(match self.connect_state() {
                    ConnectState::AwaitingSecond(_) => "pick the target node",
                    _ => "pick the source node",
                });
            }
        });
    }

    fn graph_to_screen(&self, pos: Point, center: egui::Pos2) -> egui::Pos2 {
        egui::pos2(
            center.x + self.pan.x + pos.x * self.zoom,
            center.y + self.pan.y + pos.y * self.zoom,
        )
    }

    fn screen_to_graph(&self, pos: egui::Pos2, center: egui::Pos2) -> Point {
        Point::new(
            (pos.x - center.x - self.pan.x) / self.zoom,
            (pos.y - center.y - self.pan.y) / self.zoom,
        )
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
        let center = rect.center();

        // Zoom anchored at the pointer, so the point under the cursor stays
        // put.
        let zoom_delta = ui.input(|i| i.zoom_delta());
        if response.hovered() && (zoom_delta - 1.0).abs() > f32::EPSILON {
            let prev_zoom = self.zoom;
            let new_zoom = (self.zoom * zoom_delta).clamp(0.2, 5.0);
            if (new_zoom - prev_zoom).abs() > f32::EPSILON {
                self.zoom = new_zoom;
                if let Some(pointer) = response.hover_pos() {
                    let anchor = Point::new(
                        (pointer.x - center.x - self.pan.x) / prev_zoom,
                        (pointer.y - center.y - self.pan.y) / prev_zoom,
                    );
                    let new_screen = self.graph_to_screen(anchor, center);
                    self.pan.x += pointer.x - new_screen.x;
                    self.pan.y += pointer.y - new_screen.y;
                }
            }
        }

        // Stable z-order: oldest nodes at the bottom.
        let mut order: Vec<NodeId> = self.graph().nodes().map(|n| n.id).collect();
        order.sort_by_key(|id| self.graph().node(*id).map(|n| (n.created_at, n.id)));

        let layouts: Vec<NodeLayout> = order
            .iter()
            .filter_map(|id| {
                let node = self.graph().node(*id)?;
                let pos = self.node_display_position(*id)?;
                let min = self.graph_to_screen(pos, center);
                let size = egui::vec2(NODE_WIDTH * self.zoom, NODE_HEIGHT * self.zoom);
                let node_rect = egui::Rect::from_min_size(min, size);
                let text_rect = egui::Rect::from_min_max(
                    egui::pos2(
                        node_rect.min.x + 4.0 * self.zoom,
                        node_rect.min.y + HEADER_HEIGHT * self.zoom,
                    ),
                    node_rect.max - egui::vec2(4.0 * self.zoom, 4.0 * self.zoom),
                );
                Some(NodeLayout {
                    id: *id,
                    rect: node_rect,
                    text_rect,
                    color: parse_color_token(&node.color),
                    text: self.node_display_text(*id).unwrap_or_default(),
                    selected: self.is_selected(*id),
                    pending_pick: matches!(
                        self.connect_state(),
                        ConnectState::AwaitingSecond(first) if first == *id
                    ),
                })
            })
            .collect();

        let hit_node = |pos: egui::Pos2| -> Option<NodeId> {
            layouts
                .iter()
                .rev()
                .find(|l| l.rect.contains(pos))
                .map(|l| l.id)
        };

        // Drag routing: a press on a node drags the node, anywhere else pans.
        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos()
                && let Some(id) = hit_node(pos)
            {
                self.begin_drag(id);
            }
        }
        if response.dragged() {
            let delta = response.drag_delta();
            if self.dragging().is_some() {
                self.drag_by(delta.x / self.zoom, delta.y / self.zoom);
            } else {
                self.pan.x += delta.x;
                self.pan.y += delta.y;
            }
        }
        if response.drag_stopped() {
            self.end_drag();
        }

        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos()
                && hit_node(pos).is_none()
            {
                let target = self.screen_to_graph(pos, center);
                self.create_node_at(target);
            }
        } else if response.clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            let additive = ui.input(|i| i.modifiers.command || i.modifiers.ctrl);
            match hit_node(pos) {
                Some(id) => self.click_node(id, additive),
                None => self.click_background(),
            }
        }

        // Connections first so they sit under the cards. Endpoints that no
        // longer resolve are skipped, not errors.
        let edge_stroke = egui::Stroke::new(
            3.0 * self.zoom.clamp(0.4, 1.5),
            egui::Color32::from_rgba_unmultiplied(203, 213, 225, 180),
        );
        let segments: Vec<(egui::Pos2, egui::Pos2)> = self
            .graph()
            .connections()
            .filter_map(|conn| {
                // Existence is the mirror's call; the drag preview only
                // overrides the position of a node known to exist.
                let EndpointLookup::Found { from, to } = self.graph().endpoints(conn) else {
                    return None;
                };
                let from = self.node_display_position(from.id)?;
                let to = self.node_display_position(to.id)?;
                let half = egui::vec2(NODE_WIDTH / 2.0, NODE_HEIGHT / 2.0) * self.zoom;
                Some((
                    self.graph_to_screen(from, center) + half,
                    self.graph_to_screen(to, center) + half,
                ))
            })
            .collect();
        for (a, b) in segments {
            painter.line_segment([a, b], edge_stroke);
        }

        // Preview line while picking the second endpoint.
        if let ConnectState::AwaitingSecond(first) = self.connect_state()
            && let Some(from) = self.node_display_position(first)
            && let Some(pointer) = response.hover_pos()
        {
            let half = egui::vec2(NODE_WIDTH / 2.0, NODE_HEIGHT / 2.0) * self.zoom;
            painter.line_segment(
                [self.graph_to_screen(from, center) + half, pointer],
                egui::Stroke::new(2.0, ui.visuals().weak_text_color()),
            );
        }

        let selection_stroke = egui::Stroke::new(2.0, ui.visuals().selection.stroke.color);
        let pick_stroke = egui::Stroke::new(2.0, egui::Color32::from_rgb(59, 130, 246));
        let mut edits: Vec<(NodeId, String)> = Vec::new();

        for layout in &layouts {
            painter.rect_filled(layout.rect, 6.0, layout.color);
            painter.rect_filled(
                egui::Rect::from_min_size(
                    layout.rect.min,
                    egui::vec2(layout.rect.width(), HEADER_HEIGHT * self.zoom),
                ),
                6.0,
                layout.color.gamma_multiply(0.8),
            );
            if layout.selected {
                painter.rect_stroke(
                    layout.rect.expand(2.0),
                    6.0,
                    selection_stroke,
                    egui::StrokeKind::Outside,
                );
            }
            if layout.pending_pick {
                painter.rect_stroke(
                    layout.rect.expand(4.0),
                    6.0,
                    pick_stroke,
                    egui::StrokeKind::Outside,
                );
            }

            // Editable body. The text edit consumes pointer events over its
            // rect, so dragging happens on the header band, matching the
            // original textarea-inside-card behavior.
            let mut buffer = layout.text.clone();
            let output = ui.put(
                layout.text_rect,
                egui::TextEdit::multiline(&mut buffer)
                    .frame(false)
                    .font(egui::FontId::proportional(13.0 * self.zoom))
                    .text_color(egui::Color32::WHITE),
            );
            if output.changed() {
                edits.push((layout.id, buffer));
            }
        }

        let now = Instant::now();
        for (id, text) in edits {
            self.text_edited(id, text, now);
        }
    }
}
