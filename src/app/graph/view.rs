use eframe::egui::{
    self, Align2, Color32, CursorIcon, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, vec2,
};

use super::super::interaction::Mode;
use super::super::snapshot::{Capture, Scene, SceneLink, SceneNode};
use super::super::visual::{
    blend_color, circle_visible, draw_background, quadratic_points, screen_radius, screen_to_world,
    with_opacity, world_to_screen,
};
use super::super::ViewModel;
use super::super::ui::form::EntityForm;

const CURVE_SEGMENTS: usize = 18;
const SEARCH_RING: Color32 = Color32::from_rgb(103, 196, 255);
const LOCK_BADGE: Color32 = Color32::from_rgb(245, 206, 93);

#[derive(Clone, Debug, PartialEq, Eq)]
enum HoverAction {
    Focus(String),
    Edit(String),
    Connect(String),
    ToggleLock(String),
    Delete(String),
}

/// Buttons of the hover bar, left to right.
fn hover_buttons(id: &str, is_locked: bool) -> [(&'static str, HoverAction); 5] {
    [
        ("Focus", HoverAction::Focus(id.to_owned())),
        ("Edit", HoverAction::Edit(id.to_owned())),
        ("Connect", HoverAction::Connect(id.to_owned())),
        (
            if is_locked { "Unlock" } else { "Lock" },
            HoverAction::ToggleLock(id.to_owned()),
        ),
        ("Delete", HoverAction::Delete(id.to_owned())),
    ]
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.session
            .set_spawn_point(screen_to_world(rect, self.pan, self.zoom, rect.center()));

        let activity = self.session.advance_frame();

        let scene = {
            let interaction = self.session.interaction();
            Scene::capture(
                &self.session,
                Capture::Live {
                    selected: interaction.selected(),
                    hovered: interaction.hovered(),
                },
            )
        };

        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hovered = pointer
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| {
                scene.node_at(screen_to_world(rect, self.pan, self.zoom, pointer), self.zoom)
            })
            .map(|node| node.id.clone());

        self.handle_graph_pointer(ui, rect, &response, &scene, hovered.as_deref());
        self.handle_graph_pan(&response);

        let search_matches = self.cached_search_matches().map(|(_, matches)| matches);
        let (pan, zoom) = (self.pan, self.zoom);

        for link in &scene.links {
            Self::paint_link(&painter, rect, pan, zoom, link);
        }

        if let Mode::Connecting { source } = self.session.interaction().mode()
            && let Some(source) = scene.nodes.iter().find(|node| &node.id == source)
            && let Some(pointer) = pointer
        {
            let start = world_to_screen(rect, pan, zoom, source.position);
            painter.extend(Shape::dashed_line(
                &[start, pointer],
                Stroke::new(1.5, Color32::from_gray(200)),
                6.0,
                4.0,
            ));
        }

        for node in &scene.nodes {
            let matched = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&node.id));
            Self::paint_node(&painter, rect, pan, zoom, node, matched);
        }

        if let Some(node) = hovered
            .as_deref()
            .and_then(|id| self.session.store().node(id))
        {
            let entity = node.entity();
            let year = entity
                .effective_year()
                .map(|year| format!("  |  {year}"))
                .unwrap_or_default();
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!("{}  |  {}{year}", entity.name, entity.kind.label()),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if self.session.neighborhood().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No entities yet. Use \"Add entity\" to place one.",
                FontId::proportional(15.0),
                Color32::from_gray(170),
            );
        }

        let temporal = self.session.temporal();
        if temporal.is_engaged() {
            painter.text(
                rect.right_top() + vec2(-12.0, 10.0),
                Align2::RIGHT_TOP,
                temporal.current_year().to_string(),
                FontId::proportional(22.0),
                Color32::from_gray(220),
            );
        }

        let cursor = match self.session.interaction().mode() {
            Mode::PlacingNode | Mode::Connecting { .. } => Some(CursorIcon::Crosshair),
            Mode::Dragging { .. } => Some(CursorIcon::Grabbing),
            Mode::Idle => hovered.is_some().then_some(CursorIcon::PointingHand),
        };
        if let Some(cursor) = cursor {
            ui.output_mut(|output| output.cursor_icon = cursor);
        }

        self.draw_hover_controls(ui, rect, &scene, hovered, pointer);

        if activity.any() || self.dragging || response.dragged() {
            ui.ctx().request_repaint();
        }
    }

    fn paint_link(painter: &Painter, rect: Rect, pan: egui::Vec2, zoom: f32, link: &SceneLink) {
        let start = world_to_screen(rect, pan, zoom, link.source);
        let end = world_to_screen(rect, pan, zoom, link.target);
        let control = world_to_screen(rect, pan, zoom, link.control);
        if !rect.expand(40.0).intersects(Rect::from_points(&[start, control, end])) {
            return;
        }

        let points = quadratic_points(start, control, end, CURVE_SEGMENTS);
        let stroke = Stroke::new(
            (link.visual.style.width * zoom.sqrt()).clamp(0.6, 5.0),
            with_opacity(link.visual.color, link.visual.opacity),
        );
        match link.visual.style.dash {
            Some((dash, gap)) => {
                painter.extend(Shape::dashed_line(&points, stroke, dash * zoom, gap * zoom));
            }
            None => {
                painter.add(Shape::line(points, stroke));
            }
        }
    }

    fn paint_node(
        painter: &Painter,
        rect: Rect,
        pan: egui::Vec2,
        zoom: f32,
        node: &SceneNode,
        matched: bool,
    ) {
        let position = world_to_screen(rect, pan, zoom, node.position);
        let radius = screen_radius(node.visual.radius, zoom);
        if !circle_visible(rect, position, radius + 10.0) {
            return;
        }

        let fill = node.visual.fill;
        painter.circle_filled(
            position,
            radius + 8.0 * zoom.sqrt(),
            with_opacity(fill, node.visual.glow_opacity * 0.3),
        );
        let body = if node.emphasis.selected {
            blend_color(fill, Color32::WHITE, 0.25)
        } else {
            fill
        };
        painter.circle_filled(position, radius, with_opacity(body, node.visual.opacity));
        painter.circle_stroke(
            position,
            radius,
            Stroke::new(
                if node.emphasis.selected { 2.4 } else { 1.0 },
                with_opacity(Color32::from_rgb(15, 15, 15), node.visual.opacity * 0.75),
            ),
        );

        if matched {
            painter.circle_stroke(
                position,
                radius + 4.0,
                Stroke::new(1.6, with_opacity(SEARCH_RING, node.visual.opacity)),
            );
        }

        if node.show_lock_badge {
            let badge = position + vec2(radius * 0.72, -radius * 0.72);
            painter.circle_filled(badge, 4.5, with_opacity(LOCK_BADGE, node.visual.opacity));
            painter.circle_stroke(badge, 4.5, Stroke::new(1.0, Color32::from_gray(20)));
        }

        if node.visual.label_opacity > 0.0 {
            painter.text(
                position + vec2(radius + 5.0, 0.0),
                Align2::LEFT_CENTER,
                node.label.as_str(),
                FontId::proportional(12.0),
                with_opacity(Color32::from_gray(238), node.visual.label_opacity),
            );
        }
    }

    /// Small action bar next to the hovered node. It stays up while the
    /// pointer moves onto it.
    fn draw_hover_controls(
        &mut self,
        ui: &Ui,
        rect: Rect,
        scene: &Scene,
        hovered: Option<String>,
        pointer: Option<Pos2>,
    ) {
        let kept = self
            .hover_controls
            .take()
            .filter(|(_, area)| pointer.is_some_and(|pointer| area.expand(6.0).contains(pointer)))
            .map(|(id, _)| id);
        let Some(id) = kept.or(hovered).filter(|_| !self.dragging) else {
            return;
        };
        let Some(node) = scene.nodes.iter().find(|node| node.id == id) else {
            return;
        };

        let is_locked = self
            .session
            .store()
            .node(&id)
            .is_some_and(|node| node.is_locked());
        let position = world_to_screen(rect, self.pan, self.zoom, node.position);
        let radius = screen_radius(node.visual.radius, self.zoom);

        let mut action = None;
        let area = egui::Area::new(egui::Id::new("hover_controls"))
            .order(egui::Order::Foreground)
            .fixed_pos(position + vec2(-radius, radius + 6.0))
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        for (label, button_action) in hover_buttons(&id, is_locked) {
                            if ui.small_button(label).clicked() {
                                action = Some(button_action);
                            }
                        }
                    });
                });
            });
        self.hover_controls = Some((id, area.response.rect));

        match action {
            Some(HoverAction::Focus(id)) => self.focus_entity(&id),
            Some(HoverAction::Edit(id)) => {
                if let Some(node) = self.session.store().node(&id) {
                    self.form = Some(EntityForm::edit(node.entity()));
                }
            }
            Some(HoverAction::Connect(id)) => self.session.arm_connecting(&id),
            Some(HoverAction::ToggleLock(id)) => {
                if let Err(error) = self.session.toggle_lock(&id) {
                    self.status = Some(error.to_string());
                }
            }
            Some(HoverAction::Delete(id)) => {
                self.hover_controls = None;
                if let Err(error) = self.session.delete_node(&id) {
                    self.status = Some(error.to_string());
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hover_bar_offers_edit_connect_and_delete() {
        let buttons = hover_buttons("luther", false);
        let labels = buttons.iter().map(|(label, _)| *label).collect::<Vec<_>>();
        assert_eq!(labels, ["Focus", "Edit", "Connect", "Lock", "Delete"]);
        assert_eq!(buttons[1].1, HoverAction::Edit("luther".into()));
        assert_eq!(buttons[4].1, HoverAction::Delete("luther".into()));

        let locked = hover_buttons("luther", true);
        assert_eq!(locked[3].0, "Unlock");
    }
}
