use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use super::super::interaction::{PointerEvent, SessionEvent};
use super::super::snapshot::Scene;
use super::super::ui::form::EntityForm;
use super::super::visual::screen_to_world;
use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
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
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.1, 4.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        let background_drag = !self.dragging && response.dragged_by(egui::PointerButton::Primary);
        if background_drag
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Turns this frame's pointer input on the canvas into session events.
    pub(in crate::app) fn handle_graph_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        scene: &Scene,
        hovered: Option<&str>,
    ) {
        let to_world = |screen: Pos2| screen_to_world(rect, self.pan, self.zoom, screen);
        let mut events = Vec::new();

        if self.session.interaction().hovered() != hovered {
            events.push(PointerEvent::Hover(hovered.map(str::to_owned)));
        }

        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui.input(|input| input.pointer.press_origin());
            if let Some(node) = origin.and_then(|origin| scene.node_at(to_world(origin), self.zoom)) {
                events.push(PointerEvent::DragStart {
                    node: node.id.clone(),
                });
                self.dragging = true;
            }
        }

        if self.dragging {
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(pointer) = response.interact_pointer_pos()
            {
                events.push(PointerEvent::DragMove {
                    to: to_world(pointer),
                });
            }
            if response.drag_stopped() {
                events.push(PointerEvent::DragEnd);
                self.dragging = false;
            }
        }

        if response.double_clicked()
            && let Some(id) = hovered
        {
            let id = id.to_owned();
            self.focus_entity(&id);
        } else if response.clicked_by(egui::PointerButton::Primary) {
            match hovered {
                Some(node) => events.push(PointerEvent::ClickNode {
                    node: node.to_owned(),
                }),
                None => {
                    let at = response
                        .interact_pointer_pos()
                        .map(to_world)
                        .unwrap_or(Vec2::ZERO);
                    events.push(PointerEvent::ClickBackground { at });
                }
            }
        }

        if ui.input(|input| input.key_pressed(egui::Key::Escape)) {
            self.session.cancel_interaction();
        }

        for event in events {
            if let Some(outcome) = self.session.pointer(event) {
                self.handle_session_event(outcome);
            }
        }
    }

    pub(in crate::app) fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Selected(entity) => {
                tracing::debug!(id = %entity.id, "entity selected");
            }
            SessionEvent::OpenCreateForm { at } => {
                self.form = Some(EntityForm::create_at(Some(at)));
            }
            SessionEvent::CreateLink { source, target } => {
                self.status = Some(
                    match self
                        .session
                        .create_link(&source, &target, self.link_kind, "")
                    {
                        Ok(link) => format!("Linked {} ({}).", link.id(), link.kind().label()),
                        Err(error) => error.to_string(),
                    },
                );
            }
            SessionEvent::ConnectionCancelled => {
                self.status = Some("Connection cancelled.".to_owned());
            }
        }
    }
}
