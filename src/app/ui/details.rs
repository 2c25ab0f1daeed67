use std::collections::BTreeMap;

use eframe::egui::{self, RichText, Ui};

use crate::history::Entity;

use super::super::interaction::PointerEvent;
use super::super::visual::entity_color;
use super::super::{ConnectionEntry, DetailsPanelCache, DetailsPanelCacheKey, ViewModel};
use super::form::EntityForm;

enum DetailsAction {
    Focus(String),
    Edit,
    Connect(String),
    ToggleLock(String),
    Delete(String),
    DeleteLink(String),
    Select(String),
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Entity Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.session.interaction().selected().map(str::to_owned) else {
            ui.label("Click an entity on the map, or search for one.");
            return;
        };
        let Some(node) = self.session.store().node(&selected_id) else {
            ui.label("The selected entity no longer exists.");
            return;
        };

        let entity = node.entity().clone();
        let is_locked = node.is_locked();
        let pin = node.pin();
        let is_root = self.session.root() == Some(selected_id.as_str());
        let degrees = self.session.degrees_from_root(&selected_id);
        self.refresh_details_cache(&selected_id);

        ui.label(
            RichText::new(entity.name.as_str())
                .strong()
                .size(17.0)
                .color(entity_color(entity.kind)),
        );
        ui.small(format!("{} | {}", entity.kind.label(), entity.id));
        ui.add_space(6.0);

        match (&entity.date, entity.effective_year()) {
            (Some(date), _) => {
                ui.label(format!("Date: {date}"));
            }
            (None, Some(year)) => {
                ui.label(format!("Year: {year}"));
            }
            (None, None) => {
                ui.label("Undated");
            }
        }
        if !entity.tags.is_empty() {
            ui.label(format!("Tags: {}", entity.tags.join(", ")));
        }
        if let Some(url) = &entity.image_url {
            ui.hyperlink_to("Image", url);
        }
        if !entity.description.is_empty() {
            ui.add_space(4.0);
            ui.label(entity.description.as_str());
        }

        ui.add_space(4.0);
        match (self.session.root(), degrees) {
            (Some(_), _) if is_root => ui.label("This is the focused entity."),
            (Some(_), Some(degrees)) => ui.label(format!("{degrees} degrees from the focused entity")),
            (Some(_), None) => ui.label("Not connected to the focused entity."),
            (None, _) => ui.label("No entity is focused."),
        };
        if let Some(pin) = pin
            && !is_locked
        {
            ui.small(format!("Held at ({:.0}, {:.0}) while selected.", pin.x, pin.y));
        }

        let mut action = None;
        ui.add_space(6.0);
        ui.horizontal_wrapped(|ui| {
            if ui
                .add_enabled(!is_root, egui::Button::new("Focus"))
                .on_hover_text("Center the map on this entity's neighborhood.")
                .clicked()
            {
                action = Some(DetailsAction::Focus(selected_id.clone()));
            }
            if ui.button("Edit").clicked() {
                action = Some(DetailsAction::Edit);
            }
            if ui
                .button("Connect")
                .on_hover_text("Then click the entity to link to.")
                .clicked()
            {
                action = Some(DetailsAction::Connect(selected_id.clone()));
            }
            if ui.button(if is_locked { "Unlock" } else { "Lock" }).clicked() {
                action = Some(DetailsAction::ToggleLock(selected_id.clone()));
            }
            if ui.button("Delete").clicked() {
                action = Some(DetailsAction::Delete(selected_id.clone()));
            }
        });

        ui.separator();
        ui.label(RichText::new("Connections").strong());
        if let Some(cache) = &self.details_panel_cache {
            if cache.connections.is_empty() {
                ui.label("No relationships yet.");
            }
            egui::ScrollArea::vertical()
                .id_salt("connections_scroll")
                .max_height(240.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for connection in &cache.connections {
                        ui.horizontal(|ui| {
                            let arrow = if connection.outgoing { "->" } else { "<-" };
                            let label = format!(
                                "{arrow} {} ({})",
                                connection.other_name,
                                connection.kind.label()
                            );
                            let hover = match connection.depth {
                                Some(depth) => format!("{}\ndepth {depth}", connection.description),
                                None => format!("{}\noutside the current view", connection.description),
                            };
                            if ui.link(label).on_hover_text(hover.trim()).clicked() {
                                action = Some(DetailsAction::Select(connection.other_id.clone()));
                            }
                            if ui.small_button("x").on_hover_text("Remove relationship").clicked() {
                                action = Some(DetailsAction::DeleteLink(connection.link_id.clone()));
                            }
                        });
                    }
                });

            ui.separator();
            ui.label(RichText::new("Neighborhood").strong());
            for (depth, members) in &cache.depth_groups {
                egui::CollapsingHeader::new(format!("Depth {depth} ({})", members.len()))
                    .id_salt(("depth_group", *depth))
                    .default_open(*depth <= 1)
                    .show(ui, |ui| {
                        for (id, name) in members {
                            if ui.link(name.as_str()).clicked() {
                                action = Some(DetailsAction::Select(id.clone()));
                            }
                        }
                    });
            }
        }

        if let Some(action) = action {
            self.apply_details_action(action, &entity);
        }
    }

    fn apply_details_action(&mut self, action: DetailsAction, entity: &Entity) {
        let outcome = match action {
            DetailsAction::Focus(id) => {
                self.focus_entity(&id);
                Ok(())
            }
            DetailsAction::Edit => {
                self.form = Some(EntityForm::edit(entity));
                Ok(())
            }
            DetailsAction::Connect(id) => {
                self.session.arm_connecting(&id);
                Ok(())
            }
            DetailsAction::ToggleLock(id) => self.session.toggle_lock(&id).map(|_| ()),
            DetailsAction::Delete(id) => self.session.delete_node(&id).map(|_| ()),
            DetailsAction::DeleteLink(id) => self.session.delete_link(&id).map(|_| ()),
            DetailsAction::Select(id) => {
                if let Some(event) = self.session.pointer(PointerEvent::ClickNode { node: id }) {
                    self.handle_session_event(event);
                }
                Ok(())
            }
        };
        if let Err(error) = outcome {
            self.status = Some(error.to_string());
        }
    }

    fn refresh_details_cache(&mut self, selected_id: &str) {
        let key = DetailsPanelCacheKey {
            selected_id: selected_id.to_owned(),
            root: self.session.root().map(str::to_owned),
            max_depth: self.session.max_depth(),
            revision: self.session.store().revision(),
        };
        if self
            .details_panel_cache
            .as_ref()
            .is_some_and(|cache| cache.key == key)
        {
            return;
        }

        let store = self.session.store();
        let neighborhood = self.session.neighborhood();
        let name_of = |id: &str| {
            store
                .node(id)
                .map(|node| node.entity().name.clone())
                .unwrap_or_else(|| id.to_owned())
        };

        let mut connections = store
            .incident_links(selected_id)
            .filter_map(|link| {
                let relationship = link.relationship();
                let other_id = relationship.other_end(selected_id)?.to_owned();
                Some(ConnectionEntry {
                    link_id: link.id().to_owned(),
                    other_name: name_of(&other_id),
                    depth: neighborhood.depth_of(&other_id),
                    other_id,
                    kind: link.kind(),
                    description: relationship.description.clone(),
                    outgoing: relationship.source_id == selected_id,
                })
            })
            .collect::<Vec<_>>();
        connections.sort_by(|a, b| a.other_name.cmp(&b.other_name));

        let mut grouped = BTreeMap::<usize, Vec<(String, String)>>::new();
        for (id, depth) in neighborhood.depth_map() {
            if id != selected_id {
                grouped
                    .entry(*depth)
                    .or_default()
                    .push((id.clone(), name_of(id)));
            }
        }
        let depth_groups = grouped
            .into_iter()
            .map(|(depth, mut members)| {
                members.sort_by(|a, b| a.1.cmp(&b.1));
                (depth, members)
            })
            .collect();

        self.details_panel_cache = Some(DetailsPanelCache {
            key,
            connections,
            depth_groups,
        });
    }
}
