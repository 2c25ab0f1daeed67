use eframe::egui::{self, Context, Vec2};

use crate::history::{Entity, EntityDraft, EntityKind, EntityPatch};

use super::super::ViewModel;

/// Editable copy of an entity, either for a new node at `at` or for the
/// existing node `editing`.
#[derive(Clone, Debug, Default, PartialEq)]
pub(in crate::app) struct EntityForm {
    pub editing: Option<String>,
    pub at: Option<Vec2>,
    pub name: String,
    pub kind: EntityKind,
    pub description: String,
    pub tags: String,
    pub date: String,
    pub year: String,
    pub image_url: String,
    pub error: Option<String>,
}

impl EntityForm {
    pub fn create_at(at: Option<Vec2>) -> Self {
        Self {
            at,
            ..Self::default()
        }
    }

    pub fn edit(entity: &Entity) -> Self {
        Self {
            editing: Some(entity.id.clone()),
            at: None,
            name: entity.name.clone(),
            kind: entity.kind,
            description: entity.description.clone(),
            tags: entity.tags.join(", "),
            date: entity.date.clone().unwrap_or_default(),
            year: entity.year.map(|year| year.to_string()).unwrap_or_default(),
            image_url: entity.image_url.clone().unwrap_or_default(),
            error: None,
        }
    }

    pub fn to_draft(&self) -> Result<EntityDraft, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required.".to_owned());
        }

        let year = match self.year.trim() {
            "" => None,
            raw => Some(
                raw.parse::<i32>()
                    .map_err(|_| format!("\"{raw}\" is not a year."))?,
            ),
        };

        let optional = |text: &str| {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        };

        Ok(EntityDraft {
            name: name.to_owned(),
            kind: self.kind,
            description: self.description.trim().to_owned(),
            tags: self
                .tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect(),
            date: optional(&self.date),
            year,
            image_url: optional(&self.image_url),
        })
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_form(&mut self, ctx: &Context) {
        let Some(form) = self.form.as_mut() else {
            return;
        };

        let title = if form.editing.is_some() {
            "Edit entity"
        } else {
            "New entity"
        };
        let mut open = true;
        let mut submit = false;
        let mut cancel = false;

        egui::Window::new(title)
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::Grid::new("entity_form_grid")
                    .num_columns(2)
                    .spacing([8.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Name");
                        ui.text_edit_singleline(&mut form.name);
                        ui.end_row();

                        ui.label("Type");
                        egui::ComboBox::from_id_salt("entity_form_kind")
                            .selected_text(form.kind.label())
                            .show_ui(ui, |ui| {
                                for kind in EntityKind::ALL {
                                    ui.selectable_value(&mut form.kind, kind, kind.label());
                                }
                            });
                        ui.end_row();

                        ui.label("Date");
                        ui.text_edit_singleline(&mut form.date)
                            .on_hover_text("Free text; a leading year such as 1517-10-31 dates the entity.");
                        ui.end_row();

                        ui.label("Year");
                        ui.text_edit_singleline(&mut form.year)
                            .on_hover_text("Overrides the year taken from the date.");
                        ui.end_row();

                        ui.label("Tags");
                        ui.text_edit_singleline(&mut form.tags)
                            .on_hover_text("Comma separated.");
                        ui.end_row();

                        ui.label("Image URL");
                        ui.text_edit_singleline(&mut form.image_url);
                        ui.end_row();
                    });

                ui.label("Description");
                ui.add(egui::TextEdit::multiline(&mut form.description).desired_rows(4));

                if let Some(error) = &form.error {
                    ui.colored_label(egui::Color32::from_rgb(248, 113, 113), error.as_str());
                }

                ui.horizontal(|ui| {
                    submit = ui.button("Save").clicked();
                    cancel = ui.button("Cancel").clicked();
                });
            });

        if !open || cancel {
            self.form = None;
            return;
        }
        if submit {
            self.submit_form();
        }
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let draft = match form.to_draft() {
            Ok(draft) => draft,
            Err(error) => {
                form.error = Some(error);
                return;
            }
        };

        let result = match form.editing.clone() {
            Some(id) => self
                .session
                .update_node(&id, &EntityPatch::replace_with(draft))
                .map(|node| node.id().to_owned()),
            None => self.session.create_node(draft, form.at),
        };

        match result {
            Ok(id) => {
                self.form = None;
                self.status = Some(format!("Saved {id}."));
            }
            Err(error) => {
                if let Some(form) = self.form.as_mut() {
                    form.error = Some(error.to_string());
                }
            }
        }
    }
}
