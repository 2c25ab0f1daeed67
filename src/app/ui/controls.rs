use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Key, Response, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::config::ViewConfig;
use crate::history::RelationKind;

use super::super::interaction::Mode;
use super::super::snapshot::{export_layout, export_svg};
use super::super::{SearchMatchCache, ViewModel};

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;
const SEARCH_RESULT_LIMIT: usize = 12;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    held_secs: f32,
    direction: i8,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Lets a focused slider keep moving while an arrow key is held, faster the
/// longer it is held.
fn accelerate_slider_keys(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    range: (f32, f32),
    step: f32,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.remove::<SliderKeyHoldState>(state_id));
        return false;
    }

    let (delta_time, increase, decrease) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });
    let direction = (increase as i8) - (decrease as i8);

    let mut hold = ui
        .ctx()
        .data(|data| data.get_temp::<SliderKeyHoldState>(state_id))
        .unwrap_or_default();
    if direction == 0 || direction != hold.direction {
        hold = SliderKeyHoldState {
            held_secs: 0.0,
            direction,
        };
    }
    hold.held_secs += delta_time;
    ui.ctx().data_mut(|data| data.insert_temp(state_id, hold));

    if direction == 0 {
        return false;
    }

    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold.held_secs);
    let previous = *value;
    *value = (*value + direction as f32 * step * speed * delta_time).clamp(range.0, range.1);
    ui.ctx().request_repaint();
    (*value - previous).abs() > f32::EPSILON
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

impl ViewModel {
    /// Entities matching the search box, best first, cached per query and
    /// store revision.
    pub(in crate::app) fn cached_search_matches(
        &mut self,
    ) -> Option<(Arc<Vec<(String, String)>>, Arc<HashSet<String>>)> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        let revision = self.session.store().revision();
        if let Some(cached) = &self.search_match_cache
            && cached.revision == revision
            && cached.query == query
        {
            return Some((Arc::clone(&cached.ranked), Arc::clone(&cached.matches)));
        }

        let matcher = SkimMatcherV2::default();
        let mut scored = self
            .session
            .store()
            .nodes()
            .iter()
            .filter_map(|node| {
                let entity = node.entity();
                let by_name = fuzzy_match_score(&matcher, &entity.name, query);
                let by_tag = entity
                    .tags
                    .iter()
                    .filter_map(|tag| fuzzy_match_score(&matcher, tag, query))
                    .max();
                let score = by_name.max(by_tag)?;
                Some((score, entity.id.clone(), entity.name.clone()))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.2.cmp(&b.2)));

        let matches = Arc::new(scored.iter().map(|(_, id, _)| id.clone()).collect::<HashSet<_>>());
        let ranked = Arc::new(
            scored
                .into_iter()
                .map(|(_, id, name)| (id, name))
                .collect::<Vec<_>>(),
        );

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            revision,
            ranked: Arc::clone(&ranked),
            matches: Arc::clone(&matches),
        });
        Some((ranked, matches))
    }

    pub(in crate::app) fn focus_entity(&mut self, id: &str) {
        match self.session.focus(id) {
            Ok(entity) => {
                self.pan = -self
                    .session
                    .store()
                    .node(id)
                    .map(|node| node.position() * self.zoom)
                    .unwrap_or_default();
                self.status = Some(format!("Focused on {}.", entity.name));
            }
            Err(error) => self.status = Some(error.to_string()),
        }
    }

    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Map Controls");
        ui.separator();
        ui.add_space(4.0);

        self.draw_search(ui);
        ui.separator();
        self.draw_view_controls(ui);
        ui.separator();
        self.draw_timeline(ui);
        ui.separator();

        egui::CollapsingHeader::new("Physics")
            .default_open(false)
            .show(ui, |ui| self.draw_physics(ui));

        ui.separator();
        ui.horizontal_wrapped(|ui| {
            if ui
                .button("Export SVG")
                .on_hover_text("Write the visible map as an SVG image.")
                .clicked()
            {
                self.status = Some(match export_svg(&self.session, &self.export_dir) {
                    Ok(path) => format!("Exported {}.", path.display()),
                    Err(error) => format!("{error:#}"),
                });
            }
            if ui
                .button("Save layout")
                .on_hover_text("Write entities, relationships and positions as JSON.")
                .clicked()
            {
                self.status = Some(match export_layout(&self.session, &self.export_dir) {
                    Ok(path) => format!("Saved {}.", path.display()),
                    Err(error) => format!("{error:#}"),
                });
            }
        });
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search")
            .on_hover_text("Fuzzy match entity names and tags.");
        ui.text_edit_singleline(&mut self.search);

        let Some((ranked, _)) = self.cached_search_matches() else {
            return;
        };
        if ranked.is_empty() {
            ui.small("No entities match.");
            return;
        }

        let mut focus = None;
        egui::ScrollArea::vertical()
            .id_salt("search_results_scroll")
            .max_height(180.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (id, name) in ranked.iter().take(SEARCH_RESULT_LIMIT) {
                    let is_root = self.session.root() == Some(id.as_str());
                    if ui.selectable_label(is_root, name.as_str()).on_hover_text(id.as_str()).clicked() {
                        focus = Some(id.clone());
                    }
                }
            });

        if let Some(id) = focus {
            self.focus_entity(&id);
        }
    }

    fn draw_view_controls(&mut self, ui: &mut Ui) {
        let mut depth = self.session.max_depth() as f32;
        let depth_slider = ui
            .add(
                egui::Slider::new(
                    &mut depth,
                    ViewConfig::MIN_DEPTH as f32..=ViewConfig::MAX_DEPTH as f32,
                )
                .step_by(1.0)
                .text("Depth"),
            )
            .on_hover_text("Degrees of separation shown around the focused entity.");
        let mut changed = depth_slider.changed();
        changed |= accelerate_slider_keys(
            ui,
            &depth_slider,
            &mut depth,
            (ViewConfig::MIN_DEPTH as f32, ViewConfig::MAX_DEPTH as f32),
            0.5,
        );
        if changed && let Err(error) = self.session.set_max_depth(depth.round() as usize) {
            self.status = Some(error.to_string());
        }

        ui.horizontal_wrapped(|ui| {
            if ui
                .add_enabled(self.session.root().is_some(), egui::Button::new("Show all"))
                .clicked()
            {
                self.session.clear_root();
            }
            if ui
                .button("Add entity")
                .on_hover_text("Click on the map to place a new entity.")
                .clicked()
            {
                self.session.arm_placing();
            }
            if !matches!(self.session.interaction().mode(), Mode::Idle)
                && ui.button("Cancel").clicked()
            {
                self.session.cancel_interaction();
            }
        });

        let mut locked = self.session.is_globally_locked();
        if ui
            .checkbox(&mut locked, "Lock all positions")
            .on_hover_text("Freeze the layout; new entities are locked as well.")
            .changed()
        {
            self.session.set_global_lock(locked);
        }

        egui::ComboBox::from_label("New link type")
            .selected_text(self.link_kind.label())
            .show_ui(ui, |ui| {
                for kind in RelationKind::ALL {
                    ui.selectable_value(&mut self.link_kind, kind, kind.label());
                }
            });

        match self.session.interaction().mode() {
            Mode::PlacingNode => {
                ui.small("Click an empty spot to place the entity.");
            }
            Mode::Connecting { source } => {
                let name = self
                    .session
                    .store()
                    .node(source)
                    .map(|node| node.entity().name.clone())
                    .unwrap_or_default();
                ui.small(format!("Click another entity to link it from {name}."));
            }
            Mode::Idle | Mode::Dragging { .. } => {}
        }
    }

    fn draw_timeline(&mut self, ui: &mut Ui) {
        let (min_year, target_year) = {
            let temporal = self.session.temporal();
            (temporal.min_year(), temporal.target_year())
        };

        ui.horizontal(|ui| {
            ui.label("Timeline");
            let playing = self.session.temporal().is_playing();
            if ui.button(if playing { "Pause" } else { "Play" }).clicked() {
                let temporal = self.session.temporal_mut();
                if playing {
                    temporal.pause();
                } else {
                    temporal.play();
                }
            }
            if ui
                .add_enabled(self.session.temporal().is_engaged(), egui::Button::new("Reset"))
                .clicked()
            {
                self.session.temporal_mut().reset();
            }
        });

        let mut year = self.session.temporal().current_year() as f32;
        let year_slider = ui
            .add_enabled(
                min_year < target_year,
                egui::Slider::new(&mut year, min_year as f32..=target_year as f32)
                    .step_by(1.0)
                    .text("Year"),
            )
            .on_hover_text("Entities appear as the timeline reaches them.");
        let mut changed = year_slider.changed();
        changed |= accelerate_slider_keys(
            ui,
            &year_slider,
            &mut year,
            (min_year as f32, target_year as f32),
            1.0,
        );
        if changed {
            self.session.temporal_mut().scrub(year.round() as i32);
        }
    }

    fn draw_physics(&mut self, ui: &mut Ui) {
        let mut enabled = self.session.is_physics_enabled();
        if ui
            .checkbox(&mut enabled, "Live physics simulation")
            .on_hover_text("Continuously settle the layout.")
            .changed()
        {
            self.session.set_physics_enabled(enabled);
        }

        let mut changed = false;
        let distance_slider = ui
            .add(
                egui::Slider::new(&mut self.link_distance, 40.0..=400.0)
                    .text("Link distance")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Rest length of relationship springs.");
        changed |= distance_slider.changed();
        changed |= accelerate_slider_keys(
            ui,
            &distance_slider,
            &mut self.link_distance,
            (40.0, 400.0),
            2.0,
        );

        let charge_slider = ui
            .add(
                egui::Slider::new(&mut self.charge_strength, -1500.0..=-50.0)
                    .text("Repulsion")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("How strongly entities push each other apart.");
        changed |= charge_slider.changed();
        changed |= accelerate_slider_keys(
            ui,
            &charge_slider,
            &mut self.charge_strength,
            (-1500.0, -50.0),
            10.0,
        );

        if changed {
            let mut config = self.session.config().simulation;
            config.link_distance = self.link_distance;
            config.charge_strength = self.charge_strength;
            if config != self.session.config().simulation {
                self.session.set_simulation_config(config);
            }
        }

        if let Some(simulation) = self.session.simulation() {
            ui.small(format!(
                "run {}: alpha {:.3}, {} ticks",
                simulation.generation(),
                simulation.alpha(),
                simulation.ticks()
            ));
        }
    }
}
