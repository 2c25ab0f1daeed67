use eframe::egui::Vec2;

use crate::config::{SessionConfig, SimulationConfig, ViewConfig};
use crate::history::{
    Entity, EntityDraft, EntityPatch, Ingest, RelationKind, RelationshipDraft,
};

use super::expand::{Neighborhood, Subgraph, degrees_between, expand};
use super::interaction::{InteractionController, PointerEvent, SessionEvent};
use super::persist::PersistenceHooks;
use super::physics::Simulation;
use super::store::{
    GraphError, GraphLink, GraphNode, GraphResult, GraphStore, IngestReport, StoreListener,
    validate_name,
};
use super::temporal::TemporalReveal;

/// Which periodic processes did work during a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameActivity {
    pub simulating: bool,
    pub revealing: bool,
}

impl FrameActivity {
    pub fn any(self) -> bool {
        self.simulating || self.revealing
    }
}

/// One open map: the store and everything derived from it.
///
/// All edits go through here so that the neighborhood, depths, temporal range
/// and simulation heat are brought up to date before the next frame.
pub struct GraphSession {
    store: GraphStore,
    config: SessionConfig,
    root: Option<String>,
    max_depth: usize,
    neighborhood: Neighborhood,
    simulation: Option<Simulation>,
    generation: u64,
    physics_enabled: bool,
    temporal: TemporalReveal,
    interaction: InteractionController,
    hooks: Option<Box<dyn PersistenceHooks>>,
}

impl GraphSession {
    pub fn new(config: SessionConfig) -> Self {
        let store = GraphStore::new();
        let neighborhood = Neighborhood::everything(&store);
        Self {
            temporal: TemporalReveal::new(std::iter::empty(), &config.view),
            max_depth: config.view.default_max_depth,
            store,
            config,
            root: None,
            neighborhood,
            simulation: None,
            generation: 0,
            physics_enabled: true,
            interaction: InteractionController::new(),
            hooks: None,
        }
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn PersistenceHooks>) {
        self.hooks = Some(hooks);
    }

    pub fn add_listener(&mut self, listener: Box<dyn StoreListener>) {
        self.store.add_listener(listener);
    }

    /// Where nodes created without a position appear, usually the centre of
    /// the visible area.
    pub fn set_spawn_point(&mut self, position: Vec2) {
        self.store.set_default_position(position);
    }

    /// Replaces the whole graph and starts a fresh simulation.
    pub fn load(&mut self, ingest: Ingest) -> IngestReport {
        let report = match ingest {
            Ingest::Dataset(dataset) => self.store.seed(dataset),
            Ingest::Layout(layout) => self.store.restore(layout),
        };

        self.root = None;
        self.interaction = InteractionController::new();
        self.temporal = TemporalReveal::new(self.store.dated_years(), &self.config.view);
        self.rebuild();

        tracing::info!(
            nodes = self.store.node_count(),
            links = self.store.link_count(),
            skipped = report.skipped_entities,
            dropped = report.dropped_links,
            "graph loaded"
        );
        report
    }

    /// Makes `id` the expansion root and selects it.
    pub fn focus(&mut self, id: &str) -> GraphResult<Entity> {
        if !self.store.contains_node(id) {
            return Err(GraphError::NotFound(id.to_string()));
        }
        self.root = Some(id.to_string());
        self.rebuild();
        self.interaction
            .select(id, &mut self.store)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }

    pub fn clear_root(&mut self) {
        if self.root.take().is_some() {
            self.rebuild();
        }
    }

    pub fn set_max_depth(&mut self, max_depth: usize) -> GraphResult<()> {
        if !(ViewConfig::MIN_DEPTH..=ViewConfig::MAX_DEPTH).contains(&max_depth) {
            return Err(GraphError::Validation(format!(
                "depth must be between {} and {}, got {max_depth}",
                ViewConfig::MIN_DEPTH,
                ViewConfig::MAX_DEPTH
            )));
        }
        if self.max_depth != max_depth {
            self.max_depth = max_depth;
            if self.root.is_some() {
                self.rebuild();
            }
        }
        Ok(())
    }

    pub fn create_node(&mut self, draft: EntityDraft, at: Option<Vec2>) -> GraphResult<String> {
        validate_name(&draft.name)?;

        let node = match self.hooks.as_mut() {
            Some(hooks) => {
                let entity = hooks
                    .on_node_create(&draft)
                    .ok_or_else(|| GraphError::Rejected(format!("create {}", draft.name)))?;
                self.store.insert_entity(entity, at)?
            }
            None => self.store.create_node(draft, at)?,
        };

        let id = node.id().to_string();
        if self.interaction.is_globally_locked() {
            self.store.set_locked(&id, true)?;
        }
        self.neighborhood.admit(&id, 0);
        self.after_edit(true);
        Ok(id)
    }

    pub fn update_node(&mut self, id: &str, patch: &EntityPatch) -> GraphResult<GraphNode> {
        let mut patched = self
            .store
            .node(id)
            .map(|node| node.entity().clone())
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        patch.apply(&mut patched);
        validate_name(&patched.name)?;

        let node = match self.hooks.as_mut() {
            Some(hooks) => {
                let entity = hooks
                    .on_node_update(id, patch)
                    .ok_or_else(|| GraphError::Rejected(format!("update {id}")))?;
                let canonical = EntityPatch::replace_with(EntityDraft::from_entity(&entity));
                self.store.update_node(id, &canonical)?
            }
            None => self.store.update_node(id, patch)?,
        };

        self.after_edit(false);
        Ok(node)
    }

    /// Removes a node and its links. Deleting an unknown id does nothing.
    pub fn delete_node(&mut self, id: &str) -> GraphResult<bool> {
        if !self.store.contains_node(id) {
            return Ok(false);
        }
        if let Some(hooks) = self.hooks.as_mut()
            && !hooks.on_node_delete(id)
        {
            return Err(GraphError::Rejected(format!("delete {id}")));
        }

        self.store.delete_node(id);
        self.interaction.forget(id);
        if self.root.as_deref() == Some(id) {
            self.root = None;
            self.rebuild();
        } else {
            self.after_edit(true);
        }
        Ok(true)
    }

    pub fn create_link(
        &mut self,
        source_id: &str,
        target_id: &str,
        kind: RelationKind,
        description: &str,
    ) -> GraphResult<GraphLink> {
        let link = match self.hooks.as_mut() {
            Some(hooks) => {
                if source_id == target_id {
                    return Err(GraphError::Validation(format!(
                        "an entity cannot be related to itself ({source_id})"
                    )));
                }
                for endpoint in [source_id, target_id] {
                    if !self.store.contains_node(endpoint) {
                        return Err(GraphError::Validation(format!(
                            "relationship endpoint {endpoint} does not exist"
                        )));
                    }
                }
                let draft = RelationshipDraft {
                    source_id: source_id.to_string(),
                    target_id: target_id.to_string(),
                    kind,
                    description: description.to_string(),
                };
                let relationship = hooks
                    .on_link_create(&draft)
                    .ok_or_else(|| GraphError::Rejected(format!("link {source_id} to {target_id}")))?;
                self.store.insert_relationship(relationship)?
            }
            None => self.store.create_link(source_id, target_id, kind, description)?,
        };

        self.after_edit(true);
        Ok(link)
    }

    pub fn delete_link(&mut self, id: &str) -> GraphResult<bool> {
        if self.store.link(id).is_none() {
            return Ok(false);
        }
        if let Some(hooks) = self.hooks.as_mut()
            && !hooks.on_link_delete(id)
        {
            return Err(GraphError::Rejected(format!("delete {id}")));
        }

        self.store.delete_link(id);
        self.after_edit(true);
        Ok(true)
    }

    /// Flips the lock of one node and returns the new state. Unlocking lets the
    /// layout settle again.
    pub fn toggle_lock(&mut self, id: &str) -> GraphResult<bool> {
        let locked = !self
            .store
            .node(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?
            .is_locked();
        self.store.set_locked(id, locked)?;
        if !locked {
            self.reheat(self.config.simulation.edit_alpha);
        }
        Ok(locked)
    }

    pub fn set_global_lock(&mut self, locked: bool) {
        self.interaction.set_global_lock(
            locked,
            &mut self.store,
            self.simulation.as_mut(),
            &self.config.simulation,
        );
        if !self.physics_enabled
            && let Some(simulation) = self.simulation.as_mut()
        {
            simulation.stop();
        }
        tracing::debug!(locked, "global lock changed");
    }

    pub fn set_physics_enabled(&mut self, enabled: bool) {
        self.physics_enabled = enabled;
        if enabled {
            self.reheat(self.config.simulation.edit_alpha);
        } else if let Some(simulation) = self.simulation.as_mut() {
            simulation.stop();
        }
    }

    /// Retunes the running simulation and lets it settle into the new layout.
    pub fn set_simulation_config(&mut self, config: SimulationConfig) {
        self.config.simulation = config;
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.set_config(config);
        }
        self.reheat(config.edit_alpha);
    }

    pub fn pointer(&mut self, event: PointerEvent) -> Option<SessionEvent> {
        let simulation = self.simulation.as_mut().filter(|_| self.physics_enabled);
        self.interaction
            .handle(event, &mut self.store, simulation, &self.config.simulation)
    }

    pub fn arm_placing(&mut self) {
        self.interaction.arm_placing();
    }

    pub fn arm_connecting(&mut self, source: &str) {
        if self.store.contains_node(source) {
            self.interaction.arm_connecting(source);
        }
    }

    pub fn cancel_interaction(&mut self) {
        self.interaction.cancel();
    }

    /// Runs one simulation tick and one temporal step, each only if active.
    pub fn advance_frame(&mut self) -> FrameActivity {
        let neighborhood = &self.neighborhood;
        let simulating = match self.simulation.as_mut() {
            Some(simulation) if simulation.is_running() => {
                let mut frame = self.store.simulation_frame(|id| neighborhood.contains(id));
                simulation.tick(&mut frame);
                true
            }
            _ => false,
        };
        let revealing = self.temporal.advance();

        FrameActivity {
            simulating,
            revealing,
        }
    }

    /// Stops both periodic processes; nothing runs after this until the next
    /// load or focus.
    pub fn teardown(&mut self) {
        if let Some(mut simulation) = self.simulation.take() {
            simulation.stop();
        }
        self.temporal.pause();
        tracing::debug!(generation = self.generation, "session torn down");
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn is_physics_enabled(&self) -> bool {
        self.physics_enabled
    }

    pub fn temporal(&self) -> &TemporalReveal {
        &self.temporal
    }

    pub fn temporal_mut(&mut self) -> &mut TemporalReveal {
        &mut self.temporal
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn is_globally_locked(&self) -> bool {
        self.interaction.is_globally_locked()
    }

    /// Degrees of separation between the root and `id`, if both are known and
    /// connected within the deepest expansion.
    pub fn degrees_from_root(&self, id: &str) -> Option<usize> {
        let root = self.root.as_deref()?;
        degrees_between(&self.store, root, id, ViewConfig::MAX_DEPTH)
    }

    /// The nodes and links taking part in the current view, with depths.
    pub fn active_view(&self) -> Subgraph<'_> {
        self.neighborhood.subgraph(&self.store)
    }

    /// Whether the temporal reveal has reached both ends of `link`.
    pub fn is_link_revealed(&self, link: &GraphLink) -> bool {
        [link.source_id(), link.target_id()].into_iter().all(|id| {
            self.temporal
                .is_revealed(self.store.node(id).and_then(GraphNode::year))
        })
    }

    pub fn node_visibility(&self, node: &GraphNode) -> f32 {
        self.temporal.node_visibility(node.year())
    }

    pub fn link_visibility(&self, link: &GraphLink) -> f32 {
        let year_of = |id: &str| self.store.node(id).and_then(GraphNode::year);
        self.temporal
            .link_visibility(year_of(link.source_id()), year_of(link.target_id()))
    }

    /// Recomputes the neighborhood from scratch and restarts the simulation.
    fn rebuild(&mut self) {
        self.neighborhood = match self.root.as_deref() {
            Some(root) => expand(&self.store, root, self.max_depth),
            None => Neighborhood::everything(&self.store),
        };
        self.apply_depths();
        self.restart_simulation();
    }

    fn restart_simulation(&mut self) {
        if let Some(previous) = self.simulation.as_mut() {
            previous.stop();
        }

        self.generation += 1;
        let mut simulation = Simulation::start(self.config.simulation, self.generation);
        if !self.physics_enabled || self.interaction.is_globally_locked() {
            simulation.stop();
        }
        self.simulation = Some(simulation);
    }

    fn after_edit(&mut self, structural: bool) {
        self.neighborhood.retain_existing(&self.store);
        self.apply_depths();
        self.temporal.recalibrate(self.store.dated_years());
        if structural {
            self.reheat(self.config.simulation.edit_alpha);
        }
    }

    fn apply_depths(&mut self) {
        let neighborhood = &self.neighborhood;
        self.store.apply_depths(|id| neighborhood.depth_of(id));
    }

    fn reheat(&mut self, alpha: f32) {
        if !self.physics_enabled || self.interaction.is_globally_locked() {
            return;
        }
        match self.simulation.as_mut() {
            Some(simulation) => simulation.reheat(alpha),
            None => self.restart_simulation(),
        }
    }
}
