mod error;
mod frame;

use std::collections::{HashMap, HashSet};

use eframe::egui::{Vec2, vec2};

use crate::history::{
    Dataset, Entity, EntityDraft, EntityPatch, RelationKind, Relationship, SavedLayout, SavedNode,
};
use crate::util::{phyllotaxis, stable_pair};

use super::visual::depth_opacity;

pub use error::{GraphError, GraphResult};
pub use frame::SimulationFrame;

const SEED_SPACING: f32 = 60.0;

/// Observer of store mutations. Both callbacks receive the full collections
/// after the mutation has completed; `nodes_changed` always fires first.
pub trait StoreListener {
    fn nodes_changed(&mut self, _nodes: &[GraphNode]) {}
    fn links_changed(&mut self, _links: &[GraphLink]) {}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    entity: Entity,
    position: Vec2,
    velocity: Vec2,
    pin: Option<Vec2>,
    is_locked: bool,
    depth: usize,
    opacity: f32,
}

impl GraphNode {
    fn new(entity: Entity, position: Vec2) -> Self {
        Self {
            entity,
            position,
            velocity: Vec2::ZERO,
            pin: None,
            is_locked: false,
            depth: 0,
            opacity: 1.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.entity.id
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn year(&self) -> Option<i32> {
        self.entity.effective_year()
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// The fixed position (`fx`, `fy`), if the simulation must not move this node.
    pub fn pin(&self) -> Option<Vec2> {
        self.pin
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn to_saved(&self) -> SavedNode {
        SavedNode {
            entity: self.entity.clone(),
            x: self.position.x,
            y: self.position.y,
            fx: self.pin.map(|pin| pin.x),
            fy: self.pin.map(|pin| pin.y),
            is_locked: self.is_locked,
            depth: self.depth,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
    relationship: Relationship,
    depth: usize,
    opacity: f32,
}

impl GraphLink {
    fn new(relationship: Relationship) -> Self {
        Self {
            relationship,
            depth: 0,
            opacity: 1.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.relationship.id
    }

    pub fn source_id(&self) -> &str {
        &self.relationship.source_id
    }

    pub fn target_id(&self) -> &str {
        &self.relationship.target_id
    }

    pub fn relationship(&self) -> &Relationship {
        &self.relationship
    }

    pub fn kind(&self) -> RelationKind {
        self.relationship.kind
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }
}

/// Links and nodes dropped while ingesting an external dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub skipped_entities: usize,
    pub dropped_links: usize,
}

#[derive(Default)]
pub struct GraphStore {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    index_by_id: HashMap<String, usize>,
    issued_entity_ids: HashSet<String>,
    issued_link_ids: HashSet<String>,
    entity_serial: u64,
    link_serial: u64,
    default_position: Vec2,
    revision: u64,
    listeners: Vec<Box<dyn StoreListener>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Box<dyn StoreListener>) {
        self.listeners.push(listener);
    }

    /// Where nodes created without an explicit position are placed.
    pub fn set_default_position(&mut self, position: Vec2) {
        self.default_position = position;
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn link(&self, id: &str) -> Option<&GraphLink> {
        self.links.iter().find(|link| link.id() == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Bumped after every entity, link or lock mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn dated_years(&self) -> impl Iterator<Item = i32> + '_ {
        self.nodes.iter().filter_map(GraphNode::year)
    }

    pub fn incident_links<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphLink> + 'a {
        self.links
            .iter()
            .filter(move |link| link.relationship.touches(id))
    }

    pub fn seed(&mut self, dataset: Dataset) -> IngestReport {
        self.clear();
        let mut report = IngestReport::default();

        for entity in dataset.entities {
            let position = self.default_position + phyllotaxis(self.nodes.len(), SEED_SPACING);
            if let Err(error) = self.push_entity(entity, position) {
                tracing::warn!(%error, "skipping entity during ingestion");
                report.skipped_entities += 1;
            }
        }

        for relationship in dataset.relationships {
            if let Err(error) = self.push_relationship(relationship) {
                tracing::warn!(%error, "dropping relationship during ingestion");
                report.dropped_links += 1;
            }
        }

        self.changed();
        report
    }

    /// Replaces the graph with a previously saved, positioned layout. Only
    /// locks survive as pins; transient pins are not part of a saved layout.
    pub fn restore(&mut self, layout: SavedLayout) -> IngestReport {
        self.clear();
        let mut report = IngestReport::default();

        for saved in layout.nodes {
            let position = vec2(saved.x, saved.y);
            let is_locked = saved.is_locked;
            match self.push_entity(saved.entity, position) {
                Ok(index) if is_locked => {
                    let node = &mut self.nodes[index];
                    node.is_locked = true;
                    node.pin = Some(node.position);
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%error, "skipping node during layout restore");
                    report.skipped_entities += 1;
                }
            }
        }

        for relationship in layout.links {
            if let Err(error) = self.push_relationship(relationship) {
                tracing::warn!(%error, "dropping link during layout restore");
                report.dropped_links += 1;
            }
        }

        self.changed();
        report
    }

    pub fn to_layout(&self) -> SavedLayout {
        SavedLayout {
            nodes: self.nodes.iter().map(GraphNode::to_saved).collect(),
            links: self
                .links
                .iter()
                .map(|link| link.relationship.clone())
                .collect(),
        }
    }

    pub fn create_node(&mut self, draft: EntityDraft, at: Option<Vec2>) -> GraphResult<GraphNode> {
        validate_name(&draft.name)?;
        let id = self.fresh_entity_id();
        let position = at.unwrap_or_else(|| self.spawn_point(&id));
        self.insert_entity(draft.into_entity(id), Some(position))
    }

    /// Inserts an entity whose id was assigned elsewhere (for example by a
    /// persistence backend).
    pub fn insert_entity(&mut self, entity: Entity, at: Option<Vec2>) -> GraphResult<GraphNode> {
        let position = at.unwrap_or_else(|| self.spawn_point(&entity.id));
        let index = self.push_entity(entity, position)?;
        let node = self.nodes[index].clone();
        self.changed();
        Ok(node)
    }

    pub fn update_node(&mut self, id: &str, patch: &EntityPatch) -> GraphResult<GraphNode> {
        let index = *self
            .index_by_id
            .get(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;

        let mut entity = self.nodes[index].entity.clone();
        patch.apply(&mut entity);
        validate_name(&entity.name)?;

        self.nodes[index].entity = entity;
        let node = self.nodes[index].clone();
        self.changed();
        Ok(node)
    }

    /// Removes the node and every incident link. Deleting an absent id is a
    /// no-op and returns `false`.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let Some(index) = self.index_by_id.get(id).copied() else {
            return false;
        };

        self.nodes.remove(index);
        self.links.retain(|link| !link.relationship.touches(id));
        self.reindex();
        self.changed();
        true
    }

    pub fn create_link(
        &mut self,
        source_id: &str,
        target_id: &str,
        kind: RelationKind,
        description: &str,
    ) -> GraphResult<GraphLink> {
        self.validate_endpoints(source_id, target_id)?;
        let id = self.fresh_link_id();
        self.insert_relationship(Relationship {
            id,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            description: description.trim().to_string(),
            kind,
        })
    }

    pub fn insert_relationship(&mut self, relationship: Relationship) -> GraphResult<GraphLink> {
        self.push_relationship(relationship)?;
        let link = self.links[self.links.len() - 1].clone();
        self.changed();
        Ok(link)
    }

    pub fn delete_link(&mut self, id: &str) -> bool {
        let before = self.links.len();
        self.links.retain(|link| link.id() != id);
        if self.links.len() == before {
            return false;
        }
        self.changed();
        true
    }

    /// Locks pin the node at its current position; unlocking releases the pin.
    pub fn set_locked(&mut self, id: &str, locked: bool) -> GraphResult<()> {
        let index = *self
            .index_by_id
            .get(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        lock_node(&mut self.nodes[index], locked);
        self.changed();
        Ok(())
    }

    pub fn set_all_locked(&mut self, locked: bool) {
        for node in &mut self.nodes {
            lock_node(node, locked);
        }
        self.changed();
    }

    /// Fixes the node at `at`. Locked nodes move with their pin.
    pub fn pin(&mut self, id: &str, at: Vec2) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        node.pin = Some(at);
        node.position = at;
        node.velocity = Vec2::ZERO;
        true
    }

    /// Releases a transient pin. A locked node keeps its pin.
    pub fn unpin(&mut self, id: &str) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        if node.is_locked {
            return false;
        }
        node.pin = None;
        true
    }

    /// Writes depth and the depth-derived base opacity for every node, and the
    /// minimum endpoint depth for every link.
    pub fn apply_depths(&mut self, depth_of: impl Fn(&str) -> Option<usize>) {
        for node in &mut self.nodes {
            node.depth = depth_of(node.id()).unwrap_or(0);
            node.opacity = depth_opacity(node.depth);
        }

        for link in &mut self.links {
            let source = self
                .index_by_id
                .get(link.source_id())
                .map(|&index| self.nodes[index].depth);
            let target = self
                .index_by_id
                .get(link.target_id())
                .map(|&index| self.nodes[index].depth);
            link.depth = source.unwrap_or(0).min(target.unwrap_or(0));
            link.opacity = depth_opacity(link.depth);
        }
    }

    pub fn simulation_frame(&mut self, is_active: impl Fn(&str) -> bool) -> SimulationFrame<'_> {
        SimulationFrame::new(&mut self.nodes, &self.links, is_active)
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.index_by_id.clear();
    }

    fn push_entity(&mut self, mut entity: Entity, position: Vec2) -> GraphResult<usize> {
        entity.normalize();
        if entity.id.trim().is_empty() {
            return Err(GraphError::Validation("entity id must not be empty".into()));
        }
        validate_name(&entity.name)?;
        if self.index_by_id.contains_key(&entity.id) {
            return Err(GraphError::Validation(format!(
                "duplicate entity id {}",
                entity.id
            )));
        }

        let index = self.nodes.len();
        self.issued_entity_ids.insert(entity.id.clone());
        self.index_by_id.insert(entity.id.clone(), index);
        self.nodes.push(GraphNode::new(entity, position));
        Ok(index)
    }

    fn push_relationship(&mut self, mut relationship: Relationship) -> GraphResult<()> {
        self.validate_endpoints(&relationship.source_id, &relationship.target_id)?;
        if relationship.id.trim().is_empty() {
            relationship.id = self.fresh_link_id();
        }
        if self.links.iter().any(|link| link.id() == relationship.id) {
            return Err(GraphError::Validation(format!(
                "duplicate relationship id {}",
                relationship.id
            )));
        }

        self.issued_link_ids.insert(relationship.id.clone());
        self.links.push(GraphLink::new(relationship));
        Ok(())
    }

    fn validate_endpoints(&self, source_id: &str, target_id: &str) -> GraphResult<()> {
        if source_id == target_id {
            return Err(GraphError::Validation(format!(
                "an entity cannot be related to itself ({source_id})"
            )));
        }
        for endpoint in [source_id, target_id] {
            if !self.index_by_id.contains_key(endpoint) {
                return Err(GraphError::Validation(format!(
                    "relationship endpoint {endpoint} does not exist"
                )));
            }
        }
        Ok(())
    }

    fn fresh_entity_id(&mut self) -> String {
        loop {
            self.entity_serial += 1;
            let id = format!("entity-{}", self.entity_serial);
            if !self.issued_entity_ids.contains(&id) {
                return id;
            }
        }
    }

    fn fresh_link_id(&mut self) -> String {
        loop {
            self.link_serial += 1;
            let id = format!("rel-{}", self.link_serial);
            if !self.issued_link_ids.contains(&id) {
                return id;
            }
        }
    }

    fn spawn_point(&self, id: &str) -> Vec2 {
        let (jx, jy) = stable_pair(id);
        self.default_position + vec2(jx, jy) * 4.0
    }

    fn reindex(&mut self) {
        self.index_by_id.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            self.index_by_id.insert(node.id().to_string(), index);
        }
    }

    fn changed(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        for listener in self.listeners.iter_mut() {
            listener.nodes_changed(&self.nodes);
            listener.links_changed(&self.links);
        }
    }
}

fn lock_node(node: &mut GraphNode, locked: bool) {
    node.is_locked = locked;
    if locked {
        node.pin = Some(node.position);
        node.velocity = Vec2::ZERO;
    } else {
        node.pin = None;
    }
}

pub fn validate_name(name: &str) -> GraphResult<()> {
    if name.trim().is_empty() {
        Err(GraphError::Validation("entity name must not be empty".into()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
impl GraphNode {
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::history::EntityKind;

    fn draft(name: &str) -> EntityDraft {
        EntityDraft::named(name, EntityKind::Person)
    }

    fn store_with(names: &[&str]) -> (GraphStore, Vec<String>) {
        let mut store = GraphStore::new();
        let ids = names
            .iter()
            .map(|name| {
                store
                    .create_node(draft(name), None)
                    .expect("node created")
                    .id()
                    .to_string()
            })
            .collect();
        (store, ids)
    }

    fn lock_invariant_holds(store: &GraphStore) -> bool {
        store
            .nodes()
            .iter()
            .all(|node| !node.is_locked() || node.pin() == Some(node.position()))
    }

    fn no_dangling_links(store: &GraphStore) -> bool {
        store
            .links()
            .iter()
            .all(|link| store.contains_node(link.source_id()) && store.contains_node(link.target_id()))
    }

    #[test]
    fn create_node_rejects_empty_name() {
        let mut store = GraphStore::new();
        let error = store.create_node(draft("   "), None).expect_err("rejected");
        assert!(matches!(error, GraphError::Validation(_)));
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn created_ids_are_never_reused() {
        let (mut store, ids) = store_with(&["A", "B"]);
        assert!(store.delete_node(&ids[1]));
        let next = store.create_node(draft("C"), None).expect("created");
        assert!(!ids.contains(&next.id().to_string()));
    }

    #[test]
    fn created_node_lands_near_default_position() {
        let mut store = GraphStore::new();
        store.set_default_position(vec2(300.0, -120.0));
        let node = store.create_node(draft("A"), None).expect("created");
        assert!((node.position() - vec2(300.0, -120.0)).length() <= 6.0);

        let placed = store
            .create_node(draft("B"), Some(vec2(5.0, 5.0)))
            .expect("created");
        assert_eq!(placed.position(), vec2(5.0, 5.0));
    }

    #[test]
    fn update_missing_node_is_not_found() {
        let mut store = GraphStore::new();
        let error = store
            .update_node("ghost", &EntityPatch::default())
            .expect_err("missing");
        assert_eq!(error, GraphError::NotFound("ghost".into()));
    }

    #[test]
    fn update_that_empties_name_changes_nothing() {
        let (mut store, ids) = store_with(&["Luther"]);
        let patch = EntityPatch {
            name: Some(String::new()),
            description: Some("reformer".into()),
            ..EntityPatch::default()
        };
        assert!(store.update_node(&ids[0], &patch).is_err());
        let entity = store.node(&ids[0]).expect("exists").entity();
        assert_eq!(entity.name, "Luther");
        assert!(entity.description.is_empty());
    }

    #[test]
    fn self_loop_is_rejected_without_side_effects() {
        let (mut store, ids) = store_with(&["A"]);
        let revision = store.revision();
        let error = store
            .create_link(&ids[0], &ids[0], RelationKind::Custom, "")
            .expect_err("self loop");
        assert!(matches!(error, GraphError::Validation(_)));
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.link_count(), 0);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn link_to_missing_endpoint_is_rejected() {
        let (mut store, ids) = store_with(&["A"]);
        assert!(store
            .create_link(&ids[0], "ghost", RelationKind::Influenced, "")
            .is_err());
    }

    #[test]
    fn deleting_node_removes_incident_links_and_is_idempotent() {
        let (mut store, ids) = store_with(&["A", "B", "C"]);
        store
            .create_link(&ids[0], &ids[1], RelationKind::Influenced, "")
            .expect("link");
        store
            .create_link(&ids[2], &ids[0], RelationKind::Created, "")
            .expect("link");
        store
            .create_link(&ids[1], &ids[2], RelationKind::Documented, "")
            .expect("link");

        assert!(store.delete_node(&ids[0]));
        assert_eq!(store.link_count(), 1);
        assert!(store.links().iter().all(|link| !link.relationship().touches(&ids[0])));

        let revision = store.revision();
        assert!(!store.delete_node(&ids[0]));
        assert_eq!(store.revision(), revision);
        assert!(no_dangling_links(&store));
    }

    #[test]
    fn delete_link_is_idempotent() {
        let (mut store, ids) = store_with(&["A", "B"]);
        let link = store
            .create_link(&ids[0], &ids[1], RelationKind::Custom, "")
            .expect("link");
        assert!(store.delete_link(link.id()));
        assert!(!store.delete_link(link.id()));
    }

    #[test]
    fn lock_sets_and_clears_pin_together() {
        let (mut store, ids) = store_with(&["A"]);
        store.set_locked(&ids[0], true).expect("lock");
        let node = store.node(&ids[0]).expect("exists");
        assert!(node.is_locked());
        assert_eq!(node.pin(), Some(node.position()));

        assert!(!store.unpin(&ids[0]));
        assert!(store.node(&ids[0]).expect("exists").is_pinned());

        store.set_locked(&ids[0], false).expect("unlock");
        let node = store.node(&ids[0]).expect("exists");
        assert!(!node.is_locked());
        assert_eq!(node.pin(), None);
    }

    #[test]
    fn seeding_drops_dangling_relationships() {
        let mut store = GraphStore::new();
        let dataset: Dataset = serde_json::from_str(
            r#"{
                "entities": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}, {"id": "a", "name": "dup"}],
                "relationships": [
                    {"id": "r1", "sourceId": "a", "targetId": "b"},
                    {"id": "r2", "sourceId": "a", "targetId": "missing"},
                    {"id": "r3", "sourceId": "b", "targetId": "b"}
                ]
            }"#,
        )
        .expect("dataset");

        let report = store.seed(dataset);
        assert_eq!(report.skipped_entities, 1);
        assert_eq!(report.dropped_links, 2);
        assert_eq!(store.link_count(), 1);
        assert!(no_dangling_links(&store));
    }

    #[test]
    fn restore_keeps_locks_pinned_at_saved_position() {
        let (mut store, ids) = store_with(&["A", "B"]);
        store.pin(&ids[0], vec2(40.0, 40.0));
        store.set_locked(&ids[0], true).expect("lock");
        store.pin(&ids[1], vec2(-10.0, 0.0));

        let layout = store.to_layout();
        let mut restored = GraphStore::new();
        restored.restore(layout);

        let locked = restored.node(&ids[0]).expect("restored");
        assert!(locked.is_locked());
        assert_eq!(locked.pin(), Some(vec2(40.0, 40.0)));
        let free = restored.node(&ids[1]).expect("restored");
        assert_eq!(free.position(), vec2(-10.0, 0.0));
        assert_eq!(free.pin(), None);
    }

    #[test]
    fn listeners_receive_full_collections() {
        #[derive(Default)]
        struct Counts {
            nodes: Vec<usize>,
            links: Vec<usize>,
        }
        struct Recorder(Rc<RefCell<Counts>>);
        impl StoreListener for Recorder {
            fn nodes_changed(&mut self, nodes: &[GraphNode]) {
                self.0.borrow_mut().nodes.push(nodes.len());
            }
            fn links_changed(&mut self, links: &[GraphLink]) {
                self.0.borrow_mut().links.push(links.len());
            }
        }

        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut store = GraphStore::new();
        store.add_listener(Box::new(Recorder(Rc::clone(&counts))));

        let a = store.create_node(draft("A"), None).expect("a");
        let b = store.create_node(draft("B"), None).expect("b");
        store
            .create_link(a.id(), b.id(), RelationKind::Custom, "")
            .expect("link");
        store.delete_node(a.id());

        let counts = counts.borrow();
        assert_eq!(counts.nodes, vec![1, 2, 2, 1]);
        assert_eq!(counts.links, vec![0, 0, 1, 0]);
    }

    #[test]
    fn frame_skips_links_leaving_the_active_set() {
        let (mut store, ids) = store_with(&["A", "B", "C"]);
        store
            .create_link(&ids[0], &ids[1], RelationKind::Custom, "")
            .expect("link");
        store
            .create_link(&ids[1], &ids[2], RelationKind::Custom, "")
            .expect("link");

        let active = [ids[0].clone(), ids[1].clone()];
        let frame = store.simulation_frame(|id| active.iter().any(|a| a == id));
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.edges(), &[(0, 1)]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Create,
        Delete(usize),
        Link(usize, usize),
        Lock(usize, bool),
        LockAll(bool),
        Pin(usize, f32, f32),
        Unpin(usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Create),
            (0usize..8).prop_map(Op::Delete),
            (0usize..8, 0usize..8).prop_map(|(a, b)| Op::Link(a, b)),
            (0usize..8, any::<bool>()).prop_map(|(a, locked)| Op::Lock(a, locked)),
            any::<bool>().prop_map(Op::LockAll),
            (0usize..8, -500.0f32..500.0, -500.0f32..500.0).prop_map(|(a, x, y)| Op::Pin(a, x, y)),
            (0usize..8).prop_map(Op::Unpin),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn lock_invariant_and_link_integrity_survive_any_sequence(
            ops in prop::collection::vec(arb_op(), 1..60)
        ) {
            let mut store = GraphStore::new();
            for op in ops {
                let ids = store.nodes().iter().map(|node| node.id().to_string()).collect::<Vec<_>>();
                let pick = |index: usize| ids.get(index % ids.len().max(1)).cloned();
                match op {
                    Op::Create => {
                        store.create_node(draft("n"), None).expect("valid draft");
                    }
                    Op::Delete(index) => {
                        if let Some(id) = pick(index) {
                            store.delete_node(&id);
                        }
                    }
                    Op::Link(a, b) => {
                        if let (Some(a), Some(b)) = (pick(a), pick(b)) {
                            let result = store.create_link(&a, &b, RelationKind::Custom, "");
                            prop_assert_eq!(result.is_err(), a == b);
                        }
                    }
                    Op::Lock(index, locked) => {
                        if let Some(id) = pick(index) {
                            store.set_locked(&id, locked).expect("exists");
                        }
                    }
                    Op::LockAll(locked) => store.set_all_locked(locked),
                    Op::Pin(index, x, y) => {
                        if let Some(id) = pick(index) {
                            store.pin(&id, vec2(x, y));
                        }
                    }
                    Op::Unpin(index) => {
                        if let Some(id) = pick(index) {
                            store.unpin(&id);
                        }
                    }
                }
                prop_assert!(lock_invariant_holds(&store));
                prop_assert!(no_dangling_links(&store));
            }
        }
    }
}
