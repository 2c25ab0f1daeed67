use std::collections::BTreeSet;

use eframe::egui::Vec2;

use crate::config::SimulationConfig;
use crate::history::Entity;

use super::physics::Simulation;
use super::store::GraphStore;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    /// The next background click opens the creation form there.
    PlacingNode,
    /// The next click on another node links it to `source`.
    Connecting { source: String },
    Dragging {
        node: String,
        connecting_from: Option<String>,
    },
}

/// Pointer input already resolved against the graph: which node, or which
/// world position on the background.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    DragStart { node: String },
    DragMove { to: Vec2 },
    DragEnd,
    ClickNode { node: String },
    ClickBackground { at: Vec2 },
    Hover(Option<String>),
}

/// What the surrounding view has to act on after an event.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Selected(Entity),
    OpenCreateForm { at: Vec2 },
    CreateLink { source: String, target: String },
    ConnectionCancelled,
}

/// Turns pointer gestures into store pin changes and simulation heat.
///
/// Selection and drags place "soft" pins on unlocked nodes. The controller
/// remembers which pins it placed so it can release them without touching
/// nodes the user locked.
#[derive(Debug, Default)]
pub struct InteractionController {
    mode: Mode,
    hovered: Option<String>,
    selected: Option<String>,
    soft_pins: BTreeSet<String>,
    global_lock: bool,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_globally_locked(&self) -> bool {
        self.global_lock
    }

    pub fn arm_placing(&mut self) {
        self.mode = Mode::PlacingNode;
    }

    pub fn arm_connecting(&mut self, source: &str) {
        self.mode = Mode::Connecting {
            source: source.to_string(),
        };
    }

    pub fn cancel(&mut self) {
        if !matches!(self.mode, Mode::Dragging { .. }) {
            self.mode = Mode::Idle;
        }
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        store: &mut GraphStore,
        simulation: Option<&mut Simulation>,
        config: &SimulationConfig,
    ) -> Option<SessionEvent> {
        match event {
            PointerEvent::Hover(node) => {
                self.hovered = node;
                None
            }
            PointerEvent::DragStart { node } => {
                self.drag_start(node, store, simulation, config);
                None
            }
            PointerEvent::DragMove { to } => {
                if let Mode::Dragging { node, .. } = &self.mode {
                    store.pin(node, to);
                }
                None
            }
            PointerEvent::DragEnd => {
                self.drag_end(store, simulation, config);
                None
            }
            PointerEvent::ClickNode { node } => self.click_node(node, store),
            PointerEvent::ClickBackground { at } => match std::mem::take(&mut self.mode) {
                Mode::PlacingNode => Some(SessionEvent::OpenCreateForm { at }),
                Mode::Connecting { .. } => Some(SessionEvent::ConnectionCancelled),
                other => {
                    self.mode = other;
                    None
                }
            },
        }
    }

    /// Selects `id`: it becomes the single soft-pinned node, held where it is.
    pub fn select(&mut self, id: &str, store: &mut GraphStore) -> Option<Entity> {
        let node = store.node(id)?;
        let entity = node.entity().clone();
        let position = node.position();

        for pinned in std::mem::take(&mut self.soft_pins) {
            if pinned != id {
                store.unpin(&pinned);
            }
        }
        if !store.node(id).is_some_and(|node| node.is_locked()) {
            store.pin(id, position);
            self.soft_pins.insert(id.to_string());
        }

        self.selected = Some(id.to_string());
        Some(entity)
    }

    /// Locks every node and stops the simulation, or releases all locks while
    /// keeping the selected node held.
    pub fn set_global_lock(
        &mut self,
        locked: bool,
        store: &mut GraphStore,
        simulation: Option<&mut Simulation>,
        config: &SimulationConfig,
    ) {
        self.global_lock = locked;
        store.set_all_locked(locked);
        self.soft_pins.clear();

        if locked {
            if let Some(simulation) = simulation {
                simulation.stop();
            }
            return;
        }

        if let Some(selected) = self.selected.clone() {
            self.select(&selected, store);
        }
        if let Some(simulation) = simulation {
            simulation.reheat(config.edit_alpha);
        }
    }

    /// Drops every reference to a node that no longer exists.
    pub fn forget(&mut self, id: &str) {
        self.soft_pins.remove(id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        let stale = match &self.mode {
            Mode::Connecting { source } => source == id,
            Mode::Dragging {
                node,
                connecting_from,
            } => node == id || connecting_from.as_deref() == Some(id),
            Mode::Idle | Mode::PlacingNode => false,
        };
        if stale {
            self.mode = Mode::Idle;
        }
    }

    fn drag_start(
        &mut self,
        node: String,
        store: &mut GraphStore,
        simulation: Option<&mut Simulation>,
        config: &SimulationConfig,
    ) {
        let Some(target) = store.node(&node) else {
            return;
        };
        let (position, is_locked) = (target.position(), target.is_locked());

        let connecting_from = match &self.mode {
            Mode::Connecting { source } => Some(source.clone()),
            Mode::Idle => None,
            Mode::PlacingNode | Mode::Dragging { .. } => return,
        };

        if !is_locked {
            store.pin(&node, position);
            self.soft_pins.insert(node.clone());
            if !self.global_lock
                && let Some(simulation) = simulation
            {
                simulation.reheat(config.drag_alpha);
            }
        }

        self.mode = Mode::Dragging {
            node,
            connecting_from,
        };
    }

    fn drag_end(
        &mut self,
        store: &mut GraphStore,
        simulation: Option<&mut Simulation>,
        config: &SimulationConfig,
    ) {
        let Mode::Dragging {
            node,
            connecting_from,
        } = std::mem::take(&mut self.mode)
        else {
            return;
        };

        let is_locked = store.node(&node).is_some_and(|target| target.is_locked());
        let keep_pinned = is_locked
            || self.global_lock
            || connecting_from.is_some()
            || self.selected.as_deref() == Some(node.as_str());
        if !keep_pinned {
            store.unpin(&node);
            self.soft_pins.remove(&node);
        }

        if !self.global_lock
            && let Some(simulation) = simulation
        {
            simulation.reheat(config.drag_alpha);
        }

        self.mode = match connecting_from {
            Some(source) => Mode::Connecting { source },
            None => Mode::Idle,
        };
    }

    fn click_node(&mut self, node: String, store: &mut GraphStore) -> Option<SessionEvent> {
        match &self.mode {
            Mode::Connecting { source } if *source == node => None,
            Mode::Connecting { source } => {
                let source = source.clone();
                self.mode = Mode::Idle;
                Some(SessionEvent::CreateLink {
                    source,
                    target: node,
                })
            }
            Mode::Idle => self.select(&node, store).map(SessionEvent::Selected),
            Mode::PlacingNode | Mode::Dragging { .. } => None,
        }
    }
}

#[cfg(test)]
impl InteractionController {
    pub fn soft_pins(&self) -> impl Iterator<Item = &str> {
        self.soft_pins.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::history::{EntityDraft, EntityKind};

    fn setup(count: usize) -> (GraphStore, Vec<String>) {
        let mut store = GraphStore::new();
        let ids = (0..count)
            .map(|index| {
                store
                    .create_node(
                        EntityDraft::named(format!("n{index}"), EntityKind::Event),
                        Some(vec2(index as f32 * 50.0, 0.0)),
                    )
                    .expect("node")
                    .id()
                    .to_string()
            })
            .collect();
        (store, ids)
    }

    fn send(
        controller: &mut InteractionController,
        store: &mut GraphStore,
        event: PointerEvent,
    ) -> Option<SessionEvent> {
        controller.handle(event, store, None, &SimulationConfig::default())
    }

    #[test]
    fn clicking_moves_the_single_soft_pin() {
        let (mut store, ids) = setup(3);
        let mut controller = InteractionController::new();
        store.set_locked(&ids[2], true).expect("lock");

        let outcome = send(&mut controller, &mut store, PointerEvent::ClickNode { node: ids[0].clone() });
        assert!(matches!(outcome, Some(SessionEvent::Selected(entity)) if entity.id == ids[0]));
        assert!(store.node(&ids[0]).expect("a").is_pinned());

        send(&mut controller, &mut store, PointerEvent::ClickNode { node: ids[1].clone() });
        assert!(!store.node(&ids[0]).expect("a").is_pinned());
        assert!(store.node(&ids[1]).expect("b").is_pinned());
        assert!(store.node(&ids[2]).expect("c").is_locked());
        assert!(store.node(&ids[2]).expect("c").is_pinned());
        assert_eq!(controller.soft_pins().collect::<Vec<_>>(), vec![ids[1].as_str()]);
    }

    #[test]
    fn drag_pins_then_releases() {
        let (mut store, ids) = setup(2);
        let mut controller = InteractionController::new();
        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        simulation.stop();
        let config = SimulationConfig::default();

        controller.handle(
            PointerEvent::DragStart { node: ids[1].clone() },
            &mut store,
            Some(&mut simulation),
            &config,
        );
        assert!(simulation.is_running());
        assert_eq!(simulation.alpha(), config.drag_alpha);

        send(&mut controller, &mut store, PointerEvent::DragMove { to: vec2(7.0, 9.0) });
        let node = store.node(&ids[1]).expect("node");
        assert_eq!(node.pin(), Some(vec2(7.0, 9.0)));
        assert_eq!(node.position(), vec2(7.0, 9.0));

        send(&mut controller, &mut store, PointerEvent::DragEnd);
        assert!(!store.node(&ids[1]).expect("node").is_pinned());
        assert_eq!(controller.mode(), &Mode::Idle);
    }

    #[test]
    fn dragging_the_selection_keeps_its_soft_pin() {
        let (mut store, ids) = setup(2);
        let mut controller = InteractionController::new();
        send(&mut controller, &mut store, PointerEvent::ClickNode { node: ids[0].clone() });

        send(&mut controller, &mut store, PointerEvent::DragStart { node: ids[0].clone() });
        send(&mut controller, &mut store, PointerEvent::DragMove { to: vec2(20.0, 30.0) });
        send(&mut controller, &mut store, PointerEvent::DragEnd);

        let node = store.node(&ids[0]).expect("node");
        assert!(!node.is_locked());
        assert_eq!(node.pin(), Some(vec2(20.0, 30.0)));
        assert_eq!(controller.soft_pins().collect::<Vec<_>>(), vec![ids[0].as_str()]);
    }

    #[test]
    fn dragged_locked_node_stays_locked() {
        let (mut store, ids) = setup(1);
        let mut controller = InteractionController::new();
        store.set_locked(&ids[0], true).expect("lock");

        send(&mut controller, &mut store, PointerEvent::DragStart { node: ids[0].clone() });
        send(&mut controller, &mut store, PointerEvent::DragMove { to: vec2(-3.0, 4.0) });
        send(&mut controller, &mut store, PointerEvent::DragEnd);

        let node = store.node(&ids[0]).expect("node");
        assert!(node.is_locked());
        assert_eq!(node.pin(), Some(node.position()));
        assert_eq!(node.position(), vec2(-3.0, 4.0));
    }

    #[test]
    fn connecting_links_to_a_different_node() {
        let (mut store, ids) = setup(2);
        let mut controller = InteractionController::new();
        controller.arm_connecting(&ids[0]);

        assert_eq!(
            send(&mut controller, &mut store, PointerEvent::ClickNode { node: ids[0].clone() }),
            None
        );
        let outcome = send(&mut controller, &mut store, PointerEvent::ClickNode { node: ids[1].clone() });
        assert_eq!(
            outcome,
            Some(SessionEvent::CreateLink {
                source: ids[0].clone(),
                target: ids[1].clone(),
            })
        );
        assert_eq!(controller.mode(), &Mode::Idle);
    }

    #[test]
    fn drag_during_connection_keeps_pin_and_returns_to_connecting() {
        let (mut store, ids) = setup(2);
        let mut controller = InteractionController::new();
        controller.arm_connecting(&ids[0]);

        send(&mut controller, &mut store, PointerEvent::DragStart { node: ids[1].clone() });
        send(&mut controller, &mut store, PointerEvent::DragEnd);

        assert!(store.node(&ids[1]).expect("node").is_pinned());
        assert_eq!(
            controller.mode(),
            &Mode::Connecting {
                source: ids[0].clone()
            }
        );
    }

    #[test]
    fn background_click_completes_placing_or_cancels_connection() {
        let (mut store, ids) = setup(1);
        let mut controller = InteractionController::new();

        controller.arm_placing();
        let outcome = send(&mut controller, &mut store, PointerEvent::ClickBackground { at: vec2(5.0, 5.0) });
        assert_eq!(outcome, Some(SessionEvent::OpenCreateForm { at: vec2(5.0, 5.0) }));
        assert_eq!(controller.mode(), &Mode::Idle);

        controller.arm_connecting(&ids[0]);
        let outcome = send(&mut controller, &mut store, PointerEvent::ClickBackground { at: Vec2::ZERO });
        assert_eq!(outcome, Some(SessionEvent::ConnectionCancelled));
        assert_eq!(controller.mode(), &Mode::Idle);

        assert_eq!(
            send(&mut controller, &mut store, PointerEvent::ClickBackground { at: Vec2::ZERO }),
            None
        );
    }

    #[test]
    fn global_lock_stops_and_unlock_keeps_selection_pinned() {
        let (mut store, ids) = setup(3);
        let mut controller = InteractionController::new();
        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        let config = SimulationConfig::default();
        send(&mut controller, &mut store, PointerEvent::ClickNode { node: ids[1].clone() });

        controller.set_global_lock(true, &mut store, Some(&mut simulation), &config);
        assert!(!simulation.is_running());
        assert!(store.nodes().iter().all(|node| node.is_locked() && node.is_pinned()));

        controller.set_global_lock(false, &mut store, Some(&mut simulation), &config);
        assert!(simulation.is_running());
        assert!(store.nodes().iter().all(|node| !node.is_locked()));
        assert!(store.node(&ids[1]).expect("selected").is_pinned());
        assert!(!store.node(&ids[0]).expect("other").is_pinned());
    }

    #[test]
    fn forgetting_a_node_clears_references() {
        let (mut store, ids) = setup(2);
        let mut controller = InteractionController::new();
        send(&mut controller, &mut store, PointerEvent::ClickNode { node: ids[0].clone() });
        send(&mut controller, &mut store, PointerEvent::Hover(Some(ids[0].clone())));
        controller.arm_connecting(&ids[0]);

        controller.forget(&ids[0]);
        assert_eq!(controller.selected(), None);
        assert_eq!(controller.hovered(), None);
        assert_eq!(controller.mode(), &Mode::Idle);
    }
}
