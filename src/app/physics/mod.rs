mod forces;
mod quadtree;

use eframe::egui::Vec2;

use crate::config::SimulationConfig;

use super::store::SimulationFrame;
use forces::{apply_center, apply_collisions, apply_links, apply_many_body};
use quadtree::QuadTree;

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radii: Vec<f32>,
    degrees: Vec<usize>,
}

impl PhysicsScratch {
    fn load(&mut self, frame: &SimulationFrame<'_>, collide_radius: f32) {
        let count = frame.len();
        self.positions.clear();
        self.velocities.clear();
        self.positions.extend((0..count).map(|index| frame.position(index)));
        self.velocities.extend((0..count).map(|index| frame.velocity(index)));
        self.radii.clear();
        self.radii.resize(count, collide_radius);
        self.degrees.clear();
        self.degrees.resize(count, 0);
        for &(source, target) in frame.edges() {
            self.degrees[source] += 1;
            self.degrees[target] += 1;
        }
    }
}

/// A cooling force simulation over the active nodes.
///
/// Each tick lowers `alpha` toward zero; forces are scaled by it, so motion
/// fades out and the simulation stops on its own once `alpha` falls below the
/// rest threshold. Pinned nodes are held in place. At most one simulation is
/// live per session; `generation` identifies which start it belongs to.
pub struct Simulation {
    config: SimulationConfig,
    alpha: f32,
    running: bool,
    generation: u64,
    ticks: u64,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub fn start(config: SimulationConfig, generation: u64) -> Self {
        tracing::debug!(generation, alpha = config.initial_alpha, "simulation started");
        Self {
            alpha: config.initial_alpha,
            running: config.initial_alpha > 0.0,
            config,
            generation,
            ticks: 0,
            scratch: PhysicsScratch::default(),
        }
    }

    /// Applies new tuning to the running instance.
    pub fn set_config(&mut self, config: SimulationConfig) {
        self.config = config;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Restarts cooling from `alpha`.
    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
        self.running = self.alpha > 0.0;
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!(generation = self.generation, ticks = self.ticks, "simulation stopped");
        }
        self.running = false;
        self.alpha = 0.0;
    }

    /// Advances one step. Returns whether any unpinned node moved.
    pub fn tick(&mut self, frame: &mut SimulationFrame<'_>) -> bool {
        if !self.running {
            return false;
        }

        self.alpha += -self.alpha * self.config.alpha_decay;
        self.ticks += 1;
        let moved = self.step(frame);

        if self.alpha < self.config.alpha_rest {
            self.alpha = 0.0;
            self.running = false;
            tracing::debug!(generation = self.generation, ticks = self.ticks, "simulation at rest");
        }

        moved
    }

    fn step(&mut self, frame: &mut SimulationFrame<'_>) -> bool {
        if frame.is_empty() {
            return false;
        }

        let config = self.config;
        let alpha = self.alpha;
        let scratch = &mut self.scratch;
        scratch.load(frame, config.collide_radius);

        apply_links(
            frame.edges(),
            &scratch.degrees,
            &scratch.positions,
            &mut scratch.velocities,
            config.link_distance,
            alpha,
        );
        if let Some(tree) = QuadTree::build(&scratch.positions) {
            apply_many_body(
                &tree,
                &scratch.positions,
                &mut scratch.velocities,
                config.charge_strength,
                config.barnes_hut_theta,
                alpha,
            );
        }
        apply_center(
            &scratch.positions,
            &mut scratch.velocities,
            config.center,
            config.center_strength,
            alpha,
        );
        apply_collisions(
            &scratch.positions,
            &mut scratch.velocities,
            &scratch.radii,
            config.collide_strength,
        );

        let retain = 1.0 - config.velocity_decay;
        let mut moved = false;
        for index in 0..frame.len() {
            if let Some(pin) = frame.pin(index) {
                frame.set_motion(index, pin, Vec2::ZERO);
                continue;
            }

            let previous = scratch.positions[index];
            let velocity = scratch.velocities[index] * retain;
            let position = previous + velocity;
            if !(position.x.is_finite() && position.y.is_finite()) {
                tracing::warn!(index, "non-finite position from forces, node held");
                frame.set_motion(index, previous, Vec2::ZERO);
                continue;
            }

            moved |= velocity.length_sq() > 1e-12;
            frame.set_motion(index, position, velocity);
        }

        moved
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::app::store::GraphStore;
    use crate::history::{EntityDraft, EntityKind, RelationKind};

    fn triangle() -> (GraphStore, Vec<String>) {
        let mut store = GraphStore::new();
        let ids = [vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(0.0, 10.0)]
            .into_iter()
            .enumerate()
            .map(|(index, at)| {
                store
                    .create_node(EntityDraft::named(format!("n{index}"), EntityKind::Person), Some(at))
                    .expect("node")
                    .id()
                    .to_string()
            })
            .collect::<Vec<_>>();
        store
            .create_link(&ids[0], &ids[1], RelationKind::Influenced, "")
            .expect("link");
        store
            .create_link(&ids[1], &ids[2], RelationKind::Created, "")
            .expect("link");
        (store, ids)
    }

    fn run(simulation: &mut Simulation, store: &mut GraphStore, ticks: usize) {
        for _ in 0..ticks {
            let mut frame = store.simulation_frame(|_| true);
            simulation.tick(&mut frame);
        }
    }

    #[test]
    fn alpha_decays_to_rest() {
        let (mut store, _) = triangle();
        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        assert_eq!(simulation.alpha(), 0.1);

        let mut frame = store.simulation_frame(|_| true);
        simulation.tick(&mut frame);
        assert!((simulation.alpha() - 0.095).abs() < 1e-6);

        run(&mut simulation, &mut store, 200);
        assert!(!simulation.is_running());
        assert_eq!(simulation.alpha(), 0.0);
    }

    #[test]
    fn crowded_nodes_spread_out() {
        let (mut store, ids) = triangle();
        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        run(&mut simulation, &mut store, 30);

        let a = store.node(&ids[0]).expect("a").position();
        let b = store.node(&ids[1]).expect("b").position();
        assert!((a - b).length() > 10.0);
    }

    #[test]
    fn locked_graph_does_not_move() {
        let (mut store, ids) = triangle();
        store.set_all_locked(true);
        let before = ids
            .iter()
            .map(|id| store.node(id).expect("node").position())
            .collect::<Vec<_>>();

        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        for _ in 0..100 {
            simulation.reheat(0.3);
            let mut frame = store.simulation_frame(|_| true);
            assert!(!simulation.tick(&mut frame));
        }

        for (id, position) in ids.iter().zip(before) {
            assert_eq!(store.node(id).expect("node").position(), position);
            assert_eq!(store.node(id).expect("node").velocity(), Vec2::ZERO);
        }
    }

    #[test]
    fn unlocking_one_node_lets_only_it_move() {
        let (mut store, ids) = triangle();
        store.set_all_locked(true);
        store.set_locked(&ids[1], false).expect("unlock");
        let locked_at = store.node(&ids[0]).expect("node").position();
        let free_at = store.node(&ids[1]).expect("node").position();

        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        simulation.reheat(0.3);
        run(&mut simulation, &mut store, 5);

        assert_eq!(store.node(&ids[0]).expect("node").position(), locked_at);
        assert_ne!(store.node(&ids[1]).expect("node").position(), free_at);
    }

    #[test]
    fn pinned_node_follows_its_pin() {
        let (mut store, ids) = triangle();
        store.pin(&ids[2], vec2(300.0, 300.0));
        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        run(&mut simulation, &mut store, 10);
        assert_eq!(store.node(&ids[2]).expect("node").position(), vec2(300.0, 300.0));
    }

    #[test]
    fn stopped_simulation_is_inert() {
        let (mut store, ids) = triangle();
        let before = store.node(&ids[0]).expect("node").position();
        let mut simulation = Simulation::start(SimulationConfig::default(), 4);
        simulation.stop();

        let mut frame = store.simulation_frame(|_| true);
        assert!(!simulation.tick(&mut frame));
        assert_eq!(store.node(&ids[0]).expect("node").position(), before);
        assert_eq!(simulation.generation(), 4);
    }

    #[test]
    fn inactive_nodes_are_left_alone() {
        let (mut store, ids) = triangle();
        let outside = store.node(&ids[2]).expect("node").position();
        let active = ids[..2].to_vec();
        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        for _ in 0..10 {
            let mut frame = store.simulation_frame(|id| active.iter().any(|candidate| candidate == id));
            simulation.tick(&mut frame);
        }
        assert_eq!(store.node(&ids[2]).expect("node").position(), outside);
    }

    #[test]
    fn reheat_resumes_a_resting_simulation() {
        let mut simulation = Simulation::start(SimulationConfig::default(), 1);
        simulation.stop();
        assert!(!simulation.is_running());
        simulation.reheat(0.3);
        assert!(simulation.is_running());
        assert_eq!(simulation.alpha(), 0.3);
    }
}
