use eframe::egui::Vec2;

/// Tuning for the force simulation. Defaults follow the layout contract of the
/// map: springs of 150 units, strong repulsion, weak centering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    pub initial_alpha: f32,
    pub alpha_decay: f32,
    pub alpha_rest: f32,
    pub velocity_decay: f32,
    pub link_distance: f32,
    pub charge_strength: f32,
    pub center: Vec2,
    pub center_strength: f32,
    pub collide_radius: f32,
    pub collide_strength: f32,
    pub barnes_hut_theta: f32,
    /// Heat restored when a drag starts.
    pub drag_alpha: f32,
    /// Heat restored after structural edits and unlocking.
    pub edit_alpha: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_alpha: 0.1,
            alpha_decay: 0.05,
            alpha_rest: 0.001,
            velocity_decay: 0.4,
            link_distance: 150.0,
            charge_strength: -400.0,
            center: Vec2::ZERO,
            center_strength: 0.1,
            collide_radius: 70.0,
            collide_strength: 0.5,
            barnes_hut_theta: 0.9,
            drag_alpha: 0.1,
            edit_alpha: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewConfig {
    pub default_max_depth: usize,
    pub fade_in_years: i32,
    pub year_floor: i32,
}

impl ViewConfig {
    pub const MIN_DEPTH: usize = 1;
    pub const MAX_DEPTH: usize = 5;
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 2,
            fade_in_years: 10,
            year_floor: 1000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionConfig {
    pub simulation: SimulationConfig,
    pub view: ViewConfig,
}
