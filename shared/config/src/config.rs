use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub movement: Movement,
    pub navigation: Navigation,
    pub simulation: Simulation,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Movement {
    /// Navigation region every path is searched in
    pub region: u32,
    /// Requests closer than this to the current target are ignored
    pub repath_epsilon: f32,
    /// Number of upcoming waypoints sent per path update
    pub broadcast_window: usize,
    /// Distance covered per tick
    pub move_speed: f32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Navigation {
    pub regions: Vec<u32>,
    pub max_segment_length: f32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Simulation {
    pub units: u32,
    pub ticks: u32,
    /// Distance between spawned units
    pub spacing: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            movement: Movement::default(),
            navigation: Navigation::default(),
            simulation: Simulation::default(),
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            region: 10001,
            repath_epsilon: 0.1,
            broadcast_window: 3,
            move_speed: 0.5,
        }
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            regions: vec![10001],
            max_segment_length: 2.0,
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            units: 3,
            ticks: 120,
            spacing: 4.0,
        }
    }
}
