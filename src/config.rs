//! Simulation-wide configuration.

/// Tunable rules of the crossing arbitration.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrossingConfig {
    /// Whether traffic drives on the right side of the road.
    pub driving_on_the_right: bool,
    /// Weight conflicting maneuvers by their street priority levels.
    pub edge_priority: bool,
    /// Break remaining ties with the right-before-left rule instead of a
    /// random draw.
    pub priority_to_the_right: bool,
    /// Allow at most one vehicle to cross a junction per tick.
    pub only_one_vehicle: bool,
    /// Pass over winners whose next lane has no room for them.
    pub friendly_standing_in_jam: bool,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self {
            driving_on_the_right: true,
            edge_priority: true,
            priority_to_the_right: true,
            only_one_vehicle: false,
            friendly_standing_in_jam: false,
        }
    }
}

/// Global parameters of a simulation run.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// Seed from which every junction's private random source derives.
    pub seed: u64,
    /// Length of one street cell.
    pub meters_per_cell: f64, // m
    /// Upper velocity bound of any vehicle.
    pub global_max_velocity: f64, // cells/s
    /// Arbitration rules applied at every junction.
    pub crossing: CrossingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            meters_per_cell: 7.5,
            global_max_velocity: 6.0,
            crossing: CrossingConfig::default(),
        }
    }
}
