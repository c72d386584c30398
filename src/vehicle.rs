use crate::edge::Lane;
use crate::route::Route;
use crate::{EdgeId, VehicleId};
use std::sync::atomic::{AtomicI32, Ordering};

/// Spawn state of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleState {
    /// Created and possibly registered, but not yet on a street.
    NotSpawned,
    /// Driving on the street graph.
    Spawned,
    /// Taken off the streets after finishing its route.
    Despawned,
}

/// A vehicle as the crossing logic sees it.
///
/// Kinematics live outside this crate. Junctions consult the spawn state,
/// the current lane and the next route edge, and they are the only writer
/// of the priority counter.
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// Spawn state.
    state: VehicleState,
    /// The lane the vehicle currently occupies.
    lane: Option<Lane>,
    /// The edges still ahead of the vehicle.
    route: Route,
    /// Tournament score at the junction the vehicle is registered at.
    priority_counter: AtomicI32,
}

impl Vehicle {
    /// Creates a new vehicle that still waits for its spawn.
    pub fn new(id: VehicleId, route: Route) -> Self {
        Self {
            id,
            state: VehicleState::NotSpawned,
            lane: None,
            route,
            priority_counter: AtomicI32::new(0),
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// Gets the spawn state.
    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Gets the lane the vehicle currently occupies.
    pub fn lane(&self) -> Option<Lane> {
        self.lane
    }

    /// Gets the remaining route.
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Gets the next edge the vehicle wants to enter.
    pub fn next_route_edge(&self) -> Option<EdgeId> {
        self.route.peek_next()
    }

    /// Puts the vehicle onto the first lane of its route.
    pub fn spawn(&mut self, lane: Lane) {
        assert_eq!(self.state, VehicleState::NotSpawned, "vehicle spawned twice");
        assert_eq!(
            self.route.peek_next(),
            Some(lane.edge),
            "spawn lane is not on the route"
        );
        self.route.advance();
        self.state = VehicleState::Spawned;
        self.lane = Some(lane);
    }

    /// Moves the vehicle across a junction onto the next edge of its route.
    pub fn cross_into(&mut self, lane: Lane) {
        assert_eq!(self.state, VehicleState::Spawned, "only spawned vehicles move");
        let next = self
            .route
            .advance()
            .expect("crossed beyond the end of the route");
        assert_eq!(lane.edge, next, "crossed onto an edge that is not next on the route");
        self.lane = Some(lane);
    }

    /// Takes the vehicle off the streets.
    pub fn despawn(&mut self) {
        self.state = VehicleState::Despawned;
        self.lane = None;
    }

    /// Gets the priority counter.
    pub fn priority_counter(&self) -> i32 {
        self.priority_counter.load(Ordering::Relaxed)
    }

    /// Sets the priority counter back to zero.
    pub(crate) fn reset_priority_counter(&self) {
        self.priority_counter.store(0, Ordering::Relaxed);
    }

    /// Increments the priority counter.
    pub(crate) fn inc_priority_counter(&self) {
        self.priority_counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the priority counter.
    pub(crate) fn dec_priority_counter(&self) {
        self.priority_counter.fetch_sub(1, Ordering::Relaxed);
    }
}
