use crate::config::CrossingConfig;
use crate::edge::{DirectedEdge, Lane};
use crate::indices::{are_indices_crossing, leftmost_index_in_matching};
use crate::math::{clockwise_angle, Coordinate, Vector2d};
use crate::vehicle::{Vehicle, VehicleState};
use crate::{EdgeId, EdgeSet, NodeId, VehicleId, VehicleSet};
use itertools::Itertools;
use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A junction of the street graph, arbitrating which vehicles may cross.
///
/// A junction is built up in two phases. During construction the graph
/// registers edges and connectors through `&mut` access and finally assigns
/// the crossing indices. Afterwards all arbitration entry points take
/// `&self` and synchronize on the junction's own lock, so worker threads can
/// drive disjoint junctions in parallel.
///
/// Arbitration is a tournament: every newly registered vehicle is compared
/// once against every already assessed vehicle, priority counters keep the
/// running score, and each tick the vehicles with the top score are allowed
/// to cross.
pub struct Node {
    /// The node ID.
    id: NodeId,
    /// Position of the junction.
    coordinate: Coordinate,
    /// Arbitration rules.
    config: CrossingConfig,
    /// Seed of the private random source.
    seed: u64,
    /// Edges entering the junction, in insertion order.
    incoming: Vec<EdgeId>,
    /// Edges leaving the junction, in insertion order.
    leaving: Vec<EdgeId>,
    /// Allowed turns from incoming lanes to leaving lanes.
    connectors: HashMap<Lane, Vec<Lane>>,
    /// Crossing index of every incoming lane.
    incoming_indices: HashMap<Lane, u8>,
    /// Crossing index of every leaving lane.
    leaving_indices: HashMap<Lane, u8>,
    /// Exclusive upper bound of the assigned crossing indices.
    index_supremum: u8,
    /// Mutable arbitration state behind the junction's lock.
    crossing: Mutex<CrossingState>,
}

/// The arbitration state of one junction.
struct CrossingState {
    /// Private random source for tie breaks.
    rng: SmallRng,
    /// Registered vehicles awaiting assessment, drained in id order.
    new_vehicles: BTreeSet<VehicleId>,
    /// Assessed vehicles, each with the opponents it defeated or tied.
    assessed: BTreeMap<VehicleId, BTreeSet<VehicleId>>,
    /// Vehicles allowed to cross this tick.
    max_prio: HashSet<VehicleId>,
    /// Whether any registration changed since the last update.
    any_change: bool,
}

impl CrossingState {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            new_vehicles: BTreeSet::new(),
            assessed: BTreeMap::new(),
            max_prio: HashSet::new(),
            any_change: false,
        }
    }
}

impl Node {
    /// Creates a new junction.
    pub(crate) fn new(id: NodeId, coordinate: Coordinate, config: CrossingConfig, seed: u64) -> Self {
        Self {
            id,
            coordinate,
            config,
            seed,
            incoming: Vec::new(),
            leaving: Vec::new(),
            connectors: HashMap::new(),
            incoming_indices: HashMap::new(),
            leaving_indices: HashMap::new(),
            index_supremum: 0,
            crossing: Mutex::new(CrossingState::new(seed)),
        }
    }

    /// Gets the node ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Gets the position of the junction.
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Gets the edges entering the junction.
    pub fn incoming_edges(&self) -> &[EdgeId] {
        &self.incoming
    }

    /// Gets the edges leaving the junction.
    pub fn leaving_edges(&self) -> &[EdgeId] {
        &self.leaving
    }

    /// Gets the exclusive upper bound of the junction's crossing indices.
    pub fn index_supremum(&self) -> u8 {
        self.index_supremum
    }

    pub(crate) fn add_incoming_edge(&mut self, edge: EdgeId) {
        self.incoming.push(edge);
    }

    pub(crate) fn add_leaving_edge(&mut self, edge: EdgeId) {
        self.leaving.push(edge);
    }

    /// Permits the turn from an incoming lane onto a leaving lane.
    pub(crate) fn add_connector(&mut self, incoming: Lane, leaving: Lane) {
        self.connectors.entry(incoming).or_default().push(leaving);
    }

    /// Resolves the leaving lane a vehicle on `incoming` takes to reach the
    /// `target` edge.
    ///
    /// A lane without any connectors is unrestricted and resolves to the
    /// first lane of the target edge. `None` means connectors exist but none
    /// of them reaches the target.
    pub fn leaving_lane_for(&self, incoming: Lane, target: EdgeId) -> Option<Lane> {
        debug_assert!(self.leaving.contains(&target), "target edge does not leave this junction");
        match self.connectors.get(&incoming) {
            Some(lanes) => lanes.iter().copied().find(|lane| lane.edge == target),
            None => Some(Lane::new(target, 0)),
        }
    }

    /// Gets the edges reachable when arriving over the given edge, or every
    /// leaving edge for an unconditioned query.
    pub(crate) fn leaving_edges_for(&self, arriving: Option<&DirectedEdge>) -> SmallVec<[EdgeId; 8]> {
        let Some(edge) = arriving else {
            return self.leaving.iter().copied().collect();
        };
        let mut reachable = SmallVec::new();
        for lane in edge.lanes() {
            match self.connectors.get(&lane) {
                Some(lanes) => {
                    for leaving in lanes {
                        if !reachable.contains(&leaving.edge) {
                            reachable.push(leaving.edge);
                        }
                    }
                }
                // A single unrestricted lane opens up every leaving edge.
                None => return self.leaving.iter().copied().collect(),
            }
        }
        reachable
    }

    /// Assigns a crossing index to every incoming and leaving lane.
    ///
    /// Edges sharing an exact direction vector form one group, so the two
    /// directions of a street stay together. The groups are arranged
    /// angularly around the junction with the orientation picked by the
    /// driving side, and indices are handed out walking that order: leaving
    /// lanes of a group first in ascending lane order, then its incoming
    /// lanes in descending lane order.
    pub(crate) fn compute_crossing_indices(&mut self, edges: &EdgeSet) {
        self.incoming_indices.clear();
        self.leaving_indices.clear();

        let total: usize = self
            .leaving
            .iter()
            .chain(&self.incoming)
            .map(|id| edges[*id].lane_count() as usize)
            .sum();
        assert!(total <= u8::MAX as usize, "too many lanes at one junction");

        // Direction groups in first-seen order. Leaving edges contribute
        // their negated origin direction so that all vectors point at the
        // junction consistently.
        let mut groups: Vec<(Vector2d, Vec<(EdgeId, bool)>)> = Vec::new();
        let leaving_dirs = self.leaving.iter().map(|&id| (-edges[id].origin_direction(), id, true));
        let incoming_dirs = self.incoming.iter().map(|&id| (edges[id].destination_direction(), id, false));
        for (direction, id, is_leaving) in leaving_dirs.chain(incoming_dirs) {
            match groups.iter_mut().find(|(v, _)| *v == direction) {
                Some((_, members)) => members.push((id, is_leaving)),
                None => groups.push((direction, vec![(id, is_leaving)])),
            }
        }

        if groups.is_empty() {
            self.index_supremum = 0;
            return;
        }

        let zero = groups[0].0;
        let clockwise = !self.config.driving_on_the_right;
        let groups = groups.into_iter().sorted_by(|(a, _), (b, _)| {
            clockwise_angle(zero, *a, clockwise).total_cmp(&clockwise_angle(zero, *b, clockwise))
        });

        let mut next: u8 = 0;
        for (_, members) in groups {
            for &(id, _) in members.iter().filter(|(_, is_leaving)| *is_leaving) {
                for lane in edges[id].lanes() {
                    self.leaving_indices.insert(lane, next);
                    next += 1;
                }
            }
            for &(id, _) in members.iter().filter(|(_, is_leaving)| !*is_leaving) {
                for lane in edges[id].lanes().rev() {
                    self.incoming_indices.insert(lane, next);
                    next += 1;
                }
            }
        }
        self.index_supremum = next;
        debug!("junction {:?} assigned {} crossing indices", self.id, next);
    }

    /// Queues a vehicle for assessment. Returns whether it was newly
    /// registered.
    pub fn register_vehicle(&self, vehicle: VehicleId) -> bool {
        let mut state = self.lock();
        if state.assessed.contains_key(&vehicle) || !state.new_vehicles.insert(vehicle) {
            return false;
        }
        state.any_change = true;
        true
    }

    /// Whether the vehicle is queued or assessed at this junction.
    pub fn is_registered(&self, vehicle: VehicleId) -> bool {
        let state = self.lock();
        state.assessed.contains_key(&vehicle) || state.new_vehicles.contains(&vehicle)
    }

    /// Whether the vehicle may cross this tick.
    pub fn permission_to_cross(&self, vehicle: VehicleId) -> bool {
        self.lock().max_prio.contains(&vehicle)
    }

    /// Takes a vehicle out of the arbitration, adjusting the remaining
    /// counters as if it had never been assessed.
    ///
    /// Returns false if the vehicle was only queued or not present at all.
    pub fn unregister_vehicle(&self, vehicles: &VehicleSet, vehicle: VehicleId) -> bool {
        let mut state = self.lock();
        if state.assessed.remove(&vehicle).is_none() {
            state.new_vehicles.remove(&vehicle);
            return false;
        }
        for (&other, defeated) in state.assessed.iter_mut() {
            if defeated.remove(&vehicle) {
                vehicles[other].dec_priority_counter();
            } else {
                vehicles[other].inc_priority_counter();
            }
        }
        state.max_prio.remove(&vehicle);
        state.any_change = true;
        true
    }

    /// Runs one arbitration tick: assesses all newly registered vehicles,
    /// then recomputes the set of vehicles allowed to cross.
    pub fn update(&self, vehicles: &VehicleSet, edges: &EdgeSet) {
        let mut state = self.lock();
        let CrossingState {
            rng,
            new_vehicles,
            assessed,
            max_prio,
            any_change,
        } = &mut *state;

        // Assess new arrivals in id order, one tournament round each.
        while let Some(id) = new_vehicles.pop_first() {
            let vehicle = &vehicles[id];
            vehicle.reset_priority_counter();
            let mut defeated = BTreeSet::new();
            for (&other_id, other_defeated) in assessed.iter_mut() {
                let other = &vehicles[other_id];
                match self.compare(rng, vehicle, other, edges) {
                    Ordering::Greater => {
                        vehicle.inc_priority_counter();
                        other.dec_priority_counter();
                        defeated.insert(other_id);
                    }
                    Ordering::Less => {
                        vehicle.dec_priority_counter();
                        other.inc_priority_counter();
                        other_defeated.insert(id);
                    }
                    Ordering::Equal => {
                        // Not in each other's way; both may go.
                        vehicle.inc_priority_counter();
                        other.inc_priority_counter();
                        defeated.insert(other_id);
                        other_defeated.insert(id);
                    }
                }
            }
            assessed.insert(id, defeated);
        }

        // Select the winners of this tick.
        if !assessed.is_empty() {
            max_prio.clear();
            let mut candidates: Vec<VehicleId> = Vec::new();
            let mut best = i32::MIN;
            for &id in assessed.keys() {
                let counter = vehicles[id].priority_counter();
                if counter < best {
                    continue;
                }
                if !*any_change && self.config.friendly_standing_in_jam {
                    let next = vehicles[id]
                        .next_route_edge()
                        .expect("registered vehicle without a next route edge");
                    if !edges[next].has_room(0) {
                        continue;
                    }
                }
                if counter > best {
                    candidates.clear();
                    best = counter;
                }
                candidates.push(id);
            }

            if !candidates.is_empty() {
                let beats_everyone = best == assessed.len() as i32 - 1;
                let too_many = self.config.only_one_vehicle && candidates.len() > 1;
                if !*any_change && (!beats_everyone || too_many) {
                    // Not all of the tied vehicles can cross at once; one
                    // of them is drawn.
                    let winner = candidates[rng.gen_range(0..candidates.len())];
                    trace!(
                        "junction {:?} collapsed {} tied vehicles onto {:?}",
                        self.id,
                        candidates.len(),
                        winner
                    );
                    candidates.clear();
                    candidates.push(winner);
                }
                max_prio.extend(candidates);
            }
        }
        *any_change = false;
    }

    /// Forgets all registrations and re-seeds the random source.
    pub fn reset(&self) {
        *self.lock() = CrossingState::new(self.seed);
    }

    /// Ranks two registered vehicles; `Greater` means the first one wins.
    fn compare(&self, rng: &mut SmallRng, v1: &Vehicle, v2: &Vehicle, edges: &EdgeSet) -> Ordering {
        let spawned1 = v1.state() == VehicleState::Spawned;
        let spawned2 = v2.state() == VehicleState::Spawned;
        if !spawned1 || !spawned2 {
            return match (spawned1, spawned2) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                // Neither is on a street yet; the smaller id spawns first.
                _ => v2.id().cmp(&v1.id()),
            };
        }

        let lane1 = v1.lane().expect("spawned vehicle without a lane");
        let lane2 = v2.lane().expect("spawned vehicle without a lane");
        let next1 = v1
            .next_route_edge()
            .expect("registered vehicle without a next route edge");
        let next2 = v2
            .next_route_edge()
            .expect("registered vehicle without a next route edge");
        let leaving1 = self
            .leaving_lane_for(lane1, next1)
            .expect("no connector reaches the vehicle's next route edge");
        let leaving2 = self
            .leaving_lane_for(lane2, next2)
            .expect("no connector reaches the vehicle's next route edge");

        let origin1 = self.incoming_index(lane1);
        let origin2 = self.incoming_index(lane2);
        let destination1 = self.leaving_index(leaving1);
        let destination2 = self.leaving_index(leaving2);

        if !are_indices_crossing(origin1, destination1, origin2, destination2, self.index_supremum) {
            return Ordering::Equal;
        }

        if self.config.edge_priority {
            let cmp = edges[lane1.edge]
                .priority_level()
                .cmp(&edges[lane2.edge].priority_level());
            if cmp != Ordering::Equal {
                return cmp;
            }
            let cmp = edges[next1].priority_level().cmp(&edges[next2].priority_level());
            if cmp != Ordering::Equal {
                return cmp;
            }
        }

        if self.config.priority_to_the_right {
            let leftmost =
                leftmost_index_in_matching(origin1, destination1, origin2, destination2, self.index_supremum);
            match leftmost {
                Some(index) if index == origin1 => Ordering::Greater,
                Some(index) if index == origin2 => Ordering::Less,
                _ => panic!("crossing indices are inconsistent"),
            }
        } else if rng.gen::<bool>() {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }

    /// Gets the crossing index of an incoming lane.
    fn incoming_index(&self, lane: Lane) -> u8 {
        *self
            .incoming_indices
            .get(&lane)
            .expect("crossing indices not computed for incoming lane")
    }

    /// Gets the crossing index of a leaving lane.
    fn leaving_index(&self, lane: Lane) -> u8 {
        *self
            .leaving_indices
            .get(&lane)
            .expect("crossing indices not computed for leaving lane")
    }

    fn lock(&self) -> MutexGuard<'_, CrossingState> {
        self.crossing.lock().expect("junction lock poisoned")
    }

    /// Captures the arbitration state as JSON for inspection.
    #[cfg(feature = "debug")]
    pub fn debug_snapshot(&self, vehicles: &VehicleSet) -> serde_json::Value {
        let state = self.lock();
        serde_json::json!({
            "junction": format!("{:?}", self.id),
            "queued": state.new_vehicles.iter().map(|id| format!("{:?}", id)).collect::<Vec<_>>(),
            "assessed": state
                .assessed
                .iter()
                .map(|(id, defeated)| {
                    serde_json::json!({
                        "vehicle": format!("{:?}", id),
                        "counter": vehicles[*id].priority_counter(),
                        "defeated": defeated.iter().map(|d| format!("{:?}", d)).collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
            "allowed": state
                .max_prio
                .iter()
                .sorted()
                .map(|id| format!("{:?}", id))
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::edge::EdgeAttributes;
    use slotmap::SlotMap;

    fn node_id() -> NodeId {
        let mut keys: SlotMap<NodeId, ()> = SlotMap::with_key();
        keys.insert(())
    }

    fn add_edge(
        edges: &mut EdgeSet,
        origin: NodeId,
        destination: NodeId,
        direction: Vector2d,
        lanes: u8,
    ) -> EdgeId {
        let attribs = EdgeAttributes {
            origin,
            destination,
            length: 75.0,
            origin_direction: direction,
            destination_direction: direction,
            lanes,
            max_velocity: 6.0,
            priority_level: 0,
        };
        edges.insert_with_key(|id| DirectedEdge::new(id, &attribs, 10))
    }

    /// Two-way plus crossroad around `junction`, one lane per direction.
    fn plus_crossroad(junction: NodeId, edges: &mut EdgeSet, node: &mut Node) -> Vec<(EdgeId, EdgeId)> {
        let mut streets = Vec::new();
        for direction in [
            Vector2d::new(1.0, 0.0),  // east
            Vector2d::new(0.0, 1.0),  // north
            Vector2d::new(-1.0, 0.0), // west
            Vector2d::new(0.0, -1.0), // south
        ] {
            let neighbour = node_id();
            let incoming = add_edge(edges, neighbour, junction, -direction, 1);
            let leaving = add_edge(edges, junction, neighbour, direction, 1);
            node.add_incoming_edge(incoming);
            node.add_leaving_edge(leaving);
            streets.push((incoming, leaving));
        }
        streets
    }

    #[test]
    fn crossing_indices_walk_the_streets_in_angular_order() {
        let id = node_id();
        let mut node = Node::new(id, Coordinate::new(0.0, 0.0), CrossingConfig::default(), 7);
        let mut edges = EdgeSet::with_key();
        let streets = plus_crossroad(id, &mut edges, &mut node);

        node.compute_crossing_indices(&edges);
        assert_eq!(node.index_supremum(), 8);

        // The first street seeds the angular order; with right hand traffic
        // the remaining streets follow counter-clockwise.
        let expected = [(0u8, 1u8), (2, 3), (4, 5), (6, 7)];
        for ((incoming, leaving), (leaving_index, incoming_index)) in
            streets.iter().zip(expected)
        {
            assert_eq!(node.leaving_index(Lane::new(*leaving, 0)), leaving_index);
            assert_eq!(node.incoming_index(Lane::new(*incoming, 0)), incoming_index);
        }
    }

    #[test]
    fn lanes_of_one_edge_get_adjacent_indices() {
        let id = node_id();
        let mut node = Node::new(id, Coordinate::new(0.0, 0.0), CrossingConfig::default(), 7);
        let mut edges = EdgeSet::with_key();

        let neighbour = node_id();
        let east = Vector2d::new(1.0, 0.0);
        let incoming = add_edge(&mut edges, neighbour, id, -east, 2);
        let leaving = add_edge(&mut edges, id, neighbour, east, 2);
        node.add_incoming_edge(incoming);
        node.add_leaving_edge(leaving);

        node.compute_crossing_indices(&edges);
        assert_eq!(node.index_supremum(), 4);

        // Leaving lanes ascending, incoming lanes descending.
        assert_eq!(node.leaving_index(Lane::new(leaving, 0)), 0);
        assert_eq!(node.leaving_index(Lane::new(leaving, 1)), 1);
        assert_eq!(node.incoming_index(Lane::new(incoming, 1)), 2);
        assert_eq!(node.incoming_index(Lane::new(incoming, 0)), 3);
    }

    #[test]
    fn connectors_restrict_the_reachable_edges() {
        let id = node_id();
        let mut node = Node::new(id, Coordinate::new(0.0, 0.0), CrossingConfig::default(), 7);
        let mut edges = EdgeSet::with_key();
        let streets = plus_crossroad(id, &mut edges, &mut node);

        let (east_in, _) = streets[0];
        let (_, north_out) = streets[1];
        let (_, west_out) = streets[2];

        // Unrestricted lane reaches everything.
        let all = node.leaving_edges_for(Some(&edges[east_in]));
        assert_eq!(all.len(), 4);
        assert_eq!(
            node.leaving_lane_for(Lane::new(east_in, 0), west_out),
            Some(Lane::new(west_out, 0))
        );

        // With connectors only the connected edges remain.
        node.add_connector(Lane::new(east_in, 0), Lane::new(north_out, 0));
        let restricted = node.leaving_edges_for(Some(&edges[east_in]));
        assert_eq!(restricted.as_slice(), &[north_out]);
        assert_eq!(node.leaving_lane_for(Lane::new(east_in, 0), west_out), None);
    }
}
