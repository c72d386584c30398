use crate::config::SimulationConfig;
use crate::edge::{DirectedEdge, EdgeAttributes, Lane};
use crate::math::Coordinate;
use crate::node::Node;
use crate::search::{EdgeMetrics, SearchGraph};
use crate::{EdgeId, EdgeSet, NodeId, NodeSet};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

/// The street graph of a simulation.
///
/// Junctions and streets are added while the graph is under construction;
/// once it is complete, [`compute_crossing_indices`](Self::compute_crossing_indices)
/// prepares every junction for arbitration. Each junction draws its own
/// arbitration seed from the graph's seed stream, so a graph built in the
/// same order from the same configuration behaves identically.
pub struct StreetGraph {
    /// Simulation parameters.
    config: SimulationConfig,
    /// The junctions.
    nodes: NodeSet,
    /// The streets.
    edges: EdgeSet,
    /// Source of the per-junction arbitration seeds.
    seed_stream: SmallRng,
}

impl StreetGraph {
    /// Creates an empty street graph.
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            nodes: NodeSet::with_key(),
            edges: EdgeSet::with_key(),
            seed_stream: SmallRng::seed_from_u64(config.seed),
        }
    }

    /// Gets the simulation parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Gets the junction with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Gets the street with the given ID.
    pub fn edge(&self, id: EdgeId) -> &DirectedEdge {
        &self.edges[id]
    }

    /// Gets all junctions.
    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    /// Gets all streets.
    pub fn edges(&self) -> &EdgeSet {
        &self.edges
    }

    /// Gets exclusive access to the street with the given ID.
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut DirectedEdge {
        &mut self.edges[id]
    }

    /// Adds a junction at the given position.
    pub fn add_node(&mut self, coordinate: Coordinate) -> NodeId {
        let config = self.config.crossing;
        let seed = self.seed_stream.gen();
        self.nodes
            .insert_with_key(|id| Node::new(id, coordinate, config, seed))
    }

    /// Adds a street between two junctions and wires it into both.
    ///
    /// The length in m is converted to whole cells; even the shortest street
    /// is one cell long.
    pub fn add_edge(&mut self, attribs: &EdgeAttributes) -> EdgeId {
        assert!(attribs.length > 0.0, "an edge needs a positive length");
        let cells = (attribs.length / self.config.meters_per_cell).round().max(1.0) as u32;
        let id = self
            .edges
            .insert_with_key(|id| DirectedEdge::new(id, attribs, cells));
        self.nodes[attribs.origin].add_leaving_edge(id);
        self.nodes[attribs.destination].add_incoming_edge(id);
        id
    }

    /// Permits the turn from an incoming lane onto a leaving lane of the
    /// same junction.
    pub fn add_connector(&mut self, incoming: Lane, leaving: Lane) {
        let junction = self.edges[incoming.edge].destination();
        assert_eq!(
            junction,
            self.edges[leaving.edge].origin(),
            "connector must join two edges at one junction"
        );
        // Re-derive the lanes so that out of range indices are caught here.
        let incoming = self.edges[incoming.edge].lane(incoming.index);
        let leaving = self.edges[leaving.edge].lane(leaving.index);
        self.nodes[junction].add_connector(incoming, leaving);
    }

    /// Assigns the crossing indices of every junction.
    ///
    /// Call this once the graph is complete, before any vehicle registers
    /// at a junction.
    pub fn compute_crossing_indices(&mut self) {
        let edges = &self.edges;
        for node in self.nodes.values_mut() {
            node.compute_crossing_indices(edges);
        }
    }

    /// Puts every street and junction back into its initial state.
    pub fn reset(&mut self) {
        for edge in self.edges.values_mut() {
            edge.reset();
        }
        for node in self.nodes.values() {
            node.reset();
        }
    }

    /// Captures the whole graph state as JSON for inspection.
    #[cfg(feature = "debug")]
    pub fn debug_snapshot(&self, vehicles: &crate::VehicleSet) -> serde_json::Value {
        serde_json::json!({
            "junctions": self
                .nodes
                .values()
                .map(|node| node.debug_snapshot(vehicles))
                .collect::<Vec<_>>(),
            "streets": self.edges.values().map(|edge| edge.debug_snapshot()).collect::<Vec<_>>(),
        })
    }
}

impl SearchGraph for StreetGraph {
    type Node = NodeId;
    type Edge = EdgeId;

    fn leaving_edges(&self, node: NodeId, arrived_on: Option<EdgeId>) -> SmallVec<[EdgeId; 8]> {
        let arriving = arrived_on.map(|id| &self.edges[id]);
        self.nodes[node].leaving_edges_for(arriving)
    }

    fn incoming_edges(&self, node: NodeId) -> SmallVec<[EdgeId; 8]> {
        self.nodes[node].incoming_edges().iter().copied().collect()
    }

    fn edge_origin(&self, edge: EdgeId) -> NodeId {
        self.edges[edge].origin()
    }

    fn edge_destination(&self, edge: EdgeId) -> NodeId {
        self.edges[edge].destination()
    }

    fn edge_metrics(&self, edge: EdgeId) -> EdgeMetrics {
        let edge = &self.edges[edge];
        EdgeMetrics {
            length: edge.length(),
            travel_time: edge.travel_time_millis(),
        }
    }

    fn coordinate(&self, node: NodeId) -> Coordinate {
        self.nodes[node].coordinate()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Vector2d;
    use crate::search::astar;

    fn street(graph: &mut StreetGraph, origin: NodeId, destination: NodeId, length: f64) -> EdgeId {
        graph.add_edge(&EdgeAttributes {
            origin,
            destination,
            length,
            origin_direction: Vector2d::new(1.0, 0.0),
            destination_direction: Vector2d::new(1.0, 0.0),
            lanes: 1,
            max_velocity: 6.0,
            priority_level: 0,
        })
    }

    #[test]
    fn edges_are_wired_into_their_junctions() {
        let mut graph = StreetGraph::new(SimulationConfig::default());
        let a = graph.add_node(Coordinate::new(0.0, 0.0));
        let b = graph.add_node(Coordinate::new(0.001, 0.0));
        let ab = street(&mut graph, a, b, 75.0);

        assert_eq!(graph.node(a).leaving_edges(), &[ab]);
        assert_eq!(graph.node(b).incoming_edges(), &[ab]);
        assert_eq!(graph.edge(ab).origin(), a);
        assert_eq!(graph.edge(ab).destination(), b);

        // 75 m at 7.5 m per cell; a tiny street still gets one cell.
        assert_eq!(graph.edge(ab).length(), 10);
        let stub = street(&mut graph, a, b, 1.0);
        assert_eq!(graph.edge(stub).length(), 1);
    }

    #[test]
    #[should_panic(expected = "connector must join")]
    fn connector_rejects_edges_of_different_junctions() {
        let mut graph = StreetGraph::new(SimulationConfig::default());
        let a = graph.add_node(Coordinate::new(0.0, 0.0));
        let b = graph.add_node(Coordinate::new(0.001, 0.0));
        let c = graph.add_node(Coordinate::new(0.002, 0.0));
        let ab = street(&mut graph, a, b, 75.0);
        let ca = street(&mut graph, c, a, 75.0);

        // The incoming edge ends at b, but the leaving edge starts at c.
        graph.add_connector(Lane::new(ab, 0), Lane::new(ca, 0));
    }

    #[test]
    fn search_runs_on_the_street_graph() {
        let mut graph = StreetGraph::new(SimulationConfig::default());
        let a = graph.add_node(Coordinate::new(0.0, 0.0));
        let b = graph.add_node(Coordinate::new(0.001, 0.0));
        let c = graph.add_node(Coordinate::new(0.002, 0.0));
        let ab = street(&mut graph, a, b, 75.0);
        let bc = street(&mut graph, b, c, 75.0);
        street(&mut graph, c, b, 75.0);
        graph.compute_crossing_indices();

        assert_eq!(graph.edge_metrics(ab).length, 10);
        assert_eq!(
            astar::dijkstra().find_shortest_path(&graph, a, c),
            vec![ab, bc]
        );
    }
}
