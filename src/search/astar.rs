use super::{assemble_path, EdgeMetrics, SearchGraph, WeightedEdge, WeightedNode};
use crate::math::{haversine_distance, Coordinate};
use log::debug;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A* search over a street graph.
///
/// The engine carries an edge weight and a remaining cost estimate. The
/// estimate must not overstate the true remaining cost, otherwise the found
/// paths lose their optimality; a constant zero estimate turns the engine
/// into plain Dijkstra.
pub struct AStar<W, H> {
    weight: W,
    estimate: H,
}

impl<W, H> AStar<W, H>
where
    W: Fn(&EdgeMetrics) -> f64,
    H: Fn(Coordinate, Coordinate) -> f64,
{
    /// Creates an engine with the given edge weight and remaining cost
    /// estimate.
    pub fn new(weight: W, estimate: H) -> Self {
        Self { weight, estimate }
    }

    /// Finds the cheapest edge sequence from `start` to `end`.
    ///
    /// The result is empty if `end` cannot be reached, and also when `start`
    /// and `end` coincide.
    pub fn find_shortest_path<G: SearchGraph>(
        &self,
        graph: &G,
        start: G::Node,
        end: G::Node,
    ) -> Vec<G::Edge> {
        let mut queue = BinaryHeap::new();
        let mut visited = HashSet::new();
        let mut predecessors: HashMap<G::Node, WeightedEdge<G::Edge>> = HashMap::new();

        let target = graph.coordinate(end);
        visited.insert(start);
        self.expand(graph, start, 0.0, target, &mut queue, &mut predecessors, &visited);

        while let Some(current) = queue.pop() {
            if !visited.insert(current.node) {
                continue;
            }
            if current.node == end {
                return assemble_path(graph, &predecessors, start, end);
            }
            self.expand(
                graph,
                current.node,
                current.cost,
                target,
                &mut queue,
                &mut predecessors,
                &visited,
            );
        }
        debug!("destination is not reachable");
        Vec::new()
    }

    /// Relaxes all edges leaving the node, honoring the turns permitted by
    /// the edge the node was reached on.
    #[allow(clippy::too_many_arguments)]
    fn expand<G: SearchGraph>(
        &self,
        graph: &G,
        node: G::Node,
        cost: f64,
        target: Coordinate,
        queue: &mut BinaryHeap<WeightedNode<G::Node>>,
        predecessors: &mut HashMap<G::Node, WeightedEdge<G::Edge>>,
        visited: &HashSet<G::Node>,
    ) {
        let arrived_on = predecessors.get(&node).map(|step| step.edge);
        for edge in graph.leaving_edges(node, arrived_on) {
            let next = graph.edge_destination(edge);
            let next_cost = cost + (self.weight)(&graph.edge_metrics(edge));
            if predecessors.get(&next).map_or(true, |step| next_cost < step.cost) {
                predecessors.insert(next, WeightedEdge { cost: next_cost, edge });
                if !visited.contains(&next) {
                    let estimate = next_cost + (self.estimate)(graph.coordinate(next), target);
                    queue.push(WeightedNode {
                        node: next,
                        cost: next_cost,
                        estimate,
                    });
                }
            }
        }
    }
}

/// Creates an engine minimizing the travelled distance without an estimate.
pub fn dijkstra() -> AStar<impl Fn(&EdgeMetrics) -> f64, impl Fn(Coordinate, Coordinate) -> f64> {
    AStar::new(
        |metrics: &EdgeMetrics| f64::from(metrics.length),
        |_: Coordinate, _: Coordinate| 0.0,
    )
}

/// Creates an engine minimizing the travelled distance, estimating the rest
/// of the trip by the beeline to the destination.
pub fn shortest_path_astar(
    meters_per_cell: f64,
) -> AStar<impl Fn(&EdgeMetrics) -> f64, impl Fn(Coordinate, Coordinate) -> f64> {
    AStar::new(
        |metrics: &EdgeMetrics| f64::from(metrics.length),
        move |from: Coordinate, to: Coordinate| haversine_distance(from, to) / meters_per_cell,
    )
}

/// Creates an engine minimizing the travel time, estimating the rest of the
/// trip by the beeline driven at the given maximum velocity.
pub fn fastest_path_astar(
    meters_per_cell: f64,
    max_cells_per_sec: f64,
) -> AStar<impl Fn(&EdgeMetrics) -> f64, impl Fn(Coordinate, Coordinate) -> f64> {
    AStar::new(
        |metrics: &EdgeMetrics| metrics.travel_time,
        move |from: Coordinate, to: Coordinate| {
            1000.0 * haversine_distance(from, to) / (meters_per_cell * max_cells_per_sec)
        },
    )
}
