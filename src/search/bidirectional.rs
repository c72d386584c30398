use super::{assemble_path, EdgeMetrics, SearchGraph, WeightedEdge, WeightedNode};
use crate::math::{haversine_distance, Coordinate};
use log::debug;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Bidirectional A* search over a street graph.
///
/// Two frontiers grow towards each other, one from the start along the
/// leaving edges and one from the end along the incoming edges, and the
/// search stops at the first node settled by both sides. The backward
/// frontier cannot know which edge a vehicle will arrive on, so it ignores
/// turn restrictions; on graphs with restrictive connectors the stitched
/// path can therefore differ from the one the unidirectional engine finds.
pub struct BidirectionalAStar<W, H> {
    weight: W,
    estimate: H,
}

/// One growing half of the search.
struct Frontier<N, E> {
    queue: BinaryHeap<WeightedNode<N>>,
    visited: HashSet<N>,
    steps: HashMap<N, WeightedEdge<E>>,
}

impl<N: Copy + Eq + std::hash::Hash, E> Frontier<N, E> {
    fn new(origin: N) -> Self {
        let mut visited = HashSet::new();
        visited.insert(origin);
        Self {
            queue: BinaryHeap::new(),
            visited,
            steps: HashMap::new(),
        }
    }
}

impl<W, H> BidirectionalAStar<W, H>
where
    W: Fn(&EdgeMetrics) -> f64,
    H: Fn(Coordinate, Coordinate) -> f64,
{
    /// Creates an engine with the given edge weight and remaining cost
    /// estimate.
    pub fn new(weight: W, estimate: H) -> Self {
        Self { weight, estimate }
    }

    /// Finds a cheapest edge sequence from `start` to `end`.
    ///
    /// The result is empty if `end` cannot be reached, and also when `start`
    /// and `end` coincide.
    pub fn find_shortest_path<G: SearchGraph>(
        &self,
        graph: &G,
        start: G::Node,
        end: G::Node,
    ) -> Vec<G::Edge> {
        if start == end {
            return Vec::new();
        }

        let source = graph.coordinate(start);
        let target = graph.coordinate(end);

        let mut forward: Frontier<G::Node, G::Edge> = Frontier::new(start);
        let mut backward: Frontier<G::Node, G::Edge> = Frontier::new(end);
        self.expand_forward(graph, &mut forward, start, 0.0, target);
        self.expand_backward(graph, &mut backward, end, 0.0, source);

        // Both sides advance one settled node per round. Once either queue
        // runs dry the other side can no longer produce a meeting node that
        // both halves have settled, so the search gives up.
        while !forward.queue.is_empty() && !backward.queue.is_empty() {
            if let Some(current) = forward.queue.pop() {
                if forward.visited.insert(current.node) {
                    if backward.visited.contains(&current.node) {
                        return stitch(graph, &forward, &backward, start, end, current.node);
                    }
                    self.expand_forward(graph, &mut forward, current.node, current.cost, target);
                }
            }
            if let Some(current) = backward.queue.pop() {
                if backward.visited.insert(current.node) {
                    if forward.visited.contains(&current.node) {
                        return stitch(graph, &forward, &backward, start, end, current.node);
                    }
                    self.expand_backward(graph, &mut backward, current.node, current.cost, source);
                }
            }
        }
        debug!("destination is not reachable");
        Vec::new()
    }

    /// Relaxes the edges leaving the node, honoring the turns permitted by
    /// the edge the node was reached on.
    fn expand_forward<G: SearchGraph>(
        &self,
        graph: &G,
        frontier: &mut Frontier<G::Node, G::Edge>,
        node: G::Node,
        cost: f64,
        target: Coordinate,
    ) {
        let arrived_on = frontier.steps.get(&node).map(|step| step.edge);
        for edge in graph.leaving_edges(node, arrived_on) {
            let next = graph.edge_destination(edge);
            let next_cost = cost + (self.weight)(&graph.edge_metrics(edge));
            if frontier.steps.get(&next).map_or(true, |step| next_cost < step.cost) {
                frontier.steps.insert(next, WeightedEdge { cost: next_cost, edge });
                if !frontier.visited.contains(&next) {
                    let estimate = next_cost + (self.estimate)(graph.coordinate(next), target);
                    frontier.queue.push(WeightedNode {
                        node: next,
                        cost: next_cost,
                        estimate,
                    });
                }
            }
        }
    }

    /// Relaxes the edges entering the node, walking the graph against the
    /// travel direction.
    fn expand_backward<G: SearchGraph>(
        &self,
        graph: &G,
        frontier: &mut Frontier<G::Node, G::Edge>,
        node: G::Node,
        cost: f64,
        source: Coordinate,
    ) {
        for edge in graph.incoming_edges(node) {
            let previous = graph.edge_origin(edge);
            let next_cost = cost + (self.weight)(&graph.edge_metrics(edge));
            if frontier.steps.get(&previous).map_or(true, |step| next_cost < step.cost) {
                frontier.steps.insert(previous, WeightedEdge { cost: next_cost, edge });
                if !frontier.visited.contains(&previous) {
                    let estimate = next_cost + (self.estimate)(graph.coordinate(previous), source);
                    frontier.queue.push(WeightedNode {
                        node: previous,
                        cost: next_cost,
                        estimate,
                    });
                }
            }
        }
    }
}

/// Joins the two half paths at the meeting node.
fn stitch<G: SearchGraph>(
    graph: &G,
    forward: &Frontier<G::Node, G::Edge>,
    backward: &Frontier<G::Node, G::Edge>,
    start: G::Node,
    end: G::Node,
    meeting: G::Node,
) -> Vec<G::Edge> {
    let mut path = assemble_path(graph, &forward.steps, start, meeting);
    let mut node = meeting;
    while node != end {
        let step = &backward.steps[&node];
        path.push(step.edge);
        node = graph.edge_destination(step.edge);
    }
    path
}

/// Creates an engine minimizing the travelled distance without an estimate.
pub fn dijkstra(
) -> BidirectionalAStar<impl Fn(&EdgeMetrics) -> f64, impl Fn(Coordinate, Coordinate) -> f64> {
    BidirectionalAStar::new(
        |metrics: &EdgeMetrics| f64::from(metrics.length),
        |_: Coordinate, _: Coordinate| 0.0,
    )
}

/// Creates an engine minimizing the travelled distance, estimating the rest
/// of the trip by the beeline to the frontier's goal.
pub fn shortest_path_astar(
    meters_per_cell: f64,
) -> BidirectionalAStar<impl Fn(&EdgeMetrics) -> f64, impl Fn(Coordinate, Coordinate) -> f64> {
    BidirectionalAStar::new(
        |metrics: &EdgeMetrics| f64::from(metrics.length),
        move |from: Coordinate, to: Coordinate| haversine_distance(from, to) / meters_per_cell,
    )
}

/// Creates an engine minimizing the travel time, estimating the rest of the
/// trip by the beeline driven at the given maximum velocity.
pub fn fastest_path_astar(
    meters_per_cell: f64,
    max_cells_per_sec: f64,
) -> BidirectionalAStar<impl Fn(&EdgeMetrics) -> f64, impl Fn(Coordinate, Coordinate) -> f64> {
    BidirectionalAStar::new(
        |metrics: &EdgeMetrics| metrics.travel_time,
        move |from: Coordinate, to: Coordinate| {
            1000.0 * haversine_distance(from, to) / (meters_per_cell * max_cells_per_sec)
        },
    )
}
