//! Shortest path search over street graphs.
//!
//! The engines are written against the [`SearchGraph`] trait rather than a
//! concrete graph, so routes can be planned on the live street graph as well
//! as on any other structure that can answer the neighbourhood queries.
//! Edge weights and remaining cost estimates are plain closures over
//! [`EdgeMetrics`] and coordinates, which is how the engines are specialized
//! into Dijkstra, distance A* and travel time A* variants.

use crate::math::Coordinate;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub mod astar;
pub mod bidirectional;

pub use astar::AStar;
pub use bidirectional::BidirectionalAStar;

/// The measures of an edge consulted by the search weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeMetrics {
    /// Length of the edge in cells.
    pub length: u32,
    /// Unimpeded travel time over the edge in ms.
    pub travel_time: f64,
}

/// A directed graph the search engines can run on.
pub trait SearchGraph {
    type Node: Copy + Eq + Hash + Debug;
    type Edge: Copy + Eq + Hash + Debug;

    /// Gets the edges leaving a node, restricted to the turns permitted when
    /// arriving over the given edge. `None` queries an unconditioned start.
    fn leaving_edges(&self, node: Self::Node, arrived_on: Option<Self::Edge>)
        -> SmallVec<[Self::Edge; 8]>;

    /// Gets the edges entering a node.
    fn incoming_edges(&self, node: Self::Node) -> SmallVec<[Self::Edge; 8]>;

    /// Gets the node an edge leaves from.
    fn edge_origin(&self, edge: Self::Edge) -> Self::Node;

    /// Gets the node an edge arrives at.
    fn edge_destination(&self, edge: Self::Edge) -> Self::Node;

    /// Gets the measures of an edge.
    fn edge_metrics(&self, edge: Self::Edge) -> EdgeMetrics;

    /// Gets the position of a node.
    fn coordinate(&self, node: Self::Node) -> Coordinate;
}

/// Frontier entry ordering nodes by ascending estimated total cost.
pub(crate) struct WeightedNode<N> {
    /// The reached node.
    pub node: N,
    /// Cost accumulated on the way to the node.
    pub cost: f64,
    /// Accumulated cost plus the estimated rest.
    pub estimate: f64,
}

impl<N> PartialEq for WeightedNode<N> {
    fn eq(&self, other: &Self) -> bool {
        self.estimate.total_cmp(&other.estimate) == Ordering::Equal
    }
}

impl<N> Eq for WeightedNode<N> {}

impl<N> PartialOrd for WeightedNode<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N> Ord for WeightedNode<N> {
    // Reversed, so that the std max-heap pops the cheapest node first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.estimate.total_cmp(&self.estimate)
    }
}

/// Cheapest known step into (or out of) a node.
pub(crate) struct WeightedEdge<E> {
    /// Cost accumulated up to and including the edge.
    pub cost: f64,
    /// The taken edge.
    pub edge: E,
}

/// Walks the recorded predecessor edges from `end` back to `start` and
/// returns them in travel order.
pub(crate) fn assemble_path<G: SearchGraph>(
    graph: &G,
    predecessors: &HashMap<G::Node, WeightedEdge<G::Edge>>,
    start: G::Node,
    end: G::Node,
) -> Vec<G::Edge> {
    let mut path = Vec::new();
    let mut node = end;
    while node != start {
        let step = &predecessors[&node];
        path.push(step.edge);
        node = graph.edge_origin(step.edge);
    }
    path.reverse();
    path
}

#[cfg(test)]
pub(crate) mod mesh {
    //! A hand-built graph for the engine tests.

    use super::{EdgeMetrics, SearchGraph};
    use crate::math::Coordinate;
    use smallvec::SmallVec;
    use std::collections::HashMap;

    /// One directed street of the test graph.
    pub struct Street {
        pub origin: usize,
        pub destination: usize,
        /// Length in cells.
        pub cells: u32,
        /// Speed limit in cells/s.
        pub velocity: f64,
    }

    /// Adjacency list graph with optional turn restrictions.
    pub struct Mesh {
        pub nodes: Vec<Coordinate>,
        pub streets: Vec<Street>,
        /// Leaving edges permitted per arriving edge; absent means all.
        pub turns: HashMap<usize, Vec<usize>>,
    }

    impl Mesh {
        pub fn new(nodes: Vec<Coordinate>) -> Self {
            Self {
                nodes,
                streets: Vec::new(),
                turns: HashMap::new(),
            }
        }

        /// Adds a street and returns its edge index.
        pub fn street(&mut self, origin: usize, destination: usize, cells: u32) -> usize {
            self.streets.push(Street {
                origin,
                destination,
                cells,
                velocity: 6.0,
            });
            self.streets.len() - 1
        }

        /// Adds a street with its own speed limit.
        pub fn street_with_velocity(
            &mut self,
            origin: usize,
            destination: usize,
            cells: u32,
            velocity: f64,
        ) -> usize {
            let edge = self.street(origin, destination, cells);
            self.streets[edge].velocity = velocity;
            edge
        }

        /// Restricts the turns of an arriving edge to the given leaving edges.
        pub fn restrict(&mut self, arriving: usize, leaving: Vec<usize>) {
            self.turns.insert(arriving, leaving);
        }

        fn all_leaving(&self, node: usize) -> SmallVec<[usize; 8]> {
            self.streets
                .iter()
                .enumerate()
                .filter(|(_, street)| street.origin == node)
                .map(|(edge, _)| edge)
                .collect()
        }
    }

    impl SearchGraph for Mesh {
        type Node = usize;
        type Edge = usize;

        fn leaving_edges(&self, node: usize, arrived_on: Option<usize>) -> SmallVec<[usize; 8]> {
            let Some(arrived) = arrived_on else {
                return self.all_leaving(node);
            };
            match self.turns.get(&arrived) {
                Some(leaving) => leaving
                    .iter()
                    .copied()
                    .filter(|&edge| self.streets[edge].origin == node)
                    .collect(),
                None => self.all_leaving(node),
            }
        }

        fn incoming_edges(&self, node: usize) -> SmallVec<[usize; 8]> {
            self.streets
                .iter()
                .enumerate()
                .filter(|(_, street)| street.destination == node)
                .map(|(edge, _)| edge)
                .collect()
        }

        fn edge_origin(&self, edge: usize) -> usize {
            self.streets[edge].origin
        }

        fn edge_destination(&self, edge: usize) -> usize {
            self.streets[edge].destination
        }

        fn edge_metrics(&self, edge: usize) -> EdgeMetrics {
            let street = &self.streets[edge];
            EdgeMetrics {
                length: street.cells,
                travel_time: 1000.0 * f64::from(street.cells) / street.velocity,
            }
        }

        fn coordinate(&self, node: usize) -> Coordinate {
            self.nodes[node]
        }
    }

    /// Nodes laid out on a lat/lon grid, spaced `step` degrees apart.
    pub fn grid_coordinates(positions: &[(i32, i32)], step: f64) -> Vec<Coordinate> {
        positions
            .iter()
            .map(|&(x, y)| Coordinate::new(52.0 + step * f64::from(y), 13.0 + step * f64::from(x)))
            .collect()
    }
}
