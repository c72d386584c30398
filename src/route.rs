use crate::EdgeId;
use std::collections::VecDeque;

/// The edges a vehicle still has to drive, in driving order.
///
/// A search result becomes a route, and the vehicle consumes it from the
/// front edge by edge as it spawns and crosses junctions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    edges: VecDeque<EdgeId>,
}

impl Route {
    /// Creates a route over the given edges.
    pub fn new(edges: Vec<EdgeId>) -> Self {
        Self {
            edges: edges.into(),
        }
    }

    /// Gets the next edge to drive without consuming it.
    pub fn peek_next(&self) -> Option<EdgeId> {
        self.edges.front().copied()
    }

    /// Consumes and returns the next edge to drive.
    pub fn advance(&mut self) -> Option<EdgeId> {
        self.edges.pop_front()
    }

    /// Gets the number of edges left to drive.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the route is finished.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterates the remaining edges in driving order.
    pub fn iter(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().copied()
    }
}

impl From<Vec<EdgeId>> for Route {
    fn from(edges: Vec<EdgeId>) -> Self {
        Self::new(edges)
    }
}
