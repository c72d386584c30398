use crate::math::Vector2d;
use crate::{EdgeId, NodeId};
use std::collections::BTreeSet;

/// A directed street edge between two junctions.
///
/// Edges are discretized into cells. The per-lane occupancy kept here is the
/// little the crossing logic needs to know about traffic on the street:
/// which cells are taken, and whether a lane can accept another vehicle at
/// its entry.
#[derive(Clone)]
pub struct DirectedEdge {
    /// The edge ID.
    id: EdgeId,
    /// The junction this edge leaves.
    origin: NodeId,
    /// The junction this edge enters.
    destination: NodeId,
    /// Discretized street length in cells.
    cells: u32,
    /// Street direction at the origin.
    origin_direction: Vector2d,
    /// Street direction at the destination.
    destination_direction: Vector2d,
    /// Number of parallel lanes.
    lane_count: u8,
    /// Speed limit in cells/s.
    max_velocity: f64,
    /// Weight of the street type in the arbitration.
    priority_level: i8,
    /// Occupied cells, per lane.
    occupancy: Vec<BTreeSet<u32>>,
}

/// The attributes of a directed edge.
pub struct EdgeAttributes {
    /// The junction the edge leaves.
    pub origin: NodeId,
    /// The junction the edge enters.
    pub destination: NodeId,
    /// Street length in m.
    pub length: f64,
    /// Street direction at the origin.
    pub origin_direction: Vector2d,
    /// Street direction at the destination.
    pub destination_direction: Vector2d,
    /// Number of parallel lanes.
    pub lanes: u8,
    /// Speed limit in cells/s.
    pub max_velocity: f64,
    /// Priority level of the street type.
    pub priority_level: i8,
}

/// A single lane of a directed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lane {
    /// The edge the lane belongs to.
    pub edge: EdgeId,
    /// Position of the lane on its edge, `0` being the outermost lane.
    pub index: u8,
}

impl Lane {
    /// Creates a lane handle.
    pub fn new(edge: EdgeId, index: u8) -> Self {
        Self { edge, index }
    }
}

impl DirectedEdge {
    /// Creates a new edge.
    pub(crate) fn new(id: EdgeId, attribs: &EdgeAttributes, cells: u32) -> Self {
        assert!(attribs.lanes > 0, "an edge needs at least one lane");
        assert!(cells > 0, "an edge needs at least one cell");
        Self {
            id,
            origin: attribs.origin,
            destination: attribs.destination,
            cells,
            origin_direction: attribs.origin_direction,
            destination_direction: attribs.destination_direction,
            lane_count: attribs.lanes,
            max_velocity: attribs.max_velocity,
            priority_level: attribs.priority_level,
            occupancy: vec![BTreeSet::new(); attribs.lanes as usize],
        }
    }

    /// Gets the edge ID.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Gets the junction this edge leaves.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Gets the junction this edge enters.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Gets the length of the edge in cells.
    pub fn length(&self) -> u32 {
        self.cells
    }

    /// Gets the time a vehicle driving at the speed limit needs for the
    /// whole edge, in ms.
    pub fn travel_time_millis(&self) -> f64 {
        1000.0 * f64::from(self.cells) / self.max_velocity
    }

    /// Gets the speed limit in cells/s.
    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Gets the priority level of the street type.
    pub fn priority_level(&self) -> i8 {
        self.priority_level
    }

    /// Gets the number of parallel lanes.
    pub fn lane_count(&self) -> u8 {
        self.lane_count
    }

    /// Gets the street direction at the origin.
    pub fn origin_direction(&self) -> Vector2d {
        self.origin_direction
    }

    /// Gets the street direction at the destination.
    pub fn destination_direction(&self) -> Vector2d {
        self.destination_direction
    }

    /// Gets a handle to the lane with the given index.
    pub fn lane(&self, index: u8) -> Lane {
        assert!(index < self.lane_count, "lane index out of range");
        Lane::new(self.id, index)
    }

    /// Iterates the lanes in ascending index order.
    pub fn lanes(&self) -> impl DoubleEndedIterator<Item = Lane> {
        let id = self.id;
        (0..self.lane_count).map(move |index| Lane::new(id, index))
    }

    /// Marks a cell of a lane as occupied.
    pub fn insert_vehicle(&mut self, lane: u8, cell: u32) {
        assert!(cell < self.cells, "cell out of range");
        self.occupancy[lane as usize].insert(cell);
    }

    /// Marks a cell of a lane as free again.
    pub fn remove_vehicle(&mut self, lane: u8, cell: u32) {
        self.occupancy[lane as usize].remove(&cell);
    }

    /// Gets the cell furthest into the lane at which a vehicle could still
    /// enter, or `None` if the lane entry is blocked.
    pub fn max_insertion_cell(&self, lane: u8) -> Option<u32> {
        match self.occupancy[lane as usize].iter().next() {
            None => Some(self.cells - 1),
            Some(&rearmost) => rearmost.checked_sub(1),
        }
    }

    /// Whether the lane can take another vehicle at its entry.
    pub fn has_room(&self, lane: u8) -> bool {
        self.max_insertion_cell(lane).is_some()
    }

    /// Clears all occupancy.
    pub(crate) fn reset(&mut self) {
        for lane in &mut self.occupancy {
            lane.clear();
        }
    }

    /// Captures the occupancy as JSON for inspection.
    #[cfg(feature = "debug")]
    pub fn debug_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "street": format!("{:?}", self.id),
            "cells": self.cells,
            "occupancy": self
                .occupancy
                .iter()
                .map(|lane| lane.iter().copied().collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::Vector2;

    fn edge_with_cells(cells: u32) -> DirectedEdge {
        let attribs = EdgeAttributes {
            origin: NodeId::default(),
            destination: NodeId::default(),
            length: 1.0,
            origin_direction: Vector2::new(1.0, 0.0),
            destination_direction: Vector2::new(1.0, 0.0),
            lanes: 1,
            max_velocity: 2.0,
            priority_level: 0,
        };
        DirectedEdge::new(EdgeId::default(), &attribs, cells)
    }

    #[test]
    fn insertion_cell_tracks_the_rearmost_vehicle() {
        let mut edge = edge_with_cells(10);
        assert_eq!(edge.max_insertion_cell(0), Some(9));

        edge.insert_vehicle(0, 6);
        assert_eq!(edge.max_insertion_cell(0), Some(5));
        edge.insert_vehicle(0, 3);
        assert_eq!(edge.max_insertion_cell(0), Some(2));

        edge.insert_vehicle(0, 0);
        assert_eq!(edge.max_insertion_cell(0), None);
        assert!(!edge.has_room(0));

        edge.remove_vehicle(0, 0);
        assert_eq!(edge.max_insertion_cell(0), Some(2));
        assert!(edge.has_room(0));
    }

    #[test]
    fn travel_time_scales_with_length() {
        let edge = edge_with_cells(12);
        assert_eq!(edge.travel_time_millis(), 6000.0);
    }
}
