pub use cgmath;
pub use config::{CrossingConfig, SimulationConfig};
pub use edge::{DirectedEdge, EdgeAttributes, Lane};
pub use graph::StreetGraph;
pub use math::Coordinate;
pub use node::Node;
pub use route::Route;
pub use search::{EdgeMetrics, SearchGraph};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use vehicle::{Vehicle, VehicleState};

mod config;
mod edge;
mod graph;
pub mod indices;
pub mod math;
mod node;
mod route;
pub mod search;
mod vehicle;

new_key_type! {
    /// Unique ID of a junction [Node].
    pub struct NodeId;
    /// Unique ID of a [DirectedEdge].
    pub struct EdgeId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

/// Arena of all junctions in a street graph.
pub type NodeSet = SlotMap<NodeId, Node>;
/// Arena of all directed edges in a street graph.
pub type EdgeSet = SlotMap<EdgeId, DirectedEdge>;
/// Arena of all vehicles known to the caller's simulation.
pub type VehicleSet = SlotMap<VehicleId, Vehicle>;
