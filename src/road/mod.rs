//! Road graph: classified, welded segments over a planar node set.

pub mod class;
pub mod graph;

pub use class::{Era, RoadClass, RoadMaterial};
pub use graph::{RoadEdge, RoadGraph, RoadNode, RoadNodeType};
