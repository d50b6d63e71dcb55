//! The planar road graph itself: nodes snapped within a tolerance, edges
//! carrying a classified polyline.

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use smallvec::SmallVec;

use crate::error::RoadGraphError;
use crate::geometry::{self, Vec2};
use crate::road::class::{RoadClass, RoadMaterial};
use crate::spatial_index::SpatialGrid;

/// Minimum interior angle, in degrees, allowed between an inserted edge and
/// any edge already incident to the same node. Segments that would create
/// a sharper turn are rejected rather than silently kinked.
pub const MIN_ANGLE_DEG: f64 = 30.0;
/// Nodes within this distance, in meters, are snapped together instead of
/// left as two near-coincident intersections.
pub const SNAP_THRESHOLD: f64 = 15.0;
/// Segments shorter than this, in meters, are rejected as degenerate.
pub const MIN_SEGMENT_LENGTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadNodeType {
    Intersection,
    Endpoint,
    DeadEnd,
}

#[derive(Debug, Clone)]
pub struct RoadNode {
    pub position: Vec2,
    pub node_type: RoadNodeType,
}

#[derive(Debug, Clone)]
pub struct RoadEdge {
    /// Interior polyline points, endpoints excluded. Most segments are
    /// straight and carry none.
    pub points: SmallVec<[Vec2; 4]>,
    pub class: RoadClass,
    pub material: RoadMaterial,
    pub length: f64,
}

impl RoadEdge {
    /// Full polyline including both endpoints, in order from `a` to `b`.
    pub fn polyline(&self, a: Vec2, b: Vec2) -> Vec<Vec2> {
        let mut out = Vec::with_capacity(self.points.len() + 2);
        out.push(a);
        out.extend(self.points.iter().copied());
        out.push(b);
        out
    }
}

fn polyline_length(a: Vec2, points: &[Vec2], b: Vec2) -> f64 {
    let mut prev = a;
    let mut total = 0.0;
    for p in points {
        total += prev.distance(*p);
        prev = *p;
    }
    total + prev.distance(b)
}

/// An undirected planar graph of [`RoadNode`]s joined by [`RoadEdge`]s,
/// with a spatial index over node positions for snap/nearest queries.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    graph: UnGraph<RoadNode, RoadEdge>,
    index: SpatialGrid<NodeIndex>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            index: SpatialGrid::new(SNAP_THRESHOLD.max(1.0)),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn add_node(&mut self, position: Vec2, node_type: RoadNodeType) -> NodeIndex {
        let idx = self.graph.add_node(RoadNode { position, node_type });
        self.index.insert(idx, position);
        idx
    }

    /// Find the nearest existing node to `position` within `radius`.
    pub fn find_nearest(&self, position: Vec2, radius: f64) -> Option<(NodeIndex, f64)> {
        self.index.nearest(position, radius)
    }

    /// Snap to an existing node within [`SNAP_THRESHOLD`], or create a new
    /// one at `position` with the given `node_type`.
    pub fn snap_or_create(&mut self, position: Vec2, node_type: RoadNodeType) -> NodeIndex {
        if let Some((idx, _)) = self.find_nearest(position, SNAP_THRESHOLD) {
            idx
        } else {
            self.add_node(position, node_type)
        }
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&RoadNode> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut RoadNode> {
        self.graph.node_weight_mut(idx)
    }

    /// Move a node to `position`, keeping the spatial index in sync. Used by
    /// the welder's intersection jitter pass, where `node_mut` alone would
    /// leave the index pointing at the node's old spot.
    pub fn reposition_node(&mut self, idx: NodeIndex, position: Vec2) {
        if let Some(node) = self.graph.node_weight(idx) {
            let old = node.position;
            self.index.remove(idx, old);
        } else {
            return;
        }
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.position = position;
        }
        self.index.insert(idx, position);
    }

    pub fn edge(&self, idx: EdgeIndex) -> Option<&RoadEdge> {
        self.graph.edge_weight(idx)
    }

    pub fn edge_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn edges_of_node(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(idx).map(|e| e.id())
    }

    pub fn node_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges(idx).count()
    }

    pub fn find_edge(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// The smallest angle, in degrees, between the proposed direction
    /// `from -> to` and any edge already incident to `from`. `None` if
    /// `from` currently has no incident edges.
    fn min_incident_angle(&self, from: NodeIndex, to: Vec2) -> Option<f64> {
        let from_pos = self.graph.node_weight(from)?.position;
        let new_angle = geometry::direction_angle(from_pos, to);
        self.graph
            .edges(from)
            .filter_map(|e| {
                let other = if e.source() == from { e.target() } else { e.source() };
                let other_pos = self.graph.node_weight(other)?.position;
                Some(geometry::angle_diff(
                    new_angle,
                    geometry::direction_angle(from_pos, other_pos),
                ))
            })
            .fold(None, |acc, d| Some(acc.map_or(d, |a: f64| a.min(d))))
    }

    /// Insert an edge between two already-existing nodes, enforcing the
    /// minimum-angle, minimum-length, and no-duplicate invariants.
    pub fn add_edge(
        &mut self,
        a: NodeIndex,
        b: NodeIndex,
        points: SmallVec<[Vec2; 4]>,
        class: RoadClass,
        material: RoadMaterial,
    ) -> Result<EdgeIndex, RoadGraphError> {
        let a_pos = self
            .graph
            .node_weight(a)
            .ok_or(RoadGraphError::UnknownNode(a.index()))?
            .position;
        let b_pos = self
            .graph
            .node_weight(b)
            .ok_or(RoadGraphError::UnknownNode(b.index()))?
            .position;

        if a == b {
            return Err(RoadGraphError::DegenerateSegment);
        }
        // An edge between these two nodes already exists: return it
        // unchanged rather than rejecting, so `paint-road(a, b)` called
        // twice is idempotent.
        if let Some(existing) = self.graph.find_edge(a, b) {
            return Ok(existing);
        }

        let length = polyline_length(a_pos, &points, b_pos);
        if length < MIN_SEGMENT_LENGTH {
            return Err(RoadGraphError::TooShort(length));
        }

        let first_leg = points.first().copied().unwrap_or(b_pos);
        if let Some(min_angle) = self.min_incident_angle(a, first_leg) {
            if min_angle.to_degrees() < MIN_ANGLE_DEG {
                return Err(RoadGraphError::MinAngleViolation);
            }
        }
        let last_leg = points.last().copied().unwrap_or(a_pos);
        if let Some(min_angle) = self.min_incident_angle(b, last_leg) {
            if min_angle.to_degrees() < MIN_ANGLE_DEG {
                return Err(RoadGraphError::MinAngleViolation);
            }
        }

        let edge = RoadEdge {
            points,
            class,
            material,
            length,
        };
        Ok(self.graph.add_edge(a, b, edge))
    }

    pub fn remove_edge(&mut self, idx: EdgeIndex) -> Option<RoadEdge> {
        self.graph.remove_edge(idx)
    }

    /// Rewire every edge incident to `from` so that endpoint becomes `to`,
    /// dropping any that would become a self-loop and deduping against an
    /// edge that already exists between `to` and the other endpoint, then
    /// delete `from`. Used by the welder to collapse two near-coincident
    /// intersections into one.
    pub fn merge_nodes(&mut self, from: NodeIndex, to: NodeIndex) {
        if from == to {
            return;
        }
        let incident: Vec<EdgeIndex> = self.graph.edges(from).map(|e| e.id()).collect();
        for edge_idx in incident {
            let Some((a, b)) = self.graph.edge_endpoints(edge_idx) else {
                continue;
            };
            let other = if a == from { b } else { a };
            let Some(edge) = self.graph.remove_edge(edge_idx) else {
                continue;
            };
            if other == to || self.graph.find_edge(to, other).is_some() {
                continue;
            }
            self.graph.add_edge(to, other, edge);
        }
        if let Some(node) = self.graph.node_weight(from) {
            self.index.remove(from, node.position);
        }
        self.graph.remove_node(from);
    }

    /// Remove a node and all incident edges. Returns `None` if it did not
    /// exist. Note this may renumber other node/edge indices (petgraph's
    /// swap-remove semantics); callers that hold onto indices across a
    /// removal must re-resolve them.
    pub fn remove_node(&mut self, idx: NodeIndex) -> Option<RoadNode> {
        if let Some(node) = self.graph.node_weight(idx) {
            self.index.remove(idx, node.position);
        }
        self.graph.remove_node(idx)
    }

    pub fn node_has_edges(&self, idx: NodeIndex) -> bool {
        self.graph.edges(idx).next().is_some()
    }

    /// Total length of every edge, in meters.
    pub fn total_length(&self) -> f64 {
        self.graph.edge_weights().map(|e| e.length).sum()
    }
}

impl Default for RoadGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_two_nodes_and_an_edge() {
        let mut g = RoadGraph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0), RoadNodeType::Endpoint);
        let b = g.add_node(Vec2::new(100.0, 0.0), RoadNodeType::Endpoint);
        let e = g
            .add_edge(a, b, SmallVec::new(), RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap();
        assert_eq!(g.edge_count(), 1);
        assert!((g.edge(e).unwrap().length - 100.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_edge_returns_the_existing_one() {
        let mut g = RoadGraph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0), RoadNodeType::Endpoint);
        let b = g.add_node(Vec2::new(100.0, 0.0), RoadNodeType::Endpoint);
        let first = g
            .add_edge(a, b, SmallVec::new(), RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap();
        let second = g
            .add_edge(a, b, SmallVec::new(), RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn merge_nodes_rewires_edges_and_drops_the_source() {
        let mut g = RoadGraph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0), RoadNodeType::Endpoint);
        let b = g.add_node(Vec2::new(100.0, 0.0), RoadNodeType::Intersection);
        let c = g.add_node(Vec2::new(105.0, 5.0), RoadNodeType::Intersection);
        let d = g.add_node(Vec2::new(200.0, 5.0), RoadNodeType::Endpoint);
        g.add_edge(a, b, SmallVec::new(), RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap();
        g.add_edge(c, d, SmallVec::new(), RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap();

        g.merge_nodes(c, b);

        assert!(g.node(c).is_none());
        assert_eq!(g.node_count(), 3);
        assert!(g.find_edge(b, d).is_some());
    }

    #[test]
    fn sharp_turn_is_rejected() {
        let mut g = RoadGraph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0), RoadNodeType::Intersection);
        let b = g.add_node(Vec2::new(100.0, 0.0), RoadNodeType::Endpoint);
        let c = g.add_node(Vec2::new(-10.0, 1.0), RoadNodeType::Endpoint);
        g.add_edge(a, b, SmallVec::new(), RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap();
        let err = g
            .add_edge(a, c, SmallVec::new(), RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap_err();
        assert_eq!(err, RoadGraphError::MinAngleViolation);
    }

    #[test]
    fn snap_or_create_reuses_nearby_node() {
        let mut g = RoadGraph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0), RoadNodeType::Endpoint);
        let snapped = g.snap_or_create(Vec2::new(5.0, 5.0), RoadNodeType::Endpoint);
        assert_eq!(a, snapped);
        assert_eq!(g.node_count(), 1);

        let far = g.snap_or_create(Vec2::new(1000.0, 1000.0), RoadNodeType::Endpoint);
        assert_ne!(a, far);
        assert_eq!(g.node_count(), 2);
    }
}
