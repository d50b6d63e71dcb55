//! Intersection welder: folds a new road polyline into an existing graph,
//! splitting whatever it crosses and snapping whatever it touches.
//!
//! This runs online, one road at a time, rather than as a batch planar
//! overlay, which keeps the procedural layout generator's incremental
//! insertion order meaningful (later roads yield to earlier ones at a
//! crossing, matching how the layout stages build highways first and
//! infill last).

use petgraph::graph::NodeIndex;

use crate::error::WelderError;
use crate::geometry::{self, Vec2};
use crate::rng::Mulberry32;
use crate::road::class::{RoadClass, RoadMaterial};
use crate::road::graph::{RoadGraph, RoadNodeType, SNAP_THRESHOLD};

/// Crossings within this distance, in meters, of an existing node are
/// treated as touching that node rather than as a new intersection.
pub const INTERSECTION_MERGE_DIST: f64 = 10.0;
/// Minimum perpendicular clearance, in meters, layout generation should
/// leave between two roads that don't actually cross.
pub const MIN_ROAD_SEPARATION: f64 = 20.0;
/// Tolerance, in meters, for treating a near-miss crossing as exact.
pub const INTERSECTION_EPS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionType {
    End,
    Through,
    TJunction,
    Cross,
    Complex,
}

/// Classify a node by its current degree in the graph.
pub fn classify_intersection(graph: &RoadGraph, node: NodeIndex) -> IntersectionType {
    match graph.node_degree(node) {
        0 | 1 => IntersectionType::End,
        2 => IntersectionType::Through,
        3 => IntersectionType::TJunction,
        4 => IntersectionType::Cross,
        _ => IntersectionType::Complex,
    }
}

/// A derived record describing one node's role as a road junction: its
/// incident segments, a classification by degree, the mean angle of its
/// incident legs, and a footprint radius sized off the widest of them.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub node: NodeIndex,
    pub position: Vec2,
    pub incident: Vec<petgraph::graph::EdgeIndex>,
    pub intersection_type: IntersectionType,
    pub orientation: f64,
    pub radius: f64,
}

fn describe_intersection(graph: &RoadGraph, node: NodeIndex) -> Intersection {
    let position = graph.node(node).unwrap().position;
    let incident: Vec<_> = graph.edges_of_node(node).collect();
    let angles: Vec<f64> = incident
        .iter()
        .filter_map(|&e| {
            let (a, b) = graph.edge_endpoints(e)?;
            let other = if a == node { b } else { a };
            let other_pos = graph.node(other)?.position;
            Some(geometry::direction_angle(position, other_pos))
        })
        .collect();
    let orientation = if angles.is_empty() {
        0.0
    } else {
        angles.iter().sum::<f64>() / angles.len() as f64
    };
    let max_width = incident
        .iter()
        .filter_map(|&e| graph.edge(e))
        .map(|e| e.class.base_width())
        .fold(0.0_f64, f64::max);
    Intersection {
        node,
        position,
        incident,
        intersection_type: classify_intersection(graph, node),
        orientation,
        radius: 0.75 * max_width,
    }
}

fn cumulative_lengths(poly: &[Vec2]) -> Vec<f64> {
    let mut acc = vec![0.0; poly.len()];
    for i in 1..poly.len() {
        acc[i] = acc[i - 1] + poly[i - 1].distance(poly[i]);
    }
    acc
}

/// Split a polyline (endpoints included) at a point known to lie on
/// segment `seg_index`, returning the interior points strictly before and
/// strictly after the split (endpoints and the split point itself excluded
/// from both).
fn split_interior(poly: &[Vec2], seg_index: usize) -> (Vec<Vec2>, Vec<Vec2>) {
    let before = poly[1..=seg_index].to_vec();
    let after = poly[seg_index + 1..poly.len().saturating_sub(1)].to_vec();
    (before, after)
}

struct ExistingCrossing {
    edge: petgraph::graph::EdgeIndex,
    point: Vec2,
    seg_index: usize,
}

struct NewRoadCrossing {
    param: f64,
    point: Vec2,
}

/// Wraps a [`RoadGraph`], weaving newly inserted roads into it.
pub struct IntersectionWelder {
    graph: RoadGraph,
}

impl IntersectionWelder {
    pub fn new() -> Self {
        Self {
            graph: RoadGraph::new(),
        }
    }

    pub fn from_graph(graph: RoadGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn into_graph(self) -> RoadGraph {
        self.graph
    }

    /// Weld a new road, given as a full polyline of at least two points,
    /// into the graph. Returns the edges created for the (possibly split)
    /// road, in order from the first point to the last.
    pub fn insert_road(
        &mut self,
        points: &[Vec2],
        class: RoadClass,
        material: RoadMaterial,
    ) -> Result<Vec<petgraph::graph::EdgeIndex>, WelderError> {
        if points.len() < 2 {
            return Err(WelderError::Graph(crate::error::RoadGraphError::DegenerateSegment));
        }

        let new_cumulative = cumulative_lengths(points);

        // Find every point where the new road crosses an existing edge,
        // splitting that edge in place as we go.
        let mut new_crossings: Vec<NewRoadCrossing> = Vec::new();

        let existing_edges: Vec<_> = self.graph.edges().collect();
        for edge_idx in existing_edges {
            let Some((a, b)) = self.graph.edge_endpoints(edge_idx) else {
                continue;
            };
            let Some(edge) = self.graph.edge(edge_idx) else {
                continue;
            };
            let a_pos = self.graph.node(a).unwrap().position;
            let b_pos = self.graph.node(b).unwrap().position;
            let old_poly = edge.polyline(a_pos, b_pos);
            let old_cumulative = cumulative_lengths(&old_poly);

            let mut found: Option<ExistingCrossing> = None;
            'outer: for i in 0..points.len() - 1{
                for j in 0..old_poly.len() - 1 {
                    if let Some(p) = geometry::segment_intersect(
                        points[i],
                        points[i + 1],
                        old_poly[j],
                        old_poly[j + 1],
                    ) {
                        // Only a crossing strictly interior to both segments
                        // gets split here; one that lands within epsilon of
                        // an existing endpoint is a touch, handled by
                        // snapping instead.
                        if p.distance(a_pos) < INTERSECTION_EPS
                            || p.distance(b_pos) < INTERSECTION_EPS
                        {
                            continue;
                        }
                        let new_param = new_cumulative[i] + points[i].distance(p);
                        new_crossings.push(NewRoadCrossing { param: new_param, point: p });
                        found = Some(ExistingCrossing { edge: edge_idx, point: p, seg_index: j });
                        break 'outer;
                    }
                }
            }

            if let Some(crossing) = found {
                let (before, after) = split_interior(&old_poly, crossing.seg_index);
                let class = edge.class;
                let material = edge.material;
                self.graph.remove_edge(crossing.edge);
                let node = self.weld_node(crossing.point);
                let _ = self.graph.add_edge(
                    a,
                    node,
                    before.into(),
                    class,
                    material,
                );
                let _ = self.graph.add_edge(
                    node,
                    b,
                    after.into(),
                    class,
                    material,
                );
            }
        }

        new_crossings.sort_by(|x, y| x.param.partial_cmp(&y.param).unwrap());

        let start = self.weld_node(points[0]);
        let end = self.weld_node(points[points.len() - 1]);

        let mut chain = vec![(0.0, start, points[0])];
        for c in &new_crossings {
            let node = self.weld_node(c.point);
            chain.push((c.param, node, c.point));
        }
        chain.push((new_cumulative[points.len() - 1], end, points[points.len() - 1]));

        let mut created = Vec::with_capacity(chain.len().saturating_sub(1));
        for w in chain.windows(2) {
            let (param_a, node_a, _) = w[0];
            let (param_b, node_b, _) = w[1];
            if node_a == node_b {
                continue;
            }
            let interior: smallvec::SmallVec<[Vec2; 4]> = points
                .iter()
                .zip(new_cumulative.iter())
                .filter(|(_, &p)| p > param_a + 1e-6 && p < param_b - 1e-6)
                .map(|(&pt, _)| pt)
                .collect();
            // A duplicate (a, b) pair comes back as the existing edge id,
            // not an error, so every successful call lands here.
            let e = self
                .graph
                .add_edge(node_a, node_b, interior, class, material)
                .map_err(WelderError::Graph)?;
            created.push(e);
        }

        if created.is_empty() {
            return Err(WelderError::UnresolvedCrossing);
        }

        Ok(created)
    }

    /// One bounded optimization pass over every junction: intersections
    /// closer than [`INTERSECTION_MERGE_DIST`] collapse into one via
    /// [`RoadGraph::merge_nodes`], then any surviving junction whose
    /// narrowest incident angle is below the minimum turn angle gets
    /// jittered a few meters off its original spot to open the corner up.
    /// Returns the derived [`Intersection`] records left standing.
    pub fn optimize_intersections(&mut self, rng: &mut Mulberry32) -> Vec<Intersection> {
        let mut junctions: Vec<NodeIndex> = self
            .graph
            .nodes()
            .filter(|&n| self.graph.node_degree(n) >= 3)
            .collect();

        let mut i = 0;
        while i < junctions.len() {
            let a = junctions[i];
            let Some(a_pos) = self.graph.node(a).map(|n| n.position) else {
                junctions.remove(i);
                continue;
            };
            let mut merged = false;
            let mut j = i + 1;
            while j < junctions.len() {
                let b = junctions[j];
                let Some(b_pos) = self.graph.node(b).map(|n| n.position) else {
                    junctions.remove(j);
                    continue;
                };
                if a_pos.distance(b_pos) < INTERSECTION_MERGE_DIST {
                    self.graph.merge_nodes(b, a);
                    junctions.remove(j);
                    merged = true;
                } else {
                    j += 1;
                }
            }
            if !merged {
                i += 1;
            }
        }

        const JITTER_DIST: f64 = 5.0;
        for &node in &junctions {
            let record = describe_intersection(&self.graph, node);
            let narrow = record
                .incident
                .iter()
                .filter_map(|&e| {
                    let (a, b) = self.graph.edge_endpoints(e)?;
                    let other = if a == node { b } else { a };
                    let other_pos = self.graph.node(other)?.position;
                    Some(geometry::direction_angle(record.position, other_pos))
                })
                .collect::<Vec<_>>()
                .windows(2)
                .map(|w| geometry::angle_diff(w[0], w[1]).to_degrees())
                .fold(f64::MAX, f64::min);
            if narrow < crate::road::graph::MIN_ANGLE_DEG {
                let jitter_angle = rng.range_f64(0.0, std::f64::consts::TAU);
                let offset = Vec2::new(jitter_angle.cos(), jitter_angle.sin()) * JITTER_DIST;
                self.graph.reposition_node(node, record.position + offset);
            }
        }

        junctions
            .into_iter()
            .map(|n| describe_intersection(&self.graph, n))
            .collect()
    }

    /// Snap to an existing node within [`SNAP_THRESHOLD`]/
    /// [`INTERSECTION_MERGE_DIST`] of `position`, or create a fresh
    /// intersection node there.
    fn weld_node(&mut self, position: Vec2) -> NodeIndex {
        let radius = SNAP_THRESHOLD.max(INTERSECTION_MERGE_DIST);
        if let Some((idx, _)) = self.graph.find_nearest(position, radius) {
            idx
        } else {
            self.graph.add_node(position, RoadNodeType::Intersection)
        }
    }
}

impl Default for IntersectionWelder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_crossing_roads_weld_into_four_edges() {
        let mut welder = IntersectionWelder::new();
        welder
            .insert_road(
                &[Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0)],
                RoadClass::Local,
                RoadMaterial::Asphalt,
            )
            .unwrap();
        welder
            .insert_road(
                &[Vec2::new(0.0, -50.0), Vec2::new(0.0, 50.0)],
                RoadClass::Local,
                RoadMaterial::Asphalt,
            )
            .unwrap();

        assert_eq!(welder.graph().edge_count(), 4);
        assert_eq!(welder.graph().node_count(), 5);
    }

    #[test]
    fn touching_endpoint_snaps_instead_of_splitting() {
        let mut welder = IntersectionWelder::new();
        welder
            .insert_road(
                &[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)],
                RoadClass::Local,
                RoadMaterial::Asphalt,
            )
            .unwrap();
        welder
            .insert_road(
                &[Vec2::new(100.0, 0.0), Vec2::new(100.0, 100.0)],
                RoadClass::Local,
                RoadMaterial::Asphalt,
            )
            .unwrap();

        assert_eq!(welder.graph().node_count(), 3);
        assert_eq!(welder.graph().edge_count(), 2);
    }

    #[test]
    fn single_road_has_no_crossings() {
        let mut welder = IntersectionWelder::new();
        let edges = welder
            .insert_road(
                &[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 5.0)],
                RoadClass::Street,
                RoadMaterial::Asphalt,
            )
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(welder.graph().edge_count(), 1);
    }
}
