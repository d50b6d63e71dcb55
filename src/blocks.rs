//! Block finder: extracts the small cycles in the road graph that bound
//! city blocks.
//!
//! This deliberately is not a full planar-face enumeration. A bounded-depth
//! DFS that gives up past [`MAX_CYCLE_NODES`] nodes or [`MAX_CYCLES`] total
//! results is simpler to keep deterministic and fast on the kind of welded
//! graphs this crate produces, where blocks are small by construction; it
//! can miss an unusually large block, which callers should treat as
//! acceptable fallout rather than a bug to chase.

use std::collections::HashSet;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::error::BlockFinderError;
use crate::geometry::{self, Vec2};
use crate::road::RoadGraph;

/// Cycles longer than this many nodes are not explored further.
pub const MAX_CYCLE_NODES: usize = 12;
/// Stop searching once this many candidate cycles have been found.
pub const MAX_CYCLES: usize = 500;
/// Cycles enclosing less area than this, in square meters, are discarded.
pub const MIN_BLOCK_AREA: f64 = 100.0;
/// Cycles enclosing more area than this, in square meters, are discarded
/// (almost certainly the outer boundary rather than a real block).
pub const MAX_BLOCK_AREA: f64 = 50_000.0;

#[derive(Debug, Clone)]
pub struct Block {
    pub id: u64,
    pub nodes: Vec<NodeIndex>,
    pub polygon: Vec<Vec2>,
    /// Interior hole polygons (e.g. a courtyard enclosed by its own loop of
    /// roads). The bounded-depth cycle search below never produces these;
    /// always empty until a face-aware extractor replaces it.
    pub holes: Vec<Vec<Vec2>>,
    /// Road-graph edge bounding this block, one per polygon edge, in the
    /// same winding order as `polygon`.
    pub edge_ids: Vec<EdgeIndex>,
    pub area: f64,
    /// Ids of the parcels this block has been subdivided into, populated
    /// once subdivision runs.
    pub parcel_ids: Vec<u64>,
}

/// Find all small cycles in `graph` that look like city blocks: a closed,
/// non-self-intersecting polygon with area in `[MIN_BLOCK_AREA,
/// MAX_BLOCK_AREA]`.
pub fn find_blocks(graph: &RoadGraph) -> Result<Vec<Block>, BlockFinderError> {
    if graph.edge_count() == 0 {
        return Err(BlockFinderError::EmptyGraph);
    }

    let mut cycles: Vec<Vec<NodeIndex>> = Vec::new();
    let mut seen_keys: HashSet<Vec<usize>> = HashSet::new();

    for start in graph.nodes() {
        if cycles.len() >= MAX_CYCLES {
            break;
        }
        let mut path = vec![start];
        let mut visited = HashSet::new();
        visited.insert(start);
        dfs(graph, start, start, &mut path, &mut visited, &mut cycles, &mut seen_keys);
    }

    let mut blocks: Vec<Block> = cycles
        .into_iter()
        .filter_map(|nodes| {
            let polygon: Vec<Vec2> = nodes.iter().map(|&n| graph.node(n).unwrap().position).collect();
            let area = geometry::area(&polygon);
            if area < MIN_BLOCK_AREA || area > MAX_BLOCK_AREA {
                return None;
            }
            let edge_ids: Vec<EdgeIndex> = (0..nodes.len())
                .filter_map(|i| graph.find_edge(nodes[i], nodes[(i + 1) % nodes.len()]))
                .collect();
            Some(Block {
                id: 0,
                nodes,
                polygon,
                holes: Vec::new(),
                edge_ids,
                area,
                parcel_ids: Vec::new(),
            })
        })
        .collect();

    blocks.sort_by(|a, b| a.area.partial_cmp(&b.area).unwrap());
    for (i, block) in blocks.iter_mut().enumerate() {
        block.id = i as u64;
    }
    Ok(blocks)
}

fn canonical_key(nodes: &[NodeIndex]) -> Vec<usize> {
    let mut idx: Vec<usize> = nodes.iter().map(|n| n.index()).collect();
    // Rotate so the smallest id leads, then pick the lexicographically
    // smaller of the two traversal directions, so a cycle found from any
    // starting node or direction dedupes to the same key.
    let min_pos = idx.iter().enumerate().min_by_key(|(_, v)| **v).unwrap().0;
    idx.rotate_left(min_pos);
    let mut rev = idx.clone();
    rev[1..].reverse();
    if rev < idx {
        rev
    } else {
        idx
    }
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    graph: &RoadGraph,
    origin: NodeIndex,
    current: NodeIndex,
    path: &mut Vec<NodeIndex>,
    visited: &mut HashSet<NodeIndex>,
    cycles: &mut Vec<Vec<NodeIndex>>,
    seen_keys: &mut HashSet<Vec<usize>>,
) {
    if cycles.len() >= MAX_CYCLES || path.len() > MAX_CYCLE_NODES {
        return;
    }

    for next in graph.neighbors(current) {
        if next == origin && path.len() >= 3 {
            let key = canonical_key(path);
            if seen_keys.insert(key) {
                cycles.push(path.clone());
                if cycles.len() >= MAX_CYCLES {
                    return;
                }
            }
            continue;
        }
        if visited.contains(&next) {
            continue;
        }
        visited.insert(next);
        path.push(next);
        dfs(graph, origin, next, path, visited, cycles, seen_keys);
        path.pop();
        visited.remove(&next);
    }
}
