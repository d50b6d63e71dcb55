//! Uniform-grid spatial index used by the welder and block finder to avoid
//! O(N^2) scans when looking for nearby nodes, edges, or parcels.

use std::collections::HashMap;

use crate::geometry::Vec2;

/// Any value the index can bucket: a stable id plus its query point.
pub type CellKey = (i32, i32);

/// A uniform grid over the planning area, bucketing ids by cell.
///
/// Grounded in the same bucket-and-scan-neighbors shape as a conventional
/// game-world broadphase grid: cheap inserts, cheap removes, radius queries
/// that only ever touch the 3x3 (or `ceil(radius/cell)`-wide) neighborhood.
#[derive(Debug, Clone)]
pub struct SpatialGrid<Id> {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<(Id, Vec2)>>,
}

impl<Id: Copy + PartialEq> SpatialGrid<Id> {
    pub fn new(cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive");
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn to_cell(&self, p: Vec2) -> CellKey {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, id: Id, pos: Vec2) {
        self.cells.entry(self.to_cell(pos)).or_default().push((id, pos));
    }

    pub fn remove(&mut self, id: Id, pos: Vec2) {
        if let Some(bucket) = self.cells.get_mut(&self.to_cell(pos)) {
            bucket.retain(|(existing, _)| *existing != id);
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All ids within `radius` of `center` (inclusive), without sorting.
    pub fn query_radius(&self, center: Vec2, radius: f64) -> Vec<Id> {
        let span = (radius / self.cell_size).ceil() as i32;
        let (cx, cy) = self.to_cell(center);
        let r2 = radius * radius;
        let mut out = Vec::new();
        for dx in -span..=span {
            for dy in -span..=span {
                if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) {
                    for (id, pos) in bucket {
                        if center.distance_squared(*pos) <= r2 {
                            out.push(*id);
                        }
                    }
                }
            }
        }
        out
    }

    /// All ids sharing `pos`'s cell, without a distance check.
    pub fn query_cell(&self, pos: Vec2) -> Vec<Id> {
        self.cells
            .get(&self.to_cell(pos))
            .map(|bucket| bucket.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    /// The nearest id to `center`, if any exist within `max_radius`.
    pub fn nearest(&self, center: Vec2, max_radius: f64) -> Option<(Id, f64)> {
        let span = (max_radius / self.cell_size).ceil() as i32;
        let (cx, cy) = self.to_cell(center);
        let mut best: Option<(Id, f64)> = None;
        for dx in -span..=span {
            for dy in -span..=span {
                if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) {
                    for (id, pos) in bucket {
                        let d = center.distance(*pos);
                        if d > max_radius {
                            continue;
                        }
                        if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                            best = Some((*id, d));
                        }
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_query_radius() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, Vec2::new(0.0, 0.0));
        grid.insert(2u32, Vec2::new(5.0, 5.0));
        grid.insert(3u32, Vec2::new(500.0, 500.0));

        let hits = grid.query_radius(Vec2::new(0.0, 0.0), 10.0);
        assert!(hits.contains(&1));
        assert!(hits.contains(&2));
        assert!(!hits.contains(&3));
    }

    #[test]
    fn remove_drops_id_from_bucket() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, Vec2::new(0.0, 0.0));
        grid.remove(1u32, Vec2::new(0.0, 0.0));
        assert!(grid.query_radius(Vec2::new(0.0, 0.0), 50.0).is_empty());
    }

    #[test]
    fn empty_grid_has_zero_len() {
        let grid: SpatialGrid<u32> = SpatialGrid::new(25.0);
        assert!(grid.is_empty());
    }
}
