//! Voronoi-like subdivision: partition a block around a set of seed points
//! by successively clipping each seed's cell against the perpendicular
//! bisector of every other seed.
//!
//! This is the naive O(n^2) construction rather than a proper sweep or
//! Fortune's algorithm. Block-sized seed counts here are small (low tens
//! at most), so the quadratic cost is negligible and the implementation
//! stays a direct reuse of the geometry kernel's half-plane clip.

use crate::geometry::{self, Vec2};

/// One cell of the partition: the clipped polygon and the seed it grew
/// from.
pub struct Cell {
    pub seed: Vec2,
    pub polygon: Vec<Vec2>,
    pub area: f64,
}

/// Partition `block` around `seeds`. Seeds outside the block still produce
/// a (possibly empty) cell; callers should drop cells with fewer than 3
/// vertices.
pub fn subdivide(block: &[Vec2], seeds: &[Vec2]) -> Vec<Cell> {
    seeds
        .iter()
        .map(|&seed| {
            let mut cell = block.to_vec();
            for &other in seeds {
                if other == seed || cell.len() < 3 {
                    continue;
                }
                let mid = (seed + other) * 0.5;
                let normal = (seed - other).normalize_or_zero();
                if normal == Vec2::ZERO {
                    continue;
                }
                cell = geometry::clip_by_half_plane(&cell, mid, normal);
            }
            let area = geometry::area(&cell);
            Cell { seed, polygon: cell, area }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_seeds_split_a_square_in_half() {
        let block = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        let seeds = vec![Vec2::new(2.0, 5.0), Vec2::new(8.0, 5.0)];
        let cells = subdivide(&block, &seeds);
        assert_eq!(cells.len(), 2);
        assert!((cells[0].area - 50.0).abs() < 1e-6);
        assert!((cells[1].area - 50.0).abs() < 1e-6);
    }

    #[test]
    fn cells_partition_total_area() {
        let block = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(0.0, 20.0),
        ];
        let seeds = vec![
            Vec2::new(5.0, 5.0),
            Vec2::new(15.0, 5.0),
            Vec2::new(5.0, 15.0),
            Vec2::new(15.0, 15.0),
        ];
        let cells = subdivide(&block, &seeds);
        let total: f64 = cells.iter().map(|c| c.area).sum();
        assert!((total - 400.0).abs() < 1e-6);
    }
}
