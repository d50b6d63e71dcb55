//! Frontage-aligned subdivision: slice a block into parallel strips along
//! its longest edge, like a row of townhouses sharing one street.

use crate::geometry::{self, Vec2};

/// One strip of the block, plus the index (into the block polygon's edge
/// list) of the block edge it fronts.
pub struct Strip {
    pub polygon: Vec<Vec2>,
    pub frontage_edge_index: usize,
    pub frontage_width: f64,
}

/// The index of the block polygon's longest edge, used as the presumed
/// street frontage.
pub fn longest_edge_index(block: &[Vec2]) -> usize {
    let n = block.len();
    (0..n)
        .max_by(|&a, &b| {
            let la = block[a].distance(block[(a + 1) % n]);
            let lb = block[b].distance(block[(b + 1) % n]);
            la.partial_cmp(&lb).unwrap()
        })
        .unwrap_or(0)
}

/// Slice `block` into strips of width `strip_width` running parallel to
/// its longest edge. Strips with area below `min_area` are dropped rather
/// than kept as slivers.
pub fn subdivide(block: &[Vec2], strip_width: f64, min_area: f64) -> Vec<Strip> {
    let n = block.len();
    if n < 3 || strip_width <= 0.0 {
        return Vec::new();
    }

    let frontage_edge_index = longest_edge_index(block);
    let p0 = block[frontage_edge_index];
    let p1 = block[(frontage_edge_index + 1) % n];
    let direction = (p1 - p0).normalize_or_zero();
    if direction == Vec2::ZERO {
        return Vec::new();
    }

    let projections: Vec<f64> = block.iter().map(|&v| (v - p0).dot(direction)).collect();
    let min_u = projections.iter().cloned().fold(f64::MAX, f64::min).min(0.0);
    let max_u = projections.iter().cloned().fold(f64::MIN, f64::max).max(0.0);
    let span = max_u - min_u;
    if span <= 0.0 {
        return Vec::new();
    }

    let count = (span / strip_width).ceil().max(1.0) as usize;
    let mut strips = Vec::with_capacity(count);

    for i in 0..count {
        let u0 = min_u + i as f64 * strip_width;
        let u1 = (u0 + strip_width).min(max_u);
        let lower = geometry::clip_by_half_plane(block, p0 + direction * u0, direction);
        let strip = geometry::clip_by_half_plane(&lower, p0 + direction * u1, -direction);
        let area = geometry::area(&strip);
        if strip.len() < 3 || area < min_area {
            continue;
        }
        strips.push(Strip {
            polygon: strip,
            frontage_edge_index,
            frontage_width: u1 - u0,
        });
    }
    strips
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: f64, h: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(w, 0.0),
            Vec2::new(w, h),
            Vec2::new(0.0, h),
        ]
    }

    #[test]
    fn slices_a_long_rectangle_into_equal_strips() {
        let block = rect(100.0, 20.0);
        let strips = subdivide(&block, 25.0, 10.0);
        assert_eq!(strips.len(), 4);
        for s in &strips {
            assert!((geometry::area(&s.polygon) - 500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn drops_slivers_below_min_area() {
        let block = rect(101.0, 20.0);
        let strips = subdivide(&block, 25.0, 30.0);
        // The trailing 1m-wide sliver (area 20) should be dropped.
        assert!(strips.iter().all(|s| geometry::area(&s.polygon) >= 30.0));
    }
}
