//! Geometry kernel: points, segments, polygons.
//!
//! Stateless predicates used by every downstream stage (road graph, welder,
//! block finder, parcel subdivider, massing generator). All reals are
//! double precision; epsilons are parameters of the kernel rather than
//! hard-coded inside callers.

use glam::DVec2;

/// A point or free vector in the planning-area coordinate space, in meters.
pub type Vec2 = DVec2;

/// Tolerance for treating two segment directions as parallel.
pub const PARALLEL_EPS: f64 = 1e-3;
/// Tolerance, in meters, for "two edges overlap" frontage matching.
pub const EDGE_OVERLAP_EPS: f64 = 2.0;
/// Tolerance for the line-intersection parameter `t`/`u`.
pub const LINE_T_EPS: f64 = 1e-4;
/// Tolerance below which an inward-offset bisector is considered degenerate.
pub const BISECTOR_EPS: f64 = 1e-3;

/// True iff both components are finite.
pub fn is_finite(p: Vec2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Shoelace area. Always non-negative; undefined (garbage in, garbage out)
/// for self-intersecting input.
pub fn area(poly: &[Vec2]) -> f64 {
    signed_area(poly).abs()
}

fn signed_area(poly: &[Vec2]) -> f64 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Signed-area-weighted centroid. Falls back to the vertex average for
/// degenerate (zero-area) input.
pub fn centroid(poly: &[Vec2]) -> Vec2 {
    let n = poly.len();
    if n == 0 {
        return Vec2::ZERO;
    }
    let a = signed_area(poly);
    if a.abs() < 1e-9 {
        return poly.iter().copied().sum::<Vec2>() / n as f64;
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p0 = poly[i];
        let p1 = poly[(i + 1) % n];
        let cross = p0.x * p1.y - p1.x * p0.y;
        cx += (p0.x + p1.x) * cross;
        cy += (p0.y + p1.y) * cross;
    }
    Vec2::new(cx, cy) / (6.0 * a)
}

/// Perimeter length of a closed polygon.
pub fn perimeter(poly: &[Vec2]) -> f64 {
    let n = poly.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| poly[i].distance(poly[(i + 1) % n])).sum()
}

/// Even-odd ray-casting point-in-polygon test. Boundary behavior is
/// implementation-defined but consistent across queries (a boundary point
/// may read as inside or outside depending on which edge it grazes).
pub fn point_in_polygon(p: Vec2, poly: &[Vec2]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = poly[i];
        let vj = poly[j];
        if (vi.y > p.y) != (vj.y > p.y) {
            let t = (p.y - vi.y) / (vj.y - vi.y);
            let x_cross = vi.x + t * (vj.x - vi.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Intersection of two segments, if the crossing lies strictly within
/// parameter range `[0, 1]` on both. Returns `None` for parallel segments
/// (`|denom| < PARALLEL_EPS`) or an out-of-range crossing.
pub fn segment_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < PARALLEL_EPS {
        return None;
    }
    let qp = b1 - a1;
    let t = (qp.x * s.y - qp.y * s.x) / denom;
    let u = (qp.x * r.y - qp.y * r.x) / denom;
    if t < -LINE_T_EPS || t > 1.0 + LINE_T_EPS || u < -LINE_T_EPS || u > 1.0 + LINE_T_EPS {
        return None;
    }
    Some(a1 + r * t)
}

/// Inward offset of a (CCW) polygon by perpendicular distance `d`.
///
/// Each vertex moves along the averaged inward normal of its two incident
/// edges, scaled so the perpendicular displacement equals `d`. A vertex
/// whose bisector nearly cancels (reflex turn close to 180 degrees) is left
/// in place rather than blown out to infinity. Callers are responsible for
/// detecting a degenerate result (`vertices.len() < 3` after dedup, or a
/// polygon that folds over itself); this routine does no topology repair.
pub fn offset_polygon_inward(poly: &[Vec2], d: f64) -> Vec<Vec2> {
    let n = poly.len();
    if n < 3 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = poly[(i + n - 1) % n];
        let curr = poly[i];
        let next = poly[(i + 1) % n];

        let e0 = (curr - prev).normalize_or_zero();
        let e1 = (next - curr).normalize_or_zero();
        // Inward normal of a CCW polygon points to the right of travel.
        let n0 = Vec2::new(e0.y, -e0.x);
        let n1 = Vec2::new(e1.y, -e1.x);
        let bisector = n0 + n1;
        let blen = bisector.length();
        if blen < BISECTOR_EPS {
            out.push(curr);
            continue;
        }
        let miter = bisector / blen;
        // Scale so the perpendicular component along either normal equals d.
        let cos_half = miter.dot(n0).max(1e-6);
        out.push(curr + miter * (d / cos_half));
    }
    out
}

/// Sutherland-Hodgman clip keeping the half-plane `(v - point) . normal >= 0`.
pub fn clip_by_half_plane(poly: &[Vec2], point: Vec2, normal: Vec2) -> Vec<Vec2> {
    let n = poly.len();
    if n == 0 {
        return Vec::new();
    }
    let side = |v: Vec2| (v - point).dot(normal);
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let curr = poly[i];
        let prev = poly[(i + n - 1) % n];
        let curr_side = side(curr);
        let prev_side = side(prev);
        if curr_side >= 0.0 {
            if prev_side < 0.0 {
                out.push(intersect_half_plane(prev, curr, point, normal));
            }
            out.push(curr);
        } else if prev_side >= 0.0 {
            out.push(intersect_half_plane(prev, curr, point, normal));
        }
    }
    out
}

fn intersect_half_plane(a: Vec2, b: Vec2, point: Vec2, normal: Vec2) -> Vec2 {
    let da = (a - point).dot(normal);
    let db = (b - point).dot(normal);
    let denom = da - db;
    if denom.abs() < 1e-12 {
        return a;
    }
    let t = da / denom;
    a + (b - a) * t
}

/// True iff any vertex of `a` lies in `b`, any vertex of `b` lies in `a`, or
/// any edge of `a` crosses any edge of `b`.
pub fn polygon_intersects(a: &[Vec2], b: &[Vec2]) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    if a.iter().any(|&p| point_in_polygon(p, b)) {
        return true;
    }
    if b.iter().any(|&p| point_in_polygon(p, a)) {
        return true;
    }
    for i in 0..a.len() {
        let a1 = a[i];
        let a2 = a[(i + 1) % a.len()];
        for j in 0..b.len() {
            let b1 = b[j];
            let b2 = b[(j + 1) % b.len()];
            if segment_intersect(a1, a2, b1, b2).is_some() {
                return true;
            }
        }
    }
    false
}

/// Angle in `[0, 2*pi)` of the direction `to - from`.
pub fn direction_angle(from: Vec2, to: Vec2) -> f64 {
    let d = to - from;
    let a = d.y.atan2(d.x);
    if a < 0.0 {
        a + std::f64::consts::TAU
    } else {
        a
    }
}

/// Smallest absolute difference between two angles, in `[0, pi]`.
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let mut d = (a - b).abs() % std::f64::consts::TAU;
    if d > std::f64::consts::PI {
        d = std::f64::consts::TAU - d;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ]
    }

    #[test]
    fn area_of_unit_square() {
        assert!((area(&square(10.0)) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn centroid_of_square_is_center() {
        let c = centroid(&square(10.0));
        assert!((c - Vec2::new(5.0, 5.0)).length() < 1e-9);
    }

    #[test]
    fn point_in_polygon_basic() {
        let poly = square(10.0);
        assert!(point_in_polygon(Vec2::new(5.0, 5.0), &poly));
        assert!(!point_in_polygon(Vec2::new(15.0, 5.0), &poly));
    }

    #[test]
    fn segment_intersect_crossing() {
        let p = segment_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 0.0),
        );
        let p = p.expect("segments should cross");
        assert!((p - Vec2::new(5.0, 5.0)).length() < 1e-6);
    }

    #[test]
    fn segment_intersect_parallel_is_none() {
        let p = segment_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(10.0, 1.0),
        );
        assert!(p.is_none());
    }

    #[test]
    fn offset_inward_shrinks_square() {
        let poly = square(10.0);
        let shrunk = offset_polygon_inward(&poly, 1.0);
        assert_eq!(shrunk.len(), 4);
        assert!((area(&shrunk) - 64.0).abs() < 1e-6);
    }

    #[test]
    fn clip_half_plane_bisects_square() {
        let poly = square(10.0);
        let clipped = clip_by_half_plane(&poly, Vec2::new(5.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((area(&clipped) - 50.0).abs() < 1e-6);
    }

    #[test]
    fn polygon_intersects_overlapping_squares() {
        let a = square(10.0);
        let b: Vec<Vec2> = square(10.0).iter().map(|v| *v + Vec2::new(5.0, 5.0)).collect();
        assert!(polygon_intersects(&a, &b));
        let c: Vec<Vec2> = square(10.0).iter().map(|v| *v + Vec2::new(100.0, 100.0)).collect();
        assert!(!polygon_intersects(&a, &c));
    }
}
