//! Whole-network procedural layout: an optional seeding stage that lays
//! down a plausible road network for an empty planning area before any
//! caller-supplied roads are welded in.
//!
//! The network is built in passes, each one handed to the same
//! [`IntersectionWelder`] a caller would use directly, so generated and
//! hand-authored roads weld together identically: one to three Poisson-
//! placed centers first, linked by an organic inter-center highway network
//! (plus a ring around the first two, era permitting), then radial spokes
//! out of every center with distance-based class degradation, then a grid
//! infill restricted to the network's empty regions, then a sparse scatter
//! of local spurs, a connectivity repair pass, and finally one intersection
//! optimization pass that merges near-coincident junctions and opens up
//! sharp corners.

use std::collections::{HashSet, VecDeque};

use petgraph::graph::NodeIndex;

use crate::error::LayoutError;
use crate::geometry::Vec2;
use crate::layout::poisson;
use crate::rng::Mulberry32;
use crate::road::class::{Era, RoadClass};
use crate::welder::{IntersectionWelder, MIN_ROAD_SEPARATION};

/// Successive spoke directions are separated by the golden angle, which
/// keeps radial roads from ever lining up into an accidental grid no
/// matter how many are requested.
const GOLDEN_ANGLE_RAD: f64 = 2.399_963_229_728_65;

/// Distance, in meters, a radial ray holds its starting class before the
/// first class-degradation step.
const DEGRADE_AVENUE_AT: f64 = 100.0;
/// Distance, in meters, at which a ray degrades a second time.
const DEGRADE_STREET_AT: f64 = 300.0;

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub seed: u64,
    pub bounds_min: Vec2,
    pub bounds_max: Vec2,
    pub era: Era,
    pub radial_count: usize,
    pub ring_count: usize,
    pub grid_cell_size: f64,
    pub local_infill_min_spacing: f64,
    pub local_infill_attempts: usize,
    pub repair_budget: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            bounds_min: Vec2::ZERO,
            bounds_max: Vec2::new(1000.0, 1000.0),
            era: Era::Beyond1990,
            radial_count: 6,
            ring_count: 2,
            grid_cell_size: 80.0,
            local_infill_min_spacing: 60.0,
            local_infill_attempts: 64,
            repair_budget: 256,
        }
    }
}

pub struct LayoutGenerator {
    config: LayoutConfig,
}

impl LayoutGenerator {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, welder: &mut IntersectionWelder) -> Result<(), LayoutError> {
        let c = &self.config;
        let width = c.bounds_max.x - c.bounds_min.x;
        let height = c.bounds_max.y - c.bounds_min.y;
        if width <= 0.0 || height <= 0.0 {
            return Err(LayoutError::InvalidBounds(width, height));
        }

        let mut rng = Mulberry32::from_seed_u64(c.seed);
        let radius = width.min(height) * 0.5;

        let centers = self.place_centers(&mut rng);

        for i in 0..centers.len() {
            for j in (i + 1)..centers.len() {
                self.generate_highway_link(welder, centers[i], centers[j], &mut rng)?;
            }
        }

        if c.era.favors_ring_road() {
            for &center in centers.iter().take(2) {
                self.generate_ring(welder, center, &mut rng)?;
            }
        }

        for &center in &centers {
            self.generate_radial_spokes(welder, center, radius, &mut rng)?;
        }

        self.generate_grid_infill(welder, &mut rng)?;
        self.generate_local_infill(welder, &mut rng)?;
        self.repair_connectivity(welder)?;
        welder.optimize_intersections(&mut rng);

        Ok(())
    }

    /// Place one to three Poisson-disk-separated centers across the
    /// planning area. Falls back to the single bounds midpoint if
    /// rejection sampling can't place even one (degenerate/tiny bounds).
    fn place_centers(&self, rng: &mut Mulberry32) -> Vec<Vec2> {
        let c = &self.config;
        let width = c.bounds_max.x - c.bounds_min.x;
        let height = c.bounds_max.y - c.bounds_min.y;
        let min_dist = (width.min(height) * 0.3).max(MIN_ROAD_SEPARATION * 2.0);
        let mut centers = poisson::sample(rng, c.bounds_min, c.bounds_max, min_dist, 64);
        if centers.is_empty() {
            centers.push((c.bounds_min + c.bounds_max) * 0.5);
        }
        let wanted = 1 + rng.range_u32(0, 3) as usize;
        centers.truncate(wanted.max(1));
        centers
    }

    fn clip_to_bounds(&self, from: Vec2, dir: Vec2) -> Vec2 {
        let c = &self.config;
        let mut t_max = f64::MAX;
        if dir.x > 0.0 {
            t_max = t_max.min((c.bounds_max.x - from.x) / dir.x);
        } else if dir.x < 0.0 {
            t_max = t_max.min((c.bounds_min.x - from.x) / dir.x);
        }
        if dir.y > 0.0 {
            t_max = t_max.min((c.bounds_max.y - from.y) / dir.y);
        } else if dir.y < 0.0 {
            t_max = t_max.min((c.bounds_min.y - from.y) / dir.y);
        }
        from + dir * t_max.max(0.0)
    }

    /// An organic polyline between two centers: a sinusoidal offset from
    /// the straight line, with a segment roughly every 150m.
    fn generate_highway_link(
        &self,
        welder: &mut IntersectionWelder,
        a: Vec2,
        b: Vec2,
        rng: &mut Mulberry32,
    ) -> Result<(), LayoutError> {
        let dist = a.distance(b);
        let segment_count = ((dist / 150.0).round() as usize).max(1);
        let dir = (b - a).normalize_or_zero();
        if dir == Vec2::ZERO {
            return Ok(());
        }
        let normal = Vec2::new(-dir.y, dir.x);
        let phase = rng.range_f64(0.0, std::f64::consts::TAU);

        let mut points = Vec::with_capacity(segment_count + 1);
        points.push(a);
        for i in 1..segment_count {
            let t = i as f64 / segment_count as f64;
            let base = a + (b - a) * t;
            let offset = (t * std::f64::consts::TAU + phase).sin() * 15.0;
            points.push(base + normal * offset);
        }
        points.push(b);

        let class = RoadClass::Highway;
        let material = self.config.era.material_for(class);
        let _ = welder.insert_road(&points, class, material);
        Ok(())
    }

    /// A perturbed ring of 16 nodes around `center`, at a radius of
    /// 200-300m, each node nudged up to 30m off the ideal circle.
    fn generate_ring(
        &self,
        welder: &mut IntersectionWelder,
        center: Vec2,
        rng: &mut Mulberry32,
    ) -> Result<(), LayoutError> {
        let class = RoadClass::Avenue;
        let material = self.config.era.material_for(class);
        const SEGMENTS: usize = 16;
        let jitter = |rng: &mut Mulberry32| Vec2::new(rng.range_f64(-30.0, 30.0), rng.range_f64(-30.0, 30.0));

        for ring in 0..self.config.ring_count.max(1) {
            let radius = 200.0 + ring as f64 * 100.0 + rng.range_f64(0.0, 100.0);
            let mut prev = center + Vec2::new(radius, 0.0) + jitter(rng);
            for i in 1..=SEGMENTS {
                let theta = std::f64::consts::TAU * i as f64 / SEGMENTS as f64;
                let next = center + Vec2::new(radius * theta.cos(), radius * theta.sin()) + jitter(rng);
                let _ = welder.insert_road(&[prev, next], class, material);
                prev = next;
            }
        }
        Ok(())
    }

    /// Radial rays out of `center`: a density-ish count (`radial_count`
    /// plus a `U{0,2}` jitter term) of rays at golden-angle increments,
    /// each jittered +/-0.2rad and dropped if it would land within
    /// `MIN_ANGLE_DEG` of an already-placed ray from the same center.
    fn generate_radial_spokes(
        &self,
        welder: &mut IntersectionWelder,
        center: Vec2,
        radius: f64,
        rng: &mut Mulberry32,
    ) -> Result<(), LayoutError> {
        let base_class = if self.config.era.favors_ring_road() {
            RoadClass::Highway
        } else {
            RoadClass::Avenue
        };

        let ray_count = self.config.radial_count + rng.range_u32(0, 3) as usize;
        let mut placed_angles: Vec<f64> = Vec::new();
        let mut angle = rng.range_f64(0.0, std::f64::consts::TAU);
        for _ in 0..ray_count {
            let ray_angle = angle + rng.range_f64(-0.2, 0.2);
            angle += GOLDEN_ANGLE_RAD;

            let too_close = placed_angles
                .iter()
                .any(|&a| crate::geometry::angle_diff(a, ray_angle).to_degrees() < crate::road::graph::MIN_ANGLE_DEG);
            if too_close {
                continue;
            }
            placed_angles.push(ray_angle);
            self.insert_degrading_ray(welder, center, ray_angle, radius, base_class);
        }
        Ok(())
    }

    /// Walk a single ray outward from `center`, stepping its class down
    /// via [`RoadClass::degrade`] past [`DEGRADE_AVENUE_AT`] and
    /// [`DEGRADE_STREET_AT`] meters.
    fn insert_degrading_ray(
        &self,
        welder: &mut IntersectionWelder,
        center: Vec2,
        angle: f64,
        radius: f64,
        base_class: RoadClass,
    ) {
        let dir = Vec2::new(angle.cos(), angle.sin());
        let far = self.clip_to_bounds(center, dir * radius.max(1.0) * 10.0);
        let total_dist = center.distance(far);

        let mut prev_point = center;
        let mut class = base_class;
        for threshold in [DEGRADE_AVENUE_AT, DEGRADE_STREET_AT] {
            if threshold >= total_dist {
                break;
            }
            let point = center + dir * threshold;
            let material = self.config.era.material_for(class);
            let _ = welder.insert_road(&[prev_point, point], class, material);
            prev_point = point;
            class = class.degrade();
        }
        let material = self.config.era.material_for(class);
        let _ = welder.insert_road(&[prev_point, far], class, material);
    }

    /// A rotated grid, but only in regions the network hasn't already
    /// filled in: a candidate line is skipped if its midpoint already has
    /// 3 or more nodes within `2 * grid_cell_size`, and dropped entirely
    /// if either endpoint would land closer than [`MIN_ROAD_SEPARATION`]
    /// to an existing node.
    fn generate_grid_infill(&self, welder: &mut IntersectionWelder, rng: &mut Mulberry32) -> Result<(), LayoutError> {
        let c = &self.config;
        let rotation = rng.range_f64(-0.25, 0.25);
        let (cos, sin) = (rotation.cos(), rotation.sin());
        let center = (c.bounds_min + c.bounds_max) * 0.5;
        let to_world = |u: f64, v: f64| -> Vec2 {
            let local = Vec2::new(u, v);
            center + Vec2::new(local.x * cos - local.y * sin, local.x * sin + local.y * cos)
        };

        let span = (c.bounds_max - c.bounds_min).length();
        let steps = (span / c.grid_cell_size).ceil() as i64;
        if steps <= 0 {
            return Ok(());
        }
        let empty_radius = c.grid_cell_size * 2.0;

        // Era evolution: streets upgrade to avenues at the era's rate.
        let class = if rng.chance(self.config.era.street_upgrade_chance()) {
            RoadClass::Avenue
        } else {
            RoadClass::Street
        };
        let material = c.era.material_for(class);

        let mut try_insert = |welder: &mut IntersectionWelder, a: Vec2, b: Vec2, mid: Vec2| {
            if !self.segment_overlaps_bounds(a, b) {
                return;
            }
            if self.nearby_node_count(welder, mid, empty_radius) >= 3 {
                return;
            }
            if self.too_close_to_existing(welder, a) || self.too_close_to_existing(welder, b) {
                return;
            }
            let _ = welder.insert_road(&[a, b], class, material);
        };

        for i in -steps..=steps {
            let u = i as f64 * c.grid_cell_size;
            let a = to_world(u, -span);
            let b = to_world(u, span);
            let mid = to_world(u, 0.0);
            try_insert(welder, a, b, mid);
        }
        for i in -steps..=steps {
            let v = i as f64 * c.grid_cell_size;
            let a = to_world(-span, v);
            let b = to_world(span, v);
            let mid = to_world(0.0, v);
            try_insert(welder, a, b, mid);
        }
        Ok(())
    }

    fn nearby_node_count(&self, welder: &IntersectionWelder, point: Vec2, radius: f64) -> usize {
        welder
            .graph()
            .nodes()
            .filter(|&n| welder.graph().node(n).unwrap().position.distance(point) < radius)
            .count()
    }

    fn too_close_to_existing(&self, welder: &IntersectionWelder, point: Vec2) -> bool {
        welder.graph().find_nearest(point, MIN_ROAD_SEPARATION).is_some()
    }

    fn segment_overlaps_bounds(&self, a: Vec2, b: Vec2) -> bool {
        let c = &self.config;
        let min_x = a.x.min(b.x);
        let max_x = a.x.max(b.x);
        let min_y = a.y.min(b.y);
        let max_y = a.y.max(b.y);
        max_x >= c.bounds_min.x && min_x <= c.bounds_max.x && max_y >= c.bounds_min.y && min_y <= c.bounds_max.y
    }

    /// Scatter local spurs into gaps the rest of the network left behind:
    /// a Poisson-seeded point with no neighbor within `1.5 *
    /// grid_cell_size` spawns a 3-5 ray cluster rather than a single stub,
    /// left for [`repair_connectivity`] to stitch back into the network.
    fn generate_local_infill(&self, welder: &mut IntersectionWelder, rng: &mut Mulberry32) -> Result<(), LayoutError> {
        let c = &self.config;
        let class = RoadClass::Local;
        let material = c.era.material_for(class);
        let block_max = c.grid_cell_size;
        let seeds = poisson::sample(
            rng,
            c.bounds_min,
            c.bounds_max,
            c.local_infill_min_spacing,
            c.local_infill_attempts,
        );

        for seed in seeds {
            if welder.graph().find_nearest(seed, block_max * 1.5).is_some() {
                continue;
            }
            let ray_count = 3 + rng.range_u32(0, 3) as usize;
            let mut angle = rng.range_f64(0.0, std::f64::consts::TAU);
            for _ in 0..ray_count {
                let len = rng.range_f64(c.local_infill_min_spacing * 0.5, c.local_infill_min_spacing);
                let end = seed + Vec2::new(angle.cos(), angle.sin()) * len;
                let _ = welder.insert_road(&[seed, end], class, material);
                angle += std::f64::consts::TAU / ray_count as f64;
            }
        }
        Ok(())
    }

    /// Reconnect any node that cannot reach the rest of the network, by
    /// wiring it to its nearest reachable neighbor with a street-class
    /// edge, but only if that neighbor is within a quarter of the
    /// planning area's width — farther than that, the stray is left
    /// disconnected rather than bridged with an implausibly long road.
    /// Bounded by `repair_budget` iterations so a pathological input
    /// cannot loop forever.
    fn repair_connectivity(&self, welder: &mut IntersectionWelder) -> Result<(), LayoutError> {
        let c = &self.config;
        let gate = ((c.bounds_max.x - c.bounds_min.x) / 4.0).max(1.0);
        let mut budget = c.repair_budget;
        let mut unrepairable: HashSet<NodeIndex> = HashSet::new();

        loop {
            let graph = welder.graph();
            let all: Vec<NodeIndex> = graph.nodes().collect();
            if all.is_empty() {
                return Ok(());
            }
            let reached = reachable_from(graph, all[0]);
            let Some(&stray) = all.iter().find(|n| !reached.contains(n) && !unrepairable.contains(n)) else {
                return Ok(());
            };

            if budget == 0 {
                return Err(LayoutError::RepairBudgetExceeded);
            }
            budget -= 1;

            let stray_pos = graph.node(stray).unwrap().position;
            let mut best: Option<(NodeIndex, f64)> = None;
            for &r in &reached {
                let d = graph.node(r).unwrap().position.distance(stray_pos);
                if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                    best = Some((r, d));
                }
            }
            let Some((target, dist)) = best else {
                unrepairable.insert(stray);
                continue;
            };
            if dist > gate {
                unrepairable.insert(stray);
                continue;
            }

            let target_pos = welder.graph().node(target).unwrap().position;
            let class = RoadClass::Street;
            let material = self.config.era.material_for(class);
            let _ = welder.insert_road(&[stray_pos, target_pos], class, material);
        }
    }
}

fn reachable_from(graph: &crate::road::RoadGraph, start: NodeIndex) -> HashSet<NodeIndex> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(n) = queue.pop_front() {
        for neighbor in graph.neighbors(n) {
            if seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_connected_network() {
        let config = LayoutConfig {
            seed: 12345,
            bounds_min: Vec2::new(0.0, 0.0),
            bounds_max: Vec2::new(600.0, 600.0),
            era: Era::Through1950,
            radial_count: 5,
            ring_count: 1,
            grid_cell_size: 120.0,
            local_infill_min_spacing: 80.0,
            local_infill_attempts: 32,
            repair_budget: 128,
        };
        let gen = LayoutGenerator::new(config);
        let mut welder = IntersectionWelder::new();
        gen.generate(&mut welder).unwrap();

        assert!(welder.graph().node_count() > 1);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let config = LayoutConfig {
            bounds_min: Vec2::new(10.0, 10.0),
            bounds_max: Vec2::new(10.0, 10.0),
            ..LayoutConfig::default()
        };
        let gen = LayoutGenerator::new(config);
        let mut welder = IntersectionWelder::new();
        assert!(gen.generate(&mut welder).is_err());
    }

    #[test]
    fn radial_rays_degrade_class_with_distance() {
        let config = LayoutConfig {
            seed: 7,
            bounds_min: Vec2::new(0.0, 0.0),
            bounds_max: Vec2::new(2000.0, 2000.0),
            era: Era::Beyond1990,
            radial_count: 3,
            ring_count: 0,
            grid_cell_size: 400.0,
            local_infill_min_spacing: 200.0,
            local_infill_attempts: 16,
            repair_budget: 64,
        };
        let gen = LayoutGenerator::new(config);
        let mut welder = IntersectionWelder::new();
        gen.generate(&mut welder).unwrap();

        let classes: HashSet<RoadClass> = welder
            .graph()
            .edges()
            .filter_map(|e| welder.graph().edge(e).map(|edge| edge.class))
            .collect();
        // A 2km radial ray should have degraded at least once past the
        // avenue threshold.
        assert!(classes.len() > 1);
    }
}
