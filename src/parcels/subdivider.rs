//! Orchestrates parcel subdivision for a single block: picks a strategy
//! based on the requested density, runs it, and attaches frontage
//! information to each resulting parcel.

use crate::blocks::Block;
use crate::error::ParcelError;
use crate::geometry::{self, Vec2, EDGE_OVERLAP_EPS};
use crate::layout::poisson;
use crate::parcels::{skeleton, voronoi, Density, Frontage, Parcel, ZoneType};
use crate::rng::Mulberry32;

/// A caller-painted zoning request: any block whose footprint overlaps
/// `polygon` takes on `zone`/`density`.
#[derive(Debug, Clone)]
pub struct ZoneRequest {
    pub polygon: Vec<Vec2>,
    pub zone: ZoneType,
    pub density: Density,
}

#[derive(Debug, Clone)]
pub struct SubdivisionConfig {
    pub min_parcel_area: f64,
    pub max_parcel_area: f64,
    pub min_frontage_width: f64,
}

impl Default for SubdivisionConfig {
    fn default() -> Self {
        Self {
            min_parcel_area: 50.0,
            max_parcel_area: 4000.0,
            min_frontage_width: 4.0,
        }
    }
}

/// Subdivide `block` into parcels, using whichever `ZoneRequest` covers
/// its centroid (the one with the largest overlap, if more than one).
pub fn subdivide_block(
    block: &Block,
    zones: &[ZoneRequest],
    rng: &mut Mulberry32,
    config: &SubdivisionConfig,
) -> Result<Vec<Parcel>, ParcelError> {
    if block.polygon.len() < 3 {
        return Err(ParcelError::DegenerateBlock);
    }

    let zone = select_zone(block, zones).ok_or(ParcelError::NoZoneAssigned)?;
    let target_area = zone.density.target_parcel_area();

    let raw_polygons = if zone.density == Density::Low {
        let strip_width = (target_area / average_depth(&block.polygon)).max(6.0);
        skeleton::subdivide(&block.polygon, strip_width, config.min_parcel_area)
            .into_iter()
            .map(|s| s.polygon)
            .collect::<Vec<_>>()
    } else {
        let seed_count = (block.area / target_area).round().max(1.0) as usize;
        let seeds = scatter_seeds(&block.polygon, seed_count, rng);
        voronoi::subdivide(&block.polygon, &seeds)
            .into_iter()
            .map(|c| c.polygon)
            .collect::<Vec<_>>()
    };

    let mut parcels = Vec::with_capacity(raw_polygons.len());
    for polygon in raw_polygons {
        if polygon.len() < 3 {
            continue;
        }
        let area = geometry::area(&polygon);
        if area < config.min_parcel_area || area > config.max_parcel_area {
            continue;
        }
        let (frontage, is_corner, estimated) =
            detect_frontage(&polygon, &block.polygon, config.min_frontage_width);
        let frontage_edge = if estimated {
            -1
        } else {
            block
                .edge_ids
                .get(frontage.block_edge_index)
                .map(|e| e.index() as i64)
                .unwrap_or(-1)
        };
        let centroid = geometry::centroid(&polygon);
        parcels.push(Parcel {
            id: 0,
            block_id: block.id,
            polygon,
            area,
            zone: zone.zone,
            density: zone.density,
            frontage: Some(frontage),
            frontage_edge,
            is_corner,
            centroid,
        });
    }

    if parcels.is_empty() {
        return Err(ParcelError::SubdivisionBudgetExceeded);
    }
    Ok(parcels)
}

fn select_zone<'a>(block: &Block, zones: &'a [ZoneRequest]) -> Option<&'a ZoneRequest> {
    let centroid = geometry::centroid(&block.polygon);
    zones
        .iter()
        .filter(|z| geometry::point_in_polygon(centroid, &z.polygon) || geometry::polygon_intersects(&block.polygon, &z.polygon))
        .max_by(|a, b| {
            let oa = overlap_area(&block.polygon, &a.polygon);
            let ob = overlap_area(&block.polygon, &b.polygon);
            oa.partial_cmp(&ob).unwrap()
        })
}

/// Coarse overlap estimate: fraction of the block's own vertices that fall
/// inside the zone polygon, scaled by block area. Good enough to rank
/// candidate zones without a full polygon-clip intersection area.
fn overlap_area(block: &[Vec2], zone: &[Vec2]) -> f64 {
    if block.is_empty() {
        return 0.0;
    }
    let inside = block.iter().filter(|&&p| geometry::point_in_polygon(p, zone)).count();
    geometry::area(block) * (inside as f64 / block.len() as f64)
}

fn average_depth(block: &[Vec2]) -> f64 {
    let frontage_idx = skeleton::longest_edge_index(block);
    let n = block.len();
    let p0 = block[frontage_idx];
    let p1 = block[(frontage_idx + 1) % n];
    let frontage_len = p0.distance(p1);
    if frontage_len < 1e-6 {
        return 1.0;
    }
    (geometry::area(block) / frontage_len).max(1.0)
}

fn scatter_seeds(block: &[Vec2], count: usize, rng: &mut Mulberry32) -> Vec<Vec2> {
    let (min, max) = geometry_bounds(block);
    let span = (max - min).length().max(1.0);
    let min_distance = (span / (count as f64).sqrt().max(1.0)).max(1.0);
    let mut seeds = poisson::sample(rng, min, max, min_distance, 48);
    seeds.retain(|&p| geometry::point_in_polygon(p, block));
    if seeds.len() > count {
        seeds.truncate(count);
    }
    if seeds.is_empty() {
        seeds.push(geometry::centroid(block));
    }
    seeds
}

fn geometry_bounds(poly: &[Vec2]) -> (Vec2, Vec2) {
    let mut min = Vec2::splat(f64::MAX);
    let mut max = Vec2::splat(f64::MIN);
    for &p in poly {
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

/// Find the parcel edge that most closely runs along a block edge, and
/// report it as the parcel's street frontage, along with whether the
/// parcel qualifies along more than one distinct block edge (a corner lot).
///
/// When no parcel edge overlaps a block edge within [`EDGE_OVERLAP_EPS`]
/// (a standalone zone with no bounding block, or a parcel wholly interior
/// to the block), falls back to estimating the frontage as the parcel's
/// own longest edge; the returned `estimated` flag tells the caller not to
/// treat `block_edge_index` as a real index into the block polygon.
fn detect_frontage(parcel: &[Vec2], block: &[Vec2], min_width: f64) -> (Frontage, bool, bool) {
    let mut candidates: Vec<(usize, f64)> = Vec::new();
    for i in 0..parcel.len() {
        let pa = parcel[i];
        let pb = parcel[(i + 1) % parcel.len()];
        let width = pa.distance(pb);
        if width < min_width {
            continue;
        }
        for j in 0..block.len() {
            let ba = block[j];
            let bb = block[(j + 1) % block.len()];
            let dir = (bb - ba).normalize_or_zero();
            if dir == Vec2::ZERO {
                continue;
            }
            let normal = Vec2::new(-dir.y, dir.x);
            let da = (pa - ba).dot(normal).abs();
            let db = (pb - ba).dot(normal).abs();
            if da < EDGE_OVERLAP_EPS && db < EDGE_OVERLAP_EPS {
                candidates.push((j, width));
            }
        }
    }

    if candidates.is_empty() {
        let (i, width) = (0..parcel.len())
            .map(|i| (i, parcel[i].distance(parcel[(i + 1) % parcel.len()])))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap_or((0, 0.0));
        return (
            Frontage {
                block_edge_index: i,
                width,
            },
            false,
            true,
        );
    }

    let distinct_edges: std::collections::HashSet<usize> = candidates.iter().map(|(j, _)| *j).collect();
    let (block_edge_index, width) = candidates
        .iter()
        .copied()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap();
    (
        Frontage { block_edge_index, width },
        distinct_edges.len() >= 2,
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::NodeIndex;

    fn test_block(side: f64) -> Block {
        let polygon = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ];
        Block {
            id: 0,
            nodes: vec![NodeIndex::new(0); polygon.len()],
            area: geometry::area(&polygon),
            polygon,
            holes: Vec::new(),
            edge_ids: Vec::new(),
            parcel_ids: Vec::new(),
        }
    }

    #[test]
    fn low_density_zone_uses_skeleton_strips() {
        let block = test_block(120.0);
        let zones = vec![ZoneRequest {
            polygon: block.polygon.clone(),
            zone: ZoneType::Residential,
            density: Density::Low,
        }];
        let mut rng = Mulberry32::new(1);
        let parcels = subdivide_block(&block, &zones, &mut rng, &SubdivisionConfig::default()).unwrap();
        assert!(!parcels.is_empty());
        assert!(parcels.iter().all(|p| p.zone == ZoneType::Residential));
    }

    #[test]
    fn high_density_zone_uses_voronoi_cells() {
        let block = test_block(120.0);
        let zones = vec![ZoneRequest {
            polygon: block.polygon.clone(),
            zone: ZoneType::Commercial,
            density: Density::High,
        }];
        let mut rng = Mulberry32::new(2);
        let parcels = subdivide_block(&block, &zones, &mut rng, &SubdivisionConfig::default()).unwrap();
        assert!(!parcels.is_empty());
    }

    #[test]
    fn no_overlapping_zone_is_an_error() {
        let block = test_block(120.0);
        let zones = vec![ZoneRequest {
            polygon: vec![
                Vec2::new(1000.0, 1000.0),
                Vec2::new(1100.0, 1000.0),
                Vec2::new(1100.0, 1100.0),
                Vec2::new(1000.0, 1100.0),
            ],
            zone: ZoneType::Industrial,
            density: Density::Low,
        }];
        let mut rng = Mulberry32::new(3);
        assert!(matches!(
            subdivide_block(&block, &zones, &mut rng, &SubdivisionConfig::default()),
            Err(ParcelError::NoZoneAssigned)
        ));
    }
}
