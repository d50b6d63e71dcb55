//! The generator's owned state, in one place rather than scattered across
//! manager singletons: a single-threaded cooperative context that answers
//! one request at a time and never shares mutable state across a task
//! boundary.

use std::collections::HashMap;

use log::{debug, info, warn};
use petgraph::graph::EdgeIndex;

use crate::blocks::{self, Block};
use crate::error::{CoreError, RoadGraphError};
use crate::geometry::{self, Vec2};
use crate::layout::{LayoutConfig, LayoutGenerator};
use crate::massing::{self, BuildingMassing, Lod, MassingConfig};
use crate::parcels::{subdivider, Density, Parcel, SubdivisionConfig, ZoneRequest, ZoneType};
use crate::rng::Mulberry32;
use crate::road::class::{Era, RoadClass, RoadMaterial};
use crate::road::RoadGraph;
use crate::welder::IntersectionWelder;

/// One straight sub-segment of a road edge, flattened for the wire
/// (`§6`: Float32 stride 6 = startX, startY, endX, endY, width, classCode).
#[derive(Debug, Clone, Copy)]
pub struct RoadSegmentView {
    pub start: Vec2,
    pub end: Vec2,
    pub width: f64,
    pub class: RoadClass,
    pub material: RoadMaterial,
}

/// One block's subdivision outcome, as reported back by [`CityCore::paint_zone`].
#[derive(Debug, Clone)]
pub struct BlockSummary {
    pub block_id: u64,
    pub area: f64,
    pub parcel_count: usize,
}

/// Result of painting a zone: every parcel it touched, across every block
/// (real or synthesized) the zone polygon reached.
#[derive(Debug, Clone, Default)]
pub struct ZonePaintResult {
    pub affected_parcels: Vec<u64>,
    pub parcels: Vec<Parcel>,
    pub blocks: Vec<BlockSummary>,
}

/// Everything the external interface can ask for, about one generation
/// session, in a single owned struct.
pub struct CityCore {
    era: Era,
    bounds_min: Vec2,
    bounds_max: Vec2,
    rng: Mulberry32,
    welder: IntersectionWelder,
    zones: Vec<ZoneRequest>,
    blocks: Vec<Block>,
    parcels: HashMap<u64, Vec<Parcel>>,
    massings: HashMap<u64, Vec<Option<BuildingMassing>>>,
    mesh_cache: HashMap<(u64, u8), crate::mesh::MeshBuffers>,
    last_layout_config: Option<LayoutConfig>,
    default_lod: Lod,
}

impl CityCore {
    pub fn new(seed: u64, bounds_min: Vec2, bounds_max: Vec2, era: Era) -> Self {
        info!("creating city core: era={era:?} bounds=({bounds_min:?}, {bounds_max:?}) seed={seed}");
        Self {
            era,
            bounds_min,
            bounds_max,
            rng: Mulberry32::from_seed_u64(seed),
            welder: IntersectionWelder::new(),
            zones: Vec::new(),
            blocks: Vec::new(),
            parcels: HashMap::new(),
            massings: HashMap::new(),
            mesh_cache: HashMap::new(),
            last_layout_config: None,
            default_lod: Lod::Tripartite,
        }
    }

    pub fn era(&self) -> Era {
        self.era
    }

    pub fn default_lod(&self) -> Lod {
        self.default_lod
    }

    pub fn set_default_lod(&mut self, lod: Lod) {
        self.default_lod = lod;
    }

    /// Find a previously generated massing by its id, across every block.
    pub fn find_massing(&self, building_id: u64) -> Option<&BuildingMassing> {
        self.massings.values().flatten().flatten().find(|m| m.id == building_id)
    }

    pub fn road_graph(&self) -> &RoadGraph {
        self.welder.graph()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn parcels_for_block(&self, block_index: usize) -> Option<&[Parcel]> {
        let id = self.blocks.get(block_index)?.id;
        self.parcels.get(&id).map(Vec::as_slice)
    }

    pub fn massings_for_block(&self, block_index: usize) -> Option<&[Option<BuildingMassing>]> {
        let id = self.blocks.get(block_index)?.id;
        self.massings.get(&id).map(Vec::as_slice)
    }

    /// Run the procedural layout stage, seeding a whole road network before
    /// any caller-supplied roads are welded in. A no-op once roads already
    /// exist is still allowed; the generator welds into whatever is there.
    pub fn generate_layout(&mut self, mut config: LayoutConfig) -> Result<(), CoreError> {
        config.era = self.era;
        config.bounds_min = self.bounds_min;
        config.bounds_max = self.bounds_max;
        let generator = LayoutGenerator::new(config.clone());
        generator.generate(&mut self.welder)?;
        info!(
            "layout generated: {} nodes, {} edges",
            self.welder.graph().node_count(),
            self.welder.graph().edge_count()
        );
        self.last_layout_config = Some(config);
        self.invalidate_downstream();
        Ok(())
    }

    /// Weld a single road, supplied as a raw polyline, into the graph.
    /// Rejected with [`RoadGraphError::OutOfBounds`] if any point of the
    /// polyline falls outside the planning bounds.
    pub fn insert_road(
        &mut self,
        points: &[Vec2],
        class: RoadClass,
        material: RoadMaterial,
    ) -> Result<Vec<EdgeIndex>, CoreError> {
        let out_of_bounds = points.iter().any(|p| {
            p.x < self.bounds_min.x || p.x > self.bounds_max.x || p.y < self.bounds_min.y || p.y > self.bounds_max.y
        });
        if out_of_bounds {
            return Err(CoreError::Road(RoadGraphError::OutOfBounds));
        }

        let edges = self.welder.insert_road(points, class, material)?;
        debug!("inserted road: {} sub-edges", edges.len());
        self.invalidate_downstream();
        Ok(edges)
    }

    /// Paint a zoning request over an area and immediately subdivide every
    /// block it reaches. Later requests take priority over earlier ones
    /// when they overlap the same block (see
    /// [`subdivider::subdivide_block`]'s selection-by-overlap rule).
    ///
    /// If the zone polygon overlaps no known block (an area never covered
    /// by `find_blocks`, e.g. painted before any road exists there), a
    /// "virtual block" is synthesized from the zone polygon itself and
    /// subdivided the same way a real block would be, so a standalone zone
    /// still produces parcels.
    pub fn paint_zone(
        &mut self,
        polygon: Vec<Vec2>,
        zone: ZoneType,
        density: Density,
        config: &SubdivisionConfig,
    ) -> ZonePaintResult {
        self.zones.push(ZoneRequest {
            polygon: polygon.clone(),
            zone,
            density,
        });

        if self.blocks.is_empty() {
            if let Ok(found) = blocks::find_blocks(self.welder.graph()) {
                self.blocks = found;
            }
        }

        let mut targets: Vec<usize> = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                geometry::polygon_intersects(&b.polygon, &polygon)
                    || geometry::point_in_polygon(geometry::centroid(&b.polygon), &polygon)
            })
            .map(|(i, _)| i)
            .collect();

        if targets.is_empty() {
            let id = self.blocks.len() as u64;
            let area = geometry::area(&polygon);
            info!("zone painted over no existing block; synthesizing virtual block {id}");
            self.blocks.push(Block {
                id,
                nodes: Vec::new(),
                polygon: polygon.clone(),
                holes: Vec::new(),
                edge_ids: Vec::new(),
                area,
                parcel_ids: Vec::new(),
            });
            targets.push(self.blocks.len() - 1);
        }

        let mut result = ZonePaintResult::default();
        for index in targets {
            let block_id = self.blocks[index].id;
            match subdivider::subdivide_block(&self.blocks[index], &self.zones, &mut self.rng, config) {
                Ok(mut parcels) => {
                    for (local, parcel) in parcels.iter_mut().enumerate() {
                        parcel.id = block_id * 10_000 + local as u64;
                    }
                    self.blocks[index].parcel_ids = parcels.iter().map(|p| p.id).collect();
                    result.affected_parcels.extend(parcels.iter().map(|p| p.id));
                    result.blocks.push(BlockSummary {
                        block_id,
                        area: self.blocks[index].area,
                        parcel_count: parcels.len(),
                    });
                    result.parcels.extend(parcels.clone());
                    self.parcels.insert(block_id, parcels);
                }
                Err(e) => {
                    warn!("block {block_id} not subdivided for painted zone: {e}");
                }
            }
        }
        self.massings.clear();
        self.mesh_cache.clear();
        result
    }

    /// Extract blocks from the current road graph, replacing any
    /// previously cached set.
    pub fn find_blocks(&mut self) -> Result<&[Block], CoreError> {
        self.blocks = blocks::find_blocks(self.welder.graph())?;
        self.parcels.clear();
        self.massings.clear();
        self.mesh_cache.clear();
        info!("found {} blocks", self.blocks.len());
        Ok(&self.blocks)
    }

    /// Subdivide every cached block into parcels under its painted zone.
    /// Blocks with no overlapping zone request are skipped (not an error
    /// at the batch level; per-block failures are logged and dropped).
    pub fn subdivide_all(&mut self, config: &SubdivisionConfig) -> Result<(), CoreError> {
        if self.blocks.is_empty() {
            self.find_blocks()?;
        }
        for index in 0..self.blocks.len() {
            let block_id = self.blocks[index].id;
            match subdivider::subdivide_block(&self.blocks[index], &self.zones, &mut self.rng, config) {
                Ok(mut parcels) => {
                    for (local, parcel) in parcels.iter_mut().enumerate() {
                        parcel.id = block_id * 10_000 + local as u64;
                    }
                    self.blocks[index].parcel_ids = parcels.iter().map(|p| p.id).collect();
                    self.parcels.insert(block_id, parcels);
                }
                Err(e) => {
                    warn!("block {block_id} not subdivided: {e}");
                }
            }
        }
        Ok(())
    }

    /// Generate a massing for every parcel of every subdivided block.
    pub fn generate_massings(&mut self, config: &MassingConfig) -> Result<(), CoreError> {
        if self.parcels.is_empty() {
            self.subdivide_all(&SubdivisionConfig::default())?;
        }
        for (block_id, parcels) in self.parcels.iter() {
            let mut built = Vec::with_capacity(parcels.len());
            for parcel in parcels {
                let level = 1u32;
                let seed = parcel.id.wrapping_add(level as u64 * 1000);
                let mut rng = Mulberry32::from_seed_u64(seed);
                match massing::generate(parcel, self.era, level, seed, &mut rng, config) {
                    Ok(m) => built.push(m),
                    Err(e) => {
                        warn!("parcel in block {block_id} not massed: {e}");
                        built.push(None);
                    }
                }
            }
            self.massings.insert(*block_id, built);
        }
        self.mesh_cache.clear();
        Ok(())
    }

    /// Generate (or re-roll, for an upgrade) a single parcel's massing at
    /// the given level, seeded deterministically from the parcel's id so
    /// the result does not depend on generation order (`§4.8`).
    pub fn generate_building_for_parcel(
        &self,
        parcel: &Parcel,
        level: u32,
        config: &MassingConfig,
    ) -> Result<Option<BuildingMassing>, CoreError> {
        let seed = parcel.id.wrapping_add(level as u64 * 1000);
        let mut rng = Mulberry32::from_seed_u64(seed);
        Ok(massing::generate(parcel, self.era, level, seed, &mut rng, config)?)
    }

    /// Flatten the road graph into straight wire segments (`§6`'s
    /// `get-roads` reply payload).
    pub fn road_segments(&self) -> Vec<RoadSegmentView> {
        let graph = self.welder.graph();
        let mut out = Vec::new();
        for edge_idx in graph.edges() {
            let Some((a, b)) = graph.edge_endpoints(edge_idx) else { continue };
            let Some(edge) = graph.edge(edge_idx) else { continue };
            let a_pos = graph.node(a).unwrap().position;
            let b_pos = graph.node(b).unwrap().position;
            let width = edge.class.base_width() * self.era.width_factor();
            let poly = edge.polyline(a_pos, b_pos);
            for w in poly.windows(2) {
                out.push(RoadSegmentView {
                    start: w[0],
                    end: w[1],
                    width,
                    class: edge.class,
                    material: edge.material,
                });
            }
        }
        out
    }

    /// Rebuild from a new seed, keeping the same bounds and era, and
    /// dropping every generated road, block, parcel, and massing (`§6`'s
    /// `shuffle-seed`).
    pub fn shuffle_seed(&mut self, seed: u64) {
        info!("reshuffling seed to {seed}");
        self.rng = Mulberry32::from_seed_u64(seed);
        self.welder = IntersectionWelder::new();
        self.zones.clear();
        self.last_layout_config = None;
        self.invalidate_downstream();
    }

    /// Switch era in place and, if a layout has already been generated,
    /// re-run it with the new era's rules woven into the existing graph
    /// (`§6`'s `set-era`: "re-run layout for new era"). A no-op on the
    /// era field alone if no layout has ever been generated — there's
    /// nothing to re-run yet.
    pub fn set_era(&mut self, era: Era) -> Result<(), CoreError> {
        info!("era set to {era:?}");
        self.era = era;
        if let Some(mut config) = self.last_layout_config.clone() {
            config.era = era;
            config.bounds_min = self.bounds_min;
            config.bounds_max = self.bounds_max;
            let generator = LayoutGenerator::new(config.clone());
            generator.generate(&mut self.welder)?;
            self.last_layout_config = Some(config);
            self.invalidate_downstream();
        }
        Ok(())
    }

    /// Drop all parcels and massings, keeping blocks and roads (`§6`'s
    /// `clear-zones`).
    pub fn clear_zones(&mut self) {
        self.zones.clear();
        self.parcels.clear();
        self.massings.clear();
        self.mesh_cache.clear();
    }

    /// Locate the parcel containing (or nearest to) `position`, per the
    /// `generate-building-for-zone` lookup chain in `§6`: exact
    /// point-in-polygon, then centroid match within 5 m, then nearest
    /// within 100 m. Returns `None` (surfaced as `IndexMiss` by callers)
    /// if nothing qualifies.
    pub fn find_parcel_at(&self, position: Vec2) -> Option<(usize, &Parcel)> {
        let all = || self.parcels.values().flatten().enumerate();
        if let Some((i, p)) = all().find(|(_, p)| geometry::point_in_polygon(position, &p.polygon)) {
            return Some((i, p));
        }
        if let Some((i, p)) = all().find(|(_, p)| geometry::centroid(&p.polygon).distance(position) <= 5.0) {
            return Some((i, p));
        }
        all()
            .map(|(i, p)| (i, p, geometry::centroid(&p.polygon).distance(position)))
            .filter(|(_, _, d)| *d <= 100.0)
            .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap())
            .map(|(i, p, _)| (i, p))
    }

    /// Flatten every generated massing into one combined mesh at `lod`,
    /// reusing each massing's per-(id, lod) cached mesh piece rather than
    /// re-tessellating it on every export.
    pub fn export_mesh(&mut self, lod: Lod) -> crate::mesh::MeshBuffers {
        let mut combined = crate::mesh::MeshBuffers::new();
        let lod_code = lod.code();
        for massings in self.massings.values() {
            for massing in massings.iter().flatten() {
                let key = (massing.id, lod_code);
                let piece = self
                    .mesh_cache
                    .entry(key)
                    .or_insert_with(|| massing.to_mesh(lod))
                    .clone();
                let base = combined.vertices.len() as u32;
                combined.vertices.extend(piece.vertices);
                combined.indices.extend(piece.indices.into_iter().map(|i| i + base));
            }
        }
        combined
    }

    fn invalidate_downstream(&mut self) {
        self.blocks.clear();
        self.parcels.clear();
        self.massings.clear();
        self.mesh_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pipeline_runs_end_to_end() {
        let mut core = CityCore::new(12345, Vec2::new(0.0, 0.0), Vec2::new(800.0, 800.0), Era::Through1950);
        core.generate_layout(LayoutConfig {
            seed: 12345,
            radial_count: 6,
            ring_count: 1,
            ..LayoutConfig::default()
        })
        .unwrap();
        core.paint_zone(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(800.0, 0.0),
                Vec2::new(800.0, 800.0),
                Vec2::new(0.0, 800.0),
            ],
            ZoneType::Residential,
            Density::Medium,
            &SubdivisionConfig::default(),
        );
        core.find_blocks().unwrap();
        core.subdivide_all(&SubdivisionConfig::default()).unwrap();
        core.generate_massings(&MassingConfig::default()).unwrap();

        assert!(core.road_graph().edge_count() > 0);
        let mesh = core.export_mesh(Lod::Tripartite);
        assert!(!mesh.vertices.is_empty());

        let segments = core.road_segments();
        assert!(!segments.is_empty());

        let (_, parcel) = core
            .parcels_for_block(0)
            .and_then(|p| p.first())
            .map(|p| (0usize, p.clone()))
            .expect("at least one parcel");
        let found = core.find_parcel_at(geometry::centroid(&parcel.polygon));
        assert!(found.is_some());
    }

    #[test]
    fn shuffle_seed_drops_generated_state() {
        let mut core = CityCore::new(1, Vec2::new(0.0, 0.0), Vec2::new(400.0, 400.0), Era::Beyond1990);
        core.insert_road(&[Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)], RoadClass::Local, RoadMaterial::Asphalt)
            .unwrap();
        assert!(core.road_graph().edge_count() > 0);
        core.shuffle_seed(99);
        assert_eq!(core.road_graph().edge_count(), 0);
    }

    #[test]
    fn clear_zones_keeps_blocks_but_drops_parcels() {
        let mut core = CityCore::new(1, Vec2::new(0.0, 0.0), Vec2::new(400.0, 400.0), Era::Beyond1990);
        core.generate_layout(LayoutConfig {
            seed: 1,
            radial_count: 4,
            ring_count: 1,
            ..LayoutConfig::default()
        })
        .unwrap();
        core.paint_zone(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(400.0, 0.0),
                Vec2::new(400.0, 400.0),
                Vec2::new(0.0, 400.0),
            ],
            ZoneType::Commercial,
            Density::High,
            &SubdivisionConfig::default(),
        );
        core.subdivide_all(&SubdivisionConfig::default()).unwrap();
        let block_count = core.blocks().len();
        core.clear_zones();
        assert_eq!(core.blocks().len(), block_count);
        assert!(core.parcels_for_block(0).is_none());
    }

    #[test]
    fn insert_road_outside_bounds_is_rejected() {
        let mut core = CityCore::new(1, Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0), Era::Beyond1990);
        let err = core
            .insert_road(
                &[Vec2::new(50.0, 50.0), Vec2::new(500.0, 50.0)],
                RoadClass::Local,
                RoadMaterial::Asphalt,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Road(RoadGraphError::OutOfBounds)));
    }

    #[test]
    fn painting_a_zone_with_no_blocks_yields_a_virtual_block_path() {
        let mut core = CityCore::new(2, Vec2::new(0.0, 0.0), Vec2::new(200.0, 200.0), Era::Beyond1990);
        let result = core.paint_zone(
            vec![
                Vec2::new(20.0, 20.0),
                Vec2::new(80.0, 20.0),
                Vec2::new(80.0, 80.0),
                Vec2::new(20.0, 80.0),
            ],
            ZoneType::Residential,
            Density::Low,
            &SubdivisionConfig::default(),
        );
        assert!(!result.affected_parcels.is_empty());
        assert_eq!(result.blocks.len(), 1);
    }

    #[test]
    fn set_era_re_runs_layout_when_one_exists() {
        let mut core = CityCore::new(5, Vec2::new(0.0, 0.0), Vec2::new(600.0, 600.0), Era::Through1950);
        core.generate_layout(LayoutConfig {
            seed: 5,
            radial_count: 4,
            ring_count: 1,
            ..LayoutConfig::default()
        })
        .unwrap();
        let edges_before = core.road_graph().edge_count();
        core.set_era(Era::Beyond1990).unwrap();
        assert_eq!(core.era(), Era::Beyond1990);
        assert!(core.road_graph().edge_count() >= edges_before);
    }
}
