//! Request/reply surface: the typed boundary an external collaborator
//! (renderer, UI, economic simulation) talks across. Every request is
//! handled synchronously and produces exactly one reply; there is no
//! push channel or background task.

use petgraph::graph::EdgeIndex;

use crate::core::{BlockSummary, RoadSegmentView};
use crate::error::CoreError;
use crate::geometry::Vec2;
use crate::layout::LayoutConfig;
use crate::massing::{BuildingMassing, Lod, MassingConfig};
use crate::mesh::MeshBuffers;
use crate::parcels::{Density, Parcel, SubdivisionConfig, ZoneType};
use crate::road::class::{Era, RoadClass, RoadMaterial};

/// A request sent to a [`crate::core::CityCore`]. Named after `§6`'s
/// message list (`boot`, `shuffle-seed`, `set-era`, `paint-road`, ...).
#[derive(Debug, Clone)]
pub enum Request {
    GenerateLayout(LayoutConfig),
    ShuffleSeed(u64),
    SetEra(Era),
    InsertRoad {
        points: Vec<Vec2>,
        class: RoadClass,
        material: RoadMaterial,
    },
    GetRoads,
    PaintZone {
        polygon: Vec<Vec2>,
        zone: ZoneType,
        density: Density,
        config: SubdivisionConfig,
    },
    GetParcels,
    GetBlocks,
    ClearZones,
    FindBlocks,
    SubdivideAll(SubdivisionConfig),
    GenerateBuildingForZone {
        position: Vec2,
        level: u32,
        config: MassingConfig,
        lod: Lod,
    },
    GenerateMassings(MassingConfig),
    ExportMesh(Lod),
    GetBuildingMesh {
        building_id: u64,
        lod: Lod,
    },
    SetBuildingLod(Lod),
    RegenerateWithZone {
        polygon: Vec<Vec2>,
        zone: ZoneType,
        density: Density,
        config: SubdivisionConfig,
        lod: Option<Lod>,
    },
}

/// The reply to a [`Request`]. Every variant here corresponds 1:1 to a
/// `Request` variant except `Error`, which any request can produce.
#[derive(Debug)]
pub enum Reply {
    LayoutGenerated,
    SeedShuffled,
    EraSet,
    RoadInserted { edges: Vec<EdgeIndex> },
    Roads(Vec<RoadSegmentView>),
    ZonePainted {
        affected_parcels: Vec<u64>,
        parcels: Vec<Parcel>,
        blocks: Vec<BlockSummary>,
    },
    ParcelCount(usize),
    BlocksFound { count: usize },
    ZonesCleared,
    Subdivided,
    BuildingSpawned {
        parcel_id: u64,
        massing: Option<BuildingMassing>,
        mesh: Option<MeshBuffers>,
        lod: Lod,
    },
    MassingsGenerated,
    Mesh(MeshBuffers),
    BuildingMesh(Option<MeshBuffers>),
    BuildingLodSet,
    ZoneRegenerated {
        affected_parcels: Vec<u64>,
        mesh: MeshBuffers,
        lod: Lod,
    },
    Error(CoreError),
}

/// Dispatch `request` against `core`, turning any error into
/// `Reply::Error` rather than propagating it, so a caller driving this
/// purely through messages never needs to unwind across the boundary.
pub fn handle(core: &mut crate::core::CityCore, request: Request) -> Reply {
    match request {
        Request::GenerateLayout(config) => match core.generate_layout(config) {
            Ok(()) => Reply::LayoutGenerated,
            Err(e) => Reply::Error(e),
        },
        Request::ShuffleSeed(seed) => {
            core.shuffle_seed(seed);
            Reply::SeedShuffled
        }
        Request::SetEra(era) => match core.set_era(era) {
            Ok(()) => Reply::EraSet,
            Err(e) => Reply::Error(e),
        },
        Request::InsertRoad { points, class, material } => {
            match core.insert_road(&points, class, material) {
                Ok(edges) => Reply::RoadInserted { edges },
                Err(e) => Reply::Error(e),
            }
        }
        Request::GetRoads => Reply::Roads(core.road_segments()),
        Request::PaintZone { polygon, zone, density, config } => {
            let result = core.paint_zone(polygon, zone, density, &config);
            Reply::ZonePainted {
                affected_parcels: result.affected_parcels,
                parcels: result.parcels,
                blocks: result.blocks,
            }
        }
        Request::GetParcels => {
            let count = core.blocks().iter().enumerate().filter_map(|(i, _)| core.parcels_for_block(i)).map(<[_]>::len).sum();
            Reply::ParcelCount(count)
        }
        Request::GetBlocks => Reply::BlocksFound { count: core.blocks().len() },
        Request::ClearZones => {
            core.clear_zones();
            Reply::ZonesCleared
        }
        Request::FindBlocks => match core.find_blocks() {
            Ok(blocks) => Reply::BlocksFound { count: blocks.len() },
            Err(e) => Reply::Error(e),
        },
        Request::SubdivideAll(config) => match core.subdivide_all(&config) {
            Ok(()) => Reply::Subdivided,
            Err(e) => Reply::Error(e),
        },
        Request::GenerateBuildingForZone { position, level, config, lod } => {
            match core.find_parcel_at(position) {
                Some((_, parcel)) => {
                    let parcel = parcel.clone();
                    match core.generate_building_for_parcel(&parcel, level, &config) {
                        Ok(massing) => {
                            let mesh = massing.as_ref().map(|m| m.to_mesh(lod));
                            Reply::BuildingSpawned { parcel_id: parcel.id, massing, mesh, lod }
                        }
                        Err(e) => Reply::Error(e),
                    }
                }
                None => Reply::Error(CoreError::InvalidRequest(
                    "IndexMiss: no parcel within 100m of position".to_string(),
                )),
            }
        }
        Request::GenerateMassings(config) => match core.generate_massings(&config) {
            Ok(()) => Reply::MassingsGenerated,
            Err(e) => Reply::Error(e),
        },
        Request::ExportMesh(lod) => Reply::Mesh(core.export_mesh(lod)),
        Request::GetBuildingMesh { building_id, lod } => {
            Reply::BuildingMesh(core.find_massing(building_id).map(|m| m.to_mesh(lod)))
        }
        Request::SetBuildingLod(lod) => {
            core.set_default_lod(lod);
            Reply::BuildingLodSet
        }
        Request::RegenerateWithZone { polygon, zone, density, config, lod } => {
            let result = core.paint_zone(polygon, zone, density, &config);
            if let Err(e) = core.generate_massings(&MassingConfig::default()) {
                return Reply::Error(e);
            }
            let lod = lod.unwrap_or_else(|| core.default_lod());
            let mesh = core.export_mesh(lod);
            Reply::ZoneRegenerated { affected_parcels: result.affected_parcels, mesh, lod }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CityCore;
    use crate::road::class::Era;

    #[test]
    fn generate_layout_request_produces_a_reply() {
        let mut core = CityCore::new(1, Vec2::new(0.0, 0.0), Vec2::new(400.0, 400.0), Era::Beyond1990);
        let reply = handle(
            &mut core,
            Request::GenerateLayout(LayoutConfig {
                seed: 1,
                radial_count: 4,
                ring_count: 1,
                ..LayoutConfig::default()
            }),
        );
        assert!(matches!(reply, Reply::LayoutGenerated));
    }

    #[test]
    fn unknown_zone_request_surfaces_as_error_reply() {
        let mut core = CityCore::new(2, Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), Era::Beyond1990);
        let reply = handle(&mut core, Request::FindBlocks);
        assert!(matches!(reply, Reply::Error(CoreError::Block(_))));
    }

    #[test]
    fn paint_zone_over_empty_area_takes_the_virtual_block_path() {
        let mut core = CityCore::new(3, Vec2::new(0.0, 0.0), Vec2::new(200.0, 200.0), Era::Beyond1990);
        let reply = handle(
            &mut core,
            Request::PaintZone {
                polygon: vec![
                    Vec2::new(20.0, 20.0),
                    Vec2::new(80.0, 20.0),
                    Vec2::new(80.0, 80.0),
                    Vec2::new(20.0, 80.0),
                ],
                zone: ZoneType::Commercial,
                density: Density::High,
                config: SubdivisionConfig::default(),
            },
        );
        match reply {
            Reply::ZonePainted { affected_parcels, blocks, .. } => {
                assert!(!affected_parcels.is_empty());
                assert_eq!(blocks.len(), 1);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn regenerate_with_zone_returns_a_non_empty_mesh() {
        let mut core = CityCore::new(4, Vec2::new(0.0, 0.0), Vec2::new(200.0, 200.0), Era::Beyond1990);
        let reply = handle(
            &mut core,
            Request::RegenerateWithZone {
                polygon: vec![
                    Vec2::new(10.0, 10.0),
                    Vec2::new(90.0, 10.0),
                    Vec2::new(90.0, 90.0),
                    Vec2::new(10.0, 90.0),
                ],
                zone: ZoneType::Residential,
                density: Density::Medium,
                config: SubdivisionConfig::default(),
                lod: Some(Lod::Extruded),
            },
        );
        match reply {
            Reply::ZoneRegenerated { mesh, lod, .. } => {
                assert!(!mesh.vertices.is_empty());
                assert_eq!(lod, Lod::Extruded);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
