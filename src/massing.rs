//! Massing generator: turns a zoned parcel into a building volume — a
//! setback footprint, a floor count, and a tripartite (base/body/roof)
//! height split — and optionally flattens that volume into a mesh.

use crate::error::MassingError;
use crate::geometry::{self, Vec2};
use crate::mesh::MeshBuffers;
use crate::parcels::{Density, Parcel, ZoneType};
use crate::rng::Mulberry32;
use crate::road::class::Era;

/// Architectural style, drawn from an era-indexed pool. Encoded as a
/// single byte on the wire (`§6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Style {
    Victorian = 0,
    ArtDeco = 1,
    Modern = 2,
    Brutalist = 3,
    Postmodern = 4,
    Contemporary = 5,
    Futuristic = 6,
}

impl Style {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// (base, roof) height fraction of the total, before jitter/clamp.
    /// Body is always the remainder.
    fn base_roof_fraction(self) -> (f64, f64) {
        match self {
            Style::Victorian => (0.15, 0.20),
            Style::ArtDeco => (0.20, 0.15),
            Style::Modern | Style::Contemporary => (0.10, 0.05),
            Style::Brutalist => (0.08, 0.03),
            Style::Postmodern => (0.12, 0.10),
            Style::Futuristic => (0.05, 0.08),
        }
    }
}

/// Pool of styles plausible for a given era, in the order a building from
/// that period would most to least likely have been built.
fn style_pool(era: Era) -> &'static [Style] {
    match era {
        Era::Through1900 => &[Style::Victorian],
        Era::Through1930 => &[Style::Victorian, Style::ArtDeco],
        Era::Through1950 => &[Style::ArtDeco, Style::Modern, Style::Brutalist],
        Era::Through1990 => &[Style::Modern, Style::Brutalist, Style::Postmodern],
        Era::Beyond1990 => &[Style::Postmodern, Style::Contemporary, Style::Futuristic],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Roof {
    Flat = 0,
    Gable = 1,
    Hip = 2,
    Mansard = 3,
    Pyramid = 4,
    Barrel = 5,
    Sawtooth = 6,
    Green = 7,
}

impl Roof {
    pub fn code(self) -> u8 {
        self as u8
    }
}

fn roof_pool(era: Era) -> &'static [Roof] {
    match era {
        Era::Through1900 => &[Roof::Gable, Roof::Hip, Roof::Mansard],
        Era::Through1930 => &[Roof::Gable, Roof::Hip, Roof::Mansard, Roof::Pyramid],
        Era::Through1950 => &[Roof::Mansard, Roof::Pyramid, Roof::Barrel, Roof::Flat],
        Era::Through1990 => &[Roof::Flat, Roof::Barrel, Roof::Pyramid],
        Era::Beyond1990 => &[Roof::Flat, Roof::Green],
    }
}

fn pick_roof(era: Era, zone: ZoneType, density: Density, rng: &mut Mulberry32) -> Roof {
    if zone == ZoneType::Industrial && rng.chance(0.7) {
        return Roof::Sawtooth;
    }
    if zone == ZoneType::Commercial && density == Density::High && rng.chance(0.7) {
        return Roof::Flat;
    }
    let pool = roof_pool(era);
    pool[rng.range_u32(0, pool.len() as u32) as usize]
}

/// Setback range, in meters, by density (`§4.8`: low 4-6, medium 2-4, high 1-2).
fn setback_range(density: Density) -> (f64, f64) {
    match density {
        Density::Low => (4.0, 6.0),
        Density::Medium => (2.0, 4.0),
        Density::High => (1.0, 2.0),
    }
}

/// Height range, in meters, by density (`§4.8`: low 3-6, medium 9-15, high 18-60).
fn height_range(density: Density) -> (f64, f64) {
    match density {
        Density::Low => (3.0, 6.0),
        Density::Medium => (9.0, 15.0),
        Density::High => (18.0, 60.0),
    }
}

#[derive(Debug, Clone)]
pub struct MassingConfig {
    pub min_footprint_area: f64,
    pub floor_height: f64,
}

impl Default for MassingConfig {
    fn default() -> Self {
        Self {
            min_footprint_area: 20.0,
            floor_height: 3.0,
        }
    }
}

/// Level of detail a caller wants the mesh flattened to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lod {
    /// Extruded footprint plus a top cap only.
    Extruded,
    /// Base/body/roof volumes as three stacked bands.
    Tripartite,
    /// Tripartite plus a wall band per floor, and style-conditional
    /// features on the body band.
    PerFloor,
}

impl Lod {
    pub fn code(self) -> u8 {
        match self {
            Lod::Extruded => 0,
            Lod::Tripartite => 1,
            Lod::PerFloor => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildingMassing {
    /// Stable id, derived from the owning parcel and level so a re-roll at
    /// the same level reproduces the same id.
    pub id: u64,
    pub parcel_id: u64,
    /// RNG seed this massing was generated from, recorded for diagnostics
    /// and so a caller can reproduce a specific roll off-line.
    pub seed: u64,
    pub zone_type: ZoneType,
    pub density: Density,
    pub footprint: Vec<Vec2>,
    pub floors: u32,
    pub floor_height: f64,
    pub base_height: f64,
    pub body_height: f64,
    pub roof_height: f64,
    pub style: Style,
    pub roof: Roof,
    pub level: u32,
}

impl BuildingMassing {
    pub fn total_height(&self) -> f64 {
        self.base_height + self.body_height + self.roof_height
    }

    /// Flatten this massing into a mesh at the requested level of detail.
    pub fn to_mesh(&self, lod: Lod) -> MeshBuffers {
        let mut mesh = MeshBuffers::new();
        let down = [0.0, 0.0, -1.0];
        let up = [0.0, 0.0, 1.0];

        mesh.add_flat_polygon(&self.footprint, 0.0, down, 0, true);

        match lod {
            Lod::Extruded => {
                mesh.add_wall_band(&self.footprint, 0.0, self.total_height(), 0);
            }
            Lod::Tripartite => {
                let z0 = 0.0;
                let z1 = self.base_height;
                let z2 = z1 + self.body_height;
                let z3 = z2 + self.roof_height;
                mesh.add_wall_band(&self.footprint, z0, z1, 0);
                mesh.add_wall_band(&self.footprint, z1, z2, 1);
                mesh.add_wall_band(&self.footprint, z2, z3, 2);
            }
            Lod::PerFloor => {
                mesh.add_wall_band(&self.footprint, 0.0, self.base_height, 0);
                let mut z = self.base_height;
                for floor in 0..self.floors {
                    let next = z + self.floor_height;
                    mesh.add_wall_band(&self.footprint, z, next.min(self.base_height + self.body_height), floor + 1);
                    z = next;
                }
                let roof_base = self.base_height + self.body_height;
                mesh.add_wall_band(&self.footprint, roof_base, roof_base + self.roof_height, self.floors + 1);
            }
        }

        mesh.add_flat_polygon(&self.footprint, self.total_height(), up, u32::MAX, false);
        mesh.recompute_smooth_normals();
        mesh
    }
}

/// Generate a building massing for `parcel` at the given upgrade `level`
/// (1 for a fresh spawn), or `None` if the zone is [`ZoneType::Unzoned`]
/// (no zone painted, so no building). `seed` is the value `rng` was
/// constructed from, recorded on the result for reproducibility.
pub fn generate(
    parcel: &Parcel,
    era: Era,
    level: u32,
    seed: u64,
    rng: &mut Mulberry32,
    config: &MassingConfig,
) -> Result<Option<BuildingMassing>, MassingError> {
    if parcel.zone == ZoneType::Unzoned {
        return Ok(None);
    }

    let (setback_min, setback_max) = setback_range(parcel.density);
    let setback = rng.range_f64(setback_min, setback_max);
    let footprint = geometry::offset_polygon_inward(&parcel.polygon, setback);
    if footprint.len() < 3 {
        return Err(MassingError::SetbackCollapse(setback));
    }
    let footprint_area = geometry::area(&footprint);
    if footprint_area < config.min_footprint_area {
        return Err(MassingError::FootprintTooSmall(footprint_area));
    }

    let pool = style_pool(era);
    let style = pool[rng.range_u32(0, pool.len() as u32) as usize];
    let roof = pick_roof(era, parcel.zone, parcel.density, rng);

    let (height_min, height_max) = height_range(parcel.density);
    let mut total_height = rng.range_f64(height_min, height_max);
    total_height *= 1.0 + 0.3 * (level.max(1) as f64 - 1.0);
    total_height *= match parcel.zone {
        ZoneType::Commercial => 1.1,
        ZoneType::Industrial => 0.7,
        _ => 1.0,
    };

    let (mut base_frac, mut roof_frac) = style.base_roof_fraction();
    base_frac = (base_frac + rng.range_f64(-0.05, 0.05)).clamp(0.05, 0.25);
    roof_frac = (roof_frac + rng.range_f64(-0.05, 0.05)).clamp(0.03, 0.25);
    let body_frac = (1.0 - base_frac - roof_frac).max(0.0);

    let base_height = total_height * base_frac;
    let body_height = total_height * body_frac;
    let roof_height = total_height * roof_frac;
    let floors = ((body_height / config.floor_height).round() as u32).max(1);

    Ok(Some(BuildingMassing {
        id: parcel.id.wrapping_add(level as u64 * 1000),
        parcel_id: parcel.id,
        seed,
        zone_type: parcel.zone,
        density: parcel.density,
        footprint,
        floors,
        floor_height: config.floor_height,
        base_height,
        body_height,
        roof_height,
        style,
        roof,
        level: level.max(1),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_parcel(side: f64, zone: ZoneType, density: Density) -> Parcel {
        let polygon = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(side, 0.0),
            Vec2::new(side, side),
            Vec2::new(0.0, side),
        ];
        let centroid = crate::geometry::centroid(&polygon);
        Parcel {
            id: 1,
            block_id: 0,
            polygon,
            area: side * side,
            zone,
            density,
            frontage: None,
            frontage_edge: -1,
            is_corner: false,
            centroid,
        }
    }

    #[test]
    fn unzoned_parcel_has_no_massing() {
        let parcel = square_parcel(30.0, ZoneType::Unzoned, Density::Low);
        let mut rng = Mulberry32::new(1);
        let massing = generate(&parcel, Era::Beyond1990, 1, 1, &mut rng, &MassingConfig::default()).unwrap();
        assert!(massing.is_none());
    }

    #[test]
    fn residential_parcel_gets_a_massing_with_matching_height_split() {
        let parcel = square_parcel(25.0, ZoneType::Residential, Density::Medium);
        let mut rng = Mulberry32::new(2);
        let massing = generate(&parcel, Era::Through1950, 1, 2, &mut rng, &MassingConfig::default())
            .unwrap()
            .unwrap();
        assert!(massing.floors >= 1);
        let sum = massing.base_height + massing.body_height + massing.roof_height;
        assert!((sum - massing.total_height()).abs() < 1e-9);
    }

    #[test]
    fn tiny_parcel_is_rejected() {
        let parcel = square_parcel(3.0, ZoneType::Residential, Density::Low);
        let mut rng = Mulberry32::new(3);
        let err = generate(&parcel, Era::Beyond1990, 1, 3, &mut rng, &MassingConfig::default()).unwrap_err();
        assert!(matches!(err, MassingError::SetbackCollapse(_) | MassingError::FootprintTooSmall(_)));
    }

    #[test]
    fn higher_level_scales_up_total_height() {
        let parcel = square_parcel(25.0, ZoneType::Commercial, Density::High);
        let mut rng1 = Mulberry32::new(4);
        let mut rng2 = Mulberry32::new(4);
        let m1 = generate(&parcel, Era::Beyond1990, 1, 4, &mut rng1, &MassingConfig::default())
            .unwrap()
            .unwrap();
        let m2 = generate(&parcel, Era::Beyond1990, 3, 4, &mut rng2, &MassingConfig::default())
            .unwrap()
            .unwrap();
        assert!(m2.total_height() > m1.total_height());
    }

    #[test]
    fn mesh_has_floor_bands_at_per_floor_lod() {
        let parcel = square_parcel(25.0, ZoneType::Commercial, Density::High);
        let mut rng = Mulberry32::new(5);
        let massing = generate(&parcel, Era::Beyond1990, 1, 5, &mut rng, &MassingConfig::default())
            .unwrap()
            .unwrap();
        let mesh = massing.to_mesh(Lod::PerFloor);
        assert!(!mesh.vertices.is_empty());
        assert!(!mesh.indices.is_empty());
    }
}
