//! Parcel subdivision: splitting a city block into individually zoned
//! lots, each with (if possible) a frontage onto a bounding road.

pub mod skeleton;
pub mod subdivider;
pub mod voronoi;

use crate::geometry::Vec2;

pub use subdivider::{subdivide_block, SubdivisionConfig, ZoneRequest};

/// Coarse land use. Encoded as a single byte on the wire (`§6`).
/// `Unzoned` is the "none" zone type: a parcel carved out but never
/// painted, which gets no massing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ZoneType {
    Residential = 0,
    Commercial = 1,
    Industrial = 2,
    Unzoned = 3,
}

impl ZoneType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ZoneType::Residential),
            1 => Some(ZoneType::Commercial),
            2 => Some(ZoneType::Industrial),
            3 => Some(ZoneType::Unzoned),
            _ => None,
        }
    }
}

/// Requested density tier for a zoned area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Density {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Density {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Density::Low),
            1 => Some(Density::Medium),
            2 => Some(Density::High),
            _ => None,
        }
    }

    /// Target parcel area in square meters for this density tier; denser
    /// tiers get smaller individual lots carved from the same block.
    pub fn target_parcel_area(self) -> f64 {
        match self {
            Density::Low => 800.0,
            Density::Medium => 350.0,
            Density::High => 150.0,
        }
    }
}

/// Which edge of the block polygon a parcel fronts, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frontage {
    pub block_edge_index: usize,
    pub width: f64,
}

#[derive(Debug, Clone)]
pub struct Parcel {
    /// Stable id, assigned once a parcel is attached to a block; used to
    /// seed per-parcel massing RNG so a re-roll at a new level reproduces
    /// deterministically regardless of generation order (`§4.8`).
    pub id: u64,
    /// Id of the block this parcel was carved from.
    pub block_id: u64,
    pub polygon: Vec<Vec2>,
    pub area: f64,
    pub zone: ZoneType,
    pub density: Density,
    pub frontage: Option<Frontage>,
    /// The road-graph edge this parcel fronts onto, or `-1` if none was
    /// resolved (either unzoned standalone geometry or a block whose
    /// bounding edges aren't known).
    pub frontage_edge: i64,
    /// True if the parcel shares a qualifying frontage with more than one
    /// block edge.
    pub is_corner: bool,
    pub centroid: Vec2,
}
