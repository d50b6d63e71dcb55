//! Structured error and rejection taxonomy.
//!
//! Every stage reports failures as a typed variant rather than panicking;
//! a request that cannot be satisfied comes back as a `Reply::Error`
//! wrapping one of these, never as an unwind.

use thiserror::Error;

/// Errors raised while inserting a road segment into the graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoadGraphError {
    #[error("segment endpoints coincide within snap threshold")]
    DegenerateSegment,
    #[error("segment length {0:.2}m is below the minimum road separation")]
    TooShort(f64),
    #[error("insertion angle at node is below the minimum allowed turn angle")]
    MinAngleViolation,
    #[error("segment self-intersects")]
    SelfIntersecting,
    #[error("node index {0:?} is not present in the graph")]
    UnknownNode(usize),
    #[error("segment endpoint lies outside the planning bounds")]
    OutOfBounds,
}

/// Errors raised while welding a new segment into the intersection table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WelderError {
    #[error(transparent)]
    Graph(#[from] RoadGraphError),
    #[error("crossing point could not be resolved to a stable intersection")]
    UnresolvedCrossing,
    #[error("merging intersections would collapse the graph below 2 nodes")]
    MergeUnderflow,
}

/// Errors raised by the procedural layout generator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error(transparent)]
    Graph(#[from] RoadGraphError),
    #[error(transparent)]
    Welder(#[from] WelderError),
    #[error("planning area width/height must be positive, got {0}x{1}")]
    InvalidBounds(f64, f64),
    #[error("requested seed count {0} produced zero usable centers after Poisson rejection")]
    SeedStarved(usize),
    #[error("connectivity repair exceeded its iteration budget")]
    RepairBudgetExceeded,
}

/// Errors raised while extracting blocks from the road graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BlockFinderError {
    #[error("road graph has no edges to trace blocks from")]
    EmptyGraph,
    #[error("cycle search exceeded its depth budget ({0} nodes)")]
    DepthBudgetExceeded(usize),
    #[error("cycle search exceeded its result budget ({0} cycles)")]
    CycleBudgetExceeded(usize),
}

/// Errors raised while subdividing a block into parcels.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParcelError {
    #[error("block area {0:.2}m^2 is below the minimum block area")]
    BlockTooSmall(f64),
    #[error("block polygon is degenerate (fewer than 3 usable vertices)")]
    DegenerateBlock,
    #[error("no zoning request overlaps this block")]
    NoZoneAssigned,
    #[error("recursive subdivision exceeded its depth budget")]
    SubdivisionBudgetExceeded,
}

/// Errors raised while generating a building massing for a parcel.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MassingError {
    #[error("parcel area {0:.2}m^2 is below the minimum footprint after setback")]
    FootprintTooSmall(f64),
    #[error("setback {0:.2}m collapses the parcel to fewer than 3 vertices")]
    SetbackCollapse(f64),
    #[error("unknown architectural style for era/zone combination")]
    UnknownStyle,
}

/// Top-level error returned across the request/reply boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error(transparent)]
    Road(#[from] RoadGraphError),
    #[error(transparent)]
    Welder(#[from] WelderError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Block(#[from] BlockFinderError),
    #[error(transparent)]
    Parcel(#[from] ParcelError),
    #[error(transparent)]
    Massing(#[from] MassingError),
    #[error("request referenced unknown id {0}")]
    UnknownId(u64),
    #[error("request payload failed validation: {0}")]
    InvalidRequest(String),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
