//! Procedural urban-fabric generator.
//!
//! Given a bounded planning area, a deterministic seed, and a historical
//! era tag, this crate builds a connected, classified road network; welds
//! it into intersections; finds the blocks it encloses; subdivides those
//! blocks into zoned parcels; and generates a building massing for each
//! parcel. Everything runs single-threaded and cooperatively behind a
//! request/reply boundary (see [`messages`]) — there is no background
//! task, no shared mutable state, and no panic on ordinary malformed
//! input (see [`error`]).

pub mod blocks;
pub mod core;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod massing;
pub mod mesh;
pub mod parcels;
pub mod rng;
pub mod road;
pub mod spatial_index;
pub mod welder;

pub mod messages;

pub use core::CityCore;
pub use error::CoreError;
pub use geometry::Vec2;
