//! Procedural layout: the optional seeding stage that proposes an entire
//! road network for a planning area, rather than welding roads supplied
//! one at a time by a caller.

pub mod generator;
pub mod poisson;

pub use generator::{LayoutConfig, LayoutGenerator};
