//! Common types shared by the zone navigation crates
//!
//! This crate holds the vocabulary both sides of the engine boundary agree on:
//! positions, polygon and tile references, mesh parameters, the query filter,
//! the engine status bit set and the capability traits an engine implements.

pub mod engine;
mod filter;
mod params;
mod poly_ref;
mod status;

pub use engine::{EngineResult, NavMeshQuery, TileData, TiledNavMesh};
pub use filter::QueryFilter;
pub use params::NavMeshParams;
pub use poly_ref::{PolyRef, TileRef};
pub use status::EngineStatus;

/// Represents a 3D position
pub type Position = glam::Vec3;
