//! Navigation mesh path queries for zone agents
//!
//! `zonenav` sits between game code and a navigation query engine. It loads a
//! persisted tile set for one zone, converts positions between the game's world
//! frame and the engine frame, and turns the engine's corridor and corner
//! output into a bounded buffer of world-frame waypoints.
//!
//! The engine is anything implementing [`TiledNavMesh`]; the zone layer never
//! names a concrete engine type.
//!
//! ```rust,no_run
//! use glam::Vec3;
//! use zonenav::ZoneNavMesh;
//! use zonenav_detour::DetourNavMesh;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut navmesh = ZoneNavMesh::<DetourNavMesh>::new();
//! navmesh.load("navmeshes/west_ronfaure.nav")?;
//!
//! let mut waypoints = [Vec3::ZERO; 16];
//! let count = navmesh.find_path(
//!     Vec3::new(-224.0, 60.0, -316.0),
//!     Vec3::new(-224.0, 60.0, -324.0),
//!     &mut waypoints,
//! )?;
//! for waypoint in &waypoints[..count] {
//!     println!("{waypoint}");
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod path_query;
mod random_goal;
pub mod tile_store;
pub mod transform;
mod zone_mesh;

#[cfg(test)]
mod zone_scenario_tests;

pub use config::NavMeshConfig;
pub use error::{LoadError, PathError, ERROR_NEARESTPOLY, GENERIC_FAILURE};
pub use self_test::{Scenario, SelfTestOutcome, SCENARIOS};
pub use tile_store::LoadSummary;
pub use zone_mesh::ZoneNavMesh;

pub use zonenav_common::{
    EngineStatus, NavMeshParams, NavMeshQuery, PolyRef, Position, QueryFilter, TileRef,
    TiledNavMesh,
};

use log::Level;

/// Logs every detail flag carried by an engine status, one line each
pub(crate) fn log_engine_status(level: Level, context: &str, status: EngineStatus) {
    log::log!(level, "{context}: engine returned {status}");
    for message in status.detail_messages() {
        log::log!(level, "{context}: detour {message}");
    }
}
