//! Detour compatible navigation mesh engine
//!
//! This crate implements the `zonenav-common` engine contract on top of tile
//! payloads in the Detour v7 binary layout, so tile sets exported by the
//! Recast/Detour toolchain can be queried without a native library.
//!
//! Supported queries:
//!
//! - nearest polygon lookup
//! - A* corridor search over polygon links, bounded by a node budget
//! - funnel string pulling of a corridor into corner points
//! - area weighted random point sampling around a circle
//!
//! Off-mesh connections are read but never traversed.
//!
//! # Example
//!
//! ```rust
//! use zonenav_common::{NavMeshParams, NavMeshQuery, QueryFilter, TileRef, TiledNavMesh};
//! use zonenav_detour::{DetourNavMesh, TileBuilder};
//!
//! # fn example() -> Result<(), zonenav_common::EngineStatus> {
//! let mut tile = TileBuilder::new(0, 0);
//! tile.add_poly(
//!     &[[0.0, 0.0, 10.0], [10.0, 0.0, 10.0], [10.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
//!     &[0, 0, 0, 0],
//!     1,
//! );
//!
//! let mut mesh = DetourNavMesh::allocate();
//! mesh.init(&NavMeshParams {
//!     origin: [0.0; 3],
//!     tile_width: 10.0,
//!     tile_height: 10.0,
//!     max_tiles: 1,
//!     max_polys_per_tile: 4,
//! })?;
//! mesh.add_tile(tile.build().into(), TileRef::NULL)?;
//!
//! let mut query = mesh.create_query(64)?;
//! let (poly, _) =
//!     query.find_nearest_poly(&mesh, &[5.0, 0.0, 5.0], &[1.0, 1.0, 1.0], &QueryFilter::all())?;
//! assert!(mesh.is_valid_poly_ref(poly));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod geometry;
mod nav_mesh;
mod nav_mesh_query;
mod node_pool;
pub mod tile_format;

#[cfg(test)]
mod query_tests;

pub use nav_mesh::{DetourNavMesh, Link, MeshTile};
pub use nav_mesh_query::DetourNavMeshQuery;
pub use node_pool::MAX_POOL_NODES;
pub use tile_format::{TileBuilder, EXT_LINK};

/// Maximum number of vertices per navigation polygon
pub const MAX_VERTS_PER_POLY: usize = 6;
