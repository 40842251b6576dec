//! Navigation mesh initialization parameters

use serde::{Deserialize, Serialize};

/// Parameters used to initialize a tiled navigation mesh
///
/// Stored verbatim in the tile set file header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavMeshParams {
    /// World-space origin of the tile grid
    pub origin: [f32; 3],
    /// Width of each tile along the x-axis
    pub tile_width: f32,
    /// Depth of each tile along the z-axis
    pub tile_height: f32,
    /// Maximum number of tiles the mesh can contain
    pub max_tiles: i32,
    /// Maximum number of polygons each tile can contain
    pub max_polys_per_tile: i32,
}

impl NavMeshParams {
    /// Size in bytes of the serialized parameter block
    pub const ENCODED_SIZE: usize = 28;
}
