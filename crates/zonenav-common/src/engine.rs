//! Capability contract between the zone navigation layer and a query engine
//!
//! A navigation engine is a tiled mesh type plus a stateful query context.
//! The mesh owns every registered tile; the query context owns only its search
//! scratch state and receives the mesh by reference on each call, so it can
//! never outlive the mesh it searches.
//!
//! All positions crossing this boundary are in the engine's coordinate frame.

use super::{EngineStatus, NavMeshParams, PolyRef, QueryFilter, TileRef};

/// Result of an engine operation
pub type EngineResult<T> = std::result::Result<T, EngineStatus>;

/// Owned tile payload handed to the engine
///
/// Moving a `TileData` into [`TiledNavMesh::add_tile`] transfers ownership of
/// the bytes to the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileData(Box<[u8]>);

impl TileData {
    /// Allocates a zero filled payload, returning `None` if memory is exhausted
    pub fn zeroed(size: usize) -> Option<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(size).ok()?;
        bytes.resize(size, 0);
        Some(Self(bytes.into_boxed_slice()))
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<Vec<u8>> for TileData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

/// A tiled navigation mesh
pub trait TiledNavMesh: Sized {
    /// Query context type bound to this mesh
    type Query: NavMeshQuery<Mesh = Self>;

    /// Allocates an empty, uninitialized mesh
    fn allocate() -> Self;

    /// Initializes the mesh for tiled use
    fn init(&mut self, params: &NavMeshParams) -> EngineResult<()>;

    /// Registers a tile, taking ownership of its payload
    ///
    /// `last_ref` is the reference the tile had when it was saved, or
    /// [`TileRef::NULL`] to let the engine choose.
    fn add_tile(&mut self, data: TileData, last_ref: TileRef) -> EngineResult<TileRef>;

    /// Returns true if the reference points at a polygon in a loaded tile
    fn is_valid_poly_ref(&self, poly_ref: PolyRef) -> bool;

    /// Creates a query context with a search node budget of `max_nodes`
    fn create_query(&self, max_nodes: usize) -> EngineResult<Self::Query>;
}

/// Stateful query context for a [`TiledNavMesh`]
pub trait NavMeshQuery {
    /// Mesh type this context searches
    type Mesh;

    /// Finds the polygon nearest to `center` within the box `center ± half_extents`
    ///
    /// Returns the polygon reference and the closest point on it. When no
    /// polygon is in range the call succeeds with [`PolyRef::NULL`].
    fn find_nearest_poly(
        &mut self,
        mesh: &Self::Mesh,
        center: &[f32; 3],
        half_extents: &[f32; 3],
        filter: &QueryFilter,
    ) -> EngineResult<(PolyRef, [f32; 3])>;

    /// Finds a polygon corridor from `start_ref` to `end_ref`
    ///
    /// Writes at most `path.len()` references and returns the number written
    /// together with the success status, which may carry partial-result,
    /// out-of-nodes or buffer-too-small details.
    #[allow(clippy::too_many_arguments)]
    fn find_path(
        &mut self,
        mesh: &Self::Mesh,
        start_ref: PolyRef,
        end_ref: PolyRef,
        start_pos: &[f32; 3],
        end_pos: &[f32; 3],
        filter: &QueryFilter,
        path: &mut [PolyRef],
    ) -> EngineResult<(usize, EngineStatus)>;

    /// Pulls the string through a corridor, producing corner points
    ///
    /// The first point written is the start position and the last the end
    /// position, unless `points` is too small to hold them all.
    fn find_straight_path(
        &mut self,
        mesh: &Self::Mesh,
        start_pos: &[f32; 3],
        end_pos: &[f32; 3],
        corridor: &[PolyRef],
        points: &mut [[f32; 3]],
    ) -> EngineResult<(usize, EngineStatus)>;

    /// Samples a random point reachable from `start_ref` within `radius` of `center`
    ///
    /// `frand` must return values in `[0, 1)`.
    fn find_random_point_around_circle(
        &mut self,
        mesh: &Self::Mesh,
        start_ref: PolyRef,
        center: &[f32; 3],
        radius: f32,
        filter: &QueryFilter,
        frand: &mut dyn FnMut() -> f32,
    ) -> EngineResult<(PolyRef, [f32; 3])>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_tile_data() {
        let data = TileData::zeroed(16).unwrap();
        assert_eq!(data.len(), 16);
        assert!(data.as_slice().iter().all(|b| *b == 0));
        assert!(TileData::zeroed(0).unwrap().is_empty());
    }

    #[test]
    fn test_zeroed_tile_data_reports_exhaustion() {
        assert!(TileData::zeroed(usize::MAX).is_none());
    }
}
