//! Point to point path queries

use log::{debug, warn, Level};

use crate::error::PathError;
use crate::log_engine_status;
use crate::transform::{engine_point, world_point};
use crate::zone_mesh::ZoneNavMesh;
use zonenav_common::{EngineStatus, NavMeshQuery, PolyRef, Position, QueryFilter, TiledNavMesh};

/// Snaps an engine-frame position to the nearest valid polygon
pub(crate) fn snap_to_poly<M: TiledNavMesh>(
    mesh: &M,
    query: &mut M::Query,
    pos: &[f32; 3],
    half_extents: &[f32; 3],
    filter: &QueryFilter,
) -> Result<(PolyRef, [f32; 3]), PathError> {
    match query.find_nearest_poly(mesh, pos, half_extents, filter) {
        Ok((poly, nearest)) if mesh.is_valid_poly_ref(poly) => Ok((poly, nearest)),
        Ok(_) => {
            debug!("No polygon near {pos:?}");
            Err(PathError::NearestPoly)
        }
        Err(status) => {
            log_engine_status(Level::Error, "find_nearest_poly", status);
            Err(PathError::NearestPoly)
        }
    }
}

/// Logs the flags an engine may attach to a successful reply
fn log_soft_status(context: &str, status: EngineStatus) {
    if status.detail() != 0 {
        log_engine_status(Level::Debug, context, status);
    }
}

impl<M: TiledNavMesh> ZoneNavMesh<M> {
    /// Finds a path from `start` to `end` in world frame
    ///
    /// Waypoints are written to `waypoints` in walking order, excluding the
    /// start position. At most `waypoints.len()` are written; a longer path is
    /// cut short. Returns the number of waypoints written.
    pub fn find_path(
        &self,
        start: Position,
        end: Position,
        waypoints: &mut [Position],
    ) -> Result<usize, PathError> {
        let loaded = self.loaded()?;
        let mesh = &loaded.mesh;
        let mut query = loaded.query();
        let config = self.config();

        let spos = engine_point(start);
        let epos = engine_point(end);
        let filter = QueryFilter::all();

        let (start_ref, snearest) =
            snap_to_poly(mesh, &mut *query, &spos, &config.path_extents, &filter)?;
        let (end_ref, enearest) =
            snap_to_poly(mesh, &mut *query, &epos, &config.path_extents, &filter)?;

        let mut corridor = vec![PolyRef::NULL; config.max_nav_polys];
        let (corridor_len, status) = query
            .find_path(
                mesh,
                start_ref,
                end_ref,
                &snearest,
                &enearest,
                &filter,
                &mut corridor,
            )
            .map_err(|status| {
                log_engine_status(Level::Error, "find_path", status);
                PathError::Query(status)
            })?;
        log_soft_status("find_path", status);

        if corridor_len == 0 {
            return Ok(0);
        }

        let mut points = vec![[0.0f32; 3]; config.max_nav_polys];
        let (point_count, status) = query
            .find_straight_path(
                mesh,
                &snearest,
                &enearest,
                &corridor[..corridor_len],
                &mut points,
            )
            .map_err(|status| {
                log_engine_status(Level::Error, "find_straight_path", status);
                PathError::Query(status)
            })?;
        log_soft_status("find_straight_path", status);

        // The first point is the start position
        let produced = point_count.saturating_sub(1);
        let mut written = 0;
        for (slot, point) in waypoints
            .iter_mut()
            .zip(points.iter().take(point_count).skip(1))
        {
            *slot = world_point(point);
            written += 1;
        }

        if written < produced {
            warn!("Path from {start} to {end} truncated to {written} of {produced} waypoints");
        }
        debug!("Path from {start} to {end}: {written} waypoints, {corridor_len} polygons");
        Ok(written)
    }
}
