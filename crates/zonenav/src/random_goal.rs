//! Paths to randomly sampled goals

use log::{error, Level};
use rand::Rng;

use crate::error::PathError;
use crate::log_engine_status;
use crate::path_query::snap_to_poly;
use crate::transform::{engine_point, world_point};
use crate::zone_mesh::ZoneNavMesh;
use zonenav_common::{NavMeshQuery, Position, QueryFilter, TiledNavMesh};

impl<M: TiledNavMesh> ZoneNavMesh<M> {
    /// Finds a path from `start` to a random reachable point within `max_radius`
    ///
    /// The goal is drawn from `rng` with probability proportional to polygon
    /// area, then handed to [`Self::find_path`].
    pub fn find_random_path<R: Rng + ?Sized>(
        &self,
        start: Position,
        max_radius: f32,
        waypoints: &mut [Position],
        rng: &mut R,
    ) -> Result<usize, PathError> {
        let goal = self.sample_goal(start, max_radius, rng)?;
        self.find_path(start, goal, waypoints)
    }

    /// Samples a world-frame point reachable from `start` within `max_radius`
    fn sample_goal<R: Rng + ?Sized>(
        &self,
        start: Position,
        max_radius: f32,
        rng: &mut R,
    ) -> Result<Position, PathError> {
        let loaded = self.loaded()?;
        let mesh = &loaded.mesh;
        let mut query = loaded.query();

        let spos = engine_point(start);
        let filter = QueryFilter::all();
        let extents = self.config().random_path_extents;
        let (start_ref, _) = snap_to_poly(mesh, &mut *query, &spos, &extents, &filter)?;

        let mut frand = || rng.gen::<f32>();
        match query.find_random_point_around_circle(
            mesh,
            start_ref,
            &spos,
            max_radius,
            &filter,
            &mut frand,
        ) {
            Ok((poly, point)) if poly.is_valid() => Ok(world_point(&point)),
            Ok(_) => {
                error!("No random point found around {start}");
                Err(PathError::NearestPoly)
            }
            Err(status) => {
                error!("Error finding random point around {start}");
                log_engine_status(Level::Error, "find_random_point_around_circle", status);
                Err(PathError::NearestPoly)
            }
        }
    }
}
