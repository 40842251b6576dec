//! Tests for single tile queries: nearest polygon, corridor search, string
//! pulling and random sampling.

#[cfg(test)]
mod tests {
    use crate::{DetourNavMesh, DetourNavMeshQuery, TileBuilder};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use zonenav_common::{
        EngineResult, EngineStatus, NavMeshParams, NavMeshQuery, PolyRef, QueryFilter, TileRef,
        TiledNavMesh,
    };

    const EXTENTS: [f32; 3] = [2.0, 4.0, 2.0];

    fn params(max_tiles: i32, max_polys: i32) -> NavMeshParams {
        NavMeshParams {
            origin: [0.0; 3],
            tile_width: 100.0,
            tile_height: 100.0,
            max_tiles,
            max_polys_per_tile: max_polys,
        }
    }

    fn square(x0: f32, z0: f32, x1: f32, z1: f32) -> [[f32; 3]; 4] {
        [
            [x0, 0.0, z1],
            [x1, 0.0, z1],
            [x1, 0.0, z0],
            [x0, 0.0, z0],
        ]
    }

    /// Three squares in a row along x plus one unconnected square
    fn strip_mesh() -> EngineResult<(DetourNavMesh, Vec<PolyRef>)> {
        let mut tile = TileBuilder::new(0, 0);
        tile.add_poly(&square(0.0, 0.0, 10.0, 10.0), &[0, 2, 0, 0], 1);
        tile.add_poly(&square(10.0, 0.0, 20.0, 10.0), &[0, 3, 0, 1], 1);
        tile.add_poly(&square(20.0, 0.0, 30.0, 10.0), &[0, 0, 0, 2], 1);
        tile.add_poly(&square(50.0, 0.0, 60.0, 10.0), &[0, 0, 0, 0], 1);

        let mut mesh = DetourNavMesh::allocate();
        mesh.init(&params(1, 8))?;
        let base = mesh.add_tile(tile.build().into(), TileRef::NULL)?;
        let refs = (0..4).map(|i| PolyRef::new(base.id() | i)).collect();
        Ok((mesh, refs))
    }

    /// Two squares side by side and a third on top of the second
    fn l_mesh() -> EngineResult<(DetourNavMesh, Vec<PolyRef>)> {
        let mut tile = TileBuilder::new(0, 0);
        tile.add_poly(&square(0.0, 0.0, 10.0, 10.0), &[0, 2, 0, 0], 1);
        tile.add_poly(&square(10.0, 0.0, 20.0, 10.0), &[3, 0, 0, 1], 1);
        tile.add_poly(&square(10.0, 10.0, 20.0, 20.0), &[0, 0, 2, 0], 1);

        let mut mesh = DetourNavMesh::allocate();
        mesh.init(&params(1, 8))?;
        let base = mesh.add_tile(tile.build().into(), TileRef::NULL)?;
        let refs = (0..3).map(|i| PolyRef::new(base.id() | i)).collect();
        Ok((mesh, refs))
    }

    fn corridor(
        mesh: &DetourNavMesh,
        query: &mut DetourNavMeshQuery,
        start: [f32; 3],
        end: [f32; 3],
        max_path: usize,
    ) -> EngineResult<(Vec<PolyRef>, EngineStatus)> {
        let filter = QueryFilter::all();
        let (start_ref, _) = query.find_nearest_poly(mesh, &start, &EXTENTS, &filter)?;
        let (end_ref, _) = query.find_nearest_poly(mesh, &end, &EXTENTS, &filter)?;
        let mut path = vec![PolyRef::NULL; max_path];
        let (n, status) =
            query.find_path(mesh, start_ref, end_ref, &start, &end, &filter, &mut path)?;
        path.truncate(n);
        Ok((path, status))
    }

    #[test]
    fn test_find_nearest_poly() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let filter = QueryFilter::all();

        let (poly, pt) = query.find_nearest_poly(&mesh, &[15.0, 1.0, 5.0], &EXTENTS, &filter)?;
        assert_eq!(poly, refs[1]);
        assert_eq!(pt, [15.0, 0.0, 5.0]);

        // Just off the edge, snapped onto the boundary
        let (poly, pt) = query.find_nearest_poly(&mesh, &[31.0, 0.0, 5.0], &EXTENTS, &filter)?;
        assert_eq!(poly, refs[2]);
        assert_eq!(pt, [30.0, 0.0, 5.0]);

        let (poly, _) = query.find_nearest_poly(&mesh, &[200.0, 0.0, 5.0], &EXTENTS, &filter)?;
        assert_eq!(poly, PolyRef::NULL);
        Ok(())
    }

    #[test]
    fn test_find_nearest_poly_respects_filter() -> EngineResult<()> {
        let (mesh, _) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let filter = QueryFilter {
            include_flags: 0xffff,
            exclude_flags: 1,
        };

        let (poly, _) = query.find_nearest_poly(&mesh, &[5.0, 0.0, 5.0], &EXTENTS, &filter)?;
        assert_eq!(poly, PolyRef::NULL);
        Ok(())
    }

    #[test]
    fn test_find_nearest_poly_rejects_bad_input() -> EngineResult<()> {
        let (mesh, _) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let filter = QueryFilter::all();

        let err = query
            .find_nearest_poly(&mesh, &[f32::NAN, 0.0, 0.0], &EXTENTS, &filter)
            .unwrap_err();
        assert!(err.has_detail(EngineStatus::INVALID_PARAM));
        Ok(())
    }

    #[test]
    fn test_find_path_along_strip() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;

        let (path, status) = corridor(&mesh, &mut query, [5.0, 0.0, 5.0], [25.0, 0.0, 5.0], 16)?;
        assert_eq!(path, refs[..3].to_vec());
        assert!(status.is_success());
        assert!(!status.has_detail(EngineStatus::PARTIAL_RESULT));
        Ok(())
    }

    #[test]
    fn test_find_path_same_polygon() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;

        let (path, _) = corridor(&mesh, &mut query, [2.0, 0.0, 2.0], [8.0, 0.0, 8.0], 16)?;
        assert_eq!(path, vec![refs[0]]);
        Ok(())
    }

    #[test]
    fn test_find_path_to_unreachable_polygon_is_partial() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;

        let (path, status) = corridor(&mesh, &mut query, [5.0, 0.0, 5.0], [55.0, 0.0, 5.0], 16)?;
        assert!(status.has_detail(EngineStatus::PARTIAL_RESULT));
        assert_eq!(path.first(), Some(&refs[0]));
        // Best effort ends at the polygon closest to the goal
        assert_eq!(path.last(), Some(&refs[2]));
        Ok(())
    }

    #[test]
    fn test_find_path_out_of_nodes() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(2)?;

        let (path, status) = corridor(&mesh, &mut query, [5.0, 0.0, 5.0], [25.0, 0.0, 5.0], 16)?;
        assert!(status.has_detail(EngineStatus::OUT_OF_NODES));
        assert!(status.has_detail(EngineStatus::PARTIAL_RESULT));
        assert_eq!(path, refs[..2].to_vec());
        Ok(())
    }

    #[test]
    fn test_find_path_small_buffer_keeps_start() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;

        let (path, status) = corridor(&mesh, &mut query, [5.0, 0.0, 5.0], [25.0, 0.0, 5.0], 2)?;
        assert!(status.has_detail(EngineStatus::BUFFER_TOO_SMALL));
        assert_eq!(path, refs[..2].to_vec());
        Ok(())
    }

    #[test]
    fn test_find_path_rejects_invalid_refs() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let mut path = [PolyRef::NULL; 4];

        let err = query
            .find_path(
                &mesh,
                PolyRef::NULL,
                refs[0],
                &[0.0; 3],
                &[0.0; 3],
                &QueryFilter::all(),
                &mut path,
            )
            .unwrap_err();
        assert!(err.has_detail(EngineStatus::INVALID_PARAM));
        Ok(())
    }

    #[test]
    fn test_straight_path_without_corners() -> EngineResult<()> {
        let (mesh, _) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let start = [5.0, 0.0, 5.0];
        let end = [25.0, 0.0, 5.0];
        let (path, _) = corridor(&mesh, &mut query, start, end, 16)?;

        let mut points = [[0.0f32; 3]; 8];
        let (n, status) = query.find_straight_path(&mesh, &start, &end, &path, &mut points)?;
        assert_eq!(n, 2);
        assert!(!status.has_detail(EngineStatus::BUFFER_TOO_SMALL));
        assert_eq!(points[0], start);
        assert_eq!(points[1], end);
        Ok(())
    }

    #[test]
    fn test_straight_path_turns_corner() -> EngineResult<()> {
        let (mesh, refs) = l_mesh()?;
        let mut query = mesh.create_query(64)?;
        let start = [5.0, 0.0, 5.0];
        let end = [12.0, 0.0, 18.0];
        let (path, _) = corridor(&mesh, &mut query, start, end, 16)?;
        assert_eq!(path, refs);

        let mut points = [[0.0f32; 3]; 8];
        let (n, _) = query.find_straight_path(&mesh, &start, &end, &path, &mut points)?;
        assert_eq!(n, 3);
        assert_eq!(points[0], start);
        assert_eq!(points[1], [10.0, 0.0, 10.0]);
        assert_eq!(points[2], end);
        Ok(())
    }

    #[test]
    fn test_straight_path_truncation() -> EngineResult<()> {
        let (mesh, _) = l_mesh()?;
        let mut query = mesh.create_query(64)?;
        let start = [5.0, 0.0, 5.0];
        let end = [12.0, 0.0, 18.0];
        let (path, _) = corridor(&mesh, &mut query, start, end, 16)?;

        let mut points = [[0.0f32; 3]; 2];
        let (n, status) = query.find_straight_path(&mesh, &start, &end, &path, &mut points)?;
        assert_eq!(n, 2);
        assert!(status.is_success());
        assert!(status.has_detail(EngineStatus::BUFFER_TOO_SMALL));
        assert_eq!(points[1], [10.0, 0.0, 10.0]);
        Ok(())
    }

    #[test]
    fn test_straight_path_rejects_empty_corridor() -> EngineResult<()> {
        let (mesh, _) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let mut points = [[0.0f32; 3]; 4];

        let err = query
            .find_straight_path(&mesh, &[0.0; 3], &[1.0; 3], &[], &mut points)
            .unwrap_err();
        assert!(err.is_failure());
        Ok(())
    }

    #[test]
    fn test_random_point_is_reachable() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let filter = QueryFilter::all();

        for _ in 0..32 {
            let (poly, pt) = query.find_random_point_around_circle(
                &mesh,
                refs[0],
                &[5.0, 0.0, 5.0],
                100.0,
                &filter,
                &mut || rng.gen::<f32>(),
            )?;
            // The unconnected square is never picked
            assert!(refs[..3].contains(&poly));
            assert!((0.0..=30.0).contains(&pt[0]));
            assert!((0.0..=10.0).contains(&pt[2]));
            assert_eq!(pt[1], 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_random_point_zero_radius_stays_in_start_polygon() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let (poly, pt) = query.find_random_point_around_circle(
            &mesh,
            refs[0],
            &[5.0, 0.0, 5.0],
            0.0,
            &QueryFilter::all(),
            &mut || rng.gen::<f32>(),
        )?;
        assert_eq!(poly, refs[0]);
        assert!((0.0..=10.0).contains(&pt[0]));
        Ok(())
    }

    #[test]
    fn test_random_point_is_deterministic_per_seed() -> EngineResult<()> {
        let (mesh, refs) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;
        let filter = QueryFilter::all();

        let mut sample = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            query.find_random_point_around_circle(
                &mesh,
                refs[0],
                &[5.0, 0.0, 5.0],
                50.0,
                &filter,
                &mut || rng.gen::<f32>(),
            )
        };

        assert_eq!(sample(3)?, sample(3)?);
        Ok(())
    }

    #[test]
    fn test_random_point_rejects_invalid_start() -> EngineResult<()> {
        let (mesh, _) = strip_mesh()?;
        let mut query = mesh.create_query(64)?;

        let err = query
            .find_random_point_around_circle(
                &mesh,
                PolyRef::new(0xdead_beef),
                &[5.0, 0.0, 5.0],
                10.0,
                &QueryFilter::all(),
                &mut || 0.5,
            )
            .unwrap_err();
        assert!(err.has_detail(EngineStatus::INVALID_PARAM));
        Ok(())
    }
}
