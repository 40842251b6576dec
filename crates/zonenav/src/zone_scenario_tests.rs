//! End to end tests: tile set files on disk, queried through the Detour engine
//!
//! The zone meshes are small hand built stand-ins for the real zones, shaped
//! so the built-in self-test scenarios exercise wall corners.

#[cfg(test)]
mod tests {
    use std::io::Write;

    use glam::Vec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tempfile::NamedTempFile;
    use zonenav_detour::{DetourNavMesh, TileBuilder};

    use crate::tile_store::write_tile_set;
    use crate::{LoadError, PathError, SelfTestOutcome, ZoneNavMesh};
    use zonenav_common::{NavMeshParams, TileRef, TiledNavMesh};

    fn params(max_tiles: i32) -> NavMeshParams {
        NavMeshParams {
            origin: [0.0; 3],
            tile_width: 512.0,
            tile_height: 512.0,
            max_tiles,
            max_polys_per_tile: 8,
        }
    }

    /// Reference a tile in `slot` gets from a fresh mesh
    fn saved_ref(params: &NavMeshParams, salt: u32, slot: u32) -> TileRef {
        let mut mesh = DetourNavMesh::new();
        mesh.init(params).unwrap();
        mesh.encode_poly_id(salt, slot, 0)
    }

    /// Two rooms joined by a doorway at `x` in `-222..-218`, engine frame
    fn zone_100_tile() -> Vec<u8> {
        let y = -60.0;
        let mut tile = TileBuilder::new(0, 0);
        tile.add_poly(
            &[
                [-230.0, y, 320.0],
                [-222.0, y, 320.0],
                [-218.0, y, 320.0],
                [-218.0, y, 310.0],
                [-230.0, y, 310.0],
            ],
            &[0, 2, 0, 0, 0],
            1,
        );
        tile.add_poly(
            &[
                [-230.0, y, 330.0],
                [-218.0, y, 330.0],
                [-218.0, y, 320.0],
                [-222.0, y, 320.0],
                [-230.0, y, 320.0],
            ],
            &[0, 0, 1, 0, 0],
            1,
        );
        tile.build()
    }

    /// Three rooms with doorways on opposite sides, engine frame
    fn zone_127_tile() -> Vec<u8> {
        let y = -4.0;
        let mut tile = TileBuilder::new(0, 0);
        tile.add_poly(
            &[
                [140.0, y, 105.0],
                [145.0, y, 105.0],
                [160.0, y, 105.0],
                [160.0, y, 90.0],
                [140.0, y, 90.0],
            ],
            &[2, 0, 0, 0, 0],
            1,
        );
        tile.add_poly(
            &[
                [140.0, y, 112.0],
                [158.0, y, 112.0],
                [160.0, y, 112.0],
                [160.0, y, 105.0],
                [145.0, y, 105.0],
                [140.0, y, 105.0],
            ],
            &[0, 3, 0, 0, 1, 0],
            1,
        );
        tile.add_poly(
            &[
                [140.0, y, 125.0],
                [160.0, y, 125.0],
                [160.0, y, 112.0],
                [158.0, y, 112.0],
                [140.0, y, 112.0],
            ],
            &[0, 0, 2, 0, 0],
            1,
        );
        tile.build()
    }

    fn mesh_file(params: &NavMeshParams, tiles: &[(TileRef, Vec<u8>)]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write_tile_set(&mut file, params, tiles).unwrap();
        file.flush().unwrap();
        file
    }

    fn zone_file(tile: Vec<u8>) -> NamedTempFile {
        let params = params(1);
        mesh_file(&params, &[(saved_ref(&params, 1, 0), tile)])
    }

    fn load_zone(tile: Vec<u8>) -> ZoneNavMesh<DetourNavMesh> {
        let file = zone_file(tile);
        let mut navmesh = ZoneNavMesh::new();
        let summary = navmesh.load(file.path()).unwrap();
        assert_eq!(summary.tiles_loaded, 1);
        navmesh
    }

    #[test]
    fn test_zone_100_self_test() {
        let navmesh = load_zone(zone_100_tile());
        assert_eq!(navmesh.self_test(100), SelfTestOutcome::Passed);
        assert!(navmesh.test(100));
    }

    #[test]
    fn test_zone_100_waypoints() {
        let navmesh = load_zone(zone_100_tile());
        let mut waypoints = [Vec3::ZERO; 30];

        let n = navmesh
            .find_path(
                Vec3::new(-224.0, 60.0, -316.0),
                Vec3::new(-224.0, 60.0, -324.0),
                &mut waypoints,
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(waypoints[0], Vec3::new(-222.0, 60.0, -320.0));
        assert_eq!(waypoints[1], Vec3::new(-224.0, 60.0, -324.0));
    }

    #[test]
    fn test_zone_127_self_test() {
        let navmesh = load_zone(zone_127_tile());
        assert_eq!(navmesh.self_test(127), SelfTestOutcome::Passed);
        assert!(navmesh.test(127));
    }

    #[test]
    fn test_zone_127_waypoints() {
        let navmesh = load_zone(zone_127_tile());
        let mut waypoints = [Vec3::ZERO; 30];

        let n = navmesh
            .find_path(
                Vec3::new(153.0, 4.0, -98.0),
                Vec3::new(152.0, 4.0, -120.0),
                &mut waypoints,
            )
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(waypoints[0], Vec3::new(145.0, 4.0, -105.0));
        assert_eq!(waypoints[1], Vec3::new(158.0, 4.0, -112.0));
        assert_eq!(waypoints[2], Vec3::new(152.0, 4.0, -120.0));
    }

    #[test]
    fn test_zone_127_truncated() {
        let navmesh = load_zone(zone_127_tile());
        let start = Vec3::new(153.0, 4.0, -98.0);
        let end = Vec3::new(152.0, 4.0, -120.0);

        let mut two = [Vec3::ZERO; 2];
        assert_eq!(navmesh.find_path(start, end, &mut two), Ok(2));
        assert_eq!(two[1], Vec3::new(158.0, 4.0, -112.0));

        let mut none: [Vec3; 0] = [];
        assert_eq!(navmesh.find_path(start, end, &mut none), Ok(0));
    }

    #[test]
    fn test_scenario_against_wrong_zone() {
        let navmesh = load_zone(zone_100_tile());
        assert_eq!(
            navmesh.self_test(127),
            SelfTestOutcome::QueryFailed(PathError::NearestPoly)
        );
        assert!(!navmesh.test(127));
        assert!(navmesh.test(5));
    }

    #[test]
    fn test_position_outside_every_polygon() {
        let navmesh = load_zone(zone_100_tile());
        let mut waypoints = [Vec3::ZERO; 4];

        let err = navmesh
            .find_path(Vec3::ZERO, Vec3::new(-224.0, 60.0, -324.0), &mut waypoints)
            .unwrap_err();
        assert_eq!(err, PathError::NearestPoly);
        assert_eq!(err.code(), -2);
    }

    #[test]
    fn test_same_room_path_is_just_the_end() {
        let navmesh = load_zone(zone_127_tile());
        let mut waypoints = [Vec3::ZERO; 4];

        let n = navmesh
            .find_path(
                Vec3::new(150.0, 4.0, -95.0),
                Vec3::new(155.0, 4.0, -100.0),
                &mut waypoints,
            )
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(waypoints[0], Vec3::new(155.0, 4.0, -100.0));
    }

    #[test]
    fn test_random_path_matches_direct_path() {
        let navmesh = load_zone(zone_127_tile());
        let start = Vec3::new(153.0, 4.0, -98.0);
        let mut reached = 0;

        for seed in 0..16 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut waypoints = [Vec3::ZERO; 30];
            let n = navmesh
                .find_random_path(start, 100.0, &mut waypoints, &mut rng)
                .unwrap();
            if n == 0 {
                continue;
            }
            reached += 1;

            let goal = waypoints[n - 1];
            assert!((140.0..=160.0).contains(&goal.x));
            assert!((-125.0..=-90.0).contains(&goal.z));
            assert_eq!(goal.y, 4.0);

            let mut direct = [Vec3::ZERO; 30];
            let m = navmesh.find_path(start, goal, &mut direct).unwrap();
            assert_eq!(m, n);
            assert_eq!(&direct[..m], &waypoints[..n]);
        }
        assert!(reached > 0);
    }

    #[test]
    fn test_random_path_is_reproducible() {
        let navmesh = load_zone(zone_127_tile());
        let start = Vec3::new(153.0, 4.0, -98.0);

        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut waypoints = [Vec3::ZERO; 30];
            let n = navmesh
                .find_random_path(start, 100.0, &mut waypoints, &mut rng)
                .unwrap();
            waypoints[..n].to_vec()
        };
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn test_random_path_without_start_polygon() {
        let navmesh = load_zone(zone_127_tile());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut waypoints = [Vec3::ZERO; 30];

        assert_eq!(
            navmesh.find_random_path(Vec3::ZERO, 50.0, &mut waypoints, &mut rng),
            Err(PathError::NearestPoly)
        );
    }

    #[test]
    fn test_reload_and_unload() {
        let file = zone_file(zone_100_tile());
        let mut navmesh = ZoneNavMesh::<DetourNavMesh>::new();
        navmesh.load(file.path()).unwrap();
        assert_eq!(navmesh.path(), Some(file.path()));

        let summary = navmesh.reload().unwrap();
        assert_eq!(summary.tiles_loaded, 1);
        assert!(navmesh.test(100));

        navmesh.unload();
        assert!(!navmesh.is_loaded());
        let mut waypoints = [Vec3::ZERO; 4];
        assert_eq!(
            navmesh.find_path(
                Vec3::new(-224.0, 60.0, -316.0),
                Vec3::new(-224.0, 60.0, -324.0),
                &mut waypoints
            ),
            Err(PathError::NotLoaded)
        );
    }

    #[test]
    fn test_load_replaces_previous_zone() {
        let first = zone_file(zone_100_tile());
        let second = zone_file(zone_127_tile());
        let mut navmesh = ZoneNavMesh::<DetourNavMesh>::new();

        navmesh.load(first.path()).unwrap();
        assert!(navmesh.test(100));
        navmesh.load(second.path()).unwrap();
        assert!(navmesh.test(127));
        assert!(!navmesh.test(100));
    }

    #[test]
    fn test_saved_tile_reference_is_kept() {
        let params = params(4);
        let saved = saved_ref(&params, 3, 2);
        let file = mesh_file(&params, &[(saved, zone_100_tile())]);

        let mut navmesh = ZoneNavMesh::<DetourNavMesh>::new();
        navmesh.load(file.path()).unwrap();
        let mesh = navmesh.mesh().unwrap();
        assert!(mesh.is_valid_poly_ref(saved));
        assert_eq!(mesh.decode_poly_id(saved), (3, 2, 0));
        assert!(navmesh.test(100));
    }

    #[test]
    fn test_unparseable_tile_is_skipped() {
        let params = params(4);
        let file = mesh_file(
            &params,
            &[
                (saved_ref(&params, 1, 0), vec![0xAB; 64]),
                (saved_ref(&params, 1, 1), zone_127_tile()),
            ],
        );

        let mut navmesh = ZoneNavMesh::<DetourNavMesh>::new();
        let summary = navmesh.load(file.path()).unwrap();
        assert_eq!(summary.tiles_loaded, 1);
        assert_eq!(summary.tiles_skipped, 1);
        assert!(navmesh.test(127));
    }

    #[test]
    fn test_wrong_magic_on_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 40]).unwrap();
        file.flush().unwrap();

        let mut navmesh = ZoneNavMesh::<DetourNavMesh>::new();
        assert!(matches!(
            navmesh.load(file.path()),
            Err(LoadError::Format(_))
        ));
        assert!(!navmesh.is_loaded());
    }

    #[test]
    fn test_mesh_params_rejected_by_engine() {
        let bad = NavMeshParams {
            max_tiles: 1 << 14,
            max_polys_per_tile: 1 << 14,
            ..params(1)
        };
        let file = mesh_file(&bad, &[]);

        let mut navmesh = ZoneNavMesh::<DetourNavMesh>::new();
        assert!(matches!(
            navmesh.load(file.path()),
            Err(LoadError::EngineInit(_))
        ));
        assert!(!navmesh.is_loaded());
    }
}
