//! Diagnostic CLI for zone navigation meshes

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zonenav::{NavMeshConfig, SelfTestOutcome, ZoneNavMesh};
use zonenav_detour::DetourNavMesh;

/// Loads zone navigation meshes and runs path queries against them
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in sanity test for a zone
    Test {
        /// Tile set file
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Zone identifier
        #[clap(long)]
        zone: u16,
    },

    /// Find a path between two world positions
    FindPath {
        /// Tile set file
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Start position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        start: Vec3,

        /// End position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        end: Vec3,

        /// Waypoint buffer size
        #[clap(long, default_value = "30")]
        max_waypoints: usize,

        /// Output path file
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Find a path to a random reachable point near a position
    RandomPath {
        /// Tile set file
        #[clap(long, value_parser)]
        mesh: PathBuf,

        /// Start position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        start: Vec3,

        /// Maximum distance of the goal from the start
        #[clap(long, default_value = "20.0")]
        radius: f32,

        /// Seed for the goal sampler
        #[clap(long, default_value = "0")]
        seed: u64,

        /// Waypoint buffer size
        #[clap(long, default_value = "30")]
        max_waypoints: usize,
    },
}

/// Parse a comma-separated vector
fn parse_vector(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 3 {
        return Err(format!(
            "Vector must have 3 components, got {}",
            parts.len()
        ));
    }

    let x = parts[0].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = parts[1].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let z = parts[2].trim().parse::<f32>().map_err(|e| e.to_string())?;

    Ok(Vec3::new(x, y, z))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Test { mesh, zone } => run_test(&mesh, zone),
        Commands::FindPath {
            mesh,
            start,
            end,
            max_waypoints,
            output,
        } => find_path(&mesh, start, end, max_waypoints, output.as_deref()),
        Commands::RandomPath {
            mesh,
            start,
            radius,
            seed,
            max_waypoints,
        } => random_path(&mesh, start, radius, seed, max_waypoints),
    }
}

fn load(mesh_path: &Path) -> Result<ZoneNavMesh<DetourNavMesh>> {
    let mut navmesh = ZoneNavMesh::with_config(NavMeshConfig::default());
    let summary = navmesh
        .load(mesh_path)
        .with_context(|| format!("Failed to load navigation mesh {}", mesh_path.display()))?;

    println!(
        "Loaded {}: {} tiles ({} skipped)",
        mesh_path.display(),
        summary.tiles_loaded,
        summary.tiles_skipped
    );
    Ok(navmesh)
}

/// Run the built-in sanity test for a zone
fn run_test(mesh_path: &Path, zone: u16) -> Result<()> {
    let navmesh = load(mesh_path)?;

    match navmesh.self_test(zone) {
        SelfTestOutcome::Passed => println!("Zone {zone}: passed"),
        SelfTestOutcome::Skipped => println!("Zone {zone}: no test defined"),
        outcome => bail!("Zone {zone} failed sanity test: {outcome:?}"),
    }
    Ok(())
}

/// Find a path between two world positions
fn find_path(
    mesh_path: &Path,
    start: Vec3,
    end: Vec3,
    max_waypoints: usize,
    output: Option<&Path>,
) -> Result<()> {
    let navmesh = load(mesh_path)?;

    info!("Finding path from {start} to {end}");
    let mut waypoints = vec![Vec3::ZERO; max_waypoints];
    let count = navmesh
        .find_path(start, end, &mut waypoints)
        .map_err(|e| anyhow!("Failed to find path (code {}): {e}", e.code()))?;
    let waypoints = &waypoints[..count];

    if let Some(output_path) = output {
        println!("Saving path to {}...", output_path.display());

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

        writeln!(file, "# Path from {start} to {end}")?;
        writeln!(file, "# {count} waypoints")?;
        for waypoint in waypoints {
            writeln!(file, "{},{},{}", waypoint.x, waypoint.y, waypoint.z)?;
        }
    } else {
        print_waypoints(waypoints);
    }

    Ok(())
}

/// Find a path to a random reachable point near a position
fn random_path(
    mesh_path: &Path,
    start: Vec3,
    radius: f32,
    seed: u64,
    max_waypoints: usize,
) -> Result<()> {
    let navmesh = load(mesh_path)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut waypoints = vec![Vec3::ZERO; max_waypoints];
    let count = navmesh
        .find_random_path(start, radius, &mut waypoints, &mut rng)
        .map_err(|e| anyhow!("Failed to find random path (code {}): {e}", e.code()))?;

    print_waypoints(&waypoints[..count]);
    Ok(())
}

fn print_waypoints(waypoints: &[Vec3]) {
    println!("Path ({} waypoints):", waypoints.len());
    for (i, waypoint) in waypoints.iter().enumerate() {
        println!("{}: {},{},{}", i, waypoint.x, waypoint.y, waypoint.z);
    }
}
