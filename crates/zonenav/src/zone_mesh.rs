//! Zone navigation mesh lifecycle

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{error, info, Level};

use crate::config::NavMeshConfig;
use crate::error::{LoadError, PathError};
use crate::log_engine_status;
use crate::tile_store::{read_tile_set, LoadSummary};
use zonenav_common::TiledNavMesh;

/// A mesh together with the query context bound to it
pub(crate) struct LoadedMesh<M: TiledNavMesh> {
    pub(crate) mesh: M,
    query: Mutex<M::Query>,
}

impl<M: TiledNavMesh> LoadedMesh<M> {
    /// Locks the query context
    ///
    /// The context only holds per-query scratch state, so a poisoned lock is
    /// still usable.
    pub(crate) fn query(&self) -> MutexGuard<'_, M::Query> {
        self.query
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Navigation mesh of one zone
///
/// Owns the engine mesh and its query context. Loading replaces both; unloading
/// drops both.
pub struct ZoneNavMesh<M: TiledNavMesh> {
    config: NavMeshConfig,
    path: Option<PathBuf>,
    loaded: Option<LoadedMesh<M>>,
}

impl<M: TiledNavMesh> Default for ZoneNavMesh<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: TiledNavMesh> ZoneNavMesh<M> {
    pub fn new() -> Self {
        Self::with_config(NavMeshConfig::default())
    }

    pub fn with_config(config: NavMeshConfig) -> Self {
        Self {
            config,
            path: None,
            loaded: None,
        }
    }

    pub fn config(&self) -> &NavMeshConfig {
        &self.config
    }

    /// Path of the last file passed to [`Self::load`]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Engine mesh, if one is loaded
    pub fn mesh(&self) -> Option<&M> {
        self.loaded.as_ref().map(|loaded| &loaded.mesh)
    }

    pub(crate) fn loaded(&self) -> Result<&LoadedMesh<M>, PathError> {
        self.loaded.as_ref().ok_or_else(|| {
            error!("Path query without a loaded navmesh");
            PathError::NotLoaded
        })
    }

    /// Loads a tile set file, replacing any mesh already loaded
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<LoadSummary, LoadError> {
        let path = path.as_ref();
        self.unload();
        self.path = Some(path.to_path_buf());

        let file = File::open(path).map_err(|source| {
            error!("Error loading navmesh ({}): {source}", path.display());
            LoadError::FileOpen {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let summary = self.load_from_reader(BufReader::new(file)).map_err(|e| {
            error!("Error loading navmesh ({}): {e}", path.display());
            e
        })?;
        info!(
            "Loaded navmesh {} ({} tiles, {} skipped)",
            path.display(),
            summary.tiles_loaded,
            summary.tiles_skipped
        );
        Ok(summary)
    }

    /// Loads a tile set from any byte source, replacing any mesh already loaded
    pub fn load_from_reader<R: Read>(&mut self, mut reader: R) -> Result<LoadSummary, LoadError> {
        self.unload();

        let (mesh, summary) = read_tile_set::<M, _>(&mut reader)?;
        let query = mesh.create_query(self.config.max_search_nodes).map_err(|status| {
            log_engine_status(Level::Error, "navmesh query init", status);
            LoadError::EngineInit(status)
        })?;

        self.loaded = Some(LoadedMesh {
            mesh,
            query: Mutex::new(query),
        });
        Ok(summary)
    }

    /// Loads the last loaded file again
    pub fn reload(&mut self) -> Result<LoadSummary, LoadError> {
        let path = self.path.clone().ok_or(LoadError::NoPath)?;
        self.load(path)
    }

    /// Drops the mesh and its query context
    pub fn unload(&mut self) {
        self.loaded = None;
    }
}
