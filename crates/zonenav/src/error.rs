//! Error types for loading and querying a zone navigation mesh

use std::path::PathBuf;

use zonenav_common::EngineStatus;

/// Legacy code returned when a position has no polygon in range
pub const ERROR_NEARESTPOLY: i16 = -2;

/// Legacy code for every other query failure
pub const GENERIC_FAILURE: i16 = -1;

/// Errors raised while loading a tile set
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not open navmesh {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid navmesh file: {0}")]
    Format(String),

    #[error("detour initialization failed: {0}")]
    EngineInit(EngineStatus),

    #[error("no navmesh path to reload")]
    NoPath,
}

/// Errors raised by path queries
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    #[error("no navmesh loaded")]
    NotLoaded,

    #[error("no polygon near position")]
    NearestPoly,

    #[error("path query failed: {0}")]
    Query(EngineStatus),
}

impl PathError {
    /// Legacy integer code for callers that still speak it
    pub fn code(&self) -> i16 {
        match self {
            PathError::NearestPoly => ERROR_NEARESTPOLY,
            PathError::NotLoaded | PathError::Query(_) => GENERIC_FAILURE,
        }
    }
}
