//! Reader for persisted tile sets
//!
//! A tile set file is a fixed 40 byte header followed by tile records:
//!
//! ```text
//! header   u32 magic 'MSET', u32 version 1, i32 num_tiles,
//!          f32 origin[3], f32 tile_width, f32 tile_height,
//!          i32 max_tiles, i32 max_polys
//! record   u32 tile_ref, i32 data_size, u8 payload[data_size]
//! ```
//!
//! All values are little-endian. A record with a null reference or a size of
//! zero ends the list early.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, error, warn, Level};

use crate::error::LoadError;
use crate::log_engine_status;
use zonenav_common::{NavMeshParams, TileData, TileRef, TiledNavMesh};

/// Magic number of tile set files ('MSET')
pub const MESH_SET_MAGIC: u32 = u32::from_be_bytes(*b"MSET");

/// Tile set format version
pub const MESH_SET_VERSION: u32 = 1;

/// Tile set file header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSetHeader {
    pub magic: u32,
    pub version: u32,
    pub num_tiles: i32,
    pub params: NavMeshParams,
}

impl MeshSetHeader {
    /// Size in bytes of the encoded header
    pub const SIZE: usize = 12 + NavMeshParams::ENCODED_SIZE;

    pub fn new(num_tiles: i32, params: NavMeshParams) -> Self {
        Self {
            magic: MESH_SET_MAGIC,
            version: MESH_SET_VERSION,
            num_tiles,
            params,
        }
    }

    /// Reads a header, failing if the source ends before [`Self::SIZE`] bytes
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, LoadError> {
        Self::read_fields(reader).map_err(|e| LoadError::Format(format!("truncated header: {e}")))
    }

    fn read_fields<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        let version = reader.read_u32::<LittleEndian>()?;
        let num_tiles = reader.read_i32::<LittleEndian>()?;
        let origin = [
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
            reader.read_f32::<LittleEndian>()?,
        ];
        let params = NavMeshParams {
            origin,
            tile_width: reader.read_f32::<LittleEndian>()?,
            tile_height: reader.read_f32::<LittleEndian>()?,
            max_tiles: reader.read_i32::<LittleEndian>()?,
            max_polys_per_tile: reader.read_i32::<LittleEndian>()?,
        };

        Ok(Self {
            magic,
            version,
            num_tiles,
            params,
        })
    }

    /// Checks magic and version
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.magic != MESH_SET_MAGIC {
            return Err(LoadError::Format(format!(
                "wrong magic {:#010x}, expected {:#010x}",
                self.magic, MESH_SET_MAGIC
            )));
        }
        if self.version != MESH_SET_VERSION {
            return Err(LoadError::Format(format!(
                "unsupported version {}, expected {}",
                self.version, MESH_SET_VERSION
            )));
        }
        Ok(())
    }
}

/// Header that precedes each tile payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRecordHeader {
    pub tile_ref: TileRef,
    pub data_size: i32,
}

impl TileRecordHeader {
    pub const SIZE: usize = 8;

    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            tile_ref: TileRef::new(reader.read_u32::<LittleEndian>()?),
            data_size: reader.read_i32::<LittleEndian>()?,
        })
    }

    /// True for the record that marks the end of the tile list
    pub fn is_end_marker(&self) -> bool {
        !self.tile_ref.is_valid() || self.data_size <= 0
    }
}

/// Outcome of reading a tile set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Tiles registered with the engine
    pub tiles_loaded: usize,
    /// Tile records that were unreadable or rejected by the engine
    pub tiles_skipped: usize,
}

/// Reads a tile set and registers its tiles with a new mesh
pub fn read_tile_set<M, R>(reader: &mut R) -> Result<(M, LoadSummary), LoadError>
where
    M: TiledNavMesh,
    R: Read,
{
    let header = MeshSetHeader::read_from(reader)?;
    header.validate()?;

    let mut mesh = M::allocate();
    if let Err(status) = mesh.init(&header.params) {
        log_engine_status(Level::Error, "navmesh init", status);
        return Err(LoadError::EngineInit(status));
    }

    let mut summary = LoadSummary::default();
    for index in 0..header.num_tiles.max(0) {
        let record = match TileRecordHeader::read_from(reader) {
            Ok(record) => record,
            Err(e) => {
                warn!("Tile list ended early at record {index}: {e}");
                break;
            }
        };
        if record.is_end_marker() {
            debug!("End of tile list at record {index}");
            break;
        }

        let size = record.data_size as usize;
        let Some(mut data) = TileData::zeroed(size) else {
            error!("Could not allocate {size} bytes for tile {}", record.tile_ref);
            summary.tiles_skipped += 1;
            break;
        };
        if let Err(e) = reader.read_exact(data.as_mut_slice()) {
            warn!("Tile {} payload cut short: {e}", record.tile_ref);
            summary.tiles_skipped += 1;
            break;
        }

        match mesh.add_tile(data, record.tile_ref) {
            Ok(_) => summary.tiles_loaded += 1,
            Err(status) => {
                warn!("Skipping tile {} ({size} bytes)", record.tile_ref);
                log_engine_status(Level::Warn, "add tile", status);
                summary.tiles_skipped += 1;
            }
        }
    }

    Ok((mesh, summary))
}

/// Writes a tile set, for building fixtures
#[cfg(test)]
pub(crate) fn write_tile_set<W: std::io::Write>(
    writer: &mut W,
    params: &NavMeshParams,
    tiles: &[(TileRef, Vec<u8>)],
) -> std::io::Result<()> {
    use byteorder::WriteBytesExt;

    writer.write_u32::<LittleEndian>(MESH_SET_MAGIC)?;
    writer.write_u32::<LittleEndian>(MESH_SET_VERSION)?;
    writer.write_i32::<LittleEndian>(tiles.len() as i32)?;
    for v in params.origin {
        writer.write_f32::<LittleEndian>(v)?;
    }
    writer.write_f32::<LittleEndian>(params.tile_width)?;
    writer.write_f32::<LittleEndian>(params.tile_height)?;
    writer.write_i32::<LittleEndian>(params.max_tiles)?;
    writer.write_i32::<LittleEndian>(params.max_polys_per_tile)?;

    for (tile_ref, data) in tiles {
        writer.write_u32::<LittleEndian>(tile_ref.id())?;
        writer.write_i32::<LittleEndian>(data.len() as i32)?;
        writer.write_all(data)?;
    }
    Ok(())
}
