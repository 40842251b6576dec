//! Detour tile payload layout
//!
//! A tile payload is the byte blob produced by the Detour tile builder
//! (`dtCreateNavMeshData`), version 7. It starts with a 100 byte header and
//! continues with 4-byte aligned sections:
//!
//! | section            | element size |
//! |--------------------|--------------|
//! | vertices           | 12           |
//! | polygons           | 32           |
//! | links              | 12           |
//! | detail meshes      | 12           |
//! | detail vertices    | 12           |
//! | detail triangles   | 4            |
//! | BV tree nodes      | 16           |
//! | off-mesh links     | 36           |
//!
//! Links are rebuilt when the tile is registered and BV nodes are not used,
//! so both sections are skipped on read and zero filled on write.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use super::geometry::align4;
use super::MAX_VERTS_PER_POLY;
use zonenav_common::{EngineResult, EngineStatus};

/// Tile magic number ('DNAV')
pub const NAVMESH_MAGIC: u32 =
    (b'D' as u32) << 24 | (b'N' as u32) << 16 | (b'A' as u32) << 8 | b'V' as u32;

/// Tile format version
pub const NAVMESH_VERSION: u32 = 7;

/// Marks a polygon edge that continues into a neighbouring tile
pub const EXT_LINK: u16 = 0x8000;

/// Polygon type stored in the top two bits of `area_and_type`
pub const POLYTYPE_GROUND: u8 = 0;
pub const POLYTYPE_OFFMESH_CONNECTION: u8 = 1;

const HEADER_SIZE: usize = 100;
const POLY_SIZE: usize = 32;
const LINK_SIZE: usize = 12;
const DETAIL_MESH_SIZE: usize = 12;
const BV_NODE_SIZE: usize = 16;
const OFF_MESH_CON_SIZE: usize = 36;

/// Tile header matching `dtMeshHeader`
#[derive(Debug, Clone, PartialEq)]
pub struct MeshHeader {
    pub magic: u32,
    pub version: u32,
    pub x: i32,
    pub y: i32,
    pub layer: i32,
    pub user_id: u32,
    pub poly_count: i32,
    pub vert_count: i32,
    pub max_link_count: i32,
    pub detail_mesh_count: i32,
    pub detail_vert_count: i32,
    pub detail_tri_count: i32,
    pub bv_node_count: i32,
    pub off_mesh_con_count: i32,
    /// Index of the first off-mesh connection polygon
    pub off_mesh_base: i32,
    pub walkable_height: f32,
    pub walkable_radius: f32,
    pub walkable_climb: f32,
    pub bmin: [f32; 3],
    pub bmax: [f32; 3],
    pub bv_quant_factor: f32,
}

impl MeshHeader {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            magic: reader.read_u32::<LittleEndian>()?,
            version: reader.read_u32::<LittleEndian>()?,
            x: reader.read_i32::<LittleEndian>()?,
            y: reader.read_i32::<LittleEndian>()?,
            layer: reader.read_i32::<LittleEndian>()?,
            user_id: reader.read_u32::<LittleEndian>()?,
            poly_count: reader.read_i32::<LittleEndian>()?,
            vert_count: reader.read_i32::<LittleEndian>()?,
            max_link_count: reader.read_i32::<LittleEndian>()?,
            detail_mesh_count: reader.read_i32::<LittleEndian>()?,
            detail_vert_count: reader.read_i32::<LittleEndian>()?,
            detail_tri_count: reader.read_i32::<LittleEndian>()?,
            bv_node_count: reader.read_i32::<LittleEndian>()?,
            off_mesh_con_count: reader.read_i32::<LittleEndian>()?,
            off_mesh_base: reader.read_i32::<LittleEndian>()?,
            walkable_height: reader.read_f32::<LittleEndian>()?,
            walkable_radius: reader.read_f32::<LittleEndian>()?,
            walkable_climb: reader.read_f32::<LittleEndian>()?,
            bmin: read_vec3(reader)?,
            bmax: read_vec3(reader)?,
            bv_quant_factor: reader.read_f32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_i32::<LittleEndian>(self.x)?;
        writer.write_i32::<LittleEndian>(self.y)?;
        writer.write_i32::<LittleEndian>(self.layer)?;
        writer.write_u32::<LittleEndian>(self.user_id)?;
        writer.write_i32::<LittleEndian>(self.poly_count)?;
        writer.write_i32::<LittleEndian>(self.vert_count)?;
        writer.write_i32::<LittleEndian>(self.max_link_count)?;
        writer.write_i32::<LittleEndian>(self.detail_mesh_count)?;
        writer.write_i32::<LittleEndian>(self.detail_vert_count)?;
        writer.write_i32::<LittleEndian>(self.detail_tri_count)?;
        writer.write_i32::<LittleEndian>(self.bv_node_count)?;
        writer.write_i32::<LittleEndian>(self.off_mesh_con_count)?;
        writer.write_i32::<LittleEndian>(self.off_mesh_base)?;
        writer.write_f32::<LittleEndian>(self.walkable_height)?;
        writer.write_f32::<LittleEndian>(self.walkable_radius)?;
        writer.write_f32::<LittleEndian>(self.walkable_climb)?;
        write_vec3(writer, &self.bmin)?;
        write_vec3(writer, &self.bmax)?;
        writer.write_f32::<LittleEndian>(self.bv_quant_factor)?;
        Ok(())
    }
}

/// Polygon matching `dtPoly`
#[derive(Debug, Clone, PartialEq)]
pub struct Poly {
    /// Vertex indices into the tile vertex array
    pub verts: [u16; MAX_VERTS_PER_POLY],
    /// Per edge neighbour: 0 for a wall, `index + 1` inside the tile,
    /// `EXT_LINK | side` across a tile border
    pub neis: [u16; MAX_VERTS_PER_POLY],
    pub flags: u16,
    pub vert_count: u8,
    pub area_and_type: u8,
}

impl Poly {
    pub fn area(&self) -> u8 {
        self.area_and_type & 0x3f
    }

    pub fn poly_type(&self) -> u8 {
        self.area_and_type >> 6
    }

    pub fn is_ground(&self) -> bool {
        self.poly_type() == POLYTYPE_GROUND
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        // firstLink is runtime state
        let _first_link = reader.read_u32::<LittleEndian>()?;

        let mut verts = [0u16; MAX_VERTS_PER_POLY];
        for v in &mut verts {
            *v = reader.read_u16::<LittleEndian>()?;
        }

        let mut neis = [0u16; MAX_VERTS_PER_POLY];
        for n in &mut neis {
            *n = reader.read_u16::<LittleEndian>()?;
        }

        Ok(Self {
            verts,
            neis,
            flags: reader.read_u16::<LittleEndian>()?,
            vert_count: reader.read_u8()?,
            area_and_type: reader.read_u8()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(u32::MAX)?;
        for &v in &self.verts {
            writer.write_u16::<LittleEndian>(v)?;
        }
        for &n in &self.neis {
            writer.write_u16::<LittleEndian>(n)?;
        }
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u8(self.vert_count)?;
        writer.write_u8(self.area_and_type)?;
        Ok(())
    }
}

/// Detail sub-mesh of one polygon, matching `dtPolyDetail`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyDetail {
    pub vert_base: u32,
    pub tri_base: u32,
    pub vert_count: u8,
    pub tri_count: u8,
}

impl PolyDetail {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let detail = Self {
            vert_base: reader.read_u32::<LittleEndian>()?,
            tri_base: reader.read_u32::<LittleEndian>()?,
            vert_count: reader.read_u8()?,
            tri_count: reader.read_u8()?,
        };
        // struct padding
        reader.read_u16::<LittleEndian>()?;
        Ok(detail)
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.vert_base)?;
        writer.write_u32::<LittleEndian>(self.tri_base)?;
        writer.write_u8(self.vert_count)?;
        writer.write_u8(self.tri_count)?;
        writer.write_u16::<LittleEndian>(0)?;
        Ok(())
    }
}

/// Off-mesh connection matching `dtOffMeshConnection`
#[derive(Debug, Clone, PartialEq)]
pub struct OffMeshConnection {
    /// Start and end point
    pub pos: [f32; 6],
    pub rad: f32,
    /// Polygon index of the connection inside the tile
    pub poly: u16,
    pub flags: u8,
    pub side: u8,
    pub user_id: u32,
}

impl OffMeshConnection {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut pos = [0.0; 6];
        for p in &mut pos {
            *p = reader.read_f32::<LittleEndian>()?;
        }

        Ok(Self {
            pos,
            rad: reader.read_f32::<LittleEndian>()?,
            poly: reader.read_u16::<LittleEndian>()?,
            flags: reader.read_u8()?,
            side: reader.read_u8()?,
            user_id: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for &p in &self.pos {
            writer.write_f32::<LittleEndian>(p)?;
        }
        writer.write_f32::<LittleEndian>(self.rad)?;
        writer.write_u16::<LittleEndian>(self.poly)?;
        writer.write_u8(self.flags)?;
        writer.write_u8(self.side)?;
        writer.write_u32::<LittleEndian>(self.user_id)?;
        Ok(())
    }
}

/// Decoded contents of a tile payload
#[derive(Debug, Clone)]
pub struct TileContents {
    pub header: MeshHeader,
    pub verts: Vec<[f32; 3]>,
    pub polys: Vec<Poly>,
    pub detail_meshes: Vec<PolyDetail>,
    pub detail_verts: Vec<[f32; 3]>,
    /// Triangles as three vertex indices plus an edge flag byte
    pub detail_tris: Vec<[u8; 4]>,
    pub off_mesh_connections: Vec<OffMeshConnection>,
}

fn read_vec3<R: Read>(reader: &mut R) -> std::io::Result<[f32; 3]> {
    Ok([
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ])
}

fn write_vec3<W: Write>(writer: &mut W, v: &[f32; 3]) -> std::io::Result<()> {
    writer.write_f32::<LittleEndian>(v[0])?;
    writer.write_f32::<LittleEndian>(v[1])?;
    writer.write_f32::<LittleEndian>(v[2])?;
    Ok(())
}

fn count(value: i32) -> EngineResult<usize> {
    usize::try_from(value).map_err(|_| EngineStatus::failure_detail(EngineStatus::INVALID_PARAM))
}

/// Reads `n` elements of a section, then skips to the next 4-byte boundary
fn read_section<'a, T>(
    cursor: &mut Cursor<&'a [u8]>,
    n: usize,
    elem_size: usize,
    mut read: impl FnMut(&mut Cursor<&'a [u8]>) -> std::io::Result<T>,
) -> std::io::Result<Vec<T>> {
    let start = cursor.position();
    let mut items = Vec::with_capacity(n.min(1 << 16));
    for _ in 0..n {
        items.push(read(cursor)?);
    }
    cursor.seek(SeekFrom::Start(start + align4(n * elem_size) as u64))?;
    Ok(items)
}

/// Decodes a tile payload
///
/// Fails with `WRONG_MAGIC` or `WRONG_VERSION` when the header does not match,
/// and with `INVALID_PARAM` when the payload is shorter than its header claims.
pub fn parse_tile(data: &[u8]) -> EngineResult<TileContents> {
    let invalid = |_: std::io::Error| EngineStatus::failure_detail(EngineStatus::INVALID_PARAM);

    let mut cursor = Cursor::new(data);
    let header = MeshHeader::read_from(&mut cursor).map_err(invalid)?;

    if header.magic != NAVMESH_MAGIC {
        return Err(EngineStatus::failure_detail(EngineStatus::WRONG_MAGIC));
    }
    if header.version != NAVMESH_VERSION {
        return Err(EngineStatus::failure_detail(EngineStatus::WRONG_VERSION));
    }

    let vert_count = count(header.vert_count)?;
    let poly_count = count(header.poly_count)?;
    let link_count = count(header.max_link_count)?;
    let detail_mesh_count = count(header.detail_mesh_count)?;
    let detail_vert_count = count(header.detail_vert_count)?;
    let detail_tri_count = count(header.detail_tri_count)?;
    let bv_node_count = count(header.bv_node_count)?;
    let off_mesh_con_count = count(header.off_mesh_con_count)?;

    let required = align4(HEADER_SIZE)
        + align4(vert_count * 12)
        + align4(poly_count * POLY_SIZE)
        + align4(link_count * LINK_SIZE)
        + align4(detail_mesh_count * DETAIL_MESH_SIZE)
        + align4(detail_vert_count * 12)
        + align4(detail_tri_count * 4)
        + align4(bv_node_count * BV_NODE_SIZE)
        + align4(off_mesh_con_count * OFF_MESH_CON_SIZE);
    if data.len() < required {
        return Err(EngineStatus::failure_detail(EngineStatus::INVALID_PARAM));
    }

    cursor.set_position(align4(HEADER_SIZE) as u64);
    let verts = read_section(&mut cursor, vert_count, 12, |c| read_vec3(c)).map_err(invalid)?;
    let polys = read_section(&mut cursor, poly_count, POLY_SIZE, |c| Poly::read_from(c))
        .map_err(invalid)?;
    cursor.set_position(cursor.position() + align4(link_count * LINK_SIZE) as u64);
    let detail_meshes = read_section(&mut cursor, detail_mesh_count, DETAIL_MESH_SIZE, |c| {
        PolyDetail::read_from(c)
    })
    .map_err(invalid)?;
    let detail_verts =
        read_section(&mut cursor, detail_vert_count, 12, |c| read_vec3(c)).map_err(invalid)?;
    let detail_tris = read_section(&mut cursor, detail_tri_count, 4, |c| {
        let mut tri = [0u8; 4];
        c.read_exact(&mut tri)?;
        Ok(tri)
    })
    .map_err(invalid)?;
    cursor.set_position(cursor.position() + align4(bv_node_count * BV_NODE_SIZE) as u64);
    let off_mesh_connections = read_section(
        &mut cursor,
        off_mesh_con_count,
        OFF_MESH_CON_SIZE,
        |c| OffMeshConnection::read_from(c),
    )
    .map_err(invalid)?;

    // Every vertex index must stay inside the tile
    for poly in &polys {
        let nv = poly.vert_count as usize;
        if nv > MAX_VERTS_PER_POLY || poly.verts[..nv].iter().any(|&v| v as usize >= verts.len())
        {
            return Err(EngineStatus::failure_detail(EngineStatus::INVALID_PARAM));
        }
    }

    Ok(TileContents {
        header,
        verts,
        polys,
        detail_meshes,
        detail_verts,
        detail_tris,
        off_mesh_connections,
    })
}

/// Writes Detour tile payloads from polygon outlines
///
/// Each ground polygon gets a fan triangulated detail mesh that reuses the
/// polygon vertices. Neighbour codes follow the `Poly::neis` convention.
#[derive(Debug, Clone)]
pub struct TileBuilder {
    x: i32,
    y: i32,
    layer: i32,
    walkable_height: f32,
    walkable_radius: f32,
    walkable_climb: f32,
    verts: Vec<[f32; 3]>,
    polys: Vec<Poly>,
    off_mesh: Vec<([f32; 3], [f32; 3], f32, u16)>,
}

impl TileBuilder {
    /// Creates a builder for the tile at grid location `(x, y)`
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            layer: 0,
            walkable_height: 2.0,
            walkable_radius: 0.6,
            walkable_climb: 0.9,
            verts: Vec::new(),
            polys: Vec::new(),
            off_mesh: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_walkable_climb(mut self, walkable_climb: f32) -> Self {
        self.walkable_climb = walkable_climb;
        self
    }

    fn vert_index(&mut self, v: [f32; 3]) -> u16 {
        if let Some(i) = self.verts.iter().position(|p| *p == v) {
            return i as u16;
        }
        self.verts.push(v);
        (self.verts.len() - 1) as u16
    }

    /// Adds a ground polygon and returns its index inside the tile
    ///
    /// # Panics
    ///
    /// Panics if the polygon has fewer than 3 or more than `MAX_VERTS_PER_POLY`
    /// vertices, or if `neis` does not have one entry per edge.
    pub fn add_poly(&mut self, verts: &[[f32; 3]], neis: &[u16], flags: u16) -> u16 {
        assert!((3..=MAX_VERTS_PER_POLY).contains(&verts.len()));
        assert_eq!(verts.len(), neis.len());

        let mut poly = Poly {
            verts: [0; MAX_VERTS_PER_POLY],
            neis: [0; MAX_VERTS_PER_POLY],
            flags,
            vert_count: verts.len() as u8,
            area_and_type: 63 | (POLYTYPE_GROUND << 6),
        };
        for (i, v) in verts.iter().enumerate() {
            poly.verts[i] = self.vert_index(*v);
            poly.neis[i] = neis[i];
        }
        self.polys.push(poly);
        (self.polys.len() - 1) as u16
    }

    /// Adds an off-mesh connection between two points
    pub fn add_off_mesh_connection(&mut self, start: [f32; 3], end: [f32; 3], rad: f32, flags: u16) {
        self.off_mesh.push((start, end, rad, flags));
    }

    /// Serializes the tile payload
    pub fn build(&self) -> Vec<u8> {
        let mut verts = self.verts.clone();
        let mut polys = self.polys.clone();
        let mut connections = Vec::new();

        let off_mesh_base = polys.len();
        for (start, end, rad, flags) in &self.off_mesh {
            let base = verts.len() as u16;
            verts.push(*start);
            verts.push(*end);
            let mut poly = Poly {
                verts: [0; MAX_VERTS_PER_POLY],
                neis: [0; MAX_VERTS_PER_POLY],
                flags: *flags,
                vert_count: 2,
                area_and_type: 63 | (POLYTYPE_OFFMESH_CONNECTION << 6),
            };
            poly.verts[0] = base;
            poly.verts[1] = base + 1;
            connections.push(OffMeshConnection {
                pos: [start[0], start[1], start[2], end[0], end[1], end[2]],
                rad: *rad,
                poly: polys.len() as u16,
                flags: 0,
                side: 0xff,
                user_id: 0,
            });
            polys.push(poly);
        }

        let mut detail_meshes = Vec::with_capacity(off_mesh_base);
        let mut detail_tris = Vec::new();
        for poly in &self.polys {
            let nv = poly.vert_count;
            detail_meshes.push(PolyDetail {
                vert_base: 0,
                tri_base: detail_tris.len() as u32,
                vert_count: 0,
                tri_count: nv - 2,
            });
            for i in 1..nv - 1 {
                detail_tris.push([0, i, i + 1, 0]);
            }
        }

        let mut bmin = [f32::MAX; 3];
        let mut bmax = [f32::MIN; 3];
        for v in &verts {
            for k in 0..3 {
                bmin[k] = bmin[k].min(v[k]);
                bmax[k] = bmax[k].max(v[k]);
            }
        }
        if verts.is_empty() {
            bmin = [0.0; 3];
            bmax = [0.0; 3];
        }

        let edge_count: usize = polys.iter().map(|p| p.vert_count as usize).sum();
        let header = MeshHeader {
            magic: NAVMESH_MAGIC,
            version: NAVMESH_VERSION,
            x: self.x,
            y: self.y,
            layer: self.layer,
            user_id: 0,
            poly_count: polys.len() as i32,
            vert_count: verts.len() as i32,
            max_link_count: (edge_count + connections.len() * 2) as i32,
            detail_mesh_count: detail_meshes.len() as i32,
            detail_vert_count: 0,
            detail_tri_count: detail_tris.len() as i32,
            bv_node_count: 0,
            off_mesh_con_count: connections.len() as i32,
            off_mesh_base: off_mesh_base as i32,
            walkable_height: self.walkable_height,
            walkable_radius: self.walkable_radius,
            walkable_climb: self.walkable_climb,
            bmin,
            bmax,
            bv_quant_factor: 1.0,
        };

        // Writing into a Vec cannot fail
        let mut out = Vec::new();
        let _ = Self::write_all(
            &mut out,
            &header,
            &verts,
            &polys,
            &detail_meshes,
            &detail_tris,
            &connections,
        );
        out
    }

    fn write_all(
        out: &mut Vec<u8>,
        header: &MeshHeader,
        verts: &[[f32; 3]],
        polys: &[Poly],
        detail_meshes: &[PolyDetail],
        detail_tris: &[[u8; 4]],
        connections: &[OffMeshConnection],
    ) -> std::io::Result<()> {
        header.write_to(out)?;
        pad4(out);
        for v in verts {
            write_vec3(out, v)?;
        }
        pad4(out);
        for p in polys {
            p.write_to(out)?;
        }
        pad4(out);
        out.resize(out.len() + align4(header.max_link_count as usize * LINK_SIZE), 0);
        for d in detail_meshes {
            d.write_to(out)?;
        }
        pad4(out);
        for t in detail_tris {
            out.write_all(t)?;
        }
        pad4(out);
        for c in connections {
            c.write_to(out)?;
        }
        pad4(out);
        Ok(())
    }
}

fn pad4(out: &mut Vec<u8>) {
    out.resize(align4(out.len()), 0);
}
