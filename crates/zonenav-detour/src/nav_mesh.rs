//! Tiled navigation mesh
//!
//! Tiles live in a fixed number of slots sized by `NavMeshParams::max_tiles`.
//! Polygon references pack a salt, the slot index and the polygon index, with
//! bit widths derived from the mesh parameters the same way Detour does:
//!
//! ```text
//! | salt | tile | poly |
//! ```
//!
//! Polygon links are rebuilt from the tile's neighbour codes every time a tile
//! is added, including links across the four tile borders.

use std::collections::HashMap;

use log::debug;

use super::geometry::{
    closest_height_point_triangle, closest_point_on_polygon_boundary, ilog2, next_pow2,
    overlap_bounds, point_in_polygon, vlerp,
};
use super::nav_mesh_query::DetourNavMeshQuery;
use super::node_pool::MAX_POOL_NODES;
use super::tile_format::{parse_tile, MeshHeader, OffMeshConnection, Poly, PolyDetail, EXT_LINK};
use zonenav_common::{
    EngineResult, EngineStatus, NavMeshParams, PolyRef, QueryFilter, TileData, TileRef,
    TiledNavMesh,
};

/// Marks a link that stays inside its tile
const INTERNAL_SIDE: u8 = 0xff;

/// Link between two polygons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Reference to the connected polygon
    pub reference: PolyRef,
    /// Edge of the owning polygon the link crosses
    pub edge: u8,
    /// Tile side for border links, `0xff` inside the tile
    pub side: u8,
    /// Start of the shared portal along the edge, 0..=255
    pub bmin: u8,
    /// End of the shared portal along the edge, 0..=255
    pub bmax: u8,
}

impl Link {
    fn internal(reference: PolyRef, edge: u8) -> Self {
        Self {
            reference,
            edge,
            side: INTERNAL_SIDE,
            bmin: 0,
            bmax: 255,
        }
    }
}

/// Tile registered in the mesh
#[derive(Debug)]
pub struct MeshTile {
    pub salt: u32,
    pub header: MeshHeader,
    pub verts: Vec<[f32; 3]>,
    pub polys: Vec<Poly>,
    /// Links of each polygon, indexed like `polys`
    pub links: Vec<Vec<Link>>,
    pub detail_meshes: Vec<PolyDetail>,
    pub detail_verts: Vec<[f32; 3]>,
    pub detail_tris: Vec<[u8; 4]>,
    pub off_mesh_connections: Vec<OffMeshConnection>,
    data: TileData,
}

impl MeshTile {
    /// Size of the payload the tile was created from
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Vertex positions of a polygon
    pub fn poly_verts(&self, poly: &Poly) -> Vec<[f32; 3]> {
        poly.verts[..poly.vert_count as usize]
            .iter()
            .map(|&v| self.verts[v as usize])
            .collect()
    }

    /// Height of the detail surface under `pos`, if `pos` is inside the polygon
    pub fn poly_height(&self, poly_idx: usize, pos: &[f32; 3]) -> Option<f32> {
        let poly = &self.polys[poly_idx];
        if !poly.is_ground() {
            return None;
        }

        let verts = self.poly_verts(poly);
        if !point_in_polygon(pos, &verts) {
            return None;
        }

        if let Some(detail) = self.detail_meshes.get(poly_idx) {
            let nv = verts.len();
            let tri_base = detail.tri_base as usize;
            for tri in self
                .detail_tris
                .iter()
                .skip(tri_base)
                .take(detail.tri_count as usize)
            {
                let mut v = [[0.0f32; 3]; 3];
                let mut valid = true;
                for k in 0..3 {
                    let idx = tri[k] as usize;
                    let vert = if idx < nv {
                        verts.get(idx)
                    } else {
                        self.detail_verts.get(detail.vert_base as usize + (idx - nv))
                    };
                    match vert {
                        Some(p) => v[k] = *p,
                        None => valid = false,
                    }
                }
                if !valid {
                    continue;
                }
                if let Some(h) = closest_height_point_triangle(pos, &v[0], &v[1], &v[2]) {
                    return Some(h);
                }
            }
        }

        // No usable detail mesh, fall back to the polygon fan
        for i in 2..verts.len() {
            let h = closest_height_point_triangle(pos, &verts[0], &verts[i - 1], &verts[i]);
            if h.is_some() {
                return h;
            }
        }

        // On an edge that the triangle tests reject
        Some(closest_point_on_polygon_boundary(pos, &verts)[1])
    }

    /// Closest point on a polygon and whether `pos` lies over it
    pub fn closest_point_on_poly(&self, poly_idx: usize, pos: &[f32; 3]) -> ([f32; 3], bool) {
        if let Some(h) = self.poly_height(poly_idx, pos) {
            return ([pos[0], h, pos[2]], true);
        }
        let verts = self.poly_verts(&self.polys[poly_idx]);
        (closest_point_on_polygon_boundary(pos, &verts), false)
    }
}

/// Detour compatible tiled navigation mesh
#[derive(Debug, Default)]
pub struct DetourNavMesh {
    params: Option<NavMeshParams>,
    tiles: Vec<Option<MeshTile>>,
    tile_lookup: HashMap<(i32, i32, i32), usize>,
    tile_bits: u32,
    poly_bits: u32,
    salt_bits: u32,
}

impl DetourNavMesh {
    /// Creates an empty mesh; call [`TiledNavMesh::init`] before adding tiles
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> Option<&NavMeshParams> {
        self.params.as_ref()
    }

    pub fn max_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// Iterates over the occupied slots and their tiles
    pub fn tiles(&self) -> impl Iterator<Item = (usize, &MeshTile)> {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (i, t)))
    }

    pub fn tile_at(&self, x: i32, y: i32, layer: i32) -> Option<&MeshTile> {
        self.tile_lookup
            .get(&(x, y, layer))
            .and_then(|&i| self.tiles[i].as_ref())
    }

    /// Packs a polygon reference
    pub fn encode_poly_id(&self, salt: u32, tile: u32, poly: u32) -> PolyRef {
        PolyRef::new(
            (salt << (self.poly_bits + self.tile_bits)) | (tile << self.poly_bits) | poly,
        )
    }

    /// Unpacks a polygon reference into salt, tile slot and polygon index
    pub fn decode_poly_id(&self, reference: PolyRef) -> (u32, u32, u32) {
        let id = reference.id();
        let salt_mask = (1u32 << self.salt_bits) - 1;
        let tile_mask = (1u32 << self.tile_bits) - 1;
        let poly_mask = (1u32 << self.poly_bits) - 1;
        (
            (id >> (self.poly_bits + self.tile_bits)) & salt_mask,
            (id >> self.poly_bits) & tile_mask,
            id & poly_mask,
        )
    }

    /// Reference of the first polygon of the tile in `slot`
    fn poly_ref_base(&self, slot: usize, salt: u32) -> PolyRef {
        self.encode_poly_id(salt, slot as u32, 0)
    }

    /// Resolves a reference to its tile and polygon index
    pub fn tile_and_poly(&self, reference: PolyRef) -> Option<(&MeshTile, usize)> {
        if !reference.is_valid() || self.params.is_none() {
            return None;
        }
        let (salt, it, ip) = self.decode_poly_id(reference);
        let tile = self.tiles.get(it as usize)?.as_ref()?;
        if tile.salt != salt || ip as usize >= tile.polys.len() {
            return None;
        }
        Some((tile, ip as usize))
    }

    /// Returns the portal shared by two linked polygons as `(left, right)`
    pub fn portal_points(&self, from: PolyRef, to: PolyRef) -> Option<([f32; 3], [f32; 3])> {
        let (tile, ip) = self.tile_and_poly(from)?;
        let link = tile.links[ip].iter().find(|l| l.reference == to)?;
        let poly = &tile.polys[ip];
        let nv = poly.vert_count as usize;
        let v0 = tile.verts[poly.verts[link.edge as usize] as usize];
        let v1 = tile.verts[poly.verts[(link.edge as usize + 1) % nv] as usize];

        // Border links may only cover part of the edge
        if link.side != INTERNAL_SIDE && (link.bmin != 0 || link.bmax != 255) {
            let s = 1.0 / 255.0;
            let tmin = link.bmin as f32 * s;
            let tmax = link.bmax as f32 * s;
            return Some((vlerp(&v0, &v1, tmin), vlerp(&v0, &v1, tmax)));
        }

        Some((v0, v1))
    }

    /// Polygons overlapping the box `center ± half_extents` that pass the filter
    pub fn query_polygons(
        &self,
        center: &[f32; 3],
        half_extents: &[f32; 3],
        filter: &QueryFilter,
    ) -> Vec<PolyRef> {
        let qmin = [
            center[0] - half_extents[0],
            center[1] - half_extents[1],
            center[2] - half_extents[2],
        ];
        let qmax = [
            center[0] + half_extents[0],
            center[1] + half_extents[1],
            center[2] + half_extents[2],
        ];

        let mut result = Vec::new();
        for (slot, tile) in self.tiles() {
            if !overlap_bounds(&qmin, &qmax, &tile.header.bmin, &tile.header.bmax) {
                continue;
            }
            let base = self.poly_ref_base(slot, tile.salt);
            for (ip, poly) in tile.polys.iter().enumerate() {
                if !poly.is_ground() || !filter.pass_flags(poly.flags) {
                    continue;
                }
                let mut bmin = [f32::MAX; 3];
                let mut bmax = [f32::MIN; 3];
                for v in tile.poly_verts(poly) {
                    for k in 0..3 {
                        bmin[k] = bmin[k].min(v[k]);
                        bmax[k] = bmax[k].max(v[k]);
                    }
                }
                if overlap_bounds(&qmin, &qmax, &bmin, &bmax) {
                    result.push(PolyRef::new(base.id() | ip as u32));
                }
            }
        }
        result
    }

    fn connect_int_links(&self, tile: &mut MeshTile, slot: usize) {
        let base = self.poly_ref_base(slot, tile.salt);
        for (ip, poly) in tile.polys.iter().enumerate() {
            let links = &mut tile.links[ip];
            links.clear();
            if !poly.is_ground() {
                continue;
            }
            for j in 0..poly.vert_count as usize {
                let nei = poly.neis[j];
                if nei == 0 || nei & EXT_LINK != 0 {
                    continue;
                }
                let target = (nei - 1) as u32;
                links.push(Link::internal(PolyRef::new(base.id() | target), j as u8));
            }
        }
    }

    /// Adds links from `tile` polygons on `side` into `target`
    fn connect_ext_links(tile: &mut MeshTile, target: &MeshTile, target_base: PolyRef, side: u8) {
        for ip in 0..tile.polys.len() {
            let poly = &tile.polys[ip];
            let nv = poly.vert_count as usize;
            for j in 0..nv {
                let nei = poly.neis[j];
                if nei & EXT_LINK == 0 || (nei & 0xff) as u8 != side {
                    continue;
                }
                let va = tile.verts[poly.verts[j] as usize];
                let vb = tile.verts[poly.verts[(j + 1) % nv] as usize];
                let connections =
                    find_connecting_polys(&va, &vb, target, target_base, opposite_tile(side));

                for (reference, cmin, cmax) in connections {
                    let axis = if side == 0 || side == 4 { 2 } else { 0 };
                    let span = vb[axis] - va[axis];
                    let (mut tmin, mut tmax) = if span.abs() > f32::EPSILON {
                        ((cmin - va[axis]) / span, (cmax - va[axis]) / span)
                    } else {
                        (0.0, 1.0)
                    };
                    if tmin > tmax {
                        std::mem::swap(&mut tmin, &mut tmax);
                    }
                    tile.links[ip].push(Link {
                        reference,
                        edge: j as u8,
                        side,
                        bmin: (tmin.clamp(0.0, 1.0) * 255.0).round() as u8,
                        bmax: (tmax.clamp(0.0, 1.0) * 255.0).round() as u8,
                    });
                }
            }
        }
    }
}

/// Returns the side facing `side` from the neighbouring tile
fn opposite_tile(side: u8) -> u8 {
    (side + 4) & 0x7
}

/// Grid offset of the neighbour on `side`
fn neighbour_offset(side: u8) -> (i32, i32) {
    match side {
        0 => (1, 0),
        2 => (0, 1),
        4 => (-1, 0),
        _ => (0, -1),
    }
}

fn slab_coord(v: &[f32; 3], side: u8) -> f32 {
    if side == 0 || side == 4 {
        v[0]
    } else {
        v[2]
    }
}

/// Edge end points projected onto the slab as (along-edge, height) pairs
fn slab_end_points(va: &[f32; 3], vb: &[f32; 3], side: u8) -> ([f32; 2], [f32; 2]) {
    let axis = if side == 0 || side == 4 { 2 } else { 0 };
    if va[axis] < vb[axis] {
        ([va[axis], va[1]], [vb[axis], vb[1]])
    } else {
        ([vb[axis], vb[1]], [va[axis], va[1]])
    }
}

fn overlap_slabs(
    amin: &[f32; 2],
    amax: &[f32; 2],
    bmin: &[f32; 2],
    bmax: &[f32; 2],
    px: f32,
    py: f32,
) -> bool {
    // Horizontal overlap, shrunk by the tolerance
    let minx = (amin[0] + px).max(bmin[0] + px);
    let maxx = (amax[0] - px).min(bmax[0] - px);
    if minx > maxx {
        return false;
    }

    // Vertical overlap at the ends of the shared span
    let ad = (amax[1] - amin[1]) / (amax[0] - amin[0]);
    let ak = amin[1] - ad * amin[0];
    let bd = (bmax[1] - bmin[1]) / (bmax[0] - bmin[0]);
    let bk = bmin[1] - bd * bmin[0];
    let aminy = ad * minx + ak;
    let amaxy = ad * maxx + ak;
    let bminy = bd * minx + bk;
    let bmaxy = bd * maxx + bk;
    let dmin = bminy - aminy;
    let dmax = bmaxy - amaxy;

    if dmin * dmax < 0.0 {
        return true;
    }

    let thr = (py * 2.0) * (py * 2.0);
    dmin * dmin <= thr || dmax * dmax <= thr
}

/// Finds the polygons in `target` whose border edge on `side` meets the edge `va`-`vb`
///
/// Returns each polygon with the shared span along the edge axis.
fn find_connecting_polys(
    va: &[f32; 3],
    vb: &[f32; 3],
    target: &MeshTile,
    target_base: PolyRef,
    side: u8,
) -> Vec<(PolyRef, f32, f32)> {
    let (amin, amax) = slab_end_points(va, vb, side);
    let apos = slab_coord(va, side);
    let marker = EXT_LINK | side as u16;

    let mut result = Vec::new();
    for (ip, poly) in target.polys.iter().enumerate() {
        let nv = poly.vert_count as usize;
        for j in 0..nv {
            if poly.neis[j] != marker {
                continue;
            }
            let vc = target.verts[poly.verts[j] as usize];
            let vd = target.verts[poly.verts[(j + 1) % nv] as usize];
            if (apos - slab_coord(&vc, side)).abs() > 0.01 {
                continue;
            }
            let (bmin, bmax) = slab_end_points(&vc, &vd, side);
            if !overlap_slabs(&amin, &amax, &bmin, &bmax, 0.01, target.header.walkable_climb) {
                continue;
            }
            result.push((
                PolyRef::new(target_base.id() | ip as u32),
                amin[0].max(bmin[0]),
                amax[0].min(bmax[0]),
            ));
            break;
        }
    }
    result
}

impl TiledNavMesh for DetourNavMesh {
    type Query = DetourNavMeshQuery;

    fn allocate() -> Self {
        Self::new()
    }

    fn init(&mut self, params: &NavMeshParams) -> EngineResult<()> {
        if params.max_tiles <= 0 || params.max_polys_per_tile <= 0 {
            return Err(EngineStatus::failure_detail(EngineStatus::INVALID_PARAM));
        }

        let tile_bits = ilog2(next_pow2(params.max_tiles as u32));
        let poly_bits = ilog2(next_pow2(params.max_polys_per_tile as u32));
        let salt_bits = 31u32.min(32u32.saturating_sub(tile_bits + poly_bits));
        if salt_bits < 10 {
            return Err(EngineStatus::failure_detail(EngineStatus::INVALID_PARAM));
        }

        let mut tiles = Vec::new();
        if tiles.try_reserve_exact(params.max_tiles as usize).is_err() {
            return Err(EngineStatus::failure_detail(EngineStatus::OUT_OF_MEMORY));
        }
        tiles.resize_with(params.max_tiles as usize, || None);

        self.params = Some(*params);
        self.tiles = tiles;
        self.tile_lookup.clear();
        self.tile_bits = tile_bits;
        self.poly_bits = poly_bits;
        self.salt_bits = salt_bits;

        debug!(
            "Initialized nav mesh: {} tiles, bits salt={} tile={} poly={}",
            params.max_tiles, salt_bits, tile_bits, poly_bits
        );
        Ok(())
    }

    fn add_tile(&mut self, data: TileData, last_ref: TileRef) -> EngineResult<TileRef> {
        if self.params.is_none() {
            return Err(EngineStatus::failure_detail(EngineStatus::INVALID_PARAM));
        }

        let contents = parse_tile(data.as_slice())?;
        let header = &contents.header;
        if self.tile_lookup.contains_key(&(header.x, header.y, header.layer)) {
            return Err(EngineStatus::failure_detail(EngineStatus::ALREADY_OCCUPIED));
        }
        if contents.polys.len() > (1usize << self.poly_bits) {
            return Err(EngineStatus::failure_detail(EngineStatus::INVALID_PARAM));
        }

        let (slot, salt) = if last_ref.is_valid() {
            let (salt, it, _) = self.decode_poly_id(last_ref);
            let slot = it as usize;
            if slot >= self.tiles.len() || self.tiles[slot].is_some() {
                return Err(EngineStatus::failure_detail(EngineStatus::OUT_OF_MEMORY));
            }
            (slot, salt.max(1))
        } else {
            match self.tiles.iter().position(|t| t.is_none()) {
                Some(slot) => (slot, 1),
                None => return Err(EngineStatus::failure_detail(EngineStatus::OUT_OF_MEMORY)),
            }
        };

        let poly_count = contents.polys.len();
        let mut tile = MeshTile {
            salt,
            header: contents.header,
            verts: contents.verts,
            polys: contents.polys,
            links: vec![Vec::new(); poly_count],
            detail_meshes: contents.detail_meshes,
            detail_verts: contents.detail_verts,
            detail_tris: contents.detail_tris,
            off_mesh_connections: contents.off_mesh_connections,
            data,
        };

        self.connect_int_links(&mut tile, slot);

        let tile_base = self.poly_ref_base(slot, salt);
        let (x, y, layer) = (tile.header.x, tile.header.y, tile.header.layer);
        for side in [0u8, 2, 4, 6] {
            let (dx, dy) = neighbour_offset(side);
            let Some(&nslot) = self.tile_lookup.get(&(x + dx, y + dy, layer)) else {
                continue;
            };
            let Some(nsalt) = self.tiles[nslot].as_ref().map(|t| t.salt) else {
                continue;
            };
            let nbase = self.poly_ref_base(nslot, nsalt);
            if let Some(neighbour) = self.tiles[nslot].as_mut() {
                Self::connect_ext_links(&mut tile, neighbour, nbase, side);
                Self::connect_ext_links(neighbour, &tile, tile_base, opposite_tile(side));
            }
        }

        debug!(
            "Added tile ({}, {}, {}) to slot {} with {} polygons",
            x, y, layer, slot, poly_count
        );

        self.tile_lookup.insert((x, y, layer), slot);
        self.tiles[slot] = Some(tile);
        Ok(tile_base)
    }

    fn is_valid_poly_ref(&self, poly_ref: PolyRef) -> bool {
        self.tile_and_poly(poly_ref).is_some()
    }

    fn create_query(&self, max_nodes: usize) -> EngineResult<Self::Query> {
        if max_nodes == 0 || max_nodes > MAX_POOL_NODES {
            return Err(EngineStatus::failure_detail(EngineStatus::INVALID_PARAM));
        }
        Ok(DetourNavMeshQuery::new(max_nodes))
    }
}
