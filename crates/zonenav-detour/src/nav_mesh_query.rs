//! Navigation mesh queries
//!
//! The query object keeps its node pool and open list between calls so a
//! search never allocates past the budget it was created with.

use log::trace;

use super::geometry::{
    closest_point_on_polygon_boundary, dist_pt_seg_sqr_2d, point_in_polygon, poly_area_2d,
    random_point_in_convex_poly, tri_area_2d, vdist, vequal, visfinite, vlerp,
};
use super::nav_mesh::DetourNavMesh;
use super::node_pool::{NodeFlags, NodeIndex, NodePool, NodeQueue};
use zonenav_common::{
    EngineResult, EngineStatus, NavMeshQuery, PolyRef, QueryFilter, TiledNavMesh,
};

/// Scale applied to the A* distance heuristic
const H_SCALE: f32 = 0.999;

fn invalid_param() -> EngineStatus {
    EngineStatus::failure_detail(EngineStatus::INVALID_PARAM)
}

/// Query context for [`DetourNavMesh`]
#[derive(Debug)]
pub struct DetourNavMeshQuery {
    node_pool: NodePool,
    open_list: NodeQueue,
}

impl DetourNavMeshQuery {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            node_pool: NodePool::new(max_nodes),
            open_list: NodeQueue::new(),
        }
    }

    /// Maximum number of nodes a search may visit
    pub fn max_nodes(&self) -> usize {
        self.node_pool.max_nodes()
    }

    fn edge_mid_point(mesh: &DetourNavMesh, from: PolyRef, to: PolyRef) -> Option<[f32; 3]> {
        let (left, right) = mesh.portal_points(from, to)?;
        Some(vlerp(&left, &right, 0.5))
    }

    fn closest_point_on_poly_boundary(
        mesh: &DetourNavMesh,
        reference: PolyRef,
        pos: &[f32; 3],
    ) -> Option<[f32; 3]> {
        let (tile, ip) = mesh.tile_and_poly(reference)?;
        let verts = tile.poly_verts(&tile.polys[ip]);
        if point_in_polygon(pos, &verts) {
            Some(*pos)
        } else {
            Some(closest_point_on_polygon_boundary(pos, &verts))
        }
    }

    /// Writes the path from the start node to `end_idx` into `path`
    ///
    /// Nodes nearest the end are dropped when the path does not fit.
    fn path_to_node(&self, end_idx: NodeIndex, path: &mut [PolyRef]) -> (usize, EngineStatus) {
        let mut length = 0usize;
        let mut cur = Some(end_idx);
        while let Some(idx) = cur {
            length += 1;
            cur = self.node_pool.node(idx).parent;
        }

        let mut cur = end_idx;
        let mut status = EngineStatus::success();
        while length > path.len() {
            if let Some(parent) = self.node_pool.node(cur).parent {
                cur = parent;
            }
            length -= 1;
            status = status.with_detail(EngineStatus::BUFFER_TOO_SMALL);
        }

        let mut write = length;
        let mut node = Some(cur);
        while let Some(idx) = node {
            if write == 0 {
                break;
            }
            write -= 1;
            path[write] = self.node_pool.node(idx).id;
            node = self.node_pool.node(idx).parent;
        }

        (length, status)
    }
}

/// Output cursor for straight path corners
struct StraightPath<'a> {
    points: &'a mut [[f32; 3]],
    count: usize,
}

impl StraightPath<'_> {
    /// Appends a corner, merging it with the previous one if they coincide
    ///
    /// Returns false if the point did not fit.
    fn append(&mut self, pos: &[f32; 3]) -> bool {
        if self.count > 0 && vequal(&self.points[self.count - 1], pos) {
            return true;
        }
        if self.count >= self.points.len() {
            return false;
        }
        self.points[self.count] = *pos;
        self.count += 1;
        true
    }
}

impl NavMeshQuery for DetourNavMeshQuery {
    type Mesh = DetourNavMesh;

    fn find_nearest_poly(
        &mut self,
        mesh: &DetourNavMesh,
        center: &[f32; 3],
        half_extents: &[f32; 3],
        filter: &QueryFilter,
    ) -> EngineResult<(PolyRef, [f32; 3])> {
        if !visfinite(center) || !visfinite(half_extents) || half_extents.iter().any(|e| *e < 0.0)
        {
            return Err(invalid_param());
        }

        let mut nearest = PolyRef::NULL;
        let mut nearest_pt = *center;
        let mut nearest_dist_sqr = f32::MAX;

        for reference in mesh.query_polygons(center, half_extents, filter) {
            let Some((tile, ip)) = mesh.tile_and_poly(reference) else {
                continue;
            };
            let (closest, over_poly) = tile.closest_point_on_poly(ip, center);

            // Directly above or below a polygon, small height differences are free
            let diff = [
                center[0] - closest[0],
                center[1] - closest[1],
                center[2] - closest[2],
            ];
            let d = if over_poly {
                let d = diff[1].abs() - tile.header.walkable_climb;
                if d > 0.0 {
                    d * d
                } else {
                    0.0
                }
            } else {
                diff[0] * diff[0] + diff[1] * diff[1] + diff[2] * diff[2]
            };

            if d < nearest_dist_sqr {
                nearest_dist_sqr = d;
                nearest_pt = closest;
                nearest = reference;
            }
        }

        Ok((nearest, nearest_pt))
    }

    fn find_path(
        &mut self,
        mesh: &DetourNavMesh,
        start_ref: PolyRef,
        end_ref: PolyRef,
        start_pos: &[f32; 3],
        end_pos: &[f32; 3],
        filter: &QueryFilter,
        path: &mut [PolyRef],
    ) -> EngineResult<(usize, EngineStatus)> {
        if !mesh.is_valid_poly_ref(start_ref)
            || !mesh.is_valid_poly_ref(end_ref)
            || !visfinite(start_pos)
            || !visfinite(end_pos)
            || path.is_empty()
        {
            return Err(invalid_param());
        }

        if start_ref == end_ref {
            path[0] = start_ref;
            return Ok((1, EngineStatus::success()));
        }

        self.node_pool.clear();
        self.open_list.clear();

        let start_idx = self
            .node_pool
            .get_node(start_ref)
            .ok_or_else(|| EngineStatus::failure_detail(EngineStatus::OUT_OF_NODES))?;
        {
            let start = self.node_pool.node_mut(start_idx);
            start.pos = *start_pos;
            start.parent = None;
            start.cost = 0.0;
            start.total = vdist(start_pos, end_pos) * H_SCALE;
            start.flags = NodeFlags::OPEN;
        }
        self.open_list.push(&self.node_pool, start_idx);

        let mut last_best = start_idx;
        let mut last_best_cost = self.node_pool.node(start_idx).total;
        let mut out_of_nodes = false;

        while let Some(best_idx) = self.open_list.pop(&self.node_pool) {
            let (best_ref, best_pos, best_cost, parent_ref) = {
                let best = self.node_pool.node_mut(best_idx);
                best.flags.remove(NodeFlags::OPEN);
                best.flags.insert(NodeFlags::CLOSED);
                (best.id, best.pos, best.cost, best.parent)
            };
            let parent_ref = parent_ref.map(|p| self.node_pool.node(p).id);

            if best_ref == end_ref {
                last_best = best_idx;
                break;
            }

            let Some((tile, ip)) = mesh.tile_and_poly(best_ref) else {
                continue;
            };

            for link in &tile.links[ip] {
                let neighbour_ref = link.reference;
                if !neighbour_ref.is_valid() || Some(neighbour_ref) == parent_ref {
                    continue;
                }
                let Some((ntile, nip)) = mesh.tile_and_poly(neighbour_ref) else {
                    continue;
                };
                if !filter.pass_flags(ntile.polys[nip].flags) {
                    continue;
                }

                let Some(neighbour_idx) = self.node_pool.get_node(neighbour_ref) else {
                    out_of_nodes = true;
                    continue;
                };

                if self.node_pool.node(neighbour_idx).flags.is_empty() {
                    let mid = Self::edge_mid_point(mesh, best_ref, neighbour_ref)
                        .unwrap_or(best_pos);
                    self.node_pool.node_mut(neighbour_idx).pos = mid;
                }
                let neighbour_pos = self.node_pool.node(neighbour_idx).pos;

                let (cost, heuristic) = if neighbour_ref == end_ref {
                    let cur_cost = vdist(&best_pos, &neighbour_pos);
                    let end_cost = vdist(&neighbour_pos, end_pos);
                    (best_cost + cur_cost + end_cost, 0.0)
                } else {
                    let cur_cost = vdist(&best_pos, &neighbour_pos);
                    (best_cost + cur_cost, vdist(&neighbour_pos, end_pos) * H_SCALE)
                };
                let total = cost + heuristic;

                let neighbour = self.node_pool.node_mut(neighbour_idx);
                let visited = neighbour.flags.contains(NodeFlags::OPEN)
                    || neighbour.flags.contains(NodeFlags::CLOSED);
                if visited && total >= neighbour.total {
                    continue;
                }

                neighbour.parent = Some(best_idx);
                neighbour.flags.remove(NodeFlags::CLOSED);
                neighbour.flags.insert(NodeFlags::OPEN);
                neighbour.cost = cost;
                neighbour.total = total;
                self.open_list.push(&self.node_pool, neighbour_idx);

                if heuristic < last_best_cost {
                    last_best_cost = heuristic;
                    last_best = neighbour_idx;
                }
            }
        }

        let (count, mut status) = self.path_to_node(last_best, path);
        if self.node_pool.node(last_best).id != end_ref {
            status = status.with_detail(EngineStatus::PARTIAL_RESULT);
        }
        if out_of_nodes {
            status = status.with_detail(EngineStatus::OUT_OF_NODES);
        }

        trace!(
            "find_path visited {} nodes, corridor length {}",
            self.node_pool.node_count(),
            count
        );
        Ok((count, status))
    }

    fn find_straight_path(
        &mut self,
        mesh: &DetourNavMesh,
        start_pos: &[f32; 3],
        end_pos: &[f32; 3],
        corridor: &[PolyRef],
        points: &mut [[f32; 3]],
    ) -> EngineResult<(usize, EngineStatus)> {
        if !visfinite(start_pos) || !visfinite(end_pos) || points.is_empty() {
            return Err(invalid_param());
        }
        let (Some(&first), Some(&last)) = (corridor.first(), corridor.last()) else {
            return Err(invalid_param());
        };

        let closest_start = Self::closest_point_on_poly_boundary(mesh, first, start_pos)
            .ok_or_else(invalid_param)?;
        let mut closest_end = Self::closest_point_on_poly_boundary(mesh, last, end_pos)
            .ok_or_else(invalid_param)?;

        let truncated = EngineStatus::success_detail(EngineStatus::BUFFER_TOO_SMALL);
        let mut out = StraightPath { points, count: 0 };
        if !out.append(&closest_start) {
            return Ok((out.count, truncated));
        }

        let mut status = EngineStatus::success();
        if corridor.len() > 1 {
            let mut portal_apex = closest_start;
            let mut portal_left = portal_apex;
            let mut portal_right = portal_apex;
            let mut apex_index = 0usize;
            let mut left_index = 0usize;
            let mut right_index = 0usize;

            let mut i = 0usize;
            while i < corridor.len() {
                let (left, right) = if i + 1 < corridor.len() {
                    match mesh.portal_points(corridor[i], corridor[i + 1]) {
                        Some(portal) => portal,
                        None => {
                            // Broken corridor, stop at the last polygon that is still valid
                            if let Some(end) =
                                Self::closest_point_on_poly_boundary(mesh, corridor[i], end_pos)
                            {
                                closest_end = end;
                            }
                            status = status.with_detail(EngineStatus::PARTIAL_RESULT);
                            break;
                        }
                    }
                } else {
                    (closest_end, closest_end)
                };

                // Skip a first portal that the start point already sits on
                if i == 0 {
                    let (d, _) = dist_pt_seg_sqr_2d(&portal_apex, &left, &right);
                    if d < 0.001 * 0.001 {
                        i += 1;
                        continue;
                    }
                }

                // Right vertex
                if tri_area_2d(&portal_apex, &portal_right, &right) <= 0.0 {
                    if vequal(&portal_apex, &portal_right)
                        || tri_area_2d(&portal_apex, &portal_left, &right) > 0.0
                    {
                        portal_right = right;
                        right_index = i;
                    } else {
                        portal_apex = portal_left;
                        apex_index = left_index;
                        if !out.append(&portal_apex) {
                            return Ok((out.count, truncated));
                        }
                        portal_right = portal_apex;
                        right_index = apex_index;
                        left_index = apex_index;
                        i = apex_index + 1;
                        continue;
                    }
                }

                // Left vertex
                if tri_area_2d(&portal_apex, &portal_left, &left) >= 0.0 {
                    if vequal(&portal_apex, &portal_left)
                        || tri_area_2d(&portal_apex, &portal_right, &left) < 0.0
                    {
                        portal_left = left;
                        left_index = i;
                    } else {
                        portal_apex = portal_right;
                        apex_index = right_index;
                        if !out.append(&portal_apex) {
                            return Ok((out.count, truncated));
                        }
                        portal_left = portal_apex;
                        left_index = apex_index;
                        right_index = apex_index;
                        i = apex_index + 1;
                        continue;
                    }
                }

                i += 1;
            }
        }

        if !out.append(&closest_end) {
            return Ok((out.count, truncated));
        }
        Ok((out.count, status))
    }

    fn find_random_point_around_circle(
        &mut self,
        mesh: &DetourNavMesh,
        start_ref: PolyRef,
        center: &[f32; 3],
        radius: f32,
        filter: &QueryFilter,
        frand: &mut dyn FnMut() -> f32,
    ) -> EngineResult<(PolyRef, [f32; 3])> {
        let Some((start_tile, start_ip)) = mesh.tile_and_poly(start_ref) else {
            return Err(invalid_param());
        };
        if !visfinite(center) || !radius.is_finite() || radius < 0.0 {
            return Err(invalid_param());
        }
        if !filter.pass_flags(start_tile.polys[start_ip].flags) {
            return Err(invalid_param());
        }

        self.node_pool.clear();
        self.open_list.clear();

        let start_idx = self
            .node_pool
            .get_node(start_ref)
            .ok_or_else(|| EngineStatus::failure_detail(EngineStatus::OUT_OF_NODES))?;
        {
            let start = self.node_pool.node_mut(start_idx);
            start.pos = *center;
            start.parent = None;
            start.cost = 0.0;
            start.total = 0.0;
            start.flags = NodeFlags::OPEN;
        }
        self.open_list.push(&self.node_pool, start_idx);

        let radius_sqr = radius * radius;
        let mut area_sum = 0.0f32;
        let mut random_ref = PolyRef::NULL;

        while let Some(best_idx) = self.open_list.pop(&self.node_pool) {
            let (best_ref, best_pos, best_total, parent) = {
                let best = self.node_pool.node_mut(best_idx);
                best.flags.remove(NodeFlags::OPEN);
                best.flags.insert(NodeFlags::CLOSED);
                (best.id, best.pos, best.total, best.parent)
            };
            let parent_ref = parent.map(|p| self.node_pool.node(p).id);

            let Some((tile, ip)) = mesh.tile_and_poly(best_ref) else {
                continue;
            };
            let poly = &tile.polys[ip];

            // Reservoir sample polygons weighted by area
            if poly.is_ground() {
                let poly_area = poly_area_2d(&tile.poly_verts(poly));
                area_sum += poly_area;
                let u = frand();
                if u * area_sum <= poly_area {
                    random_ref = best_ref;
                }
            }

            for link in &tile.links[ip] {
                let neighbour_ref = link.reference;
                if !neighbour_ref.is_valid() || Some(neighbour_ref) == parent_ref {
                    continue;
                }
                let Some((ntile, nip)) = mesh.tile_and_poly(neighbour_ref) else {
                    continue;
                };
                if !filter.pass_flags(ntile.polys[nip].flags) {
                    continue;
                }

                let Some((va, vb)) = mesh.portal_points(best_ref, neighbour_ref) else {
                    continue;
                };

                // Skip polygons the circle does not reach
                let (dist_sqr, _) = dist_pt_seg_sqr_2d(center, &va, &vb);
                if dist_sqr > radius_sqr {
                    continue;
                }

                let Some(neighbour_idx) = self.node_pool.get_node(neighbour_ref) else {
                    continue;
                };
                let neighbour = self.node_pool.node_mut(neighbour_idx);
                if neighbour.flags.contains(NodeFlags::CLOSED) {
                    continue;
                }
                if neighbour.flags.is_empty() {
                    neighbour.pos = vlerp(&va, &vb, 0.5);
                }

                let total = best_total + vdist(&best_pos, &neighbour.pos);
                if neighbour.flags.contains(NodeFlags::OPEN) && total >= neighbour.total {
                    continue;
                }

                neighbour.parent = Some(best_idx);
                neighbour.total = total;
                neighbour.flags.insert(NodeFlags::OPEN);
                self.open_list.push(&self.node_pool, neighbour_idx);
            }
        }

        let Some((tile, ip)) = mesh.tile_and_poly(random_ref) else {
            return Err(EngineStatus::failure());
        };

        let verts = tile.poly_verts(&tile.polys[ip]);
        let s = frand();
        let t = frand();
        let pt = random_point_in_convex_poly(&verts, s, t);
        let (closest, _) = tile.closest_point_on_poly(ip, &pt);

        Ok((random_ref, closest))
    }
}
