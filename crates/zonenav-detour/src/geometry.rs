//! Geometry helpers working on the xz-plane
//!
//! Positions are `[f32; 3]` in the engine frame, y up.

/// Squared epsilon used when comparing two points for equality
const EQUAL_THRESHOLD: f32 = (1.0 / 16384.0) * (1.0 / 16384.0);

#[inline]
pub fn vsub(a: &[f32; 3], b: &[f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vlerp(a: &[f32; 3], b: &[f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[inline]
pub fn vdist(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    vdist_sqr(a, b).sqrt()
}

#[inline]
pub fn vdist_sqr(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let d = vsub(a, b);
    d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
}

/// Returns true if the two points are practically the same
#[inline]
pub fn vequal(a: &[f32; 3], b: &[f32; 3]) -> bool {
    vdist_sqr(a, b) < EQUAL_THRESHOLD
}

#[inline]
pub fn visfinite(v: &[f32; 3]) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Signed xz-plane area of the triangle ABC, times two
///
/// Positive when the triangle winds the same way as mesh polygons.
#[inline]
pub fn tri_area_2d(a: &[f32; 3], b: &[f32; 3], c: &[f32; 3]) -> f32 {
    let abx = b[0] - a[0];
    let abz = b[2] - a[2];
    let acx = c[0] - a[0];
    let acz = c[2] - a[2];
    acx * abz - abx * acz
}

#[inline]
pub fn overlap_bounds(amin: &[f32; 3], amax: &[f32; 3], bmin: &[f32; 3], bmax: &[f32; 3]) -> bool {
    !(amin[0] > bmax[0]
        || amax[0] < bmin[0]
        || amin[1] > bmax[1]
        || amax[1] < bmin[1]
        || amin[2] > bmax[2]
        || amax[2] < bmin[2])
}

/// Squared xz distance from `pt` to segment `pq`, plus the segment parameter
pub fn dist_pt_seg_sqr_2d(pt: &[f32; 3], p: &[f32; 3], q: &[f32; 3]) -> (f32, f32) {
    let pqx = q[0] - p[0];
    let pqz = q[2] - p[2];
    let dx = pt[0] - p[0];
    let dz = pt[2] - p[2];
    let d = pqx * pqx + pqz * pqz;
    let mut t = pqx * dx + pqz * dz;
    if d > 0.0 {
        t /= d;
    }
    let t = t.clamp(0.0, 1.0);
    let dx = p[0] + t * pqx - pt[0];
    let dz = p[2] + t * pqz - pt[2];
    (dx * dx + dz * dz, t)
}

/// Even-odd point in polygon test on the xz-plane
pub fn point_in_polygon(pt: &[f32; 3], verts: &[[f32; 3]]) -> bool {
    let mut inside = false;
    let n = verts.len();
    if n == 0 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let vi = &verts[i];
        let vj = &verts[j];
        if ((vi[2] > pt[2]) != (vj[2] > pt[2]))
            && (pt[0] < (vj[0] - vi[0]) * (pt[2] - vi[2]) / (vj[2] - vi[2]) + vi[0])
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Height of the triangle ABC under `p`, if `p` lies inside it on the xz-plane
pub fn closest_height_point_triangle(
    p: &[f32; 3],
    a: &[f32; 3],
    b: &[f32; 3],
    c: &[f32; 3],
) -> Option<f32> {
    const EPS: f32 = 1e-6;

    let v0 = vsub(c, a);
    let v1 = vsub(b, a);
    let v2 = vsub(p, a);

    let mut denom = v0[0] * v1[2] - v0[2] * v1[0];
    if denom.abs() < EPS {
        return None;
    }

    let mut u = v1[2] * v2[0] - v1[0] * v2[2];
    let mut v = v0[0] * v2[2] - v0[2] * v2[0];

    if denom < 0.0 {
        denom = -denom;
        u = -u;
        v = -v;
    }

    if u >= 0.0 && v >= 0.0 && (u + v) <= denom {
        Some(a[1] + (v0[1] * u + v1[1] * v) / denom)
    } else {
        None
    }
}

/// Closest point to `pos` on the boundary of a polygon, interpolating height along the edge
pub fn closest_point_on_polygon_boundary(pos: &[f32; 3], verts: &[[f32; 3]]) -> [f32; 3] {
    let n = verts.len();
    let mut best = f32::MAX;
    let mut closest = *pos;
    for i in 0..n {
        let va = &verts[i];
        let vb = &verts[(i + 1) % n];
        let (d, t) = dist_pt_seg_sqr_2d(pos, va, vb);
        if d < best {
            best = d;
            closest = vlerp(va, vb, t);
        }
    }
    closest
}

/// Picks a point inside a convex polygon from two uniform samples `s` and `t`
///
/// The triangle fan is weighted by area so the result is uniform over the polygon.
pub fn random_point_in_convex_poly(pts: &[[f32; 3]], s: f32, t: f32) -> [f32; 3] {
    let n = pts.len();
    if n < 3 {
        return pts.first().copied().unwrap_or([0.0; 3]);
    }

    let areas: Vec<f32> = (2..n)
        .map(|i| tri_area_2d(&pts[0], &pts[i - 1], &pts[i]).abs().max(0.001))
        .collect();
    let area_sum: f32 = areas.iter().sum();

    let thr = s * area_sum;
    let mut acc = 0.0;
    let mut u = 1.0;
    let mut tri = n - 1;
    for (k, dacc) in areas.iter().enumerate() {
        if thr >= acc && thr < acc + dacc {
            u = (thr - acc) / dacc;
            tri = k + 2;
            break;
        }
        acc += dacc;
    }

    let v = t.sqrt();
    let a = 1.0 - v;
    let b = (1.0 - u) * v;
    let c = u * v;
    let pa = &pts[0];
    let pb = &pts[tri - 1];
    let pc = &pts[tri];

    [
        a * pa[0] + b * pb[0] + c * pc[0],
        a * pa[1] + b * pb[1] + c * pc[1],
        a * pa[2] + b * pb[2] + c * pc[2],
    ]
}

/// Area of a convex polygon on the xz-plane
pub fn poly_area_2d(pts: &[[f32; 3]]) -> f32 {
    (2..pts.len())
        .map(|i| tri_area_2d(&pts[0], &pts[i - 1], &pts[i]).abs() * 0.5)
        .sum()
}

/// Returns the next power of 2
#[inline]
pub fn next_pow2(v: u32) -> u32 {
    if v == 0 {
        0
    } else {
        v.next_power_of_two()
    }
}

/// Integer logarithm base 2, 0 for 0
#[inline]
pub fn ilog2(v: u32) -> u32 {
    v.checked_ilog2().unwrap_or(0)
}

#[inline]
pub fn align4(x: usize) -> usize {
    (x + 3) & !3
}
