//! C7: the prior-guided dense matcher.

use crate::descriptor::{texture_energy, Descriptor};
use crate::grid::DisparityGrid;
use crate::params::Parameters;
use crate::plane::Triangle;
use crate::sentinel::Disparity;
use crate::simd::sad16;
use crate::support::SupportPoint;

/// Descriptor window half-width used by the dense matcher (distinct from
/// the support finder's wider, four-block window).
const WINDOW_SIZE: i32 = 2;

/// Precomputed per-triangle context shared by every `find_match` call
/// inside its rasterised interior.
struct TriangleContext<'a> {
    plane_a: f32,
    plane_b: f32,
    plane_c: f32,
    valid: bool,
    plane_radius: i32,
    disp_num: i32,
    grid: &'a DisparityGrid,
    grid_size: i32,
}

/// Evaluate the MAP matching cost at `(u, v)` and return the winning
/// disparity, or `Disparity::MatcherInvalid` if nothing could be matched.
#[allow(clippy::too_many_arguments)]
fn find_match(
    ctx: &TriangleContext,
    params: &Parameters,
    u: i32,
    v: i32,
    from_desc: &Descriptor,
    to_desc: &Descriptor,
    right_image: bool,
    prior: &[i32],
) -> Disparity {
    let width = from_desc.width() as i32;
    let height = from_desc.height() as i32;

    if u < WINDOW_SIZE || u >= width - WINDOW_SIZE {
        return Disparity::Filtered;
    }

    // The reference clamps the descriptor row to [2, height-3] when
    // fetching the block, since rasterisation can briefly visit rows just
    // outside each descriptor's own valid margin.
    let v_desc = v.clamp(2, height - 3);

    let from_block = from_desc.at(u as usize, v_desc as usize);
    if texture_energy(from_block) < params.match_texture {
        return Disparity::Filtered;
    }

    let d_plane = (ctx.plane_a * u as f32 + ctx.plane_b * v as f32 + ctx.plane_c) as i32;
    let d_plane_min = (d_plane - ctx.plane_radius).max(0);
    let d_plane_max = (d_plane + ctx.plane_radius).min(ctx.disp_num - 1);

    let grid_x = (u / ctx.grid_size).max(0) as usize;
    let grid_y = (v / ctx.grid_size).max(0) as usize;
    let grid_x = grid_x.min(ctx.grid.grid_width.saturating_sub(1));
    let grid_y = grid_y.min(ctx.grid.grid_height.saturating_sub(1));
    let candidates = ctx.grid.candidates(grid_x, grid_y);

    let mut min_val = i32::MAX;
    let mut min_d = -1i32;

    let warp = |d: i32| -> i32 {
        if !right_image {
            u - d
        } else {
            u + d
        }
    };

    let mut try_candidate = |d_curr: i32, weight: i32| {
        let u_warp = warp(d_curr);
        if u_warp < WINDOW_SIZE || u_warp >= width - WINDOW_SIZE {
            return;
        }
        let to_block = to_desc.at(u_warp as usize, v_desc as usize);
        let val = sad16(from_block, to_block) + weight;
        if val < min_val {
            min_val = val;
            min_d = d_curr;
        }
    };

    for &d_curr in candidates {
        if d_curr < d_plane_min || d_curr > d_plane_max {
            try_candidate(d_curr, 0);
        }
    }
    for d_curr in d_plane_min..=d_plane_max {
        let weight = if ctx.valid {
            prior[(d_curr - d_plane).unsigned_abs() as usize]
        } else {
            0
        };
        try_candidate(d_curr, weight);
    }

    if min_d >= 0 {
        Disparity::Valid(min_d as f32)
    } else {
        Disparity::MatcherInvalid
    }
}

fn write_disparity(out: &mut [f32], width: i32, u: i32, v: i32, subsampling: bool, value: Disparity) {
    let addr = if subsampling {
        ((v / 2) * (width / 2) + (u / 2)) as usize
    } else {
        (v * width + u) as usize
    };
    out[addr] = value.to_sentinel();
}

/// C7 entry point: fill `out` (pre-sized `width*height`, or the
/// subsampled size) with the MAP dense disparity for `right_image`'s
/// reference view.
#[allow(clippy::too_many_arguments)]
pub fn compute_disparity(
    params: &Parameters,
    supports: &[SupportPoint],
    tris: &[Triangle],
    grid: &DisparityGrid,
    desc1: &Descriptor,
    desc2: &Descriptor,
    right_image: bool,
    width: i32,
    height: i32,
    out: &mut [f32],
) {
    out.fill(Disparity::Filtered.to_sentinel());

    let disp_num = params.disp_max + 1;
    let two_sigma_sq = 2.0 * params.sigma * params.sigma;
    let prior: Vec<i32> = (0..disp_num)
        .map(|delta_d| {
            let dd = delta_d as f32;
            ((-((params.gamma + (-dd * dd / two_sigma_sq).exp()).ln()) + params.gamma.ln())
                / params.beta) as i32
        })
        .collect();
    let plane_radius = (params.sigma * params.sradius).ceil().max(2.0) as i32;

    let (from_desc, to_desc) = if !right_image { (desc1, desc2) } else { (desc2, desc1) };

    for tri in tris {
        let (plane_a, plane_b, plane_c, plane_d_a) = if !right_image {
            (tri.plane1.0, tri.plane1.1, tri.plane1.2, tri.plane2.0)
        } else {
            (tri.plane2.0, tri.plane2.1, tri.plane2.2, tri.plane1.0)
        };

        let p1 = supports[tri.c1 as usize];
        let p2 = supports[tri.c2 as usize];
        let p3 = supports[tri.c3 as usize];

        let tri_u = |p: SupportPoint| if !right_image { p.u as f32 } else { (p.u - p.d) as f32 };
        let mut verts = [(tri_u(p1), p1.v as f32), (tri_u(p2), p2.v as f32), (tri_u(p3), p3.v as f32)];
        verts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let (a_u, a_v) = verts[0];
        let (b_u, b_v) = verts[1];
        let (c_u, c_v) = verts[2];

        let line = |x1: f32, y1: f32, x2: f32, y2: f32| -> (f32, f32) {
            if x1 as i32 != x2 as i32 {
                let slope = (y1 - y2) / (x1 - x2);
                (slope, y1 - slope * x1)
            } else {
                (0.0, y1)
            }
        };
        let (ab_a, ab_b) = line(a_u, a_v, b_u, b_v);
        let (ac_a, ac_b) = line(a_u, a_v, c_u, c_v);
        let (bc_a, bc_b) = line(b_u, b_v, c_u, c_v);

        let valid = plane_a.abs() < 0.7 && plane_d_a.abs() < 0.7;

        let ctx = TriangleContext {
            plane_a,
            plane_b,
            plane_c,
            valid,
            plane_radius,
            disp_num,
            grid,
            grid_size: params.grid_size,
        };

        let mut rasterise_half = |u_lo: f32, u_hi: f32, edge_a: (f32, f32)| {
            if u_lo as i32 == u_hi as i32 {
                return;
            }
            let u_start = (u_lo as i32).max(0);
            let u_end = (u_hi as i32).min(width);
            for u in u_start..u_end {
                if params.subsampling && u % 2 != 0 {
                    continue;
                }
                let v1 = (ac_a * u as f32 + ac_b) as i32;
                let v2 = (edge_a.0 * u as f32 + edge_a.1) as i32;
                let (v_lo, v_hi) = if v1 < v2 { (v1, v2) } else { (v2, v1) };
                for v in v_lo..v_hi {
                    if v < 0 || v >= height {
                        continue;
                    }
                    if params.subsampling && v % 2 != 0 {
                        continue;
                    }
                    let result = find_match(&ctx, params, u, v, from_desc, to_desc, right_image, &prior);
                    write_disparity(out, width, u, v, params.subsampling, result);
                }
            }
        };

        rasterise_half(a_u, b_u, (ab_a, ab_b));
        rasterise_half(b_u, c_u, (bc_a, bc_b));
    }
}
