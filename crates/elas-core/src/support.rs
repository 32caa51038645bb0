//! C3: support-point finder.

use crate::descriptor::{texture_energy, Descriptor, DESC_LEN};
use crate::params::Parameters;
use crate::simd::sad16;

/// A single robust sparse correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportPoint {
    pub u: i32,
    pub v: i32,
    pub d: i32,
}

impl SupportPoint {
    pub fn new(u: i32, v: i32, d: i32) -> Self {
        Self { u, v, d }
    }
}

/// Step (in pixels) between the four descriptor samples accumulated by
/// [`matching_disparity`], and the minimum margin from the image border
/// required for any of them to be addressable.
const U_STEP: i32 = 2;
const V_STEP: i32 = 2;
const WINDOW_SIZE: i32 = 3;

/// SAD between four descriptors of `desc1` centred at `(u, v)` (sampled at
/// `(u ± U_STEP, v ± V_STEP)`) and the matching four descriptors of `desc2`
/// centred at `(u_warp, v)`.
fn four_block_sad(desc1: &Descriptor, desc2: &Descriptor, u: i32, v: i32, u_warp: i32) -> i32 {
    let offsets = [(-U_STEP, -V_STEP), (U_STEP, -V_STEP), (-U_STEP, V_STEP), (U_STEP, V_STEP)];
    let mut sum = 0i32;
    for (du, dv) in offsets {
        let a = desc1.at((u + du) as usize, (v + dv) as usize);
        let b = desc2.at((u_warp + du) as usize, (v_warp_clamp(v + dv)) as usize);
        sum += sad16(a, b);
    }
    sum
}

#[inline]
fn v_warp_clamp(v: i32) -> i32 {
    // The warped row never differs from v; kept as a named helper so the
    // intent (same row, horizontal-only disparity) stays documented at the
    // call site.
    v
}

/// Forward (or, if `right_image`, backward) disparity search from
/// `(u, v)` using the four-block SAD criterion with a uniqueness check.
///
/// Returns `None` when the block lacks texture, the disparity window is
/// too narrow, or the best match is not unique enough.
pub fn matching_disparity(
    params: &Parameters,
    desc1: &Descriptor,
    desc2: &Descriptor,
    u: i32,
    v: i32,
    right_image: bool,
) -> Option<i32> {
    let width = desc1.width() as i32;
    let height = desc1.height() as i32;

    if u < WINDOW_SIZE + U_STEP
        || u > width - WINDOW_SIZE - 1 - U_STEP
        || v < WINDOW_SIZE + V_STEP
        || v > height - WINDOW_SIZE - 1 - V_STEP
    {
        return None;
    }

    let (from, to) = if right_image { (desc2, desc1) } else { (desc1, desc2) };

    // Texture gate on the centre descriptor only, matching the original's
    // single 16-byte energy check before the 4-block SAD loop.
    let centre = from.at(u as usize, v as usize);
    if texture_energy(centre) < params.support_texture {
        return None;
    }

    let disp_min_valid = params.disp_min.max(0);
    let disp_max_valid = if !right_image {
        params.disp_max.min(u - WINDOW_SIZE - U_STEP)
    } else {
        params.disp_max.min(width - u - WINDOW_SIZE - U_STEP)
    };
    if disp_max_valid - disp_min_valid < 10 {
        return None;
    }

    let mut min1_e = i32::MAX;
    let mut min1_d = -1;
    let mut min2_e = i32::MAX;
    let mut min2_d = -1;

    for d in disp_min_valid..=disp_max_valid {
        let u_warp = if !right_image { u - d } else { u + d };
        let sum = four_block_sad(from, to, u, v, u_warp);
        if sum < min1_e {
            min2_e = min1_e;
            min2_d = min1_d;
            min1_e = sum;
            min1_d = d;
        } else if sum < min2_e {
            min2_e = sum;
            min2_d = d;
        }
    }

    if min1_d >= 0 && min2_d >= 0 && (min1_e as f32) < params.support_threshold * (min2_e as f32) {
        Some(min1_d)
    } else {
        None
    }
}

/// A sparse candidate grid of disparities, `-1` meaning "no support here".
struct CandidateGrid {
    d: Vec<i32>,
    width: usize,
    height: usize,
}

impl CandidateGrid {
    fn new(width: usize, height: usize) -> Self {
        Self {
            d: vec![-1; width * height],
            width,
            height,
        }
    }

    #[inline]
    fn get(&self, u: usize, v: usize) -> i32 {
        self.d[v * self.width + u]
    }

    #[inline]
    fn set(&mut self, u: usize, v: usize, val: i32) {
        self.d[v * self.width + u] = val;
    }
}

/// Invalidate any candidate whose `(2*incon_window_size+1)^2` neighbourhood
/// has fewer than `incon_min_support` disparities within `incon_threshold`.
///
/// Modifies `grid` in place during the sweep (no snapshot), so a candidate
/// invalidated earlier in raster order is immediately invisible to later
/// candidates' neighbourhood counts, matching the reference's in-place
/// `D_can` sweep.
fn remove_inconsistent(grid: &mut CandidateGrid, params: &Parameters) {
    let w = grid.width as i32;
    let h = grid.height as i32;

    for u_can in 0..w {
        for v_can in 0..h {
            let d_can = grid.get(u_can as usize, v_can as usize);
            if d_can < 0 {
                continue;
            }
            let mut support = 0;
            for u2 in (u_can - params.incon_window_size)..=(u_can + params.incon_window_size) {
                for v2 in (v_can - params.incon_window_size)..=(v_can + params.incon_window_size) {
                    if u2 >= 0 && v2 >= 0 && u2 < w && v2 < h {
                        let d2 = grid.get(u2 as usize, v2 as usize);
                        if d2 >= 0 && (d_can - d2).abs() <= params.incon_threshold {
                            support += 1;
                        }
                    }
                }
            }
            if support < params.incon_min_support {
                grid.set(u_can as usize, v_can as usize, -1);
            }
        }
    }
}

/// Invalidate candidates that are redundant: walking up to `redun_max_dist`
/// steps in both directions along one axis, a nearby-disparity support
/// exists on *both* sides.
///
/// Modifies `grid` in place during the sweep, matching the reference's
/// in-place `D_can` sweep: a candidate dropped earlier in raster order is
/// no longer available as a neighbour for candidates visited afterwards.
fn remove_redundant(grid: &mut CandidateGrid, redun_max_dist: i32, redun_threshold: i32, vertical: bool) {
    let w = grid.width as i32;
    let h = grid.height as i32;
    let (du, dv): ([i32; 2], [i32; 2]) = if vertical { ([0, 0], [-1, 1]) } else { ([-1, 1], [0, 0]) };

    for u_can in 0..w {
        for v_can in 0..h {
            let d_can = grid.get(u_can as usize, v_can as usize);
            if d_can < 0 {
                continue;
            }
            let mut redundant = true;
            for i in 0..2 {
                let mut u2 = u_can;
                let mut v2 = v_can;
                let mut found = false;
                for _ in 0..redun_max_dist {
                    u2 += du[i];
                    v2 += dv[i];
                    if u2 < 0 || v2 < 0 || u2 >= w || v2 >= h {
                        break;
                    }
                    let d2 = grid.get(u2 as usize, v2 as usize);
                    if d2 >= 0 && (d_can - d2).abs() <= redun_threshold {
                        found = true;
                        break;
                    }
                }
                if !found {
                    redundant = false;
                    break;
                }
            }
            if redundant {
                grid.set(u_can as usize, v_can as usize, -1);
            }
        }
    }
}

/// Append four left-image corner supports (disparity copied from the
/// nearest existing support by squared distance) plus two right-image
/// anchors for the two right-side corners.
fn add_corner_support_points(supports: &mut Vec<SupportPoint>, width: i32, height: i32) {
    let mut border = vec![
        SupportPoint::new(0, 0, 0),
        SupportPoint::new(0, height - 1, 0),
        SupportPoint::new(width - 1, 0, 0),
        SupportPoint::new(width - 1, height - 1, 0),
    ];

    for b in border.iter_mut() {
        let mut best_dist = i64::MAX;
        for s in supports.iter() {
            let du = (b.u - s.u) as i64;
            let dv = (b.v - s.v) as i64;
            let dist = du * du + dv * dv;
            if dist < best_dist {
                best_dist = dist;
                b.d = s.d;
            }
        }
    }

    let r2 = SupportPoint::new(border[2].u + border[2].d, border[2].v, border[2].d);
    let r3 = SupportPoint::new(border[3].u + border[3].d, border[3].v, border[3].d);
    border.push(r2);
    border.push(r3);

    supports.extend(border);
}

/// C3 entry point: find robust sparse correspondences across the whole
/// image, filter them, and optionally inject corner anchors.
pub fn compute_support_matches(
    params: &Parameters,
    desc1: &Descriptor,
    desc2: &Descriptor,
) -> Vec<SupportPoint> {
    let width = desc1.width() as i32;
    let height = desc1.height() as i32;

    let mut stepsize = params.candidate_stepsize;
    if params.subsampling {
        stepsize += stepsize % 2;
    }

    let mut can_width = 0usize;
    let mut u = 0;
    while u < width {
        can_width += 1;
        u += stepsize;
    }
    let mut can_height = 0usize;
    let mut v = 0;
    while v < height {
        can_height += 1;
        v += stepsize;
    }

    let mut grid = CandidateGrid::new(can_width, can_height);

    for u_can in 1..can_width {
        let u = (u_can as i32) * stepsize;
        for v_can in 1..can_height {
            let v = (v_can as i32) * stepsize;
            grid.set(u_can, v_can, -1);
            if let Some(d) = matching_disparity(params, desc1, desc2, u, v, false) {
                if let Some(d2) = matching_disparity(params, desc1, desc2, u - d, v, true) {
                    if (d - d2).abs() <= params.lr_threshold {
                        grid.set(u_can, v_can, d);
                    }
                }
            }
        }
    }

    remove_inconsistent(&mut grid, params);
    remove_redundant(&mut grid, 5, 1, true);
    remove_redundant(&mut grid, 5, 1, false);

    let mut supports = Vec::new();
    for u_can in 1..can_width {
        for v_can in 1..can_height {
            let d = grid.get(u_can, v_can);
            if d >= 0 {
                supports.push(SupportPoint::new(
                    (u_can as i32) * stepsize,
                    (v_can as i32) * stepsize,
                    d,
                ));
            }
        }
    }

    if params.add_corners {
        add_corner_support_points(&mut supports, width, height);
    }

    supports
}

const _: () = assert!(DESC_LEN == 16);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::AlignedImage;
    use crate::params::{Parameters, Setting};

    fn noise_image(w: usize, h: usize, seed: u64) -> Vec<u8> {
        let mut rng = rand_pcg(seed);
        (0..w * h).map(|_| rng_next(&mut rng)).collect()
    }

    // Tiny deterministic xorshift PRNG so the test has no extra
    // dependency: good enough for a non-flat "textured" synthetic image.
    fn rand_pcg(seed: u64) -> u64 {
        seed.wrapping_mul(2685821657736338717).wrapping_add(1)
    }
    fn rng_next(state: &mut u64) -> u8 {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        (*state % 256) as u8
    }

    #[test]
    fn flat_image_yields_no_supports() {
        let w = 64;
        let h = 64;
        let flat = vec![128u8; w * h];
        let img1 = AlignedImage::from_rows(&flat, w, h, w);
        let img2 = AlignedImage::from_rows(&flat, w, h, w);
        let desc1 = Descriptor::build(&img1, false);
        let desc2 = Descriptor::build(&img2, false);
        let params = Parameters::new(Setting::Robotics);
        let supports = compute_support_matches(&params, &desc1, &desc2);
        assert!(supports.is_empty());
    }

    #[test]
    fn shifted_textured_image_yields_supports_near_shift() {
        let w = 128;
        let h = 128;
        let shift = 8i32;
        let left = noise_image(w, h, 42);
        let mut right = vec![0u8; w * h];
        for v in 0..h {
            for u in 0..w {
                let su = u as i32 + shift;
                right[v * w + u] = if su < w as i32 {
                    left[v * w + su as usize]
                } else {
                    0
                };
            }
        }
        let img1 = AlignedImage::from_rows(&left, w, h, w);
        let img2 = AlignedImage::from_rows(&right, w, h, w);
        let desc1 = Descriptor::build(&img1, false);
        let desc2 = Descriptor::build(&img2, false);
        let mut params = Parameters::new(Setting::Robotics);
        params.candidate_stepsize = 8;
        let supports = compute_support_matches(&params, &desc1, &desc2);
        assert!(!supports.is_empty(), "expected some support points");
        for s in &supports {
            assert!((s.d - shift).abs() <= params.lr_threshold + 1);
        }
    }

    #[test]
    fn corner_injection_adds_six_points() {
        let mut supports = vec![SupportPoint::new(10, 10, 5)];
        add_corner_support_points(&mut supports, 100, 80);
        assert_eq!(supports.len(), 1 + 6);
    }
}
