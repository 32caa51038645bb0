//! C6: disparity candidate grid with 3x3 dilation.

use crate::params::Parameters;
use crate::support::SupportPoint;

/// A coarse per-cell disparity candidate list.
///
/// Cell `(x, y)` stores `count` followed by `count` strictly increasing
/// candidate disparities, packed into one flat `Vec<i32>` with a fixed
/// stride of `disp_max + 2` per cell (slot 0 = count, slots 1..=disp_max+1
/// = candidates), exactly mirroring the reference's `disparity_grid`
/// layout.
pub struct DisparityGrid {
    data: Vec<i32>,
    pub grid_width: usize,
    pub grid_height: usize,
    stride: usize,
}

impl DisparityGrid {
    fn addr(&self, x: usize, y: usize) -> usize {
        (y * self.grid_width + x) * self.stride
    }

    /// Number of candidates in cell `(x, y)`.
    pub fn count(&self, x: usize, y: usize) -> usize {
        self.data[self.addr(x, y)] as usize
    }

    /// The candidate disparities in cell `(x, y)`.
    pub fn candidates(&self, x: usize, y: usize) -> &[i32] {
        let base = self.addr(x, y);
        let n = self.data[base] as usize;
        &self.data[base + 1..base + 1 + n]
    }
}

/// C6 entry point. `right_image` controls whether a support's grid cell is
/// keyed by `u` or by `u - d` (the right-view warp), matching `createGrid`.
pub fn create_grid(params: &Parameters, width: i32, height: i32, supports: &[SupportPoint], right_image: bool) -> DisparityGrid {
    let grid_width = ((width as f32) / (params.grid_size as f32)).ceil() as usize;
    let grid_height = ((height as f32) / (params.grid_size as f32)).ceil() as usize;
    let disp_max = params.disp_max as usize;

    // Scratch bitmap: one bool per (cell, disparity) before dilation.
    let scratch_stride = disp_max + 1;
    let mut scratch = vec![false; grid_width * grid_height * scratch_stride];
    let scratch_addr = |x: usize, y: usize, d: usize| (y * grid_width + x) * scratch_stride + d;

    for s in supports {
        let d_curr = s.d;
        let d_min = (d_curr - 1).max(0) as usize;
        let d_max = (d_curr + 1).min(params.disp_max) as usize;

        let gx = if !right_image {
            (s.u as f32 / params.grid_size as f32).floor()
        } else {
            ((s.u - s.d) as f32 / params.grid_size as f32).floor()
        };
        let gy = (s.v as f32 / params.grid_size as f32).floor();

        if gx < 0.0 || gy < 0.0 {
            continue;
        }
        let gx = gx as usize;
        let gy = gy as usize;
        if gx >= grid_width || gy >= grid_height {
            continue;
        }

        for d in d_min..=d_max {
            scratch[scratch_addr(gx, gy, d)] = true;
        }
    }

    // 3x3 logical-OR dilation in (x,y); depth (disparity) axis untouched.
    let mut dilated = vec![false; scratch.len()];
    for y in 0..grid_height {
        for x in 0..grid_width {
            for d in 0..scratch_stride {
                let mut any = false;
                for dy in -1..=1i32 {
                    for dx in -1..=1i32 {
                        let nx = x as i32 + dx;
                        let ny = y as i32 + dy;
                        if nx >= 0 && ny >= 0 && (nx as usize) < grid_width && (ny as usize) < grid_height {
                            if scratch[scratch_addr(nx as usize, ny as usize, d)] {
                                any = true;
                            }
                        }
                    }
                }
                dilated[scratch_addr(x, y, d)] = any;
            }
        }
    }

    let stride = disp_max + 2;
    let mut data = vec![0i32; grid_width * grid_height * stride];
    for y in 0..grid_height {
        for x in 0..grid_width {
            let base = (y * grid_width + x) * stride;
            let mut idx = 1usize;
            for d in 0..=disp_max {
                if dilated[scratch_addr(x, y, d)] {
                    data[base + idx] = d as i32;
                    idx += 1;
                }
            }
            data[base] = (idx - 1) as i32;
        }
    }

    DisparityGrid {
        data,
        grid_width,
        grid_height,
        stride,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Parameters, Setting};

    #[test]
    fn candidates_are_strictly_increasing_and_within_bound() {
        let params = Parameters::new(Setting::Robotics);
        let supports = vec![
            SupportPoint::new(10, 10, 20),
            SupportPoint::new(12, 11, 22),
        ];
        let grid = create_grid(&params, 100, 100, &supports, false);
        for y in 0..grid.grid_height {
            for x in 0..grid.grid_width {
                let cands = grid.candidates(x, y);
                assert!(cands.len() <= params.disp_max as usize + 1);
                for w in cands.windows(2) {
                    assert!(w[0] < w[1]);
                }
            }
        }
    }

    #[test]
    fn dilation_spreads_to_neighbour_cells() {
        let params = Parameters::new(Setting::Robotics);
        let supports = vec![SupportPoint::new(5, 5, 50)];
        let grid = create_grid(&params, 100, 100, &supports, false);
        // grid_size=20 so (5,5) lands in cell (0,0); its 8-neighbours (here
        // only (1,0),(0,1),(1,1) exist) should see disparity 50 after
        // dilation.
        assert!(grid.candidates(1, 0).contains(&50));
        assert!(grid.candidates(0, 1).contains(&50));
        assert!(grid.candidates(1, 1).contains(&50));
    }
}
