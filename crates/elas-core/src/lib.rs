//! Efficient Large-scale Stereo (ELAS) dense disparity matching.
//!
//! ## Pipeline
//!
//! 1. Copy both input images into 16-byte-aligned, row-padded buffers
//!    ([`image_buffer`]).
//! 2. Build the sparse 16-byte descriptor for each pixel ([`descriptor`]).
//! 3. Find robust sparse support-point correspondences ([`support`]).
//! 4. Triangulate the supports ([`triangulate`]) and fit a disparity plane
//!    per triangle ([`plane`]).
//! 5. Build the per-cell disparity candidate grid ([`grid`]).
//! 6. Run the prior-guided dense matcher over every triangle's interior
//!    ([`matcher`]).
//! 7. Enforce left-right consistency ([`consistency`]).
//! 8. Remove speckles, interpolate gaps, and smooth ([`postprocess`]).
//!
//! ## Logging
//!
//! Every stage emits a `log::debug!` at entry/exit with its timing-relevant
//! counts (support points found, triangles built); wire up `env_logger` (or
//! any other `log`-compatible subscriber) in the host application to see
//! them.
//!
//! ## Configuration
//!
//! See [`params::Parameters`] and [`params::Setting`] for the two shipped
//! presets (`Robotics`, `Middlebury`) and the full tunable surface.

pub mod consistency;
pub mod descriptor;
pub mod error;
pub mod grid;
pub mod image_buffer;
pub mod matcher;
pub mod params;
pub mod plane;
pub mod postprocess;
pub mod sentinel;
pub mod simd;
pub mod support;
pub mod triangulate;

pub use error::{ElasError, Result};
pub use params::{Parameters, Setting};
pub use sentinel::Disparity;
pub use triangulate::{DelaunatorTriangulation, Triangulator};

use image_buffer::AlignedImage;
use plane::compute_disparity_planes;
use support::compute_support_matches;

/// The ELAS dense stereo matcher.
///
/// Holds the configuration and the triangulator collaborator; stateless
/// beyond that — every [`Elas::process`] call allocates its own scratch
/// buffers and releases them on return, including on the early-error exit.
pub struct Elas<T: Triangulator = DelaunatorTriangulation> {
    params: Parameters,
    triangulator: T,
}

impl Elas<DelaunatorTriangulation> {
    /// Build a matcher with the default Delaunay triangulator.
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            triangulator: DelaunatorTriangulation,
        }
    }
}

impl<T: Triangulator> Elas<T> {
    /// Build a matcher with a custom triangulation collaborator.
    pub fn with_triangulator(params: Parameters, triangulator: T) -> Self {
        Self { params, triangulator }
    }

    /// Run the full pipeline over a rectified grayscale stereo pair.
    ///
    /// `left`/`right` are row-major, `width*height` bytes, one byte per
    /// pixel (tightly packed; use [`Elas::process_with_stride`] if the
    /// source has row padding). `d1`/`d2` receive the left- and
    /// right-referenced disparity maps, sentinel-encoded
    /// ([`Disparity::to_sentinel`]): sized `width*height` normally, or
    /// `(width/2)*(height/2)` when `params.subsampling` is set.
    pub fn process(&self, left: &[u8], right: &[u8], width: usize, height: usize, d1: &mut [f32], d2: &mut [f32]) -> error::Result<()> {
        self.process_with_stride(left, right, width, height, width, d1, d2)
    }

    /// As [`Elas::process`], but `left`/`right` use `src_bpl` bytes per row
    /// instead of `width`.
    pub fn process_with_stride(
        &self,
        left: &[u8],
        right: &[u8],
        width: usize,
        height: usize,
        src_bpl: usize,
        d1: &mut [f32],
        d2: &mut [f32],
    ) -> error::Result<()> {
        let expected_len = if self.params.subsampling {
            (width / 2) * (height / 2)
        } else {
            width * height
        };
        if d1.len() != expected_len {
            return Err(error::ElasError::OutputBufferSize {
                got: d1.len(),
                expected: expected_len,
            });
        }
        if d2.len() != expected_len {
            return Err(error::ElasError::OutputBufferSize {
                got: d2.len(),
                expected: expected_len,
            });
        }

        let expected_input_len = src_bpl * height;
        if left.len() < expected_input_len {
            return Err(error::ElasError::InputBufferSize {
                side: "left",
                got: left.len(),
                expected: expected_input_len,
            });
        }
        if right.len() < expected_input_len {
            return Err(error::ElasError::InputBufferSize {
                side: "right",
                got: right.len(),
                expected: expected_input_len,
            });
        }

        log::debug!("elas: aligning {width}x{height} image pair");
        let img1 = AlignedImage::from_rows(left, width, height, src_bpl);
        let img2 = AlignedImage::from_rows(right, width, height, src_bpl);

        log::debug!("elas: building descriptors");
        let desc1 = descriptor::Descriptor::build(&img1, self.params.subsampling);
        let desc2 = descriptor::Descriptor::build(&img2, self.params.subsampling);

        log::debug!("elas: computing support matches");
        let supports = compute_support_matches(&self.params, &desc1, &desc2);
        log::debug!("elas: found {} support points", supports.len());

        if supports.len() < 3 {
            log::error!("elas: only {} support points, need at least 3", supports.len());
            return Err(error::ElasError::InsufficientSupportPoints { found: supports.len() });
        }

        let points: Vec<(f32, f32)> = supports.iter().map(|s| (s.u as f32, s.v as f32)).collect();
        let left_tris_idx = self.triangulator.triangulate(&points);

        let right_points: Vec<(f32, f32)> = supports.iter().map(|s| ((s.u - s.d) as f32, s.v as f32)).collect();
        let right_tris_idx = self.triangulator.triangulate(&right_points);

        log::debug!(
            "elas: triangulated {} left / {} right triangles",
            left_tris_idx.len(),
            right_tris_idx.len()
        );

        let left_tris = compute_disparity_planes(&supports, &left_tris_idx);
        let right_tris = compute_disparity_planes(&supports, &right_tris_idx);

        let w = width as i32;
        let h = height as i32;

        log::debug!("elas: building disparity grids");
        let grid1 = grid::create_grid(&self.params, w, h, &supports, false);
        let grid2 = grid::create_grid(&self.params, w, h, &supports, true);

        log::debug!("elas: dense matching (left reference)");
        matcher::compute_disparity(&self.params, &supports, &left_tris, &grid1, &desc1, &desc2, false, w, h, d1);

        log::debug!("elas: dense matching (right reference)");
        matcher::compute_disparity(&self.params, &supports, &right_tris, &grid2, &desc1, &desc2, true, w, h, d2);

        log::debug!("elas: left-right consistency check");
        consistency::left_right_consistency_check(&self.params, w, h, d1, d2);

        let (out_w, out_h) = if self.params.subsampling {
            (w / 2, h / 2)
        } else {
            (w, h)
        };

        log::debug!("elas: postprocessing");
        postprocess::remove_small_segments(&self.params, out_w, out_h, d1);
        postprocess::gap_interpolation(&self.params, out_w, out_h, d1);
        if !self.params.postprocess_only_left {
            postprocess::remove_small_segments(&self.params, out_w, out_h, d2);
            postprocess::gap_interpolation(&self.params, out_w, out_h, d2);
        }

        if self.params.filter_adaptive_mean {
            postprocess::adaptive_mean(&self.params, out_w, out_h, d1);
            if !self.params.postprocess_only_left {
                postprocess::adaptive_mean(&self.params, out_w, out_h, d2);
            }
        }
        if self.params.filter_median {
            postprocess::median(out_w, out_h, d1);
            if !self.params.postprocess_only_left {
                postprocess::median(out_w, out_h, d2);
            }
        }

        log::debug!("elas: done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise_image(w: usize, h: usize, seed: u64) -> Vec<u8> {
        let mut state = seed;
        (0..w * h)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 256) as u8
            })
            .collect()
    }

    #[test]
    fn flat_image_pair_is_rejected_for_lack_of_support() {
        let w = 64;
        let h = 64;
        let flat = vec![128u8; w * h];
        let elas = Elas::new(Parameters::new(Setting::Robotics));
        let mut d1 = vec![0.0f32; w * h];
        let mut d2 = vec![0.0f32; w * h];
        let result = elas.process(&flat, &flat, w, h, &mut d1, &mut d2);
        assert!(matches!(result, Err(ElasError::InsufficientSupportPoints { .. })));
    }

    #[test]
    fn undersized_input_buffer_is_rejected() {
        let w = 64;
        let h = 64;
        let short_left = vec![128u8; w * h - 1];
        let right = vec![128u8; w * h];
        let elas = Elas::new(Parameters::new(Setting::Robotics));
        let mut d1 = vec![0.0f32; w * h];
        let mut d2 = vec![0.0f32; w * h];
        let result = elas.process(&short_left, &right, w, h, &mut d1, &mut d2);
        assert!(matches!(
            result,
            Err(ElasError::InputBufferSize { side: "left", .. })
        ));
    }

    #[test]
    fn mismatched_output_buffer_size_is_rejected() {
        let w = 64;
        let h = 64;
        let flat = vec![128u8; w * h];
        let elas = Elas::new(Parameters::new(Setting::Robotics));
        let mut d1 = vec![0.0f32; w * h - 1];
        let mut d2 = vec![0.0f32; w * h];
        let result = elas.process(&flat, &flat, w, h, &mut d1, &mut d2);
        assert!(matches!(result, Err(ElasError::OutputBufferSize { .. })));
    }

    #[test]
    fn shifted_textured_pair_yields_dense_disparities_near_the_shift() {
        let w = 200;
        let h = 200;
        let shift = 10i32;
        let left = noise_image(w, h, 99);
        let mut right = vec![0u8; w * h];
        for v in 0..h {
            for u in 0..w {
                let su = u as i32 + shift;
                right[v * w + u] = if (su as usize) < w { left[v * w + su as usize] } else { 0 };
            }
        }

        let mut params = Parameters::new(Setting::Robotics);
        params.candidate_stepsize = 8;
        let elas = Elas::new(params);
        let mut d1 = vec![0.0f32; w * h];
        let mut d2 = vec![0.0f32; w * h];
        elas.process(&left, &right, w, h, &mut d1, &mut d2).expect("pipeline should succeed on a textured pair");

        let mut valid = 0;
        let mut near_shift = 0;
        for v in 30..(h - 30) {
            for u in 30..(w - 30) {
                let d = Disparity::from_sentinel(d1[v * w + u]);
                if let Disparity::Valid(val) = d {
                    valid += 1;
                    if (val - shift as f32).abs() <= 2.0 {
                        near_shift += 1;
                    }
                }
            }
        }
        assert!(valid > 0, "expected some valid disparities in the interior");
        assert!(
            near_shift as f32 >= 0.5 * valid as f32,
            "expected most interior disparities near the true shift, got {near_shift}/{valid}"
        );
    }
}
