//! C2: gradient images and the 16-byte sparse descriptor.
//!
//! The original descriptor is a sparse approximation of a published 50-D
//! descriptor, chosen so it loads as a single 128-bit SIMD word. The exact
//! sampling offsets used by the reference `descriptor.cpp` were not part of
//! the retrieved source (only its header contract was available), so the
//! offsets below are a fixed, documented, internally-consistent
//! instantiation of the same idea: 8 samples from the horizontal gradient
//! and 8 from the vertical gradient, drawn from a small cross/diamond
//! pattern within a 2-pixel margin (see DESIGN.md, OQ-2).

use crate::image_buffer::AlignedImage;

/// Bytes per descriptor (one 128-bit SIMD word).
pub const DESC_LEN: usize = 16;

/// Relative `(du, dv)` offsets sampled from the horizontal-gradient image.
const DU_OFFSETS: [(i32, i32); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

/// Relative `(du, dv)` offsets sampled from the vertical-gradient image.
const DV_OFFSETS: [(i32, i32); 8] = [
    (0, -2),
    (0, 2),
    (-2, 0),
    (2, 0),
    (-1, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
];

/// Margin (in pixels) within which descriptors are undefined. Callers must
/// not sample a descriptor closer than this to any border.
pub const MARGIN: usize = 3;

/// Gradient images plus the packed sparse descriptor for one input image.
pub struct Descriptor {
    /// `desc[16*(v*width+u) ..= +15]`
    pub data: Vec<u8>,
    width: usize,
    height: usize,
}

/// Sobel-like horizontal response: `[-1 0 1; -2 0 2; -1 0 1]`.
fn sobel_du(img: &AlignedImage, u: usize, v: usize) -> i32 {
    let w = img.width();
    let h = img.height();
    let at = |uu: i32, vv: i32| -> i32 {
        let uu = uu.clamp(0, w as i32 - 1) as usize;
        let vv = vv.clamp(0, h as i32 - 1) as usize;
        img.get(uu, vv) as i32
    };
    let ui = u as i32;
    let vi = v as i32;
    -at(ui - 1, vi - 1) + at(ui + 1, vi - 1) - 2 * at(ui - 1, vi) + 2 * at(ui + 1, vi)
        - at(ui - 1, vi + 1)
        + at(ui + 1, vi + 1)
}

/// Sobel-like vertical response: `[-1 -2 -1; 0 0 0; 1 2 1]`.
fn sobel_dv(img: &AlignedImage, u: usize, v: usize) -> i32 {
    let w = img.width();
    let h = img.height();
    let at = |uu: i32, vv: i32| -> i32 {
        let uu = uu.clamp(0, w as i32 - 1) as usize;
        let vv = vv.clamp(0, h as i32 - 1) as usize;
        img.get(uu, vv) as i32
    };
    let ui = u as i32;
    let vi = v as i32;
    -at(ui - 1, vi - 1) - 2 * at(ui, vi - 1) - at(ui + 1, vi - 1) + at(ui - 1, vi + 1)
        + 2 * at(ui, vi + 1)
        + at(ui + 1, vi + 1)
}

/// Gradient response clamped to `[-128,127]` and offset to `[0,255]`, the
/// same convention `filter.h`'s 5x5/3x3 convolutions describe ("truncated
/// to [-128,128], then shifted to [0,255]").
fn clamp_to_byte(v: i32) -> u8 {
    (v.clamp(-128, 127) + 128) as u8
}

impl Descriptor {
    /// Build gradient images and the packed descriptor for `img`.
    ///
    /// In half-resolution mode (`half_resolution`) the descriptor is only
    /// populated for even `u`/`v`; the stride between descriptor pixels is
    /// otherwise identical (full `width`-wide addressing), matching the
    /// original's practice of leaving odd rows/cols untouched rather than
    /// repacking into a half-sized buffer.
    pub fn build(img: &AlignedImage, half_resolution: bool) -> Self {
        let width = img.width();
        let height = img.height();
        let mut data = vec![0u8; DESC_LEN * width * height];

        let du = |u: usize, v: usize| clamp_to_byte(sobel_du(img, u, v));
        let dv = |u: usize, v: usize| clamp_to_byte(sobel_dv(img, u, v));

        for v in MARGIN..height.saturating_sub(MARGIN) {
            for u in MARGIN..width.saturating_sub(MARGIN) {
                if half_resolution && (u % 2 != 0 || v % 2 != 0) {
                    continue;
                }
                let base = DESC_LEN * (v * width + u);
                for (i, (dx, dy)) in DU_OFFSETS.iter().enumerate() {
                    let su = (u as i32 + dx) as usize;
                    let sv = (v as i32 + dy) as usize;
                    data[base + i] = du(su, sv);
                }
                for (i, (dx, dy)) in DV_OFFSETS.iter().enumerate() {
                    let su = (u as i32 + dx) as usize;
                    let sv = (v as i32 + dy) as usize;
                    data[base + 8 + i] = dv(su, sv);
                }
            }
        }

        Self {
            data,
            width,
            height,
        }
    }

    /// The 16-byte descriptor at `(u, v)`.
    #[inline]
    pub fn at(&self, u: usize, v: usize) -> &[u8] {
        let base = DESC_LEN * (v * self.width + u);
        &self.data[base..base + DESC_LEN]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
}

/// Texture energy of a descriptor: `sum(|b - 128|)` over its 16 bytes.
#[inline]
pub fn texture_energy(desc: &[u8]) -> i32 {
    desc.iter().map(|&b| (b as i32 - 128).abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_has_zero_gradient_and_zero_texture() {
        let w = 32;
        let h = 32;
        let flat = vec![128u8; w * h];
        let img = AlignedImage::from_rows(&flat, w, h, w);
        let desc = Descriptor::build(&img, false);
        let d = desc.at(16, 16);
        assert_eq!(texture_energy(d), 0);
        assert!(d.iter().all(|&b| b == 128));
    }

    #[test]
    fn vertical_edge_produces_nonzero_horizontal_gradient() {
        let w = 32;
        let h = 32;
        let mut data = vec![0u8; w * h];
        for v in 0..h {
            for u in 0..w {
                data[v * w + u] = if u < w / 2 { 0 } else { 255 };
            }
        }
        let img = AlignedImage::from_rows(&data, w, h, w);
        let desc = Descriptor::build(&img, false);
        let d = desc.at(w / 2, h / 2);
        assert!(texture_energy(d) > 0);
    }

    #[test]
    fn half_resolution_only_fills_even_pixels() {
        let w = 32;
        let h = 32;
        let data = vec![200u8; w * h];
        let img = AlignedImage::from_rows(&data, w, h, w);
        let desc = Descriptor::build(&img, true);
        // (16,16) even -> descriptor computed (flat image -> all 128s).
        assert_eq!(desc.at(16, 16)[0], 128);
        // (17,16) odd u -> left untouched (zero-initialized).
        assert_eq!(desc.at(17, 16)[0], 0);
    }
}
