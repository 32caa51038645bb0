//! C1: 16-byte-aligned, row-padded image buffer.

/// An 8-bit grayscale image copied into a 16-byte-aligned, row-padded
/// buffer so descriptor construction can later load 16-byte SIMD words
/// without straddling a row boundary.
///
/// `bpl` ("bytes per line") is `width` rounded up to the next multiple of
/// 16, matching `bpl = width + 15 - (width-1) % 16` from the original.
/// Bytes between `width` and `bpl` in every row are zero.
#[derive(Debug, Clone)]
pub struct AlignedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    bpl: usize,
}

/// 16-byte alignment needed for descriptor SIMD loads.
const ALIGNMENT: usize = 16;

fn aligned_bytes_per_line(width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    width + (ALIGNMENT - 1) - (width - 1) % ALIGNMENT
}

impl AlignedImage {
    /// Copy `src` (row-major, `src_bpl` bytes per line) into a new
    /// 16-byte-aligned buffer of `width x height`.
    ///
    /// If `src_bpl == bpl` the whole buffer is copied in one shot;
    /// otherwise each row is copied independently, matching the row-copy
    /// fallback in `Elas::process`.
    pub fn from_rows(src: &[u8], width: usize, height: usize, src_bpl: usize) -> Self {
        let bpl = aligned_bytes_per_line(width);
        let mut data = vec![0u8; bpl * height];
        if src_bpl == bpl {
            let n = bpl * height;
            data[..n].copy_from_slice(&src[..n]);
        } else {
            for v in 0..height {
                let src_row = &src[v * src_bpl..v * src_bpl + width];
                let dst_row = &mut data[v * bpl..v * bpl + width];
                dst_row.copy_from_slice(src_row);
            }
        }
        Self {
            data,
            width,
            height,
            bpl,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn bpl(&self) -> usize {
        self.bpl
    }

    #[inline]
    pub fn get(&self, u: usize, v: usize) -> u8 {
        self.data[v * self.bpl + u]
    }

    #[inline]
    pub fn row(&self, v: usize) -> &[u8] {
        &self.data[v * self.bpl..v * self.bpl + self.bpl]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bpl_rounds_up_to_16() {
        assert_eq!(aligned_bytes_per_line(1), 16);
        assert_eq!(aligned_bytes_per_line(16), 16);
        assert_eq!(aligned_bytes_per_line(17), 32);
        assert_eq!(aligned_bytes_per_line(640), 640);
        assert_eq!(aligned_bytes_per_line(641), 656);
    }

    #[test]
    fn tight_copy_preserves_pixels_and_pads_tail() {
        let w = 5;
        let h = 2;
        let src: Vec<u8> = (0..(w * h) as u8).collect();
        let img = AlignedImage::from_rows(&src, w, h, w);
        assert_eq!(img.bpl(), 16);
        for v in 0..h {
            for u in 0..w {
                assert_eq!(img.get(u, v), src[v * w + u]);
            }
            for u in w..img.bpl() {
                assert_eq!(img.get(u, v), 0);
            }
        }
    }

    #[test]
    fn row_copy_when_src_stride_differs() {
        let w = 4;
        let h = 2;
        let src_bpl = 6;
        let mut src = vec![0u8; src_bpl * h];
        for v in 0..h {
            for u in 0..w {
                src[v * src_bpl + u] = (v * 10 + u) as u8;
            }
        }
        let img = AlignedImage::from_rows(&src, w, h, src_bpl);
        for v in 0..h {
            for u in 0..w {
                assert_eq!(img.get(u, v), (v * 10 + u) as u8);
            }
        }
    }
}
