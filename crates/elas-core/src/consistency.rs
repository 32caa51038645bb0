//! C8: left-right consistency check.

use crate::params::Parameters;
use crate::sentinel::Disparity;

/// Invalidate any pixel in `d1`/`d2` whose cross-warped disparity in the
/// other view disagrees by more than `params.lr_threshold`, or whose warp
/// lands outside the image. Operates in place; both buffers must already
/// be sized `width*height` (or the subsampled half-resolution size).
pub fn left_right_consistency_check(params: &Parameters, width: i32, height: i32, d1: &mut [f32], d2: &mut [f32]) {
    let src1 = d1.to_vec();
    let src2 = d2.to_vec();

    let (w, h) = if params.subsampling {
        (width / 2, height / 2)
    } else {
        (width, height)
    };

    for v in 0..h {
        for u in 0..w {
            let idx = (v * w + u) as usize;

            let cur1 = Disparity::from_sentinel(src1[idx]);
            if let Disparity::Valid(d1_val) = cur1 {
                let u_warp = if params.subsampling {
                    u - (d1_val / 2.0) as i32
                } else {
                    u - d1_val as i32
                };
                let ok = u_warp >= 0
                    && u_warp < w
                    && match Disparity::from_sentinel(src2[(v * w + u_warp) as usize]) {
                        Disparity::Valid(d2_val) => (d2_val - d1_val).abs() <= params.lr_threshold as f32,
                        _ => false,
                    };
                if !ok {
                    d1[idx] = Disparity::Filtered.to_sentinel();
                }
            }

            let cur2 = Disparity::from_sentinel(src2[idx]);
            if let Disparity::Valid(d2_val) = cur2 {
                let u_warp = if params.subsampling {
                    u + (d2_val / 2.0) as i32
                } else {
                    u + d2_val as i32
                };
                let ok = u_warp >= 0
                    && u_warp < w
                    && match Disparity::from_sentinel(src1[(v * w + u_warp) as usize]) {
                        Disparity::Valid(d1_val) => (d1_val - d2_val).abs() <= params.lr_threshold as f32,
                        _ => false,
                    };
                if !ok {
                    d2[idx] = Disparity::Filtered.to_sentinel();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Setting;

    #[test]
    fn agreeing_pair_survives() {
        let params = Parameters::new(Setting::Robotics);
        let w = 10;
        let h = 1;
        let mut d1 = vec![Disparity::Filtered.to_sentinel(); (w * h) as usize];
        let mut d2 = vec![Disparity::Filtered.to_sentinel(); (w * h) as usize];
        d1[5] = 3.0;
        d2[2] = 3.0; // u_warp for d1 at u=5 is 5-3=2
        left_right_consistency_check(&params, w, h, &mut d1, &mut d2);
        assert_eq!(Disparity::from_sentinel(d1[5]), Disparity::Valid(3.0));
    }

    #[test]
    fn disagreeing_pair_is_filtered() {
        let params = Parameters::new(Setting::Robotics);
        let w = 10;
        let h = 1;
        let mut d1 = vec![Disparity::Filtered.to_sentinel(); (w * h) as usize];
        let mut d2 = vec![Disparity::Filtered.to_sentinel(); (w * h) as usize];
        d1[5] = 3.0;
        d2[2] = 9.0; // disagrees well beyond lr_threshold
        left_right_consistency_check(&params, w, h, &mut d1, &mut d2);
        assert_eq!(Disparity::from_sentinel(d1[5]), Disparity::Filtered);
    }

    #[test]
    fn out_of_range_warp_is_filtered() {
        let params = Parameters::new(Setting::Robotics);
        let w = 10;
        let h = 1;
        let mut d1 = vec![Disparity::Filtered.to_sentinel(); (w * h) as usize];
        let mut d2 = vec![Disparity::Filtered.to_sentinel(); (w * h) as usize];
        d1[1] = 9.0; // u_warp = 1-9 = -8, out of range
        left_right_consistency_check(&params, w, h, &mut d1, &mut d2);
        assert_eq!(Disparity::from_sentinel(d1[1]), Disparity::Filtered);
    }
}
