//! Parameter bundle and named presets.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named parameter presets, mirroring the two scenarios the original ELAS
/// ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Setting {
    /// Favours precision over completeness: no corner injection, small gap
    /// width, no dense disparities in half-occluded regions.
    Robotics,
    /// Favours completeness: corner injection on, large gap width, every
    /// pixel gets interpolated.
    Middlebury,
}

/// The full configuration bundle consumed by every pipeline stage.
///
/// Field meanings follow `spec.md` §3 exactly; defaults below reproduce the
/// two named presets from the original `elas.h` constructor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameters {
    pub disp_min: i32,
    pub disp_max: i32,
    pub support_threshold: f32,
    pub support_texture: i32,
    pub candidate_stepsize: i32,
    pub incon_window_size: i32,
    pub incon_threshold: i32,
    pub incon_min_support: i32,
    pub add_corners: bool,
    pub grid_size: i32,
    pub beta: f32,
    pub gamma: f32,
    pub sigma: f32,
    pub sradius: f32,
    pub match_texture: i32,
    pub lr_threshold: i32,
    pub speckle_sim_threshold: f32,
    pub speckle_size: i32,
    pub ipol_gap_width: i32,
    pub filter_median: bool,
    pub filter_adaptive_mean: bool,
    pub postprocess_only_left: bool,
    pub subsampling: bool,
}

impl Parameters {
    /// Build a parameter bundle from a named preset.
    pub fn new(setting: Setting) -> Self {
        match setting {
            Setting::Robotics => Self {
                disp_min: 0,
                disp_max: 255,
                support_threshold: 0.85,
                support_texture: 10,
                candidate_stepsize: 5,
                incon_window_size: 5,
                incon_threshold: 5,
                incon_min_support: 5,
                add_corners: false,
                grid_size: 20,
                beta: 0.02,
                gamma: 3.0,
                sigma: 1.0,
                sradius: 2.0,
                match_texture: 1,
                lr_threshold: 2,
                speckle_sim_threshold: 1.0,
                speckle_size: 200,
                ipol_gap_width: 3,
                filter_median: false,
                filter_adaptive_mean: true,
                postprocess_only_left: true,
                subsampling: false,
            },
            Setting::Middlebury => Self {
                disp_min: 0,
                disp_max: 255,
                support_threshold: 0.95,
                support_texture: 10,
                candidate_stepsize: 5,
                incon_window_size: 5,
                incon_threshold: 5,
                incon_min_support: 5,
                add_corners: true,
                grid_size: 20,
                beta: 0.02,
                gamma: 5.0,
                sigma: 1.0,
                sradius: 3.0,
                match_texture: 0,
                lr_threshold: 2,
                speckle_sim_threshold: 1.0,
                speckle_size: 200,
                ipol_gap_width: 5000,
                filter_median: true,
                filter_adaptive_mean: false,
                postprocess_only_left: false,
                subsampling: false,
            },
        }
    }
}

impl Default for Parameters {
    /// Defaults to the `Robotics` preset, matching `elas.h`'s default
    /// constructor argument.
    fn default() -> Self {
        Self::new(Setting::Robotics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robotics_favours_precision() {
        let p = Parameters::new(Setting::Robotics);
        assert!(!p.add_corners);
        assert_eq!(p.ipol_gap_width, 3);
        assert!(p.filter_adaptive_mean);
        assert!(!p.filter_median);
    }

    #[test]
    fn middlebury_favours_completeness() {
        let p = Parameters::new(Setting::Middlebury);
        assert!(p.add_corners);
        assert_eq!(p.ipol_gap_width, 5000);
        assert!(p.filter_median);
        assert!(!p.filter_adaptive_mean);
        assert!(!p.postprocess_only_left);
    }

    #[test]
    fn default_is_robotics() {
        assert_eq!(Parameters::default(), Parameters::new(Setting::Robotics));
    }
}
