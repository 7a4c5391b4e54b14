use serde::{Deserialize, Serialize};

use crate::fillet::{FilletMode, FilletParams};
use crate::teardrop::TeardropParams;

/// Every knob of a smoothing run, as read from a JSON settings object.
///
/// Missing keys take their defaults. The legacy single-word lowercase spellings of the flags
/// (`nofillet`, `noteardrops`, ...) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmoothingParams {
    pub radius: f64,
    pub radius_width_multiplier: f64,
    pub max_radius: f64,
    /// Degrees.
    pub min_angle: f64,
    pub min_length: f64,
    pub passes: u32,
    pub teardrop_length: f64,
    pub teardrop_width: f64,
    pub teardrop_segs: usize,
    pub teardrop_max_chain: usize,
    pub fillet_mode: FilletMode,
    #[serde(alias = "smoothnway")]
    pub smooth_n_way: bool,
    #[serde(alias = "nosubdivide")]
    pub no_subdivide: bool,
    #[serde(alias = "nofillet")]
    pub no_fillet: bool,
    #[serde(alias = "noteardrops")]
    pub no_teardrops: bool,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            radius: 5.0,
            radius_width_multiplier: 0.5,
            max_radius: 100.0,
            min_angle: 5.0,
            min_length: 2.5,
            passes: 3,
            teardrop_length: 50.0,
            teardrop_width: 90.0,
            teardrop_segs: 10,
            teardrop_max_chain: 1,
            fillet_mode: FilletMode::Arc,
            smooth_n_way: false,
            no_subdivide: false,
            no_fillet: false,
            no_teardrops: false,
        }
    }
}

/// Inputs of the corner-rounding (subdivision) pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundingParams {
    pub radius: f64,
    pub radius_width_multiplier: f64,
    pub max_radius: f64,
    pub min_angle: f64,
    pub min_length: f64,
    pub passes: u32,
    pub smooth_n_way: bool,
}

impl SmoothingParams {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn with_fillet_mode(mut self, mode: FilletMode) -> Self {
        self.fillet_mode = mode;
        self
    }

    pub fn fillet_params(&self) -> FilletParams {
        FilletParams {
            min_angle: self.min_angle,
            min_length: self.min_length,
            mode: self.fillet_mode,
        }
    }

    pub fn teardrop_params(&self) -> TeardropParams {
        TeardropParams {
            length_percent: self.teardrop_length,
            width_percent: self.teardrop_width,
            segments: self.teardrop_segs,
            max_chain: self.teardrop_max_chain,
        }
    }

    pub fn rounding_params(&self) -> RoundingParams {
        RoundingParams {
            radius: self.radius,
            radius_width_multiplier: self.radius_width_multiplier,
            max_radius: self.max_radius,
            min_angle: self.min_angle,
            min_length: self.min_length,
            passes: self.passes,
            smooth_n_way: self.smooth_n_way,
        }
    }
}
