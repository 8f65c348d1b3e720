//! Monocular depth prior contracts.
//!
//! The estimator kind is a closed set; unknown names are rejected while the
//! configuration is parsed, never at first use.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ContractError, FrameRecord};

/// Supported depth estimators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthModel {
    /// DPT hybrid trained on Omnidata; outputs normalized depth
    #[serde(rename = "omnidata")]
    Omnidata,
    /// Depth Anything V2 (ViT-L); outputs relative inverse depth
    #[serde(rename = "anydepth_v2")]
    DepthAnythingV2,
}

impl DepthModel {
    pub const ALL: [DepthModel; 2] = [DepthModel::Omnidata, DepthModel::DepthAnythingV2];

    /// Configuration name
    pub fn name(self) -> &'static str {
        match self {
            DepthModel::Omnidata => "omnidata",
            DepthModel::DepthAnythingV2 => "anydepth_v2",
        }
    }

    /// Network input resolution `(width, height)`
    pub fn input_size(self) -> (u32, u32) {
        match self {
            DepthModel::Omnidata => (512, 512),
            DepthModel::DepthAnythingV2 => (518, 518),
        }
    }

    /// Whether the raw network output is inverse depth
    pub fn predicts_inverse_depth(self) -> bool {
        matches!(self, DepthModel::DepthAnythingV2)
    }
}

impl fmt::Display for DepthModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DepthModel {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DepthModel::ALL
            .into_iter()
            .find(|model| model.name() == s)
            .ok_or_else(|| ContractError::unsupported("depth model", s))
    }
}

/// `[mono_prior]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonoPriorConfig {
    /// Estimator kind
    pub depth: DepthModel,

    /// Checkpoint path
    pub depth_pretrained: PathBuf,
}

/// Dense depth prediction, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

/// Load/predict capability shared by every estimator kind
pub trait DepthEstimator {
    fn model(&self) -> DepthModel;

    /// Load weights from a checkpoint
    fn load(&mut self, checkpoint: &Path) -> Result<(), ContractError>;

    /// Predict a normalized depth map for one frame
    fn predict(&mut self, frame: &FrameRecord) -> Result<DepthMap, ContractError>;
}
