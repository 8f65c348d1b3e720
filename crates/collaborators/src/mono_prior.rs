//! Monocular depth prior: post-processing and `.npy` persistence.
//!
//! Network inference is not part of this crate. [`IntensityDepthEstimator`]
//! turns image intensity into a raw prediction so the per-model
//! post-processing and the on-disk layout can run end to end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use contracts::{ContractError, DepthEstimator, DepthMap, DepthModel, FrameRecord, MonoPriorConfig};
use tracing::{debug, info};

const INVERSE_DEPTH_EPS: f32 = 1e-6;

/// Apply the per-model output normalization
///
/// - Omnidata: clamp to `[0, 1]`
/// - Depth Anything V2: invert (network outputs inverse depth), then
///   min-max normalize to `[0, 1]`
pub fn postprocess(model: DepthModel, mut map: DepthMap) -> DepthMap {
    match model {
        DepthModel::Omnidata => {
            for value in &mut map.data {
                *value = value.clamp(0.0, 1.0);
            }
        }
        DepthModel::DepthAnythingV2 => {
            for value in &mut map.data {
                *value = 1.0 / value.max(INVERSE_DEPTH_EPS);
            }
            let (min, max) = map
                .data
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(*v), hi.max(*v))
                });
            let range = max - min;
            for value in &mut map.data {
                *value = if range > 0.0 { (*value - min) / range } else { 0.0 };
            }
        }
    }
    map
}

/// `{output}/{scene}/mono_priors/depths/{idx:05}.npy`
pub fn prior_path(scene_dir: &Path, video_index: u64) -> PathBuf {
    scene_dir
        .join("mono_priors")
        .join("depths")
        .join(format!("{video_index:05}.npy"))
}

/// Serialize a depth map as NPY v1.0, little-endian `f32`, shape `(H, W)`
pub fn encode_npy(map: &DepthMap) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        map.height, map.width
    );
    // magic(6) + version(2) + header_len(2) + header, padded to 64 with '\n' last
    let unpadded = 10 + header.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + map.data.len() * 4);
    out.extend_from_slice(b"\x93NUMPY");
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in &map.data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Stand-in estimator deriving a raw prediction from pixel intensity
///
/// Expects one byte per pixel, `width * height` bytes.
#[derive(Debug)]
pub struct IntensityDepthEstimator {
    model: DepthModel,
    width: u32,
    height: u32,
    checkpoint: Option<PathBuf>,
}

impl IntensityDepthEstimator {
    pub fn new(model: DepthModel, width: u32, height: u32) -> Self {
        Self {
            model,
            width,
            height,
            checkpoint: None,
        }
    }

    pub fn checkpoint(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }
}

impl DepthEstimator for IntensityDepthEstimator {
    fn model(&self) -> DepthModel {
        self.model
    }

    fn load(&mut self, checkpoint: &Path) -> Result<(), ContractError> {
        if !checkpoint.is_file() {
            return Err(ContractError::collaborator(
                format!("{} depth estimator", self.model),
                format!("checkpoint not found: {}", checkpoint.display()),
            ));
        }
        self.checkpoint = Some(checkpoint.to_path_buf());
        let (w, h) = self.model.input_size();
        info!(model = %self.model, input = %format!("{w}x{h}"), "Depth estimator loaded");
        Ok(())
    }

    fn predict(&mut self, frame: &FrameRecord) -> Result<DepthMap, ContractError> {
        if self.checkpoint.is_none() {
            return Err(ContractError::collaborator(
                format!("{} depth estimator", self.model),
                "predict called before load",
            ));
        }
        let pixels = self.width as usize * self.height as usize;
        if frame.image.len() != pixels {
            return Err(ContractError::collaborator(
                format!("{} depth estimator", self.model),
                format!(
                    "expected {pixels} bytes for {}x{}, got {}",
                    self.width,
                    self.height,
                    frame.image.len()
                ),
            ));
        }
        let raw = DepthMap {
            width: self.width,
            height: self.height,
            data: frame.image.iter().map(|&b| f32::from(b) / 255.0).collect(),
        };
        Ok(postprocess(self.model, raw))
    }
}

/// Build the estimator for a `[mono_prior]` section and load its checkpoint
pub fn load_estimator(
    config: &MonoPriorConfig,
    width: u32,
    height: u32,
) -> Result<Box<dyn DepthEstimator + Send>, ContractError> {
    let mut estimator: Box<dyn DepthEstimator + Send> = match config.depth {
        DepthModel::Omnidata | DepthModel::DepthAnythingV2 => {
            Box::new(IntensityDepthEstimator::new(config.depth, width, height))
        }
    };
    estimator.load(&config.depth_pretrained)?;
    Ok(estimator)
}

/// Predicts and persists one prior per admitted keyframe
pub struct MonoPriorWriter {
    estimator: Box<dyn DepthEstimator + Send>,
    scene_dir: PathBuf,
    written: u64,
}

impl MonoPriorWriter {
    /// Create the output directory
    pub fn new(
        estimator: Box<dyn DepthEstimator + Send>,
        scene_dir: impl Into<PathBuf>,
    ) -> Result<Self, ContractError> {
        let scene_dir = scene_dir.into();
        fs::create_dir_all(scene_dir.join("mono_priors").join("depths"))?;
        Ok(Self {
            estimator,
            scene_dir,
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write(
        &mut self,
        video_index: u64,
        frame: &FrameRecord,
    ) -> Result<PathBuf, ContractError> {
        let map = self.estimator.predict(frame)?;
        let path = prior_path(&self.scene_dir, video_index);
        let mut file = fs::File::create(&path)?;
        file.write_all(&encode_npy(&map))?;
        self.written += 1;
        debug!(video_index, path = %path.display(), "Depth prior written");
        Ok(path)
    }
}
