//! SlamConfig - Config Loader output
//!
//! Mirrors the layout of the tracker/mapper configuration file. Options the
//! control loop does not interpret (`frontend.window`, `motion_filter.thresh`,
//! `device`) are carried opaquely and handed to collaborators.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::MonoPriorConfig;

/// Complete configuration for one tracker/mapper run
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SlamConfig {
    /// Send a synthetic handshake for the first stream frame on the first notification
    #[serde(default)]
    pub clear_init: bool,

    /// Disable every mapper message, including shutdown
    #[serde(default)]
    pub only_tracking: bool,

    /// Compute device, passed opaquely to collaborators
    #[serde(default = "default_device")]
    pub device: String,

    /// Scene name (used for output paths)
    #[serde(default = "default_scene")]
    #[validate(length(min = 1))]
    pub scene: String,

    /// Tracking collaborators and scheduling
    #[validate(nested)]
    pub tracking: TrackingConfig,

    /// Mapper notification policy
    #[validate(nested)]
    pub mapping: MappingConfig,

    /// Transport settings
    #[serde(default)]
    #[validate(nested)]
    pub handshake: HandshakeConfig,

    /// Monocular depth prior (optional)
    #[serde(default)]
    pub mono_prior: Option<MonoPriorConfig>,

    /// Output locations
    #[serde(default)]
    pub data: DataConfig,
}

fn default_device() -> String {
    "cuda:0".to_string()
}

fn default_scene() -> String {
    "scene".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackingConfig {
    #[validate(nested)]
    pub frontend: FrontendConfig,

    #[validate(nested)]
    pub motion_filter: MotionFilterConfig,

    #[validate(nested)]
    pub backend: BackendConfig,
}

/// Local refiner settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FrontendConfig {
    /// Keyframes required before the frontend reports initialized
    #[validate(range(min = 1))]
    pub window: usize,

    /// Gate for the periodic global BA
    #[serde(default)]
    pub enable_online_ba: bool,

    /// Minimum motion a new keyframe must carry to survive local BA (0 disables deletion)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub keyframe_thresh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MotionFilterConfig {
    /// Motion required to admit a candidate keyframe
    #[validate(range(min = 0.0))]
    pub thresh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BackendConfig {
    /// Minimum keyframe-index distance between two global BA runs
    #[validate(range(min = 1))]
    pub ba_freq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MappingConfig {
    /// One mapper notification per this many confirmed keyframes
    #[validate(range(min = 1))]
    pub every_keyframe: u64,
}

/// Serialization format for the TCP link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Bincode => "bincode",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HandshakeConfig {
    /// Acknowledgement timeout in milliseconds (0 = wait forever)
    #[serde(default)]
    pub ack_timeout_ms: u64,

    /// Wire format for the TCP link
    #[serde(default)]
    pub format: WireFormat,

    /// Mapper listen address / tracker connect address
    #[serde(default = "default_address")]
    #[validate(length(min = 1))]
    pub address: String,
}

fn default_address() -> String {
    "127.0.0.1:7878".to_string()
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 0,
            format: WireFormat::Json,
            address: default_address(),
        }
    }
}

impl HandshakeConfig {
    pub fn ack_timeout(&self) -> Option<Duration> {
        (self.ack_timeout_ms > 0).then(|| Duration::from_millis(self.ack_timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory for run outputs
    pub output: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output"),
        }
    }
}

impl Default for SlamConfig {
    fn default() -> Self {
        Self {
            clear_init: false,
            only_tracking: false,
            device: default_device(),
            scene: default_scene(),
            tracking: TrackingConfig {
                frontend: FrontendConfig {
                    window: 25,
                    enable_online_ba: true,
                    keyframe_thresh: 0.0,
                },
                motion_filter: MotionFilterConfig { thresh: 4.0 },
                backend: BackendConfig { ba_freq: 20 },
            },
            mapping: MappingConfig { every_keyframe: 1 },
            handshake: HandshakeConfig::default(),
            mono_prior: None,
            data: DataConfig::default(),
        }
    }
}

/// Settings consumed by the tracking loop itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub enable_online_ba: bool,
    pub ba_freq: u64,
    pub every_keyframe: u64,
    pub clear_init: bool,
    pub only_tracking: bool,
    pub ack_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        SlamConfig::default().to_tracker_config()
    }
}

impl SlamConfig {
    /// Extract the control-loop settings
    pub fn to_tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            enable_online_ba: self.tracking.frontend.enable_online_ba,
            ba_freq: self.tracking.backend.ba_freq,
            every_keyframe: self.mapping.every_keyframe,
            clear_init: self.clear_init,
            only_tracking: self.only_tracking,
            ack_timeout: self.handshake.ack_timeout(),
        }
    }

    /// Output directory of this scene
    pub fn scene_output_dir(&self) -> PathBuf {
        self.data.output.join(&self.scene)
    }
}
