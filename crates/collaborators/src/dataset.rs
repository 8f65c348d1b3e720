//! Frame sources.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{ContractError, Dataset, FrameRecord, Intrinsics};
use tracing::debug;

/// Parameters of a [`SyntheticDataset`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticDatasetConfig {
    pub frames: usize,
    pub fps: f64,
    /// Intensity change per frame; the gate sees this as motion
    pub motion_per_frame: f64,
    pub width: u32,
    pub height: u32,
    pub intrinsics: Intrinsics,
}

impl Default for SyntheticDatasetConfig {
    fn default() -> Self {
        Self {
            frames: 300,
            fps: 30.0,
            motion_per_frame: 1.5,
            width: 64,
            height: 48,
            intrinsics: Intrinsics::new(600.0, 600.0, 32.0, 24.0),
        }
    }
}

/// Deterministic stream of uniform images
///
/// Intensity follows a triangle wave over the cumulative motion, so
/// consecutive frames differ by `motion_per_frame` except at the turns.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    config: SyntheticDatasetConfig,
}

impl SyntheticDataset {
    pub fn new(config: SyntheticDatasetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyntheticDatasetConfig {
        &self.config
    }

    fn intensity(&self, index: usize) -> u8 {
        let travelled = (index as f64 * self.config.motion_per_frame).rem_euclid(510.0);
        let value = if travelled > 255.0 {
            510.0 - travelled
        } else {
            travelled
        };
        value.round().clamp(0.0, 255.0) as u8
    }
}

impl Dataset for SyntheticDataset {
    fn len(&self) -> usize {
        self.config.frames
    }

    fn get(&self, index: usize) -> Result<FrameRecord, ContractError> {
        if index >= self.config.frames {
            return Err(ContractError::Dataset {
                index,
                message: format!("out of range (len {})", self.config.frames),
            });
        }
        let pixels = self.config.width as usize * self.config.height as usize;
        Ok(FrameRecord {
            index,
            timestamp: index as f64 / self.config.fps,
            image: Bytes::from(vec![self.intensity(index); pixels]),
            intrinsics: self.config.intrinsics,
        })
    }

    fn intrinsics(&self) -> Intrinsics {
        self.config.intrinsics
    }
}

/// TUM-style listing: one `timestamp path` pair per line
///
/// `#` starts a comment line. Paths are relative to the listing file.
/// Images are read when the frame is requested.
#[derive(Debug, Clone)]
pub struct ListingDataset {
    entries: Vec<(f64, PathBuf)>,
    intrinsics: Intrinsics,
}

impl ListingDataset {
    /// Sibling file holding `fx fy cx cy`
    pub const INTRINSICS_FILE: &'static str = "intrinsics.txt";

    /// Open a listing
    ///
    /// Without explicit `intrinsics`, reads [`Self::INTRINSICS_FILE`] next
    /// to the listing.
    pub fn open(listing: &Path, intrinsics: Option<Intrinsics>) -> Result<Self, ContractError> {
        let base = listing.parent().unwrap_or_else(|| Path::new("."));
        let content = fs::read_to_string(listing)?;
        let entries = parse_listing(&content, base)?;

        let intrinsics = match intrinsics {
            Some(intrinsics) => intrinsics,
            None => read_intrinsics(&base.join(Self::INTRINSICS_FILE))?,
        };

        debug!(
            listing = %listing.display(),
            frames = entries.len(),
            "Listing dataset opened"
        );
        Ok(Self {
            entries,
            intrinsics,
        })
    }

    /// Timestamp and image path of one frame
    pub fn entry(&self, index: usize) -> Option<(f64, &Path)> {
        self.entries
            .get(index)
            .map(|(timestamp, path)| (*timestamp, path.as_path()))
    }
}

fn parse_listing(content: &str, base: &Path) -> Result<Vec<(f64, PathBuf)>, ContractError> {
    let mut entries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(timestamp), Some(path)) = (parts.next(), parts.next()) else {
            return Err(ContractError::config_parse(format!(
                "listing line {}: expected 'timestamp path'",
                line_no + 1
            )));
        };
        let timestamp: f64 = timestamp.parse().map_err(|e| {
            ContractError::config_parse(format!("listing line {}: bad timestamp: {e}", line_no + 1))
        })?;
        entries.push((timestamp, base.join(path)));
    }
    Ok(entries)
}

fn read_intrinsics(path: &Path) -> Result<Intrinsics, ContractError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ContractError::config_parse(format!("cannot read intrinsics {}: {e}", path.display()))
    })?;
    let values = content
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ContractError::config_parse(format!("bad intrinsics value: {e}")))?;
    match values.as_slice() {
        [fx, fy, cx, cy] => Ok(Intrinsics::new(*fx, *fy, *cx, *cy)),
        other => Err(ContractError::config_parse(format!(
            "intrinsics need 4 values (fx fy cx cy), got {}",
            other.len()
        ))),
    }
}

impl Dataset for ListingDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Result<FrameRecord, ContractError> {
        let (timestamp, path) = self.entries.get(index).ok_or_else(|| ContractError::Dataset {
            index,
            message: format!("out of range (len {})", self.entries.len()),
        })?;
        let image = fs::read(path).map_err(|e| ContractError::Dataset {
            index,
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(FrameRecord {
            index,
            timestamp: *timestamp,
            image: Bytes::from(image),
            intrinsics: self.intrinsics,
        })
    }

    fn intrinsics(&self) -> Intrinsics {
        self.intrinsics
    }
}
