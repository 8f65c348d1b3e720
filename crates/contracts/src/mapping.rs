//! MappingBackend trait - mapper-side work interface

use crate::{ContractError, KeyframeEntry};

/// Mapping work triggered by tracker requests
///
/// Implementations run inside the mapper process; the service acknowledges
/// a request only after the corresponding call returned.
#[trait_variant::make(MappingBackend: Send)]
pub trait LocalMappingBackend {
    /// Backend name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Map a confirmed keyframe
    async fn map_keyframe(&mut self, entry: KeyframeEntry) -> Result<(), ContractError>;

    /// Refine a keyframe using its older and newer neighbours
    async fn gap_track(&mut self, entry: KeyframeEntry) -> Result<(), ContractError>;

    /// Tracker finished; flush whatever remains
    async fn finish(&mut self) -> Result<(), ContractError>;
}
