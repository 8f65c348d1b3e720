//! LogBackend - logs every request via tracing

use contracts::{ContractError, KeyframeEntry, MappingBackend};
use tracing::{info, instrument};

/// Backend that only logs, for running the protocol without a map
pub struct LogBackend {
    name: String,
}

impl LogBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogBackend {
    fn default() -> Self {
        Self::new("log")
    }
}

impl MappingBackend for LogBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_backend_map", skip(self), fields(backend = %self.name))]
    async fn map_keyframe(&mut self, entry: KeyframeEntry) -> Result<(), ContractError> {
        info!(
            video_index = entry.video_index,
            timestamp = entry.timestamp,
            "Keyframe mapped"
        );
        Ok(())
    }

    #[instrument(name = "log_backend_gap", skip(self), fields(backend = %self.name))]
    async fn gap_track(&mut self, entry: KeyframeEntry) -> Result<(), ContractError> {
        info!(
            video_index = entry.video_index,
            timestamp = entry.timestamp,
            "Gap tracked"
        );
        Ok(())
    }

    #[instrument(name = "log_backend_finish", skip(self))]
    async fn finish(&mut self) -> Result<(), ContractError> {
        info!(backend = %self.name, "LogBackend finished");
        Ok(())
    }
}
