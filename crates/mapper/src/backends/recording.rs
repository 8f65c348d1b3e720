//! RecordingBackend - keeps every request in memory

use std::sync::{Arc, Mutex};

use contracts::{ContractError, KeyframeEntry, MapperRequest, MappingBackend};

/// Shared view of the requests a [`RecordingBackend`] received
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    inner: Arc<Mutex<Vec<MapperRequest>>>,
}

impl RequestLog {
    fn push(&self, request: MapperRequest) {
        // a poisoned log still holds every request pushed before the panic
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(request);
    }

    /// Requests in arrival order
    pub fn requests(&self) -> Vec<MapperRequest> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Video indices of `Map` requests
    pub fn mapped(&self) -> Vec<u64> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                MapperRequest::Map(entry) => Some(entry.video_index),
                _ => None,
            })
            .collect()
    }

    /// Video indices of `GapTrack` requests
    pub fn gap_tracked(&self) -> Vec<u64> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                MapperRequest::GapTrack(entry) => Some(entry.video_index),
                _ => None,
            })
            .collect()
    }
}

/// Backend that records requests, optionally failing on one video index
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: RequestLog,
    fail_on: Option<u64>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any request for `video_index`
    pub fn failing_on(video_index: u64) -> Self {
        Self {
            log: RequestLog::default(),
            fail_on: Some(video_index),
        }
    }

    pub fn log(&self) -> RequestLog {
        self.log.clone()
    }

    fn check(&self, entry: &KeyframeEntry) -> Result<(), ContractError> {
        if self.fail_on == Some(entry.video_index) {
            return Err(ContractError::collaborator(
                "recording backend",
                format!("injected failure at video index {}", entry.video_index),
            ));
        }
        Ok(())
    }
}

impl MappingBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn map_keyframe(&mut self, entry: KeyframeEntry) -> Result<(), ContractError> {
        self.check(&entry)?;
        self.log.push(MapperRequest::Map(entry));
        Ok(())
    }

    async fn gap_track(&mut self, entry: KeyframeEntry) -> Result<(), ContractError> {
        self.check(&entry)?;
        self.log.push(MapperRequest::GapTrack(entry));
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), ContractError> {
        self.log.push(MapperRequest::Shutdown);
        Ok(())
    }
}
