//! MapperService - receive, route to the backend, acknowledge

use std::fmt;
use std::sync::Arc;

use contracts::{
    Acknowledgement, ContractError, HandshakeKind, MapperEndpoint, MapperRequest, MappingBackend,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::MapperError;
use crate::metrics::{MapperMetrics, MetricsSnapshot};

/// Outcome of a completed mapper session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapperReport {
    pub mapped: u64,
    pub gap_tracked: u64,
    pub acknowledged: u64,
}

impl From<MetricsSnapshot> for MapperReport {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            mapped: snapshot.map_count,
            gap_tracked: snapshot.gap_count,
            acknowledged: snapshot.ack_count,
        }
    }
}

impl fmt::Display for MapperReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Mapper Summary ===")?;
        writeln!(f, "Keyframes mapped: {}", self.mapped)?;
        writeln!(f, "Gap tracking requests: {}", self.gap_tracked)?;
        writeln!(f, "Acknowledgements: {}", self.acknowledged)
    }
}

/// Mapper side of one tracker session
pub struct MapperService<E, B> {
    endpoint: E,
    backend: B,
    metrics: Arc<MapperMetrics>,
}

impl<E, B> MapperService<E, B>
where
    E: MapperEndpoint,
    B: MappingBackend,
{
    pub fn new(endpoint: E, backend: B) -> Self {
        Self {
            endpoint,
            backend,
            metrics: Arc::new(MapperMetrics::new()),
        }
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<MapperMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Serve until the terminal message
    ///
    /// Each non-terminal request is acknowledged only after the backend
    /// returned. A closed link without `end` is reported as
    /// [`MapperError::TrackerGone`].
    #[instrument(name = "mapper_service", skip(self), fields(backend = %self.backend.name()))]
    pub async fn run(mut self) -> Result<MapperReport, MapperError> {
        info!("Mapper service started");

        loop {
            let Some(message) = self
                .endpoint
                .receive()
                .await
                .map_err(MapperError::Channel)?
            else {
                let acknowledged = self.metrics.ack_count();
                error!(acknowledged, "Tracker disconnected without shutdown");
                return Err(MapperError::TrackerGone { acknowledged });
            };

            let kind = message.kind();
            let request = message.request().map_err(MapperError::Protocol)?;
            observability::record_mapper_request(kind.as_str());

            let result = match request {
                MapperRequest::Shutdown => {
                    self.backend
                        .finish()
                        .await
                        .map_err(|e| self.backend_failure(kind, e))?;
                    let report = MapperReport::from(self.metrics.snapshot());
                    info!(
                        mapped = report.mapped,
                        gap_tracked = report.gap_tracked,
                        "Tracker finished, mapper service stopped"
                    );
                    return Ok(report);
                }
                MapperRequest::Map(entry) => {
                    debug!(video_index = entry.video_index, "Map keyframe");
                    let result = self.backend.map_keyframe(entry).await;
                    if result.is_ok() {
                        self.metrics.inc_map_count();
                    }
                    result
                }
                MapperRequest::GapTrack(entry) => {
                    debug!(video_index = entry.video_index, "Gap tracking");
                    let result = self.backend.gap_track(entry).await;
                    if result.is_ok() {
                        self.metrics.inc_gap_count();
                    }
                    result
                }
            };
            result.map_err(|e| self.backend_failure(kind, e))?;

            let sequence = self.metrics.next_ack();
            self.endpoint
                .acknowledge(Acknowledgement { sequence })
                .await
                .map_err(MapperError::Channel)?;
        }
    }

    fn backend_failure(&self, kind: HandshakeKind, source: ContractError) -> MapperError {
        self.metrics.inc_failure_count();
        observability::record_backend_failure(self.backend.name());
        let err = MapperError::backend(self.backend.name(), kind, source);
        error!(error = %err, "Backend failed");
        err
    }
}

impl<E, B> MapperService<E, B>
where
    E: MapperEndpoint + Send + 'static,
    B: MappingBackend + Send + 'static,
{
    /// Run the service on its own task
    pub fn spawn(self) -> MapperHandle {
        let metrics = self.metrics();
        let task = tokio::spawn(self.run());
        MapperHandle { metrics, task }
    }
}

/// Handle to a spawned mapper service
pub struct MapperHandle {
    metrics: Arc<MapperMetrics>,
    task: JoinHandle<Result<MapperReport, MapperError>>,
}

impl MapperHandle {
    pub fn metrics(&self) -> &Arc<MapperMetrics> {
        &self.metrics
    }

    /// Wait for the service to stop
    pub async fn join(self) -> Result<MapperReport, MapperError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Mapper task did not complete");
                Err(MapperError::Join(e.to_string()))
            }
        }
    }

    /// Cancel the service
    pub fn abort(&self) {
        self.task.abort();
    }
}
