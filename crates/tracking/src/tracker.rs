//! Per-frame control loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use contracts::{
    Acknowledgement, ContractError, Dataset, FrameRecord, GlobalRefiner, HandshakeChannel,
    HandshakeMessage, KeyframeEntry, LocalRefiner, MotionGate, TrackerConfig,
};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::buffer::{KeyframeBuffer, KEYFRAME_BUFFER_CAPACITY};
use crate::scheduler::{GlobalBaScheduler, GLOBAL_BA_WINDOW};
use crate::{Dispatch, Stage, TrackingError, TrackingStats};

/// Frames between two `info` progress events
pub const PROGRESS_LOG_INTERVAL: usize = 100;

/// External collaborators driven by the loop
#[derive(Debug)]
pub struct Collaborators<G, F, B> {
    pub motion_gate: G,
    pub frontend: F,
    pub backend: B,
}

impl<G, F, B> Collaborators<G, F, B> {
    pub fn new(motion_gate: G, frontend: F, backend: B) -> Self {
        Self {
            motion_gate,
            frontend,
            backend,
        }
    }
}

/// Tracker control loop
///
/// Owns every counter of the coordination protocol. One instance per run;
/// collaborators are called synchronously, the only suspension points are
/// the handshake send / acknowledgement wait.
#[derive(Debug)]
pub struct TrackingLoop<G, F, B, C> {
    config: TrackerConfig,
    collaborators: Collaborators<G, F, B>,
    channel: C,
    buffer: KeyframeBuffer,
    scheduler: GlobalBaScheduler,
    /// Last observed `video_counter - 1`; may be -1 before the first keyframe
    prev_kf_index: i64,
    keyframe_count: u64,
    /// Clear-init handshake already sent
    initialized: bool,
    /// Timestamp of the first processed frame
    stream_origin: Option<f64>,
    stats: TrackingStats,
}

impl<G, F, B, C> TrackingLoop<G, F, B, C>
where
    G: MotionGate,
    F: LocalRefiner,
    B: GlobalRefiner,
    C: HandshakeChannel,
{
    /// Create a loop for one run
    ///
    /// # Errors
    /// `every_keyframe == 0` or `ba_freq == 0`.
    pub fn new(
        config: TrackerConfig,
        collaborators: Collaborators<G, F, B>,
        channel: C,
    ) -> Result<Self, TrackingError> {
        if config.every_keyframe == 0 {
            return Err(TrackingError::Config(ContractError::config_validation(
                "mapping.every_keyframe",
                "must be >= 1",
            )));
        }
        if config.ba_freq == 0 {
            return Err(TrackingError::Config(ContractError::config_validation(
                "tracking.backend.ba_freq",
                "must be >= 1",
            )));
        }

        let scheduler = GlobalBaScheduler::new(config.enable_online_ba, config.ba_freq);
        Ok(Self {
            config,
            collaborators,
            channel,
            buffer: KeyframeBuffer::new(),
            scheduler,
            prev_kf_index: 0,
            keyframe_count: 0,
            initialized: false,
            stream_origin: None,
            stats: TrackingStats::default(),
        })
    }

    /// Drive the whole dataset, then send the terminal message
    ///
    /// # Errors
    /// The first collaborator, dataset or channel failure aborts the run;
    /// no terminal message is sent in that case.
    pub async fn run<D>(&mut self, dataset: &D) -> Result<TrackingStats, TrackingError>
    where
        D: Dataset + ?Sized,
    {
        self.run_until(dataset, &AtomicBool::new(false)).await
    }

    /// Like [`run`](Self::run), but stops early once `stop` is raised
    ///
    /// `stop` is only checked between frames, so every handshake of the
    /// current frame completes before the terminal message goes out.
    #[instrument(name = "tracking_run", skip(self, dataset, stop), fields(frames = dataset.len()))]
    pub async fn run_until<D>(
        &mut self,
        dataset: &D,
        stop: &AtomicBool,
    ) -> Result<TrackingStats, TrackingError>
    where
        D: Dataset + ?Sized,
    {
        let total = dataset.len();
        info!(
            total,
            only_tracking = self.config.only_tracking,
            clear_init = self.config.clear_init,
            every_keyframe = self.config.every_keyframe,
            "Tracking started"
        );

        for index in 0..total {
            if stop.load(Ordering::SeqCst) {
                warn!(frame = index, total, "Stop requested, leaving the tracking loop");
                self.stats.stopped_early = true;
                break;
            }

            let frame = dataset.get(index).map_err(TrackingError::Dataset)?;

            if let Err(e) = self.process_frame(&frame).await {
                error!(frame = index, error = %e, "Tracking aborted");
                return Err(e);
            }

            debug!(frame = index, total, "Frame processed");
            if (index + 1) % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    frame = index + 1,
                    total,
                    keyframes = self.keyframe_count,
                    "Tracking progress"
                );
            }
        }

        self.finish().await;

        info!(
            frames = self.stats.frames_processed,
            keyframes = self.stats.keyframes,
            "Tracking finished"
        );
        Ok(self.stats.clone())
    }

    /// One control cycle for one frame
    #[instrument(name = "tracking_step", skip(self, frame), fields(frame = frame.index))]
    pub async fn process_frame(&mut self, frame: &FrameRecord) -> Result<(), TrackingError> {
        let origin = *self.stream_origin.get_or_insert(frame.timestamp);

        self.collaborators
            .motion_gate
            .track(frame)
            .map_err(|e| TrackingError::collaborator(Stage::MotionGate, frame.index, e))?;
        self.collaborators
            .frontend
            .step()
            .map_err(|e| TrackingError::collaborator(Stage::LocalRefiner, frame.index, e))?;

        let curr_kf_index = self.collaborators.frontend.video_counter() as i64 - 1;

        if curr_kf_index != self.prev_kf_index && self.collaborators.frontend.is_initialized() {
            let video_index = u64::try_from(curr_kf_index).map_err(|_| {
                TrackingError::invariant(format!(
                    "negative keyframe index {curr_kf_index} at frame {}",
                    frame.index
                ))
            })?;
            let entry = KeyframeEntry::new(video_index, frame.timestamp);
            self.on_new_keyframe(entry, origin, frame.index).await?;
        }

        self.prev_kf_index = curr_kf_index;
        self.stats.frames_processed += 1;
        observability::record_frame();
        Ok(())
    }

    /// Send the terminal message (best-effort, no acknowledgement)
    ///
    /// Does nothing in tracking-only mode or when already sent.
    pub async fn finish(&mut self) {
        if self.config.only_tracking || self.stats.shutdown_sent {
            return;
        }

        match self.channel.send(HandshakeMessage::shutdown()).await {
            Ok(()) => {
                self.stats.shutdown_sent = true;
                self.stats.handshakes.update(Dispatch::Shutdown.as_str(), None);
                observability::record_handshake(Dispatch::Shutdown.as_str(), None);
                info!("Shutdown sent to mapper");
            }
            Err(e) => warn!(error = %e, "Failed to send shutdown to mapper"),
        }
    }

    /// Steps 5-8: buffer, global BA, notification, gap dispatch
    async fn on_new_keyframe(
        &mut self,
        entry: KeyframeEntry,
        origin: f64,
        frame: usize,
    ) -> Result<(), TrackingError> {
        self.keyframe_count += 1;
        self.stats.keyframes += 1;
        observability::record_keyframe(entry.video_index);

        let evicted = self.buffer.append(entry);
        if let Some(old) = evicted {
            self.stats.buffer_evictions += 1;
            trace!(video_index = old.video_index, "Keyframe left the buffer");
        }

        if self.scheduler.is_due(entry.video_index) {
            info!(
                video_index = entry.video_index,
                timestamp = entry.timestamp,
                "Online BA"
            );
            self.collaborators
                .backend
                .dense_ba(GLOBAL_BA_WINDOW)
                .map_err(|e| TrackingError::collaborator(Stage::GlobalRefiner, frame, e))?;
            self.scheduler.record_run(entry.video_index);
            self.stats.global_ba_runs += 1;
            observability::record_global_ba(entry.video_index);
        }

        if !self.config.only_tracking && self.keyframe_count % self.config.every_keyframe == 0 {
            if self.config.clear_init && !self.initialized {
                let first = KeyframeEntry::new(0, origin);
                self.round_trip(Dispatch::Init, HandshakeMessage::keyframe(first))
                    .await?;
                self.initialized = true;
                self.stats.init_sent = true;
                // the synthetic dispatch replaces the oldest pending entry,
                // unless this append already pushed one out
                if evicted.is_none() {
                    self.buffer.pop_front();
                }
            } else {
                self.round_trip(Dispatch::Map, HandshakeMessage::keyframe(entry))
                    .await?;
            }
        }

        if self.buffer.len() > KEYFRAME_BUFFER_CAPACITY {
            return Err(TrackingError::invariant(format!(
                "keyframe buffer holds {} entries",
                self.buffer.len()
            )));
        }

        if !self.config.only_tracking && self.buffer.len() == KEYFRAME_BUFFER_CAPACITY {
            let middle = self.buffer.peek(1).ok_or_else(|| {
                TrackingError::invariant("full keyframe buffer without middle entry")
            })?;
            debug!(video_index = middle.video_index, "Gap tracking");
            self.round_trip(Dispatch::Gap, HandshakeMessage::gap(middle))
                .await?;
        }

        observability::record_buffer_depth(self.buffer.len());
        Ok(())
    }

    /// Send, then block for the acknowledgement
    #[instrument(
        name = "handshake",
        skip_all,
        fields(kind = %kind, video_index = ?message.video_index)
    )]
    async fn round_trip(
        &mut self,
        kind: Dispatch,
        message: HandshakeMessage,
    ) -> Result<Acknowledgement, TrackingError> {
        let started = Instant::now();

        self.channel
            .send(message)
            .await
            .map_err(|source| TrackingError::Channel { kind, source })?;

        let ack = match self.config.ack_timeout {
            Some(limit) => tokio::time::timeout(limit, self.channel.receive_ack())
                .await
                .map_err(|_| TrackingError::AckTimeout {
                    kind,
                    video_index: message.video_index,
                    waited_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })?,
            None => self.channel.receive_ack().await,
        }
        .map_err(|source| TrackingError::Channel { kind, source })?;

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats.handshakes.update(kind.as_str(), Some(latency_ms));
        observability::record_handshake(kind.as_str(), Some(latency_ms));

        if kind != Dispatch::Gap {
            info!(
                kind = %kind,
                video_index = ?message.video_index,
                sequence = ack.sequence,
                "Mapper acknowledged"
            );
        }
        Ok(ack)
    }

    /// Snapshot of the run statistics
    pub fn stats(&self) -> &TrackingStats {
        &self.stats
    }

    pub fn buffer(&self) -> &KeyframeBuffer {
        &self.buffer
    }

    pub fn scheduler(&self) -> &GlobalBaScheduler {
        &self.scheduler
    }

    /// Confirmed keyframes so far
    pub fn keyframe_count(&self) -> u64 {
        self.keyframe_count
    }

    pub fn collaborators(&self) -> &Collaborators<G, F, B> {
        &self.collaborators
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn into_parts(self) -> (Collaborators<G, F, B>, C) {
        (self.collaborators, self.channel)
    }
}
