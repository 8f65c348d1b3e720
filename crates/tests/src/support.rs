//! Scripted collaborators shared by the integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    ContractError, Dataset, FrameRecord, GlobalRefiner, HandshakeChannel, Intrinsics,
    KeyframeEntry, LocalRefiner, MappingBackend, MotionGate, TrackerConfig,
};
use mapper::{MapperError, MapperReport, MapperService, RecordingBackend, RequestLog};
use tracking::{Collaborators, TrackingError, TrackingLoop, TrackingStats};

/// Gate that accepts every frame
#[derive(Debug, Default)]
pub struct PassGate;

impl MotionGate for PassGate {
    fn track(&mut self, _frame: &FrameRecord) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Gate that raises a stop flag while tracking frame `at`
#[derive(Debug)]
pub struct StopAtGate {
    pub stop: Arc<AtomicBool>,
    pub at: usize,
}

impl MotionGate for StopAtGate {
    fn track(&mut self, frame: &FrameRecord) -> Result<(), ContractError> {
        if frame.index == self.at {
            self.stop.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Frontend replaying a fixed keyframe schedule
///
/// Keyframe 0 is in the store from the start; `video_counter` becomes
/// `index + 1` on the frame that confirms keyframe `index`.
#[derive(Debug)]
pub struct ScriptedFrontend {
    /// `(frame, video_index)` pairs
    schedule: Vec<(usize, u64)>,
    /// Frame from which the frontend reports initialized
    init_frame: usize,
    frame: usize,
    counter: Arc<AtomicU64>,
}

impl ScriptedFrontend {
    pub fn keyframes_at(schedule: &[(usize, u64)]) -> Self {
        Self {
            schedule: schedule.to_vec(),
            init_frame: 0,
            frame: 0,
            counter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// One keyframe per listed index, on consecutive frames starting at 1
    pub fn confirming(indices: &[u64]) -> Self {
        let schedule: Vec<_> = indices
            .iter()
            .enumerate()
            .map(|(i, &index)| (i + 1, index))
            .collect();
        Self::keyframes_at(&schedule)
    }

    pub fn initialized_from(mut self, frame: usize) -> Self {
        self.init_frame = frame;
        self
    }

    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.counter)
    }
}

impl LocalRefiner for ScriptedFrontend {
    fn step(&mut self) -> Result<(), ContractError> {
        if let Some(&(_, index)) = self.schedule.iter().find(|(f, _)| *f == self.frame) {
            self.counter.store(index + 1, Ordering::SeqCst);
        }
        self.frame += 1;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        // `step` already advanced past the current frame
        self.frame > self.init_frame
    }

    fn video_counter(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

/// Records the newest keyframe index at each global BA
#[derive(Debug)]
pub struct BaRecorder {
    counter: Arc<AtomicU64>,
    pub runs: Vec<u64>,
    pub windows: Vec<usize>,
}

impl BaRecorder {
    pub fn new(counter: Arc<AtomicU64>) -> Self {
        Self {
            counter,
            runs: Vec::new(),
            windows: Vec::new(),
        }
    }
}

impl GlobalRefiner for BaRecorder {
    fn dense_ba(&mut self, window: usize) -> Result<(), ContractError> {
        self.runs
            .push(self.counter.load(Ordering::SeqCst).saturating_sub(1));
        self.windows.push(window);
        Ok(())
    }
}

/// Uniform frames at 10 Hz starting at t = 1.0
#[derive(Debug, Clone, Copy)]
pub struct StaticDataset {
    pub frames: usize,
}

impl StaticDataset {
    pub fn timestamp(index: usize) -> f64 {
        1.0 + index as f64 * 0.1
    }
}

impl Dataset for StaticDataset {
    fn len(&self) -> usize {
        self.frames
    }

    fn get(&self, index: usize) -> Result<FrameRecord, ContractError> {
        Ok(FrameRecord {
            index,
            timestamp: Self::timestamp(index),
            image: Bytes::from_static(&[0u8; 16]),
            intrinsics: self.intrinsics(),
        })
    }

    fn intrinsics(&self) -> Intrinsics {
        Intrinsics::new(500.0, 500.0, 320.0, 240.0)
    }
}

/// Backend that never finishes a map request
#[derive(Debug, Default)]
pub struct StallingBackend;

impl MappingBackend for StallingBackend {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn map_keyframe(&mut self, _entry: KeyframeEntry) -> Result<(), ContractError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn gap_track(&mut self, _entry: KeyframeEntry) -> Result<(), ContractError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

pub type ScriptedLoop<C> = TrackingLoop<PassGate, ScriptedFrontend, BaRecorder, C>;

pub fn tracker_config(every_keyframe: u64, clear_init: bool) -> TrackerConfig {
    TrackerConfig {
        enable_online_ba: false,
        ba_freq: 20,
        every_keyframe,
        clear_init,
        only_tracking: false,
        ack_timeout: None,
    }
}

pub fn scripted_loop<C: HandshakeChannel>(
    config: TrackerConfig,
    frontend: ScriptedFrontend,
    channel: C,
) -> ScriptedLoop<C> {
    let backend = BaRecorder::new(frontend.counter());
    TrackingLoop::new(config, Collaborators::new(PassGate, frontend, backend), channel)
        .expect("valid tracker config")
}

/// Outcome of one tracker ⇄ mapper session
pub struct Session<C> {
    pub tracker: ScriptedLoop<C>,
    pub tracked: Result<TrackingStats, TrackingError>,
    pub log: RequestLog,
    pub mapped: Result<MapperReport, MapperError>,
}

/// Run a full scripted session over the in-process link
pub async fn run_in_process(
    config: TrackerConfig,
    frontend: ScriptedFrontend,
    frames: usize,
) -> Session<handshake::TrackerLink> {
    let (tracker_link, mapper_link) = handshake::pair();
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mapper = MapperService::new(mapper_link, backend).spawn();

    let mut tracker = scripted_loop(config, frontend, tracker_link);
    let tracked = tracker.run(&StaticDataset { frames }).await;

    let mapped = if tracked.is_ok() && tracker.stats().shutdown_sent {
        mapper.join().await
    } else {
        mapper.abort();
        Err(MapperError::Join("tracker did not finish".to_string()))
    };

    Session {
        tracker,
        tracked,
        log,
        mapped,
    }
}
