//! The same sessions over TCP loopback, plus failure paths of the link.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use contracts::{MapperRequest, TrackerConfig, WireFormat};
use handshake::{MapperListener, TcpHandshake};
use mapper::{MapperService, RecordingBackend};
use tracking::{Collaborators, Dispatch, TrackingError, TrackingLoop};

use crate::support::{
    run_in_process, scripted_loop, tracker_config, BaRecorder, ScriptedFrontend,
    StallingBackend, StaticDataset, StopAtGate,
};

const SCHEDULE: [u64; 7] = [1, 2, 4, 5, 8, 9, 12];

async fn tcp_session(format: WireFormat, config: TrackerConfig) -> Vec<MapperRequest> {
    let listener = MapperListener::bind("127.0.0.1:0", format).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let backend = RecordingBackend::new();
    let log = backend.log();
    let mapper = tokio::spawn(async move {
        let endpoint = listener.accept().await.unwrap();
        MapperService::new(endpoint, backend).run().await
    });

    let channel = TcpHandshake::connect(addr, format).await.unwrap();
    let mut tracker = scripted_loop(config, ScriptedFrontend::confirming(&SCHEDULE), channel);
    let stats = tracker.run(&StaticDataset { frames: 10 }).await.unwrap();
    assert!(stats.shutdown_sent);

    let report = mapper.await.unwrap().unwrap();
    assert_eq!(report.mapped, stats.notifications());
    assert_eq!(report.gap_tracked, stats.gap_dispatches());
    log.requests()
}

#[tokio::test]
async fn test_tcp_json_matches_in_process() {
    let config = tracker_config(2, true);

    let local = run_in_process(config.clone(), ScriptedFrontend::confirming(&SCHEDULE), 10).await;
    local.tracked.unwrap();

    let remote = tcp_session(WireFormat::Json, config).await;
    assert_eq!(remote, local.log.requests());
}

#[tokio::test]
async fn test_tcp_bincode_matches_in_process() {
    let config = tracker_config(1, false);

    let local = run_in_process(config.clone(), ScriptedFrontend::confirming(&SCHEDULE), 10).await;
    local.tracked.unwrap();

    let remote = tcp_session(WireFormat::Bincode, config).await;
    assert_eq!(remote, local.log.requests());
    assert_eq!(remote.last(), Some(&MapperRequest::Shutdown));
}

#[tokio::test]
async fn test_mapper_disconnect_aborts_tracker() {
    let listener = MapperListener::bind("127.0.0.1:0", WireFormat::Json).await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept, then hang up without answering
    let mapper = tokio::spawn(async move {
        let endpoint = listener.accept().await.unwrap();
        drop(endpoint);
    });

    let channel = TcpHandshake::connect(addr, WireFormat::Json).await.unwrap();
    mapper.await.unwrap();

    let mut tracker = scripted_loop(
        tracker_config(1, false),
        ScriptedFrontend::confirming(&SCHEDULE),
        channel,
    );
    let err = tracker.run(&StaticDataset { frames: 10 }).await.unwrap_err();
    assert!(err.is_channel_failure(), "got {err:?}");
    assert!(!tracker.stats().shutdown_sent);
}

#[tokio::test]
async fn test_stalled_mapper_hits_ack_timeout() {
    let (tracker_link, mapper_link) = handshake::pair();
    let mapper = MapperService::new(mapper_link, StallingBackend).spawn();

    let config = TrackerConfig {
        ack_timeout: Some(Duration::from_millis(50)),
        ..tracker_config(1, false)
    };
    let mut tracker = scripted_loop(config, ScriptedFrontend::confirming(&SCHEDULE), tracker_link);
    let err = tracker.run(&StaticDataset { frames: 10 }).await.unwrap_err();

    match err {
        TrackingError::AckTimeout {
            kind,
            video_index,
            waited_ms,
        } => {
            assert_eq!(kind, Dispatch::Map);
            assert_eq!(video_index, Some(1));
            assert_eq!(waited_ms, 50);
        }
        other => panic!("expected ack timeout, got {other:?}"),
    }
    assert_eq!(tracker.stats().frames_processed, 1);
    mapper.abort();
}

#[tokio::test]
async fn test_stop_request_finishes_frame_before_shutdown() {
    let listener = MapperListener::bind("127.0.0.1:0", WireFormat::Bincode).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let backend = RecordingBackend::new();
    let log = backend.log();
    let mapper = tokio::spawn(async move {
        let endpoint = listener.accept().await.unwrap();
        MapperService::new(endpoint, backend).run().await
    });

    // Frame 4 confirms keyframe 5, which fills the buffer and triggers a gap
    let stop = Arc::new(AtomicBool::new(false));
    let gate = StopAtGate {
        stop: Arc::clone(&stop),
        at: 4,
    };
    let frontend = ScriptedFrontend::confirming(&SCHEDULE);
    let refiner = BaRecorder::new(frontend.counter());
    let channel = TcpHandshake::connect(addr, WireFormat::Bincode).await.unwrap();
    let mut tracker = TrackingLoop::new(
        tracker_config(1, false),
        Collaborators::new(gate, frontend, refiner),
        channel,
    )
    .unwrap();

    let stats = tracker
        .run_until(&StaticDataset { frames: 10 }, &stop)
        .await
        .unwrap();
    assert!(stats.stopped_early);
    assert!(stats.shutdown_sent);
    assert_eq!(stats.frames_processed, 5);

    // Every frame arrived whole: the mapper decodes all of them and stops cleanly
    let report = mapper.await.unwrap().unwrap();
    assert_eq!(log.mapped(), vec![1, 2, 4, 5]);
    assert_eq!(log.gap_tracked(), vec![2, 4]);
    assert_eq!(log.requests().last(), Some(&MapperRequest::Shutdown));
    assert_eq!(report.acknowledged, 6);
}
