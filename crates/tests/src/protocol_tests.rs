//! Protocol properties over the in-process link.

use contracts::{Dataset, KeyframeEntry, MapperRequest, TrackerConfig};
use mapper::{MapperError, MapperService, RecordingBackend};
use tracking::{TrackingError, KEYFRAME_BUFFER_CAPACITY};

use crate::support::{
    run_in_process, scripted_loop, tracker_config, ScriptedFrontend, StaticDataset,
};

fn indices<'a>(entries: impl Iterator<Item = &'a KeyframeEntry>) -> Vec<u64> {
    entries.map(|e| e.video_index).collect()
}

#[tokio::test]
async fn test_global_ba_fires_at_7_14_20() {
    let config = TrackerConfig {
        enable_online_ba: true,
        ba_freq: 5,
        ..tracker_config(1, false)
    };
    let frontend = ScriptedFrontend::confirming(&[1, 3, 7, 9, 14, 20]);

    let session = run_in_process(config, frontend, 8).await;
    session.tracked.unwrap();

    let backend = &session.tracker.collaborators().backend;
    assert_eq!(backend.runs, vec![7, 14, 20]);
    assert!(backend.windows.iter().all(|&w| w == tracking::GLOBAL_BA_WINDOW));
}

#[tokio::test]
async fn test_clear_init_replaces_first_notification() {
    let frontend = ScriptedFrontend::confirming(&[2, 5, 9]);

    let session = run_in_process(tracker_config(3, true), frontend, 5).await;
    let stats = session.tracked.unwrap();
    assert!(stats.init_sent);

    // Synthetic first-frame keyframe, then nothing but the terminal message
    assert_eq!(
        session.log.requests(),
        vec![
            MapperRequest::Map(KeyframeEntry::new(0, StaticDataset::timestamp(0))),
            MapperRequest::Shutdown,
        ]
    );
    assert_eq!(indices(session.tracker.buffer().iter()), vec![5, 9]);
    session.mapped.unwrap();
}

#[tokio::test]
async fn test_gap_dispatch_sends_middle_and_evicts_oldest() {
    let frontend = ScriptedFrontend::confirming(&[10, 11, 12, 13]);

    let session = run_in_process(tracker_config(1, false), frontend, 6).await;
    session.tracked.unwrap();

    let t = StaticDataset::timestamp;
    assert_eq!(
        session.log.requests(),
        vec![
            MapperRequest::Map(KeyframeEntry::new(10, t(1))),
            MapperRequest::Map(KeyframeEntry::new(11, t(2))),
            MapperRequest::Map(KeyframeEntry::new(12, t(3))),
            MapperRequest::GapTrack(KeyframeEntry::new(11, t(2))),
            MapperRequest::Map(KeyframeEntry::new(13, t(4))),
            MapperRequest::GapTrack(KeyframeEntry::new(12, t(3))),
            MapperRequest::Shutdown,
        ]
    );
    assert_eq!(indices(session.tracker.buffer().iter()), vec![11, 12, 13]);

    let report = session.mapped.unwrap();
    assert_eq!(report.mapped, 4);
    assert_eq!(report.gap_tracked, 2);
    assert_eq!(report.acknowledged, 6);
}

#[tokio::test]
async fn test_notification_modulus() {
    let frontend = ScriptedFrontend::confirming(&[1, 2, 3, 4, 5, 6]);

    let session = run_in_process(tracker_config(2, false), frontend, 8).await;
    let stats = session.tracked.unwrap();

    assert_eq!(session.log.mapped(), vec![2, 4, 6]);
    assert_eq!(session.log.gap_tracked(), vec![2, 3, 4, 5]);
    assert_eq!(stats.notifications(), 3);
    assert_eq!(stats.gap_dispatches(), 4);
}

#[tokio::test]
async fn test_keyframes_before_initialization_are_ignored() {
    let frontend = ScriptedFrontend::confirming(&[1, 2, 3, 4, 5, 6, 7, 8]).initialized_from(5);

    let session = run_in_process(tracker_config(1, false), frontend, 10).await;
    let stats = session.tracked.unwrap();

    assert_eq!(stats.keyframes, 4);
    assert_eq!(session.log.mapped(), vec![5, 6, 7, 8]);
}

#[tokio::test]
async fn test_only_tracking_sends_nothing() {
    let config = TrackerConfig {
        only_tracking: true,
        ..tracker_config(1, true)
    };
    let (tracker_link, mapper_link) = handshake::pair();
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mapper = MapperService::new(mapper_link, backend).spawn();

    let mut tracker = scripted_loop(
        config,
        ScriptedFrontend::confirming(&[1, 2, 3, 4, 5]),
        tracker_link,
    );
    let stats = tracker.run(&StaticDataset { frames: 7 }).await.unwrap();
    assert_eq!(stats.keyframes, 5);
    assert!(!stats.shutdown_sent);
    assert!(!stats.init_sent);

    // The mapper only learns that the tracker went away
    drop(tracker);
    let err = mapper.join().await.unwrap_err();
    assert!(matches!(err, MapperError::TrackerGone { acknowledged: 0 }));
    assert!(log.requests().is_empty());
}

#[tokio::test]
async fn test_mapper_failure_aborts_tracker_without_shutdown() {
    let (tracker_link, mapper_link) = handshake::pair();
    let mapper = MapperService::new(mapper_link, RecordingBackend::failing_on(3)).spawn();

    let mut tracker = scripted_loop(
        tracker_config(1, false),
        ScriptedFrontend::confirming(&[1, 2, 3, 4, 5]),
        tracker_link,
    );
    let err = tracker.run(&StaticDataset { frames: 7 }).await.unwrap_err();

    assert!(matches!(err, TrackingError::Channel { .. }), "got {err:?}");
    assert!(err.is_channel_failure());
    assert!(!tracker.stats().shutdown_sent);
    // Frames 0..=2 complete; frame 3 confirms keyframe 3, whose round trip fails
    assert_eq!(tracker.stats().frames_processed, 3);
    assert_eq!(tracker.stats().notifications(), 2);

    let mapper_err = mapper.join().await.unwrap_err();
    assert!(matches!(mapper_err, MapperError::Backend { .. }));
}

/// Keyframe schedule with irregular index gaps, one keyframe every other frame
fn irregular_schedule(keyframes: usize) -> Vec<(usize, u64)> {
    let mut index = 0;
    (0..keyframes)
        .map(|k| {
            index += 1 + (k as u64 * 7) % 3;
            (2 * k + 1, index)
        })
        .collect()
}

#[tokio::test]
async fn test_protocol_properties_hold_per_frame() {
    let schedule = irregular_schedule(30);
    let frames = 2 * schedule.len() + 2;

    for every_keyframe in 1..=4u64 {
        for clear_init in [false, true] {
            let (tracker_link, mapper_link) = handshake::pair();
            let backend = RecordingBackend::new();
            let log = backend.log();
            let mapper = MapperService::new(mapper_link, backend).spawn();

            let config = TrackerConfig {
                enable_online_ba: true,
                ba_freq: 4,
                ..tracker_config(every_keyframe, clear_init)
            };
            let mut tracker =
                scripted_loop(config, ScriptedFrontend::keyframes_at(&schedule), tracker_link);
            let dataset = StaticDataset { frames };

            for i in 0..frames {
                let keyframes_before = tracker.keyframe_count();
                let seen = log.requests().len();

                tracker.process_frame(&dataset.get(i).unwrap()).await.unwrap();

                let buffer = tracker.buffer();
                assert!(buffer.len() <= KEYFRAME_BUFFER_CAPACITY);

                let requests = log.requests();
                let fresh = &requests[seen..];
                let gaps: Vec<_> = fresh
                    .iter()
                    .filter_map(|r| match r {
                        MapperRequest::GapTrack(entry) => Some(*entry),
                        _ => None,
                    })
                    .collect();

                if tracker.keyframe_count() == keyframes_before {
                    assert!(fresh.is_empty(), "frame {i}: requests without a new keyframe");
                } else if buffer.len() == KEYFRAME_BUFFER_CAPACITY {
                    assert_eq!(gaps, vec![buffer.peek(1).unwrap()], "frame {i}");
                } else {
                    assert!(gaps.is_empty(), "frame {i}: gap with {} entries", buffer.len());
                }
            }
            tracker.finish().await;
            tracker.finish().await;
            mapper.join().await.unwrap();

            let keyframes = tracker.keyframe_count();
            let mapped = log.mapped();
            assert_eq!(mapped.len() as u64, keyframes / every_keyframe);

            // Strictly increasing, the synthetic first keyframe aside
            let ordered = if clear_init && !mapped.is_empty() {
                assert_eq!(mapped[0], 0);
                &mapped[1..]
            } else {
                &mapped[..]
            };
            assert!(ordered.windows(2).all(|w| w[0] < w[1]), "{mapped:?}");

            let requests = log.requests();
            let shutdowns = requests
                .iter()
                .filter(|r| matches!(r, MapperRequest::Shutdown))
                .count();
            assert_eq!(shutdowns, 1);
            assert_eq!(requests.last(), Some(&MapperRequest::Shutdown));

            let runs = &tracker.collaborators().backend.runs;
            assert!(!runs.is_empty());
            assert!(runs.windows(2).all(|w| w[1] - w[0] >= 4), "{runs:?}");
        }
    }
}
