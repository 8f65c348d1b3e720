//! Sessions driven by the runnable collaborators instead of scripts.

use std::fs;

use collaborators::mono_prior::load_estimator;
use collaborators::{
    ListingDataset, LoggingGlobalRefiner, MonoPriorWriter, SharedVideoStore, SyntheticDataset,
    SyntheticDatasetConfig, ThresholdMotionGate, WindowedFrontend,
};
use config_loader::{ConfigFormat, ConfigLoader};
use contracts::{DepthModel, MapperRequest, MonoPriorConfig, SlamConfig};
use mapper::{MapperService, RecordingBackend};
use tracking::{Collaborators, TrackingLoop};

const ROOM0: &str = r#"
clear_init = true
only_tracking = false
scene = "room0"

[tracking.frontend]
window = 4
enable_online_ba = true
keyframe_thresh = 4.5

[tracking.motion_filter]
thresh = 4.0

[tracking.backend]
ba_freq = 3

[mapping]
every_keyframe = 2
"#;

fn runnable_collaborators(
    config: &SlamConfig,
    store: &SharedVideoStore,
) -> Collaborators<ThresholdMotionGate, WindowedFrontend, LoggingGlobalRefiner> {
    Collaborators::new(
        ThresholdMotionGate::new(store.clone(), config.tracking.motion_filter.thresh),
        WindowedFrontend::new(
            store.clone(),
            config.tracking.frontend.window,
            config.tracking.frontend.keyframe_thresh,
        ),
        LoggingGlobalRefiner::new(store.clone()),
    )
}

#[tokio::test]
async fn test_synthetic_session_end_to_end() {
    let config = ConfigLoader::load_from_str(ROOM0, ConfigFormat::Toml).unwrap();
    let store = SharedVideoStore::new();

    let (tracker_link, mapper_link) = handshake::pair();
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mapper = MapperService::new(mapper_link, backend).spawn();

    let mut tracker = TrackingLoop::new(
        config.to_tracker_config(),
        runnable_collaborators(&config, &store),
        tracker_link,
    )
    .unwrap();

    let dataset = SyntheticDataset::new(SyntheticDatasetConfig {
        frames: 120,
        width: 16,
        height: 12,
        ..SyntheticDatasetConfig::default()
    });
    let stats = tracker.run(&dataset).await.unwrap();
    let report = mapper.join().await.unwrap();

    assert_eq!(stats.frames_processed, 120);
    assert!(stats.keyframes > 0);
    assert!(stats.keyframes <= store.counter());
    assert!(stats.init_sent);
    assert!(stats.shutdown_sent);

    let mapped = log.mapped();
    assert_eq!(mapped.len() as u64, stats.keyframes / 2);
    assert_eq!(mapped.first(), Some(&0));
    assert!(mapped[1..].windows(2).all(|w| w[0] < w[1]));
    assert_eq!(log.gap_tracked().len() as u64, stats.gap_dispatches());
    assert_eq!(log.requests().last(), Some(&MapperRequest::Shutdown));
    assert_eq!(report.acknowledged, stats.notifications() + stats.gap_dispatches());

    let backend = &tracker.collaborators().backend;
    assert_eq!(backend.run_count(), stats.global_ba_runs);
    let runs: Vec<_> = backend.recent_runs().copied().collect();
    assert_eq!(runs.len() as u64, stats.global_ba_runs);
    assert!(runs.iter().all(|run| run.window == 2));
    assert!(runs
        .windows(2)
        .all(|w| w[1].newest_index - w[0].newest_index >= 3));
}

#[tokio::test]
async fn test_mono_prior_written_per_keyframe() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = dir.path().join("depth_anything_v2_vitl.pth");
    fs::write(&checkpoint, b"weights").unwrap();

    let mut config = ConfigLoader::load_from_str(ROOM0, ConfigFormat::Toml).unwrap();
    config.only_tracking = true;
    config.tracking.frontend.keyframe_thresh = 0.0;
    config.data.output = dir.path().join("output");
    config.mono_prior = Some(MonoPriorConfig {
        depth: DepthModel::DepthAnythingV2,
        depth_pretrained: checkpoint,
    });

    let store = SharedVideoStore::new();
    let prior = config.mono_prior.as_ref().unwrap();
    let writer =
        MonoPriorWriter::new(load_estimator(prior, 16, 12).unwrap(), config.scene_output_dir())
            .unwrap();
    let mut collaborators = runnable_collaborators(&config, &store);
    collaborators.motion_gate = collaborators.motion_gate.with_depth_prior(writer);

    // No mapper in tracking-only mode; the link is never used
    let (tracker_link, _mapper_link) = handshake::pair();
    let mut tracker =
        TrackingLoop::new(config.to_tracker_config(), collaborators, tracker_link).unwrap();

    let dataset = SyntheticDataset::new(SyntheticDatasetConfig {
        frames: 30,
        width: 16,
        height: 12,
        ..SyntheticDatasetConfig::default()
    });
    tracker.run(&dataset).await.unwrap();

    let depths = config.scene_output_dir().join("mono_priors").join("depths");
    let files = fs::read_dir(&depths).unwrap().count() as u64;
    let written = tracker
        .collaborators()
        .motion_gate
        .depth_prior()
        .unwrap()
        .written();

    assert!(written > 0);
    assert_eq!(written, store.counter());
    assert_eq!(files, written);
    assert!(depths.join("00000.npy").is_file());
}

#[tokio::test]
async fn test_listing_dataset_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut listing = String::from("# timestamp filename\n");
    for i in 0..24u8 {
        let name = format!("frame_{i:03}.raw");
        fs::write(dir.path().join(&name), vec![i * 10; 16]).unwrap();
        listing.push_str(&format!("{:.3} {}\n", 100.0 + f64::from(i) * 0.05, name));
    }
    fs::write(dir.path().join("rgb.txt"), listing).unwrap();
    fs::write(
        dir.path().join(ListingDataset::INTRINSICS_FILE),
        "525.0 525.0 319.5 239.5\n",
    )
    .unwrap();

    let dataset = ListingDataset::open(&dir.path().join("rgb.txt"), None).unwrap();

    let mut config = ConfigLoader::load_from_str(ROOM0, ConfigFormat::Toml).unwrap();
    config.mapping.every_keyframe = 1;
    let store = SharedVideoStore::new();

    let (tracker_link, mapper_link) = handshake::pair();
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mapper = MapperService::new(mapper_link, backend).spawn();

    let mut tracker = TrackingLoop::new(
        config.to_tracker_config(),
        runnable_collaborators(&config, &store),
        tracker_link,
    )
    .unwrap();
    let stats = tracker.run(&dataset).await.unwrap();
    mapper.join().await.unwrap();

    // Every frame moves by 10, so every frame is a keyframe
    assert_eq!(store.counter(), 24);
    assert_eq!(stats.frames_processed, 24);
    let mapped = log.mapped();
    assert_eq!(mapped.len() as u64, stats.keyframes);
    assert_eq!(mapped.first(), Some(&0));
    let first = log.requests()[0];
    assert_eq!(first, MapperRequest::Map(contracts::KeyframeEntry::new(0, 100.0)));
}

#[test]
fn test_unknown_depth_model_rejected_at_load() {
    let content = format!(
        "{ROOM0}\n[mono_prior]\ndepth = \"midas\"\ndepth_pretrained = \"ckpt\"\n"
    );
    let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
    assert!(err.to_string().contains("midas"), "{err}");
}
