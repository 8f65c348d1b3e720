//! Session statistics.

use std::time::Duration;

use mapper::MapperReport;
use tracking::TrackingStats;

/// Statistics from one CLI session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Tracker side, absent for `map`
    pub tracking: Option<TrackingStats>,

    /// Mapper side, absent for `track`
    pub mapper: Option<MapperReport>,

    /// Frames in the dataset
    pub frames_total: usize,

    /// Total duration of the session
    pub duration: Duration,

    /// Stopped by Ctrl-C / SIGTERM
    pub interrupted: bool,
}

impl SessionStats {
    /// Processed frames per second
    pub fn fps(&self) -> f64 {
        let frames = self
            .tracking
            .as_ref()
            .map_or(0, |stats| stats.frames_processed);
        if self.duration.as_secs_f64() > 0.0 {
            frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Session Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Dataset frames: {}", self.frames_total);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   └─ Interrupted: {}", self.interrupted);

        if let Some(ref tracking) = self.tracking {
            println!("\n📈 Tracker");
            println!("   ├─ Frames processed: {}", tracking.frames_processed);
            println!("   ├─ Keyframes: {}", tracking.keyframes);
            println!("   ├─ Mapper notifications: {}", tracking.notifications());
            println!("   ├─ Gap dispatches: {}", tracking.gap_dispatches());
            println!("   ├─ Global BA runs: {}", tracking.global_ba_runs);
            println!("   ├─ Buffer evictions: {}", tracking.buffer_evictions);
            println!("   ├─ Clear-init sent: {}", tracking.init_sent);
            println!("   └─ Shutdown sent: {}", tracking.shutdown_sent);

            let summary = tracking.handshakes.summary();
            if summary.total > 0 {
                println!("\n🤝 Handshakes");
                for (kind, count) in &summary.per_kind {
                    println!("   ├─ {}: {}", kind, count);
                }
                println!("   └─ Ack latency (ms): {}", summary.ack_latency_ms);
            }
        }

        if let Some(ref report) = self.mapper {
            println!("\n🗺  Mapper");
            println!("   ├─ Keyframes mapped: {}", report.mapped);
            println!("   ├─ Gap tracking requests: {}", report.gap_tracked);
            println!("   └─ Acknowledgements: {}", report.acknowledged);
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_without_tracker() {
        let stats = SessionStats {
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(stats.fps(), 0.0);
    }

    #[test]
    fn test_fps() {
        let tracking = TrackingStats {
            frames_processed: 60,
            ..Default::default()
        };
        let stats = SessionStats {
            tracking: Some(tracking),
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.fps() - 30.0).abs() < 1e-9);
    }
}
