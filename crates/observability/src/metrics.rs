//! Tracker / Mapper 指标收集模块
//!
//! `record_*` 函数写入 `metrics` facade (由 Prometheus exporter 导出)，
//! `HandshakeMetricsAggregator` 在内存中聚合握手往返，用于运行结束时的摘要。

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// 记录一帧处理完成
pub fn record_frame() {
    counter!("tracker_frames_total").increment(1);
}

/// 记录一个确认的关键帧
pub fn record_keyframe(video_index: u64) {
    counter!("tracker_keyframes_total").increment(1);
    gauge!("tracker_last_keyframe_index").set(video_index as f64);
}

/// 记录一次握手
///
/// `kind` 为 `map` / `gap` / `init` / `shutdown`；
/// 终止消息没有 ack，`ack_latency_ms` 为 `None`。
pub fn record_handshake(kind: &str, ack_latency_ms: Option<f64>) {
    counter!("tracker_handshakes_total", "kind" => kind.to_string()).increment(1);
    if let Some(latency) = ack_latency_ms {
        histogram!("tracker_ack_latency_ms", "kind" => kind.to_string()).record(latency);
    }
}

/// 记录一次全局 BA
pub fn record_global_ba(video_index: u64) {
    counter!("tracker_global_ba_total").increment(1);
    gauge!("tracker_last_global_ba_index").set(video_index as f64);
}

/// 记录关键帧缓冲区深度
pub fn record_buffer_depth(depth: usize) {
    gauge!("tracker_keyframe_buffer_depth").set(depth as f64);
}

/// 记录 mapper 收到的请求
pub fn record_mapper_request(kind: &str) {
    counter!("mapper_requests_total", "kind" => kind.to_string()).increment(1);
}

/// 记录 mapper 后端失败
pub fn record_backend_failure(backend: &str) {
    counter!(
        "mapper_backend_failures_total",
        "backend" => backend.to_string()
    )
    .increment(1);
}

/// 握手指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct HandshakeMetricsAggregator {
    /// 各类型握手次数
    pub per_kind: BTreeMap<String, u64>,

    /// ack 延迟统计 (毫秒)
    pub ack_latency: RunningStats,
}

impl HandshakeMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, kind: &str, ack_latency_ms: Option<f64>) {
        *self.per_kind.entry(kind.to_string()).or_insert(0) += 1;
        if let Some(latency) = ack_latency_ms {
            self.ack_latency.push(latency);
        }
    }

    /// 某类型握手次数
    pub fn count(&self, kind: &str) -> u64 {
        self.per_kind.get(kind).copied().unwrap_or(0)
    }

    /// 生成摘要报告
    pub fn summary(&self) -> HandshakeSummary {
        HandshakeSummary {
            total: self.per_kind.values().sum(),
            per_kind: self.per_kind.clone(),
            ack_latency_ms: StatsSummary::from(&self.ack_latency),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 握手摘要
#[derive(Debug, Clone, Default)]
pub struct HandshakeSummary {
    pub total: u64,
    pub per_kind: BTreeMap<String, u64>,
    pub ack_latency_ms: StatsSummary,
}

impl std::fmt::Display for HandshakeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Handshake Summary ===")?;
        writeln!(f, "Total handshakes: {}", self.total)?;
        for (kind, count) in &self.per_kind {
            writeln!(f, "  {}: {}", kind, count)?;
        }
        writeln!(f, "Ack latency (ms): {}", self.ack_latency_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
