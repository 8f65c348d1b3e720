//! # Observability
//!
//! 可观测性模块：Tracing 初始化 + Prometheus 指标。
//!
//! - 日志格式 JSON / Pretty / Compact，级别由 `-v` / `-q` 或 `RUST_LOG` 决定
//! - Prometheus 导出器（可选 HTTP 端口）
//! - 握手往返延迟统计，供运行摘要使用
//!
//! ```ignore
//! let config = observability::ObservabilityConfig::for_verbosity(1, false);
//! observability::init_with_config(config)?;
//! observability::record_handshake("map", Some(3.2));
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_backend_failure, record_buffer_depth, record_frame, record_global_ba,
    record_handshake, record_keyframe, record_mapper_request, HandshakeMetricsAggregator,
    HandshakeSummary, RunningStats, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 未设置 `RUST_LOG` 时的日志级别
    pub default_log_level: String,
    /// 是否允许 `RUST_LOG` 覆盖 `default_log_level`
    pub honor_env: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
            honor_env: true,
        }
    }
}

impl ObservabilityConfig {
    /// Map `-v` counts and `-q` onto a log level.
    ///
    /// `-q` pins the level to `warn` and ignores `RUST_LOG`.
    pub fn for_verbosity(verbose: u8, quiet: bool) -> Self {
        let (level, honor_env) = if quiet {
            ("warn", false)
        } else {
            match verbose {
                0 => ("info", true),
                1 => ("debug", true),
                _ => ("trace", true),
            }
        };
        Self {
            default_log_level: level.to_string(),
            honor_env,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    fn filter(&self) -> EnvFilter {
        if self.honor_env {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
        } else {
            EnvFilter::new(&self.default_log_level)
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!(
                "unknown log format '{other}' (expected json, pretty or compact)"
            )),
        }
    }
}

/// 初始化 tracing 订阅者，并按需启动 Prometheus 导出器
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        "Observability initialized"
    );
    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
