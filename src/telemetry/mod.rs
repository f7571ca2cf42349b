//! 遥测模块：Prometheus 指标与网关聚合统计。
//!
//! # Telemetry Module
//!
//! The gateway only emits observations; scraping and storage belong to an
//! external collector.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`GatewayMetrics`] | Prometheus collectors on a private registry, text exposition via `render()` |
//! | [`GatewayStats`] | Lock-free counters behind the JSON-friendly [`StatsSnapshot`] |

pub mod metrics;
pub mod stats;

pub use metrics::GatewayMetrics;
pub use stats::{GatewayStats, StatsSnapshot};
