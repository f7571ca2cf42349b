//! # completion-gateway
//!
//! 面向大语言模型聊天补全服务的出站网关：缓存、熔断、重试、并发准入与按调用方限流。
//!
//! Outbound gateway for a remote chat-completion service. It turns an
//! expensive, occasionally flaky upstream call into a bounded, observable,
//! fail-safe operation for a multi-tenant HTTP service.
//!
//! ## Overview
//!
//! Control flow of one call:
//!
//! caller → per-caller rate limiter → circuit-breaker check → cache lookup →
//! (on miss) concurrency admission → retrying transport → parsing and
//! reasoning-markup removal → cache store and breaker bookkeeping → metrics.
//!
//! ## Key Features
//!
//! - **Gateway Client**: [`GatewayClient`] with `generate_text` / `generate_vision`
//! - **Caching**: fingerprint-keyed responses with TTL via the [`cache`] module
//! - **Resilience**: circuit breaker, token buckets and admission via [`resilience`]
//! - **Transport**: bounded retries with capped exponential backoff via [`transport`]
//! - **Telemetry**: Prometheus metrics and aggregate stats via [`telemetry`]
//! - **Failure catalogue**: localized, user-safe messages via [`failure`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use completion_gateway::{GatewayClientBuilder, GatewayConfig, Message};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> completion_gateway::Result<()> {
//!     let gateway = Arc::new(GatewayClientBuilder::from_config(GatewayConfig::from_env()).build()?);
//!
//!     gateway.admit("203.0.113.7")?;
//!     let context = vec![Message::system("Eres un asistente de obra.")];
//!     let answer = gateway.generate_text("¿Qué es un APU?", None, &context).await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Gateway orchestration, builder, response parsing, vision helpers |
//! | [`cache`] | Response cache and request fingerprinting |
//! | [`resilience`] | Circuit breaker, token buckets, admission control |
//! | [`transport`] | HTTP transport and retry policy |
//! | [`telemetry`] | Prometheus metrics and stats snapshot |
//! | [`config`] | Defaults, environment and YAML loading, validation |
//! | [`failure`] | Failure kinds and the localized message catalogue |
//! | [`types`] | Messages and upstream wire types |

pub mod cache;
pub mod client;
pub mod config;
pub mod failure;
pub mod resilience;
pub mod telemetry;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{GatewayClient, GatewayClientBuilder, SignalsSnapshot};
pub use config::GatewayConfig;
pub use failure::FailureKind;
pub use telemetry::StatsSnapshot;
pub use types::message::{Message, MessageRole};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
