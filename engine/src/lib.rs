//! Real-Time Trade-Surveillance Detection Engine
//!
//! A streaming pipeline that ingests trade events and emits alerts when
//! configured manipulative-trading patterns fire. Designed for
//! sub-microsecond per-trade overhead in the hot path:
//!
//! - Pre-sized lock-free slot pool, no allocation per trade
//! - Bounded lock-free MPMC ingress queue
//! - Per-key serialized sliding-window context with value-semantic
//!   snapshots
//! - Detector fan-out with per-pattern counters and error isolation
//! - Separate alert lane that tolerates slow consumers without stalling
//!   producers
//!
//! Overload is handled by failing fast: ingress loss is permitted and
//! every drop is observable through a counter.

#![deny(warnings)]
#![deny(clippy::all)]

pub mod config;
pub mod context;
pub mod core;
pub mod detector;
pub mod dispatch;
pub mod memory;
pub mod patterns;
pub mod queue;
pub mod registry;
pub mod stats;

pub use crate::core::{Engine, EngineState};
pub use config::EngineConfig;
pub use context::{ContextStore, HistoricalContext, QuoteSnapshot};
pub use detector::{DetectorError, PatternConfig, PatternDetector};
pub use dispatch::AlertSink;
pub use memory::{Slot, TradePool};
pub use queue::IngressQueue;
pub use registry::{DetectorEntry, DetectorRegistry};
pub use stats::{EngineCounters, ProcessingStats};
