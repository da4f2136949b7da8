//! Tapwire Core - runtime control plane for live trace capture
//!
//! This crate lets an operator attach a tap configuration to running
//! traffic-processing components at runtime, receive captured trace
//! records as they occur, and detach cleanly. It provides:
//!
//! - A thread-safe registry mapping config ids to live components
//! - A single-slot session manager for the admin tap stream
//! - Safe delivery of trace records from worker tasks back to the
//!   task that owns the admin connection
//!
//! # Architecture
//!
//! ```text
//! POST /tap {config_id, tap_config}
//!     │
//!     ▼
//! TapSessionManager ──validate──► ConfigIdRegistry
//!     │                               │
//!     │ push_config                   │ config_id → components
//!     ▼                               ▼
//! TapComponent::apply_config(config, sink)
//!     │
//!     │ sink.submit(record, format)     (any worker task)
//!     ▼
//! delivery channel ──► admin delivery task ──► AdminStream chunk
//!                          (drops the record if the session
//!                           detached while it was in flight)
//! ```
//!
//! Components register themselves under a config id of their choosing
//! and must unregister before they are dropped. At most one admin
//! session is attached at a time; detach is driven solely by transport
//! teardown.

pub mod component;
pub mod error;
pub mod registry;
pub mod session;
pub mod sink;

pub use component::{TapComponent, TapConfig, TapSink, TraceFormat, TraceRecord};
pub use error::{Result, TapError};
pub use registry::ConfigIdRegistry;
pub use session::{AdminStream, DetachCallback, TapRequest, TapSessionManager, TapSessionStats};
pub use sink::SessionSinkHandle;
