//! Capability traits connecting traffic-processing components to the
//! tap control plane
//!
//! A component registers itself under a config id of its choosing and
//! receives `apply_config`/`clear_config` calls when an admin session
//! attaches or detaches. The `sink` passed to `apply_config` is its
//! route for submitting captured trace records back to the admin
//! stream.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque tap configuration payload
///
/// The control plane never inspects this beyond checking for null;
/// its schema is a contract between the operator and the components
/// registered under the config id.
pub type TapConfig = serde_json::Value;

/// A single captured trace record submitted by a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceRecord(serde_json::Value);

impl TraceRecord {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

/// Requested rendering of submitted trace records
///
/// Only the structured JSON rendering is implemented. Submitting with
/// `Binary` is rejected with `TapError::UnsupportedFormat` rather than
/// silently corrupting the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceFormat {
    /// Pretty-printed JSON projection of the record
    Json,
    /// Length-delimited binary encoding (not implemented)
    Binary,
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// Capability a component uses to submit captured trace records
///
/// A sink handle is created per attached session. Submitting after the
/// session has detached is safe: the record is dropped on arrival in
/// the admin task.
pub trait TapSink: Send + Sync {
    /// Submit one completed trace record for delivery to the admin
    /// stream. Never blocks.
    fn submit(&self, record: TraceRecord, format: TraceFormat) -> Result<()>;
}

/// A traffic-processing unit capable of accepting a tap configuration
///
/// Lifecycle contract: register with the session manager on startup,
/// unregister before drop. The registry holds only weak handles and
/// never owns a component's lifetime.
pub trait TapComponent: Send + Sync {
    /// The config id this component registered under
    fn config_id(&self) -> &str;

    /// Apply a tap configuration. Called synchronously from the
    /// attaching task with the registry and session locks held; must
    /// not call back into the registry or the session manager.
    /// Submitting on the sink is always safe.
    fn apply_config(&self, config: &TapConfig, sink: Arc<dyn TapSink>);

    /// Clear the currently applied tap configuration. Called
    /// synchronously at session detach with the registry and session
    /// locks held; must not call back into the registry or the
    /// session manager.
    fn clear_config(&self);
}
