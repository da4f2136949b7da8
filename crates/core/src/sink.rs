//! Session sink - the trace submission path from worker tasks to the
//! admin stream
//!
//! Components receive a `SessionSinkHandle` with each applied
//! configuration. `submit` renders the record on the calling (worker)
//! task and hands the bytes to the delivery channel; the delivery task
//! spawned by the session manager re-checks attachment on arrival and
//! writes or drops the record. No lock is held across the hand-off and
//! the submitting task never blocks.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::component::{TapSink, TraceFormat, TraceRecord};
use crate::error::{Result, TapError};
use crate::session::TapSessionManager;

/// Per-session sink capability handed to components
///
/// Holds a strong reference to the session manager so the delivery
/// target outlives the session that created the handle: a component
/// may submit after detach, and the record is then dropped on arrival
/// rather than delivered to a stale session.
pub struct SessionSinkHandle {
    manager: Arc<TapSessionManager>,
    delivery_tx: mpsc::UnboundedSender<Bytes>,
}

impl SessionSinkHandle {
    pub(crate) fn new(manager: Arc<TapSessionManager>) -> Self {
        let delivery_tx = manager.delivery_sender();
        Self {
            manager,
            delivery_tx,
        }
    }
}

impl TapSink for SessionSinkHandle {
    fn submit(&self, record: TraceRecord, format: TraceFormat) -> Result<()> {
        let rendered = match format {
            TraceFormat::Json => {
                let mut out = serde_json::to_string_pretty(record.value())?;
                out.push('\n');
                out
            }
            TraceFormat::Binary => return Err(TapError::UnsupportedFormat(format)),
        };

        self.manager.note_submitted();
        debug!("submitting rendered trace record to the delivery task");

        // Send failure means the delivery task is gone (manager
        // dropped); the record is dropped either way.
        let _ = self.delivery_tx.send(Bytes::from(rendered));
        Ok(())
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod tests;
