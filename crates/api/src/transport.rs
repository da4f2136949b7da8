//! Channel-backed admin stream
//!
//! `ChannelStream` bridges the core's `AdminStream` seam onto an axum
//! streaming response body. Chunks written by the delivery task go
//! over an unbounded channel whose receiver becomes the response body;
//! when the client disconnects the body is dropped, the sender
//! observes the close, and the registered detach callback fires.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use tapwire_core::{AdminStream, DetachCallback};

/// Admin stream writing into an unbounded byte channel
pub struct ChannelStream {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelStream {
    /// Create the stream and the receiver that becomes the response
    /// body
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AdminStream for ChannelStream {
    fn write_chunk(&self, data: Bytes) {
        // Send failure means the client is already gone; the detach
        // watcher handles the teardown.
        let _ = self.tx.send(data);
    }

    fn on_detach(&self, callback: DetachCallback) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tx.closed().await;
            debug!("admin tap client disconnected");
            callback();
        });
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
