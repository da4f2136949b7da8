//! Admin tap session manager
//!
//! `TapSessionManager` owns the single admin tap session slot. An
//! attach request is validated against the registry, the configuration
//! is fanned out to every matching component, and captured trace
//! records flow back through the session sink onto the admin stream.
//! Detach is driven solely by transport teardown and clears the
//! configuration from every matching component.
//!
//! Session state lives behind one mutex and is touched only by
//! attach, the detach callback, the late-join path, and the delivery
//! task that `new` spawns. Worker tasks never read it directly; their
//! only interaction is the non-blocking hand-off in
//! [`SessionSinkHandle::submit`](crate::sink::SessionSinkHandle).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::component::{TapComponent, TapConfig, TapSink};
use crate::error::{Result, TapError};
use crate::registry::ConfigIdRegistry;
use crate::sink::SessionSinkHandle;

/// Callback invoked exactly once when the admin transport tears down
pub type DetachCallback = Box<dyn FnOnce() + Send>;

/// The admin transport collaborator
///
/// Supplies incremental response writes that do not end the stream,
/// and a teardown notification hook. Implemented by the HTTP surface;
/// the core never assumes a concrete transport.
pub trait AdminStream: Send + Sync {
    /// Write one chunk of response bytes without ending the response
    fn write_chunk(&self, data: Bytes);

    /// Register a callback invoked exactly once at transport teardown
    ///
    /// The callback may be invoked from any task, including
    /// synchronously from within this call when the transport is
    /// already gone.
    fn on_detach(&self, callback: DetachCallback);
}

/// An admin tap attach request
#[derive(Debug, Clone, Deserialize)]
pub struct TapRequest {
    /// The config id to attach to
    pub config_id: String,
    /// Opaque configuration payload pushed to matching components
    #[serde(default)]
    pub tap_config: TapConfig,
}

/// The single attached session
struct AttachedSession {
    config_id: String,
    config: TapConfig,
    stream: Arc<dyn AdminStream>,
}

/// Counters for the session delivery path
#[derive(Debug, Clone, Copy)]
pub struct TapSessionStats {
    /// Whether a session is currently attached
    pub attached: bool,
    /// Records submitted by components
    pub submitted: u64,
    /// Records written onto the admin stream
    pub delivered: u64,
    /// Records dropped because the session detached while they were
    /// in flight
    pub dropped: u64,
}

/// Owner of the admin tap session lifecycle
///
/// Created once at startup inside a tokio runtime and shared by
/// reference with the admin surface and with component lifecycle
/// code. `new` spawns the delivery task that marshals rendered trace
/// records from worker tasks onto the attached stream.
pub struct TapSessionManager {
    registry: Arc<ConfigIdRegistry>,
    delivery_tx: mpsc::UnboundedSender<Bytes>,
    attached: Mutex<Option<AttachedSession>>,
    submitted: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl TapSessionManager {
    /// Create the session manager and spawn its delivery task
    ///
    /// Must be called within a tokio runtime. The delivery task holds
    /// only a weak back-reference, so dropping the last `Arc` ends it.
    pub fn new(registry: Arc<ConfigIdRegistry>) -> Arc<Self> {
        let (delivery_tx, mut delivery_rx) = mpsc::unbounded_channel::<Bytes>();
        let manager = Arc::new(Self {
            registry,
            delivery_tx,
            attached: Mutex::new(None),
            submitted: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&manager);
        tokio::spawn(async move {
            while let Some(rendered) = delivery_rx.recv().await {
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.deliver(rendered);
            }
        });

        manager
    }

    /// The registry this manager validates attach requests against
    pub fn registry(&self) -> &Arc<ConfigIdRegistry> {
        &self.registry
    }

    /// Attach an admin tap session
    ///
    /// Rejected, with no state change, when a session is already
    /// attached, the request carries no payload, or no component has
    /// registered under the requested config id. On success the
    /// stream's detach hook is registered and the configuration is
    /// pushed to every matching component before this returns.
    pub fn attach(self: &Arc<Self>, request: TapRequest, stream: Arc<dyn AdminStream>) -> Result<()> {
        {
            // Held across the fan-out so registration racing the
            // attach cannot double-push.
            let mut attached = self.attached.lock();

            if attached.is_some() {
                // TODO: support concurrent admin tap sessions; a single
                // slot keeps the state machine simple for now.
                return Err(TapError::AlreadyAttached);
            }
            if request.tap_config.is_null() {
                return Err(TapError::MissingTapConfig);
            }
            if !self.registry.has_config_id(&request.config_id) {
                return Err(TapError::UnknownConfigId(request.config_id));
            }

            debug!(config_id = %request.config_id, "attaching admin tap session");

            *attached = Some(AttachedSession {
                config_id: request.config_id.clone(),
                config: request.tap_config.clone(),
                stream: Arc::clone(&stream),
            });

            let sink = self.new_sink();
            self.registry
                .push_config(&request.config_id, &request.tap_config, &sink);
        }

        // Registered with the session mutex released: a transport that
        // fires the callback synchronously lands in detach without
        // deadlocking. Teardown cannot be missed in the gap because it
        // is only observable through this callback.
        let detach_target = Arc::clone(self);
        stream.on_detach(Box::new(move || detach_target.detach()));
        Ok(())
    }

    /// Detach the attached session
    ///
    /// Invoked by the transport teardown callback; this is the only
    /// way out of the attached state. Clears the configuration from
    /// every component registered under the attached id, then frees
    /// the session slot. Idempotent: a second invocation is a no-op.
    pub fn detach(&self) {
        let mut attached = self.attached.lock();
        let Some(session) = attached.take() else {
            return;
        };
        debug!(config_id = %session.config_id, "detaching admin tap session");
        self.registry.clear_config(&session.config_id);
    }

    /// Register a component and push the active configuration to it
    /// when its config id matches the attached session (late join).
    ///
    /// The already-attached components do not see the configuration a
    /// second time.
    pub fn register_component(self: &Arc<Self>, component: &Arc<dyn TapComponent>, config_id: &str) {
        // Held across registration and the late-join decision. If the
        // registry insert landed first, an in-flight attach could fan
        // out to this component and the late-join check would then
        // push the same config a second time.
        let attached = self.attached.lock();
        self.registry.register(component, config_id);

        if let Some(session) = attached.as_ref() {
            if session.config_id == config_id {
                debug!(config_id, "pushing active tap config to late-registering component");
                component.apply_config(&session.config, self.new_sink());
            }
        }
    }

    /// Unregister a component
    ///
    /// Must be called before the component is dropped.
    pub fn unregister_component(&self, component: &Arc<dyn TapComponent>) {
        self.registry.unregister(component);
    }

    /// Whether a session is currently attached
    pub fn is_attached(&self) -> bool {
        self.attached.lock().is_some()
    }

    /// Snapshot of the session delivery counters
    pub fn stats(&self) -> TapSessionStats {
        TapSessionStats {
            attached: self.is_attached(),
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Create the sink handle handed to components for this session
    fn new_sink(self: &Arc<Self>) -> Arc<dyn TapSink> {
        Arc::new(SessionSinkHandle::new(Arc::clone(self)))
    }

    pub(crate) fn delivery_sender(&self) -> mpsc::UnboundedSender<Bytes> {
        self.delivery_tx.clone()
    }

    pub(crate) fn note_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Write one rendered record onto the attached stream, or drop it
    /// if the session detached while the record was in flight. Runs on
    /// the delivery task only.
    fn deliver(&self, rendered: Bytes) {
        let attached = self.attached.lock();
        match attached.as_ref() {
            Some(session) => {
                trace!("writing trace record to admin stream");
                session.stream.write_chunk(rendered);
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                // Expected outcome of a disconnect racing an in-flight
                // capture, not an error.
                trace!("dropping trace record submitted after detach");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
