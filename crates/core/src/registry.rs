//! Config id registry
//!
//! `ConfigIdRegistry` maintains the mapping between config id strings
//! and the sets of live components registered under them. It exists so
//! an attach request can be validated and fanned out, and so the
//! `/tap/config_ids` endpoint can enumerate valid ids.
//!
//! The registry is thread safe via an internal reader/writer lock.
//! Contention should be very low: it is mutated only at component
//! startup/shutdown and at tap attach/detach.

use std::collections::HashMap;
use std::ptr;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::component::{TapComponent, TapConfig, TapSink};

type ComponentSet = Vec<Weak<dyn TapComponent>>;

/// Registry mapping config ids to sets of registered components
///
/// Component handles are weak: the registry never owns a component's
/// lifetime. A component must unregister itself before it is dropped;
/// violating that contract panics on the next unregister rather than
/// fanning out to a dangling handle.
#[derive(Default)]
pub struct ConfigIdRegistry {
    inner: RwLock<HashMap<String, ComponentSet>>,
}

/// Weak/Arc identity compare, ignoring vtable metadata
fn is_component(entry: &Weak<dyn TapComponent>, component: &Arc<dyn TapComponent>) -> bool {
    ptr::addr_eq(entry.as_ptr(), Arc::as_ptr(component))
}

impl ConfigIdRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under `config_id`, creating the entry if
    /// needed.
    ///
    /// # Panics
    ///
    /// Panics if `config_id` is empty or if the component is already
    /// registered under `config_id`. Both are caller-contract
    /// violations, not runtime conditions.
    pub fn register(&self, component: &Arc<dyn TapComponent>, config_id: &str) {
        let mut map = self.inner.write();
        assert!(!config_id.is_empty(), "config_id must be non-empty");

        let set = map.entry(config_id.to_string()).or_default();
        assert!(
            !set.iter().any(|entry| is_component(entry, component)),
            "component already registered under config_id '{config_id}'"
        );
        set.push(Arc::downgrade(component));
        debug!(config_id, "registered component");
    }

    /// Unregister a component from the set named by its own config id.
    /// Removes the id key entirely once its set empties, so no
    /// dangling keys remain.
    ///
    /// # Panics
    ///
    /// Panics if the component reports an empty config id or is not
    /// currently a member of that id's set.
    pub fn unregister(&self, component: &Arc<dyn TapComponent>) {
        let mut map = self.inner.write();
        let config_id = component.config_id();
        assert!(!config_id.is_empty(), "component has no config_id");

        let set = map
            .get_mut(config_id)
            .unwrap_or_else(|| panic!("component not registered under config_id '{config_id}'"));
        let before = set.len();
        set.retain(|entry| !is_component(entry, component));
        assert!(
            set.len() < before,
            "component not registered under config_id '{config_id}'"
        );

        if set.is_empty() {
            map.remove(config_id);
        }
        debug!(config_id, "unregistered component");
    }

    /// Push a tap configuration to every component registered under
    /// `config_id`, synchronously, in the calling task.
    ///
    /// Unknown ids are a silent no-op; callers are expected to have
    /// validated existence via [`has_config_id`](Self::has_config_id).
    /// Component callbacks run under the registry lock and must not
    /// re-enter it.
    pub fn push_config(&self, config_id: &str, config: &TapConfig, sink: &Arc<dyn TapSink>) {
        let map = self.inner.write();
        let Some(set) = map.get(config_id) else {
            return;
        };
        for entry in set {
            if let Some(component) = entry.upgrade() {
                debug!(config_id, "pushing tap config to component");
                component.apply_config(config, Arc::clone(sink));
            }
        }
    }

    /// Clear the tap configuration from every component registered
    /// under `config_id`, synchronously. Unknown ids are a silent
    /// no-op.
    pub fn clear_config(&self, config_id: &str) {
        let map = self.inner.write();
        let Some(set) = map.get(config_id) else {
            return;
        };
        for entry in set {
            if let Some(component) = entry.upgrade() {
                debug!(config_id, "clearing tap config from component");
                component.clear_config();
            }
        }
    }

    /// Whether any component is registered under `config_id`
    pub fn has_config_id(&self, config_id: &str) -> bool {
        self.inner.read().contains_key(config_id)
    }

    /// Snapshot of all currently registered config ids, unordered
    ///
    /// This is a copy-out, not a live view: ids registered or removed
    /// after the call are not reflected.
    pub fn config_ids(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for ConfigIdRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigIdRegistry")
            .field("config_ids", &self.config_ids())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
