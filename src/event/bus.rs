use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::ModuleError;

use super::module::{ErasedModule, Loaded};
use super::{Context, Event, Module};

type Slot = Arc<Mutex<Vec<Box<dyn ErasedModule>>>>;

/// Registry of modules per connection tag, and synchronous dispatch.
///
/// Cloning is cheap; clones share the same registry. Each tag has its own
/// lock, so connections dispatching concurrently never contend unless
/// they share a tag.
#[derive(Clone, Default)]
pub struct EventBus {
    tags: Arc<RwLock<HashMap<String, Slot>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, tag: &str) -> Option<Slot> {
        self.tags.read().get(tag).cloned()
    }

    fn slot_or_insert(&self, tag: &str) -> Slot {
        if let Some(slot) = self.slot(tag) {
            return slot;
        }
        self.tags
            .write()
            .entry(tag.to_owned())
            .or_default()
            .clone()
    }

    /// Attach a module's declared handlers under `tag`. Fails if a module
    /// of the same type is already registered there.
    pub fn register<M: Module>(&self, tag: &str, module: M) -> Result<(), ModuleError> {
        self.register_erased(tag, Box::new(Loaded::new(module)))
    }

    pub(crate) fn register_erased(&self, tag: &str, module: Box<dyn ErasedModule>) -> Result<(), ModuleError> {
        let slot = self.slot_or_insert(tag);
        let mut modules = slot.lock();
        if modules
            .iter()
            .any(|m| m.module_type() == module.module_type())
        {
            return Err(ModuleError::AlreadyRegistered {
                module: module.name(),
                tag: tag.to_owned(),
            });
        }
        debug!(module = module.name(), tag, handlers = module.handler_count(), "registered");
        modules.push(module);
        Ok(())
    }

    /// Drop every module registered under `tag`.
    pub fn unregister_all(&self, tag: &str) {
        self.tags.write().remove(tag);
    }

    pub fn module_count(&self, tag: &str) -> usize {
        self.slot(tag).map_or(0, |s| s.lock().len())
    }

    pub fn handler_count(&self, tag: &str) -> usize {
        self.slot(tag)
            .map_or(0, |s| s.lock().iter().map(|m| m.handler_count()).sum())
    }

    /// Run every matching handler, in registration order, on `event`.
    pub fn fire(&self, event: &mut Event, ctx: &mut Context<'_>) {
        trace!(kind = %event.kind(), tag = event.tag(), "fire");
        if let Some(slot) = self.slot(event.tag()) {
            let mut modules = slot.lock();
            for module in modules.iter_mut() {
                module.dispatch(event, ctx);
            }
        }
    }

    /// Fire, then run `on_complete` with the final event state. The
    /// callback always runs, cancelled or not; it decides for itself
    /// whether the default reaction should happen.
    pub fn fire_with<F>(&self, event: &mut Event, ctx: &mut Context<'_>, on_complete: F)
    where
        F: FnOnce(&Event, &mut Context<'_>),
    {
        self.fire(event, ctx);
        on_complete(event, ctx);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tags = self.tags.read();
        f.debug_struct("EventBus")
            .field("tags", &tags.keys().collect::<Vec<_>>())
            .finish()
    }
}
