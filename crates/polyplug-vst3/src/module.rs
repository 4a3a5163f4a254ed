//! Instance lifetime management for a loaded plugin module.
//!
//! Some hosts keep calling into an instance after releasing it. Released
//! instances are therefore not dropped right away: they move into a
//! [`ReleaseArena`] keyed by instance id and are only destroyed when the
//! module unloads.

use std::collections::HashMap;

use log::debug;

use polyplug_core::{ConstructionParams, Plugin, PluginConfig, PluginResult};

use crate::processor::Vst3Adapter;
use crate::wrapper::Vst3Config;

/// Identity of an instance created by a [`PluginModule`].
pub type InstanceId = u64;

/// Objects the host has released but may still reference.
#[derive(Debug)]
pub struct ReleaseArena<T> {
    entries: HashMap<InstanceId, T>,
}

impl<T> Default for ReleaseArena<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ReleaseArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a released object. An object already parked under `id` is
    /// replaced and returned.
    pub fn insert(&mut self, id: InstanceId, object: T) -> Option<T> {
        self.entries.insert(id, object)
    }

    /// Late access to a released object.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    /// Take a parked object back out.
    pub fn reclaim(&mut self, id: InstanceId) -> Option<T> {
        self.entries.remove(&id)
    }

    #[inline]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.entries.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every parked object, returning how many there were.
    pub fn flush(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

/// All instances of one plugin type created by a loaded module.
pub struct PluginModule<P: Plugin> {
    config: PluginConfig,
    vst3_config: Vst3Config,
    next_id: InstanceId,
    live: HashMap<InstanceId, Vst3Adapter<P>>,
    released: ReleaseArena<Vst3Adapter<P>>,
}

impl<P: Plugin> PluginModule<P> {
    pub fn new(config: PluginConfig, vst3_config: Vst3Config) -> Self {
        Self {
            config,
            vst3_config,
            next_id: 1,
            live: HashMap::new(),
            released: ReleaseArena::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Create a new instance and return its id.
    pub fn create_instance(&mut self, params: &ConstructionParams) -> PluginResult<InstanceId> {
        let adapter = Vst3Adapter::new(&self.config, &self.vst3_config, params)?;
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, adapter);
        debug!("Created instance {} of '{}'", id, self.config.name);
        Ok(id)
    }

    /// Look up an instance, released ones included.
    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Vst3Adapter<P>> {
        match self.live.get_mut(&id) {
            Some(adapter) => Some(adapter),
            None => self.released.get_mut(id),
        }
    }

    /// Returns true if `id` was released but is still kept alive.
    pub fn is_released(&self, id: InstanceId) -> bool {
        self.released.contains(id)
    }

    /// Host released an instance. It stays reachable until [`unload`](Self::unload).
    pub fn release(&mut self, id: InstanceId) -> bool {
        match self.live.remove(&id) {
            Some(mut adapter) => {
                adapter.instance_mut().deactivate();
                self.released.insert(id, adapter);
                debug!("Released instance {}", id);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    /// Destroy every instance, released or not.
    pub fn unload(&mut self) {
        let live = self.live.len();
        self.live.clear();
        let released = self.released.flush();
        if live + released > 0 {
            debug!(
                "Unloading '{}': {} live, {} released instances",
                self.config.name, live, released
            );
        }
    }
}

impl<P: Plugin> Drop for PluginModule<P> {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_insert_reclaim_flush() {
        let mut arena = ReleaseArena::new();
        assert!(arena.is_empty());
        arena.insert(1, "a");
        arena.insert(2, "b");
        assert!(arena.contains(1));
        assert_eq!(arena.reclaim(1), Some("a"));
        assert!(!arena.contains(1));
        assert_eq!(arena.flush(), 1);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_arena_late_access() {
        let mut arena = ReleaseArena::new();
        arena.insert(7, 1u32);
        if let Some(value) = arena.get_mut(7) {
            *value += 1;
        }
        assert_eq!(arena.reclaim(7), Some(2));
        assert_eq!(arena.get_mut(7), None);
    }
}
