//! Per-process registry of guest-named host objects.
//!
//! GLES textures and EGL images are created against guest-visible names and
//! must outlive any single batch, so each guest process keeps them in one
//! map shared by both API dispatchers. Entries own their host resources and
//! release them on removal.

use std::collections::HashMap;

/// A host object registered under a guest name.
///
/// Dropping the object releases whatever host resource backs it.
pub trait MapObject: Send {
    /// Host-side name of the backing resource, for logs and lookups.
    fn global_name(&self) -> u32;
}

/// Guest name to host object map.
///
/// Callers are expected to know which names are live: adding a duplicate
/// name or removing an absent one is a host bug and panics. Guest-supplied
/// names go through [`ObjectMap::contains`] first.
#[derive(Default)]
pub struct ObjectMap {
    objects: HashMap<u32, Box<dyn MapObject>>,
}

impl ObjectMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `obj` under `local_name`. Panics if the name is taken.
    pub fn add(&mut self, local_name: u32, obj: Box<dyn MapObject>) {
        let prev = self.objects.insert(local_name, obj);
        assert!(prev.is_none(), "object name {local_name} already registered");
    }

    /// Removes and drops the object under `local_name`. Panics if absent.
    pub fn remove(&mut self, local_name: u32) {
        let removed = self.objects.remove(&local_name);
        assert!(removed.is_some(), "object name {local_name} not registered");
    }

    /// Host name of the object under `local_name`. Panics if absent.
    pub fn global_name(&self, local_name: u32) -> u32 {
        match self.objects.get(&local_name) {
            Some(obj) => obj.global_name(),
            None => panic!("object name {local_name} not registered"),
        }
    }

    pub fn contains(&self, local_name: u32) -> bool {
        self.objects.contains_key(&local_name)
    }

    /// Drops every registered object. Used at process teardown.
    pub fn remove_all(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
