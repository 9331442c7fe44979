use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::object_map::{MapObject, ObjectMap};

struct Tracked {
    global: u32,
    drops: Arc<AtomicUsize>,
}

impl MapObject for Tracked {
    fn global_name(&self) -> u32 {
        self.global
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn tracked(global: u32, drops: &Arc<AtomicUsize>) -> Box<Tracked> {
    Box::new(Tracked {
        global,
        drops: drops.clone(),
    })
}

#[test]
fn add_lookup_remove() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut map = ObjectMap::new();
    assert!(map.is_empty());

    map.add(1, tracked(100, &drops));
    map.add(2, tracked(200, &drops));
    assert_eq!(map.len(), 2);
    assert!(map.contains(1));
    assert!(!map.contains(3));
    assert_eq!(map.global_name(1), 100);
    assert_eq!(map.global_name(2), 200);

    map.remove(1);
    assert!(!map.contains(1));
    assert_eq!(map.len(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn remove_all_drops_every_object() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut map = ObjectMap::new();
    for name in 1..=4 {
        map.add(name, tracked(name * 10, &drops));
    }
    map.remove_all();
    assert!(map.is_empty());
    assert_eq!(drops.load(Ordering::SeqCst), 4);
}

#[test]
#[should_panic(expected = "already registered")]
fn duplicate_name_panics() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut map = ObjectMap::new();
    map.add(7, tracked(1, &drops));
    map.add(7, tracked(2, &drops));
}

#[test]
#[should_panic(expected = "not registered")]
fn removing_an_absent_name_panics() {
    let mut map = ObjectMap::new();
    map.remove(9);
}

#[test]
#[should_panic(expected = "not registered")]
fn looking_up_an_absent_name_panics() {
    let map = ObjectMap::new();
    map.global_name(9);
}
