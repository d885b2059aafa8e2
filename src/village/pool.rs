//! Recycling pools — free-lists shared across villages
//!
//! Villages come and go far more often than objects are worth allocating,
//! so disposed objects park in a per-kind free-list and are reset on their
//! way back out. Pools are shared by every village on the process and must
//! therefore tolerate concurrent push/pop; they are injected as `Arc`
//! handles rather than reached through a process-wide global so tests can
//! run against isolated instances.
//!
//! Pools grow monotonically and are never shrunk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::core::types::EntityKind;
use crate::village::component::{Component, ComponentKind, COMPONENT_SLOTS};
use crate::village::object::VillageObject;

// Kind indices run up to EntityKind::Decoration (6); one shelf per possible
// row index keeps the lookup branch-free.
const OBJECT_SHELVES: usize = 8;

/// Counters describing a pool's traffic so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects pushed into the pool over its lifetime.
    pub pushed: u64,
    /// Objects popped back out (each one reset on the way).
    pub reused: u64,
}

/// Free-lists for village objects, one per entity kind
#[derive(Debug, Default)]
pub struct ObjectPool {
    shelves: [Mutex<Vec<VillageObject>>; OBJECT_SHELVES],
    pushed: AtomicU64,
    reused: AtomicU64,
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an object for later reuse.
    pub fn push(&self, obj: VillageObject) {
        let shelf = &self.shelves[obj.kind().index()];
        shelf.lock().expect("object pool lock poisoned").push(obj);
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take an object of the given kind out of the pool, if one is parked
    ///
    /// The object is reset before it is returned: coordinates, addressing,
    /// timers, and attached components are all cleared, with the components
    /// handed to the component pool. Apart from its reuse counter the
    /// result is indistinguishable from a freshly built object.
    pub fn pop(&self, kind: EntityKind, components: &ComponentPool) -> Option<VillageObject> {
        let mut obj = {
            let mut shelf = self.shelves[kind.index()]
                .lock()
                .expect("object pool lock poisoned");
            shelf.pop()?
        };
        obj.reuse_count += 1;
        obj.reset_for_reuse(components);
        self.reused.fetch_add(1, Ordering::Relaxed);
        Some(obj)
    }

    /// Number of parked objects of one kind.
    pub fn parked(&self, kind: EntityKind) -> usize {
        self.shelves[kind.index()]
            .lock()
            .expect("object pool lock poisoned")
            .len()
    }

    /// Number of parked objects across all kinds.
    pub fn parked_total(&self) -> usize {
        self.shelves
            .iter()
            .map(|shelf| shelf.lock().expect("object pool lock poisoned").len())
            .sum()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
        }
    }
}

/// Free-lists for components, one per component kind
#[derive(Debug, Default)]
pub struct ComponentPool {
    shelves: [Mutex<Vec<Component>>; COMPONENT_SLOTS],
    pushed: AtomicU64,
    reused: AtomicU64,
}

impl ComponentPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, component: Component) {
        let shelf = &self.shelves[component.kind().index()];
        shelf
            .lock()
            .expect("component pool lock poisoned")
            .push(component);
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a component of the given kind, reset, out of the pool.
    pub fn pop(&self, kind: ComponentKind) -> Option<Component> {
        let mut component = {
            let mut shelf = self.shelves[kind.index()]
                .lock()
                .expect("component pool lock poisoned");
            shelf.pop()?
        };
        component.reset();
        self.reused.fetch_add(1, Ordering::Relaxed);
        Some(component)
    }

    pub fn parked(&self, kind: ComponentKind) -> usize {
        self.shelves[kind.index()]
            .lock()
            .expect("component pool lock poisoned")
            .len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
        }
    }
}

/// The pair of pools a village is wired to
#[derive(Debug, Default)]
pub struct PoolSet {
    pub objects: ObjectPool,
    pub components: ComponentPool,
}

impl PoolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reused object of the given kind, or a freshly built bare one.
    pub fn instantiate(&self, kind: EntityKind) -> VillageObject {
        self.objects
            .pop(kind, &self.components)
            .unwrap_or_else(|| VillageObject::bare(kind))
    }
}
