//! Worker roster — capacity tracking and task allocation
//!
//! One worker is held per in-flight construction or clearing task. Capacity
//! is soft: the roster reports free workers but never refuses an
//! allocation, matching the behavior the rest of the engine was built
//! around (see DESIGN.md for the open question on admission control).

use crate::core::types::GameId;

/// Tracks worker capacity and which objects currently hold one
#[derive(Debug, Clone, Default)]
pub struct WorkerRoster {
    total: u32,
    // Insertion-ordered so fastest-task ties resolve to the earliest
    // allocation.
    allocations: Vec<GameId>,
}

impl WorkerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total worker capacity of the village.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Workers not currently held by a task
    ///
    /// Informational only; may go negative when allocations exceed
    /// capacity.
    pub fn free(&self) -> i64 {
        self.total as i64 - self.allocations.len() as i64
    }

    /// Grow capacity (a worker hut finished building).
    pub fn add_capacity(&mut self, count: u32) {
        self.total += count;
        tracing::debug!(total = self.total, "worker capacity grew");
    }

    /// Give the object a worker; idempotent.
    pub fn allocate(&mut self, id: GameId) {
        if !self.allocations.contains(&id) {
            self.allocations.push(id);
        }
    }

    /// Take the object's worker back; idempotent.
    pub fn deallocate(&mut self, id: GameId) {
        self.allocations.retain(|&held| held != id);
    }

    pub fn is_allocated(&self, id: GameId) -> bool {
        self.allocations.contains(&id)
    }

    /// Objects currently holding a worker, in allocation order.
    pub fn allocations(&self) -> &[GameId] {
        &self.allocations
    }

    pub(crate) fn clear(&mut self) {
        self.allocations.clear();
        self.total = 0;
    }
}
