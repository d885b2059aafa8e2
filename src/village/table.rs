//! Object table — dense per-kind storage with packed-id addressing
//!
//! One row of slots per entity kind, indexed by the column encoded in the
//! packed identifier. Removal leaves a hole rather than shifting columns,
//! so identifiers of live objects never move. The table is reached only
//! through `&mut` from its owning village, which gives the same mutual
//! exclusion the original table-wide lock provided.

use crate::core::error::{Result, SimError};
use crate::core::types::{EntityKind, GameId};
use crate::village::object::{VillageObject, DETACHED_COLUMN};

/// Dense storage for all objects of a village
#[derive(Debug, Default)]
pub struct ObjectTable {
    rows: Vec<Vec<Option<VillageObject>>>,
}

impl ObjectTable {
    /// Table with the given number of kind rows provisioned up front.
    pub fn new(initial_kind_rows: usize) -> Self {
        Self {
            rows: (0..initial_kind_rows).map(|_| Vec::new()).collect(),
        }
    }

    /// Append an object to its kind's row and stamp its column index
    ///
    /// Kinds beyond the provisioned row count grow the table rather than
    /// fail, since kind indices are not a closed set.
    pub fn add(&mut self, mut obj: VillageObject) -> GameId {
        let kind_index = obj.kind().index();
        if kind_index >= self.rows.len() {
            self.rows.resize_with(kind_index + 4, Vec::new);
        }

        let row = &mut self.rows[kind_index];
        obj.column_index = row.len() as i64;
        let id = obj.id().expect("column index just assigned");
        row.push(Some(obj));
        id
    }

    fn slot(&self, id: GameId) -> Option<&Option<VillageObject>> {
        self.rows.get(id.kind_index())?.get(id.column_index())
    }

    /// Object with the given identifier, if present.
    pub fn get(&self, id: GameId) -> Option<&VillageObject> {
        self.slot(id)?.as_ref()
    }

    pub fn get_mut(&mut self, id: GameId) -> Option<&mut VillageObject> {
        self.rows
            .get_mut(id.kind_index())?
            .get_mut(id.column_index())?
            .as_mut()
    }

    /// Whether a live object occupies the identifier's slot.
    pub fn contains(&self, id: GameId) -> bool {
        self.get(id).is_some()
    }

    /// Replace the object at an existing slot
    ///
    /// The slot must already be provisioned; out-of-range identifiers are a
    /// failure, never an out-of-bounds access.
    pub fn set(&mut self, id: GameId, mut obj: VillageObject) -> Result<()> {
        let slot = self
            .rows
            .get_mut(id.kind_index())
            .and_then(|row| row.get_mut(id.column_index()))
            .ok_or(SimError::ObjectNotFound(id))?;
        obj.column_index = id.column_index() as i64;
        *slot = Some(obj);
        Ok(())
    }

    /// Remove the object at the identifier's slot, leaving a hole
    ///
    /// The removed object's column index is stamped with the detached
    /// sentinel so a stale copy of its identifier cannot be mistaken for a
    /// live one. The caller decides whether it goes back to a pool.
    pub fn remove(&mut self, id: GameId) -> Option<VillageObject> {
        let slot = self
            .rows
            .get_mut(id.kind_index())?
            .get_mut(id.column_index())?;
        let mut obj = slot.take()?;
        obj.column_index = DETACHED_COLUMN;
        Some(obj)
    }

    /// Total number of live objects.
    pub fn len(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|slot| slot.is_some()).count())
            .sum()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live objects in table order (row-major, holes skipped).
    pub fn iter(&self) -> impl Iterator<Item = &VillageObject> {
        self.rows.iter().flatten().filter_map(|slot| slot.as_ref())
    }

    /// Live objects of one kind in column order.
    pub fn iter_kind(&self, kind: EntityKind) -> impl Iterator<Item = &VillageObject> {
        self.rows
            .get(kind.index())
            .into_iter()
            .flatten()
            .filter_map(|slot| slot.as_ref())
    }

    /// Identifiers of live objects in table order
    ///
    /// Snapshotting the ids lets the driver tick objects one at a time while
    /// mutating the table (removal on clear) between visits.
    pub fn live_ids(&self) -> Vec<GameId> {
        self.iter().filter_map(|obj| obj.id()).collect()
    }

    /// Drain every live object out of the table in table order.
    pub fn drain(&mut self) -> Vec<VillageObject> {
        let mut drained = Vec::new();
        for row in &mut self.rows {
            for slot in row.iter_mut() {
                if let Some(mut obj) = slot.take() {
                    obj.column_index = DETACHED_COLUMN;
                    drained.push(obj);
                }
            }
            row.clear();
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn building() -> VillageObject {
        VillageObject::bare(EntityKind::Building)
    }

    fn obstacle() -> VillageObject {
        VillageObject::bare(EntityKind::Obstacle)
    }

    #[test]
    fn test_add_assigns_sequential_columns() {
        let mut table = ObjectTable::new(8);
        let first = table.add(building());
        let second = table.add(building());
        let third = table.add(obstacle());

        assert_eq!(first, GameId::encode(EntityKind::Building, 0));
        assert_eq!(second, GameId::encode(EntityKind::Building, 1));
        assert_eq!(third, GameId::encode(EntityKind::Obstacle, 0));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_get_out_of_range_is_not_found() {
        let table = ObjectTable::new(8);
        // Reserved kind row (index 1) and an unused column both miss.
        let reserved = GameId::from_raw(501_000_000).unwrap();
        assert!(table.get(reserved).is_none());
        assert!(!table.contains(GameId::encode(EntityKind::Building, 99)));
    }

    #[test]
    fn test_remove_stamps_sentinel_and_leaves_hole() {
        let mut table = ObjectTable::new(8);
        let first = table.add(building());
        let second = table.add(building());

        let removed = table.remove(first).unwrap();
        assert_eq!(removed.id(), None);
        assert!(!table.contains(first));
        assert!(table.contains(second));

        // The hole is not reused: new objects append.
        let third = table.add(building());
        assert_eq!(third, GameId::encode(EntityKind::Building, 2));
    }

    #[test]
    fn test_remove_missing_returns_none() {
        let mut table = ObjectTable::new(8);
        assert!(table.remove(GameId::encode(EntityKind::Trap, 0)).is_none());
    }

    #[test]
    fn test_set_replaces_existing_slot_only() {
        let mut table = ObjectTable::new(8);
        let id = table.add(building());

        assert!(table.set(id, building()).is_ok());
        assert!(table.get(id).is_some());

        let missing = GameId::encode(EntityKind::Building, 40);
        assert!(table.set(missing, building()).is_err());
    }

    #[test]
    fn test_table_grows_for_high_kind_rows() {
        // Provision a single row, then add a kind that lives at index 6.
        let mut table = ObjectTable::new(1);
        let id = table.add(VillageObject::bare(EntityKind::Decoration));
        assert_eq!(id, GameId::encode(EntityKind::Decoration, 0));
        assert!(table.contains(id));
    }

    #[test]
    fn test_iteration_is_row_major() {
        let mut table = ObjectTable::new(8);
        let b0 = table.add(building());
        let o0 = table.add(obstacle());
        let b1 = table.add(building());

        let order: Vec<_> = table.iter().filter_map(|obj| obj.id()).collect();
        assert_eq!(order, vec![b0, b1, o0]);
    }

    #[test]
    fn test_drain_empties_table() {
        let mut table = ObjectTable::new(8);
        table.add(building());
        table.add(obstacle());

        let drained = table.drain();
        assert_eq!(drained.len(), 2);
        assert!(table.is_empty());
        assert!(drained.iter().all(|obj| obj.id().is_none()));
    }
}
